use std::{f32::consts::PI, fmt, sync::Arc};

use ndarray::Array2;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, warn};

use crate::{
    error::{Result, SurfaceError},
    interp::remap,
    types::{FieldFunction, Point, Value},
};

/// A scalar density field over the square domain `[-radius, radius]²`.
///
/// The field is sampled as a surface: the height of a domain point is
/// `density(x, z) × height_scale`, where `height_scale` maps the field's peak density
/// onto `peak_height`.
#[derive(Clone)]
pub struct ScalarField {
    function: Arc<FieldFunction>,
    /// Half-width of the square domain.
    pub radius: Value,
    /// Domain location `(x, z)` of the field's global maximum.
    pub peak: (Value, Value),
    /// Field value at [`peak`](ScalarField::peak).
    pub max_density: Value,
    /// Multiplier from density to world-space height.
    pub height_scale: Value,
}

impl fmt::Debug for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarField")
            .field("radius", &self.radius)
            .field("peak", &self.peak)
            .field("max_density", &self.max_density)
            .field("height_scale", &self.height_scale)
            .finish_non_exhaustive()
    }
}

impl ScalarField {
    /// Wraps `function`, evaluating it once at `peak` to fix the normalization.
    ///
    /// If the value at `peak` is not a finite positive density the surface is drawn flat
    /// (`height_scale == 0`); shading still follows the sampled grid.
    pub fn new<F>(function: F, radius: Value, peak: (Value, Value), peak_height: Value) -> Self
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        let max_density = function(peak.0, peak.1);
        let height_scale = if max_density.is_finite() && max_density > 0.0 {
            peak_height / max_density
        } else {
            warn!(max_density, "field has no positive peak, drawing it flat");
            0.0
        };
        Self {
            function: Arc::new(function),
            radius,
            peak,
            max_density,
            height_scale,
        }
    }

    /// Standard bivariate normal density with correlation `correlation`, centred on the origin.
    ///
    /// ```text
    /// f(x, z) = exp(-(x² - 2rxz + z²) / 2(1 - r²)) / (2π √(1 - r²))
    /// ```
    pub fn bivariate_normal(correlation: Value, radius: Value, peak_height: Value) -> Result<Self> {
        if !(correlation.abs() < 1.0) {
            return Err(SurfaceError::InvalidCorrelation(correlation));
        }
        let r = correlation;
        let det = 1.0 - r * r;
        let norm = 1.0 / (2.0 * PI * det.sqrt());
        let density = move |x: Value, z: Value| {
            let q = (x * x - 2.0 * r * x * z + z * z) / det;
            norm * (-0.5 * q).exp()
        };
        Ok(Self::new(density, radius, (0.0, 0.0), peak_height))
    }

    /// Field value at domain point `(x, z)`.
    #[inline]
    pub fn density(&self, x: Value, z: Value) -> Value {
        (self.function)(x, z)
    }

    /// Surface height at domain point `(x, z)`.
    #[inline]
    pub fn height(&self, x: Value, z: Value) -> Value {
        self.density(x, z) * self.height_scale
    }

    /// World-space point on the surface above `(x, z)`.
    pub fn surface_point(&self, x: Value, z: Value) -> Point {
        Point::new(x, self.height(x, z), z)
    }
}

/// A `resolution × resolution` cell grid tiling the field's domain.
///
/// The grid has `(resolution + 1)²` corner points with precomputed heights and
/// `resolution²` cells with precomputed centre densities. Both are stored as
/// `[row, column]` where rows advance along `z` and columns along `x`.
///
/// Built once per [`ScalarField`]; rebuild it when the field changes.
#[derive(Debug, Clone)]
pub struct Grid {
    /// Number of cells along each axis.
    pub resolution: usize,
    /// Half-width of the tiled domain.
    pub radius: Value,
    /// World-space edge length of one cell.
    pub cell_size: Value,
    heights: Array2<Value>,
    densities: Array2<Value>,
    peak_density: Value,
}

impl Grid {
    /// Samples `field` at every corner and cell centre.
    ///
    /// Rows are sampled in parallel; the result does not depend on scheduling.
    pub fn build(field: &ScalarField, resolution: usize) -> Result<Self> {
        if resolution == 0 {
            return Err(SurfaceError::InvalidResolution(resolution));
        }
        let radius = field.radius;
        let cell_size = 2.0 * radius / resolution as Value;
        let extent = resolution as Value;
        let coord = |index: Value| remap(index, [0.0, extent], [-radius, radius]);

        let heights: Vec<Value> = (0..=resolution)
            .into_par_iter()
            .flat_map_iter(|row| {
                (0..=resolution).map(move |col| field.height(coord(col as Value), coord(row as Value)))
            })
            .collect();
        let heights = Array2::from_shape_vec((resolution + 1, resolution + 1), heights)?;

        let densities: Vec<Value> = (0..resolution)
            .into_par_iter()
            .flat_map_iter(|row| {
                (0..resolution).map(move |col| {
                    field.density(coord(col as Value + 0.5), coord(row as Value + 0.5))
                })
            })
            .collect();
        let densities = Array2::from_shape_vec((resolution, resolution), densities)?;

        let peak_density = densities
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .fold(0.0, Value::max);

        let grid = Self {
            resolution,
            radius,
            cell_size,
            heights,
            densities,
            peak_density,
        };
        debug!(
            resolution,
            peak_density,
            peak_cell = ?grid.peak_cell(),
            "built surface grid"
        );
        Ok(grid)
    }

    /// World-space corner at grid index `(row, col)`.
    #[inline]
    pub fn corner(&self, row: usize, col: usize) -> Point {
        Point::new(
            -self.radius + col as Value * self.cell_size,
            self.heights[[row, col]],
            -self.radius + row as Value * self.cell_size,
        )
    }

    /// The 4 corners of cell `(row, col)`, in winding order:
    ///
    /// ```text
    ///   3----2     +X →
    ///   |    |     +Z ↓
    ///   0----1
    /// ```
    pub fn cell_corners(&self, row: usize, col: usize) -> [Point; 4] {
        [
            self.corner(row, col),
            self.corner(row, col + 1),
            self.corner(row + 1, col + 1),
            self.corner(row + 1, col),
        ]
    }

    /// Domain coordinates `(x, z)` of the centre of cell `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> (Value, Value) {
        (
            -self.radius + (col as Value + 0.5) * self.cell_size,
            -self.radius + (row as Value + 0.5) * self.cell_size,
        )
    }

    /// Raw field density at the centre of cell `(row, col)`.
    #[inline]
    pub fn density(&self, row: usize, col: usize) -> Value {
        self.densities[[row, col]]
    }

    /// Centre density of cell `(row, col)` divided by the grid's largest centre density.
    ///
    /// The densest cell maps to exactly `1.0`. Values are clamped to `[0, 1]`; a NaN
    /// sample stays NaN and paints as a fully transparent face.
    pub fn normalized_density(&self, row: usize, col: usize) -> Value {
        if self.peak_density <= 0.0 {
            return 0.0;
        }
        (self.densities[[row, col]] / self.peak_density).clamp(0.0, 1.0)
    }

    /// Index `(row, col)` of the first cell attaining the grid's largest centre density.
    pub fn peak_cell(&self) -> (usize, usize) {
        self.densities
            .indexed_iter()
            .find(|(_, d)| **d == self.peak_density)
            .map(|(idx, _)| idx)
            .unwrap_or((0, 0))
    }

    /// Iterator over every world-space corner point, row-major.
    pub fn corners(&self) -> impl Iterator<Item = Point> + '_ {
        (0..=self.resolution)
            .flat_map(move |row| (0..=self.resolution).map(move |col| self.corner(row, col)))
    }

    /// Iterator over every cell index `(row, col)`, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.resolution).flat_map(move |row| (0..self.resolution).map(move |col| (row, col)))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn hero_field() -> ScalarField {
        ScalarField::bivariate_normal(0.72, 2.8, 1.7).unwrap()
    }

    #[test]
    fn bivariate_peak_maps_to_peak_height() {
        let field = hero_field();
        assert_relative_eq!(field.height(0.0, 0.0), 1.7, epsilon = 1e-5);
        assert_relative_eq!(
            field.max_density,
            1.0 / (2.0 * PI * (1.0_f32 - 0.72 * 0.72).sqrt()),
            epsilon = 1e-6
        );
        assert!(field.density(1.0, 1.0) > field.density(1.0, -1.0));
    }

    #[test]
    fn rejects_degenerate_correlation() {
        assert!(matches!(
            ScalarField::bivariate_normal(1.0, 2.8, 1.7),
            Err(SurfaceError::InvalidCorrelation(_))
        ));
        assert!(ScalarField::bivariate_normal(f32::NAN, 2.8, 1.7).is_err());
    }

    #[test]
    fn rejects_empty_grid() {
        assert!(matches!(
            Grid::build(&hero_field(), 0),
            Err(SurfaceError::InvalidResolution(0))
        ));
    }

    #[test]
    fn grid_corners_span_domain() {
        let grid = Grid::build(&hero_field(), 34).unwrap();
        let first = grid.corner(0, 0);
        let last = grid.corner(34, 34);
        assert_relative_eq!(first.x, -2.8, epsilon = 1e-5);
        assert_relative_eq!(first.z, -2.8, epsilon = 1e-5);
        assert_relative_eq!(last.x, 2.8, epsilon = 1e-5);
        assert_relative_eq!(last.z, 2.8, epsilon = 1e-5);
        assert!(first.y > 0.0 && first.y < 0.05);
    }

    #[test]
    fn odd_grid_has_single_peak_cell() {
        let grid = Grid::build(&hero_field(), 33).unwrap();
        let peaks: Vec<_> = grid
            .cells()
            .filter(|&(r, c)| grid.normalized_density(r, c) == 1.0)
            .collect();
        assert_eq!(peaks, vec![(16, 16)]);
        assert_eq!(grid.peak_cell(), (16, 16));
    }

    #[test]
    fn even_grid_peak_sits_on_the_central_diagonal() {
        let grid = Grid::build(&hero_field(), 34).unwrap();
        let peaks: Vec<_> = grid
            .cells()
            .filter(|&(r, c)| grid.normalized_density(r, c) == 1.0)
            .collect();
        assert!(!peaks.is_empty());
        assert!(peaks.iter().all(|cell| [(16, 16), (17, 17)].contains(cell)));
        // positive correlation favours the x = z diagonal over the anti-diagonal
        assert_relative_eq!(grid.density(16, 16), grid.density(17, 17), max_relative = 1e-5);
        assert!(grid.density(16, 17) < grid.density(16, 16));
        assert!(grid.density(17, 16) < grid.density(16, 16));
        for (r, c) in grid.cells() {
            let d = grid.normalized_density(r, c);
            assert!((0.0..=1.0).contains(&d));
        }
    }

    #[test]
    fn field_without_positive_peak_is_flat() {
        let field = ScalarField::new(|x, z| x * x + z * z, 2.8, (0.0, 0.0), 1.7);
        assert_eq!(field.height_scale, 0.0);
        let grid = Grid::build(&field, 8).unwrap();
        assert!(grid.corners().all(|corner| corner.y == 0.0));
        assert_relative_eq!(grid.normalized_density(0, 0), 1.0, max_relative = 1e-5);
        assert!(grid.normalized_density(3, 4) < 0.1);
    }

    #[test]
    fn custom_field_is_sampled_at_cell_centres() {
        let field = ScalarField::new(|x, z| 4.0 - x.abs() - z.abs(), 2.0, (0.0, 0.0), 2.0);
        let grid = Grid::build(&field, 2).unwrap();
        assert_eq!(grid.cell_center(0, 0), (-1.0, -1.0));
        assert_relative_eq!(grid.density(1, 1), 2.0);
        assert_relative_eq!(grid.normalized_density(0, 1), 1.0);
        assert_relative_eq!(grid.corner(1, 1).y, 2.0);
    }
}
