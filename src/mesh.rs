use crate::{
    field::Grid,
    projector::Projector,
    types::{Point, ScreenPoint, Value},
};

/// One grid cell as seen by the camera in the current frame.
///
/// Faces are rebuilt from the [`Grid`] every frame and never patched in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Grid index `(row, col)` of the cell.
    pub cell: (usize, usize),
    /// World-space corners, in [`Grid::cell_corners`] order.
    pub corners: [Point; 4],
    /// Projected corners in logical canvas pixels.
    pub screen: [ScreenPoint; 4],
    /// Mean of the four projected corner depths.
    pub depth: Value,
    /// Cell-centre density normalized to `[0, 1]`.
    pub density: Value,
}

impl Face {
    /// Projects cell `(row, col)` of `grid` through `projector`.
    pub fn from_cell(grid: &Grid, row: usize, col: usize, projector: &Projector) -> Self {
        let corners = grid.cell_corners(row, col);
        let projected = corners.map(|corner| projector.project(&corner));
        let depth = projected.iter().map(|p| p.depth).sum::<Value>() / 4.0;
        Self {
            cell: (row, col),
            corners,
            screen: projected.map(|p| p.screen),
            depth,
            density: grid.normalized_density(row, col),
        }
    }
}

/// Builds one [`Face`] per grid cell, row-major and unsorted.
pub fn build_faces(grid: &Grid, projector: &Projector) -> Vec<Face> {
    let mut faces = Vec::with_capacity(grid.resolution * grid.resolution);
    faces.extend(
        grid.cells()
            .map(|(row, col)| Face::from_cell(grid, row, col, projector)),
    );
    faces
}
