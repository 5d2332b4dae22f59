use tracing::{debug, trace, warn};

use crate::{
    canvas::{Canvas, Rgba},
    error::{Result, SurfaceError},
    field::{Grid, ScalarField},
    interaction::{CameraState, InteractionConfig, InteractionController},
    mesh::Face,
    painter::{
        SurfaceLabels, label_anchors, paint_faces, paint_labels, paint_reference_lines,
        paint_scatter, sort_faces,
    },
    projector::{ProjectionParams, Projector, Viewport},
    scatter::{ScatterConfig, ScatterPoint, scatter_points},
    theme::{Palette, Theme},
    types::{Point, Value},
};

/// Everything that defines the surface at construction time.
///
/// The field parameters describe the default bivariate normal surface; use
/// [`SurfaceRenderer::from_field`] for any other [`ScalarField`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    /// Correlation (shape) parameter of the bivariate normal field.
    pub correlation: Value,
    /// Half-width of the square domain.
    pub radius: Value,
    /// World-space height of the field's peak.
    pub peak_height: Value,
    /// Cells per grid axis.
    pub resolution: usize,
    /// Reference grid divisions per axis on the floor.
    pub reference_divisions: usize,
    pub scatter: ScatterConfig,
    pub projection: ProjectionParams,
    pub interaction: InteractionConfig,
    pub labels: SurfaceLabels,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        let correlation = 0.72;
        Self {
            correlation,
            radius: 2.8,
            peak_height: 1.7,
            resolution: 34,
            reference_divisions: 8,
            scatter: ScatterConfig::default().with_correlation(correlation),
            projection: ProjectionParams::default(),
            interaction: InteractionConfig::default(),
            labels: SurfaceLabels::default(),
        }
    }
}

impl SurfaceConfig {
    /// Sets the field correlation; the scatter overlay follows the same shape.
    pub fn with_correlation(mut self, correlation: Value) -> Self {
        self.correlation = correlation;
        self.scatter.correlation = correlation;
        self
    }

    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_scatter(mut self, scatter: ScatterConfig) -> Self {
        self.scatter = scatter;
        self
    }

    pub fn with_interaction(mut self, interaction: InteractionConfig) -> Self {
        self.interaction = interaction;
        self
    }

    pub fn with_labels(mut self, labels: SurfaceLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Builds the bivariate normal field these parameters describe.
    pub fn field(&self) -> Result<ScalarField> {
        ScalarField::bivariate_normal(self.correlation, self.radius, self.peak_height)
    }
}

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// No drawable context was available; nothing was painted and yaw did not advance.
    Skipped,
}

/// One surface instance: geometry built at construction, camera state mutated by input
/// and idle frames, and the per-frame draw.
#[derive(Debug)]
pub struct SurfaceRenderer {
    config: SurfaceConfig,
    field: ScalarField,
    grid: Grid,
    scatter: Vec<ScatterPoint>,
    controller: InteractionController,
    palette: Palette,
    viewport: Viewport,
    faces: Vec<Face>,
}

impl SurfaceRenderer {
    pub fn new(config: SurfaceConfig, viewport: Viewport, theme: Theme) -> Result<Self> {
        let field = config.field()?;
        Self::from_field(field, config, viewport, theme)
    }

    /// Renders `field` instead of the bivariate normal described by `config`.
    pub fn from_field(
        field: ScalarField,
        config: SurfaceConfig,
        viewport: Viewport,
        theme: Theme,
    ) -> Result<Self> {
        let grid = Grid::build(&field, config.resolution)?;
        let scatter = scatter_points(&config.scatter);
        check_clearance(&field, &grid, &scatter, &config.projection)?;
        let controller = InteractionController::new(config.interaction);
        Ok(Self {
            field,
            grid,
            scatter,
            controller,
            palette: theme.palette(),
            viewport,
            faces: Vec::with_capacity(config.resolution * config.resolution),
            config,
        })
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn field(&self) -> &ScalarField {
        &self.field
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn scatter(&self) -> &[ScatterPoint] {
        &self.scatter
    }

    pub fn camera(&self) -> &CameraState {
        self.controller.camera()
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Camera transform for the current yaw and viewport.
    pub fn projector(&self) -> Projector {
        Projector::new(self.camera().yaw(), self.viewport, self.config.projection)
    }

    /// Faces painted by the most recent drawn frame, farthest first.
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Replaces the field and rebuilds the grid. The camera is untouched.
    ///
    /// On error the previous field and grid stay in place.
    pub fn set_field(&mut self, field: ScalarField) -> Result<()> {
        let grid = Grid::build(&field, self.config.resolution)?;
        check_clearance(&field, &grid, &self.scatter, &self.config.projection)?;
        self.grid = grid;
        self.field = field;
        Ok(())
    }

    /// Adopts a new logical size / pixel ratio. Geometry and camera are untouched.
    pub fn resize(&mut self, viewport: Viewport) {
        debug!(
            width = viewport.width,
            height = viewport.height,
            pixel_ratio = viewport.pixel_ratio,
            "surface resized"
        );
        self.viewport = viewport;
    }

    /// Swaps the palette used by every draw call; no geometry is recomputed.
    pub fn set_theme(&mut self, theme: Theme) {
        debug!(?theme, "surface theme changed");
        self.palette = theme.palette();
    }

    pub fn pointer_down(&mut self, x: Value) {
        self.controller.pointer_down(x);
    }

    pub fn pointer_move(&mut self, x: Value) -> bool {
        self.controller.pointer_move(x)
    }

    pub fn pointer_up(&mut self) {
        self.controller.pointer_up();
    }

    pub fn pointer_leave(&mut self) {
        self.controller.pointer_leave();
    }

    pub fn touch_start(&mut self, x: Value) {
        self.controller.touch_start(x);
    }

    pub fn touch_move(&mut self, x: Value) -> bool {
        self.controller.touch_move(x)
    }

    pub fn touch_end(&mut self) {
        self.controller.touch_end();
    }

    /// Draws one frame and, if idle, advances the ambient rotation.
    ///
    /// ```text
    /// 1. clear to background
    /// 2. floor reference lines
    /// 3. build faces → sort far-to-near → paint
    /// 4. scatter points
    /// 5. labels (hint only while idle)
    /// 6. idle tick
    /// ```
    ///
    /// Without a canvas the frame is skipped entirely; the next one starts from scratch.
    pub fn draw_frame<C: Canvas + ?Sized>(&mut self, canvas: Option<&mut C>) -> FrameOutcome {
        let Some(canvas) = canvas else {
            trace!("no drawable context, skipping frame");
            return FrameOutcome::Skipped;
        };

        let projector = self.projector();
        let palette = self.palette;

        canvas.clear(Rgba::rgb(palette.background));
        paint_reference_lines(
            canvas,
            self.grid.radius,
            self.config.reference_divisions,
            &projector,
            &palette,
        );

        let grid = &self.grid;
        self.faces.clear();
        self.faces.extend(
            grid.cells()
                .map(|(row, col)| Face::from_cell(grid, row, col, &projector)),
        );
        sort_faces(&mut self.faces);
        paint_faces(canvas, &self.faces, &palette);

        paint_scatter(canvas, &self.scatter, &projector, &palette);
        paint_labels(
            canvas,
            &self.config.labels,
            &self.field,
            &projector,
            &palette,
            self.camera().is_idle(),
        );

        self.controller.apply_idle_tick();
        FrameOutcome::Drawn
    }
}

/// Rejects scenes whose nearest point can come too close to the camera at some yaw.
///
/// Checks every grid corner, the floor outline, the scatter points and the label anchors.
fn check_clearance(
    field: &ScalarField,
    grid: &Grid,
    scatter: &[ScatterPoint],
    projection: &ProjectionParams,
) -> Result<()> {
    let r = grid.radius;
    let floor = [(-r, -r), (r, -r), (r, r), (-r, r)].map(|(x, z)| Point::new(x, 0.0, z));
    let divisor = projection.min_divisor(
        grid.corners()
            .chain(floor)
            .chain(scatter.iter().map(ScatterPoint::position))
            .chain(label_anchors(field)),
    );
    if divisor >= projection.min_clearance() {
        Ok(())
    } else {
        warn!(divisor, radius = r, "surface rejected: reaches behind the camera");
        Err(SurfaceError::BehindCamera(divisor))
    }
}
