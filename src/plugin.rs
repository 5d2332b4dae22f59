use bevy::{
    asset::RenderAssetUsages,
    prelude::*,
    render::render_resource::{Extent3d, TextureDimension, TextureFormat},
    window::{PrimaryWindow, WindowResized, WindowScaleFactorChanged},
};
#[cfg(feature = "pointer_input")]
use bevy::window::CursorLeft;

use crate::{
    canvas::{PixelCanvas, Rgba},
    error::Result,
    field::ScalarField,
    projector::Viewport,
    render_loop::{FrameTask, RenderLoop},
    renderer::{FrameOutcome, SurfaceConfig, SurfaceRenderer},
    theme::Theme,
};
#[cfg(feature = "pointer_input")]
use crate::types::ScreenPoint;

/// Label entities pooled under each view: two axis tags, the peak annotation, the hint.
const LABEL_SLOTS: usize = 4;

/// System sets for the surface pipeline, chained in `Update`:
///
/// ```text
/// SurfaceSet::Setup  →  SurfaceSet::Input  →  SurfaceSet::Draw  →  SurfaceSet::Present
/// ```
///
/// Order your own camera or layout systems before [`SurfaceSet::Input`] so the frame
/// sees them.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SurfaceSet {
    /// Attaches the image, sprite and label children to new [`SurfaceView`]s and starts them.
    Setup,
    /// Resize, theme, pointer and touch handling.
    Input,
    /// Runs one frame per view and uploads the pixels.
    Draw,
    /// Moves label children to the positions recorded by the frame.
    Present,
}

/// Active colour scheme for every [`SurfaceView`]. Change it at runtime to switch palettes:
///
/// ```rust,ignore
/// fn toggle(mut theme: ResMut<SurfaceTheme>) {
///     theme.0 = theme.0.toggled();
/// }
/// ```
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceTheme(pub Theme);

/// How a [`SurfaceView`] sizes itself.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SurfaceLayout {
    /// Logical size of the primary window.
    #[default]
    FillWindow,
    /// Fixed logical size, centred on the entity's transform.
    Fixed { width: f32, height: f32 },
}

impl SurfaceLayout {
    fn viewport(&self, window: Option<&Window>) -> Option<Viewport> {
        let pixel_ratio = window.map_or(1.0, |w| w.scale_factor());
        let (width, height) = match *self {
            SurfaceLayout::FillWindow => {
                let window = window?;
                (window.width(), window.height())
            }
            SurfaceLayout::Fixed { width, height } => (width, height),
        };
        Viewport::new(width, height, pixel_ratio).ok()
    }
}

/// An interactive density surface drawn into a sprite.
///
/// Spawn it with a 2D camera in the scene; the plugin does the rest. Despawning the entity
/// stops its render loop and removes its label children.
///
/// ```rust,ignore
/// commands.spawn(Camera2d);
/// commands.spawn(SurfaceView::new(SurfaceConfig::default())?);
/// ```
#[derive(Component)]
#[require(Transform, Visibility)]
pub struct SurfaceView {
    layout: SurfaceLayout,
    render_loop: RenderLoop,
    canvas: PixelCanvas,
    frame: Option<FrameTask>,
    /// Id of the touch that started the current touch drag.
    #[cfg(feature = "pointer_input")]
    touch: Option<u64>,
}

impl SurfaceView {
    /// A view of the bivariate normal surface described by `config`.
    pub fn new(config: SurfaceConfig) -> Result<Self> {
        let field = config.field()?;
        Self::with_field(field, config)
    }

    /// A view of an arbitrary field.
    pub fn with_field(field: ScalarField, config: SurfaceConfig) -> Result<Self> {
        let viewport = Viewport::default();
        let renderer = SurfaceRenderer::from_field(field, config, viewport, Theme::default())?;
        Ok(Self {
            layout: SurfaceLayout::default(),
            render_loop: RenderLoop::new(renderer),
            canvas: PixelCanvas::new(viewport),
            frame: None,
            #[cfg(feature = "pointer_input")]
            touch: None,
        })
    }

    pub fn with_layout(mut self, layout: SurfaceLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn renderer(&self) -> &SurfaceRenderer {
        self.render_loop.renderer()
    }

    pub fn canvas(&self) -> &PixelCanvas {
        &self.canvas
    }

    pub fn is_running(&self) -> bool {
        self.frame.is_some()
    }

    /// Cancels the pending frame and detaches the resize listener. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.frame.take() {
            if let Err(err) = self.render_loop.stop(task) {
                warn!("surface loop did not stop cleanly: {err}");
            }
        }
    }
}

impl Drop for SurfaceView {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Marks a pooled label child of a [`SurfaceView`]; the index selects the recorded label.
#[derive(Component, Debug, Clone, Copy)]
pub struct SurfaceLabel(pub usize);

/// Bevy plugin that drives every [`SurfaceView`].
///
/// ```text
/// SurfaceView added
///   → image + Sprite + label children attached, loop started   (SurfaceSet::Setup)
///   → resize / theme / pointer / touch applied                  (SurfaceSet::Input)
///   → one frame drawn, pixels copied into the image             (SurfaceSet::Draw)
///   → label children moved onto the recorded text positions     (SurfaceSet::Present)
/// SurfaceView despawned
///   → loop stopped (Drop), label children despawned with it
/// ```
#[derive(Default)]
pub struct DensitySurfacePlugin {
    /// Initial value for [`SurfaceTheme`].
    pub theme: Theme,
}

impl Plugin for DensitySurfacePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SurfaceTheme(self.theme))
            .configure_sets(
                Update,
                (
                    SurfaceSet::Setup,
                    SurfaceSet::Input,
                    SurfaceSet::Draw,
                    SurfaceSet::Present,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    start_views.in_set(SurfaceSet::Setup),
                    (track_viewport, apply_theme).in_set(SurfaceSet::Input),
                    draw_views.in_set(SurfaceSet::Draw),
                    sync_labels.in_set(SurfaceSet::Present),
                ),
            );

        #[cfg(feature = "pointer_input")]
        app.add_systems(
            Update,
            (mouse_input, touch_input)
                .chain()
                .after(track_viewport)
                .in_set(SurfaceSet::Input),
        );
    }
}

/// Creates the backing image and label pool for every newly added [`SurfaceView`] and
/// starts its loop.
fn start_views(
    mut commands: Commands,
    theme: Res<SurfaceTheme>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut images: ResMut<Assets<Image>>,
    mut views: Query<(Entity, &mut SurfaceView), Added<SurfaceView>>,
) {
    let window = windows.single().ok();
    for (entity, mut view) in views.iter_mut() {
        let view = &mut *view;
        let task = match view.render_loop.start() {
            Ok(task) => task,
            Err(err) => {
                warn!("surface {entity} not started: {err}");
                continue;
            }
        };
        if let Some(viewport) = view.layout.viewport(window) {
            if let Some(viewport) = view.render_loop.on_resize(viewport) {
                view.canvas.set_viewport(viewport);
            }
        }
        view.render_loop.renderer_mut().set_theme(theme.0);
        view.frame = Some(task);

        let viewport = view.canvas.viewport();
        let image = Image::new_fill(
            Extent3d {
                width: view.canvas.width(),
                height: view.canvas.height(),
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            &[0, 0, 0, 0],
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::default(),
        );
        commands.entity(entity).insert(Sprite {
            image: images.add(image),
            custom_size: Some(Vec2::new(viewport.width, viewport.height)),
            ..default()
        });

        let font_size = view.renderer().config().labels.font_size;
        for slot in 0..LABEL_SLOTS {
            commands.spawn((
                SurfaceLabel(slot),
                Text2d::default(),
                TextFont::from_font_size(font_size),
                TextColor(Color::WHITE),
                Transform::from_xyz(0.0, 0.0, 1.0),
                Visibility::Hidden,
                ChildOf(entity),
            ));
        }
        debug!("surface {entity} started at {}x{}", viewport.width, viewport.height);
    }
}

/// Forwards window resize and scale-factor notifications to every view.
fn track_viewport(
    mut resized: MessageReader<WindowResized>,
    mut rescaled: MessageReader<WindowScaleFactorChanged>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut views: Query<(&mut SurfaceView, &mut Sprite)>,
) {
    let notified = resized.read().count() + rescaled.read().count() > 0;
    if !notified {
        return;
    }
    let window = windows.single().ok();
    for (mut view, mut sprite) in views.iter_mut() {
        let SurfaceView {
            layout,
            render_loop,
            canvas,
            ..
        } = &mut *view;
        let Some(viewport) = layout.viewport(window) else {
            continue;
        };
        if let Some(viewport) = render_loop.on_resize(viewport) {
            canvas.set_viewport(viewport);
            sprite.custom_size = Some(Vec2::new(viewport.width, viewport.height));
        }
    }
}

fn apply_theme(theme: Res<SurfaceTheme>, mut views: Query<&mut SurfaceView>) {
    if !theme.is_changed() {
        return;
    }
    for mut view in views.iter_mut() {
        view.render_loop.renderer_mut().set_theme(theme.0);
    }
}

/// Window position (logical, origin top-left) to canvas-local logical pixels for a view
/// centred at `center`, seen through an unscaled 2D camera at the origin. Unbounded.
#[cfg(feature = "pointer_input")]
fn canvas_local(window_size: Vec2, position: Vec2, center: Vec2, viewport: Viewport) -> ScreenPoint {
    ScreenPoint::new(
        position.x - (window_size.x * 0.5 + center.x - viewport.width * 0.5),
        position.y - (window_size.y * 0.5 - center.y - viewport.height * 0.5),
    )
}

#[cfg(feature = "pointer_input")]
fn contains(viewport: Viewport, point: &ScreenPoint) -> bool {
    (0.0..=viewport.width).contains(&point.x) && (0.0..=viewport.height).contains(&point.y)
}

/// Mouse drag control. Pressing inside a view starts a drag and moving rotates. Releasing,
/// leaving the view or leaving the window ends it.
#[cfg(feature = "pointer_input")]
fn mouse_input(
    buttons: Res<ButtonInput<MouseButton>>,
    mut left: MessageReader<CursorLeft>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut views: Query<(&mut SurfaceView, &GlobalTransform)>,
) {
    let cursor_left = left.read().count() > 0;
    let window = windows.single().ok();
    let cursor = window.and_then(|w| w.cursor_position().map(|cursor| (w.size(), cursor)));

    for (mut view, transform) in views.iter_mut() {
        let center = transform.translation().truncate();
        let viewport = view.canvas.viewport();
        let inside = cursor
            .map(|(size, cursor)| canvas_local(size, cursor, center, viewport))
            .filter(|point| contains(viewport, point));
        let renderer = view.render_loop.renderer_mut();

        if buttons.just_pressed(MouseButton::Left) {
            if let Some(point) = inside {
                renderer.pointer_down(point.x);
            }
        } else if buttons.pressed(MouseButton::Left) && !renderer.camera().is_idle() {
            match inside {
                Some(point) => {
                    renderer.pointer_move(point.x);
                }
                None => renderer.pointer_leave(),
            }
        }
        if buttons.just_released(MouseButton::Left) {
            renderer.pointer_up();
        }
        if cursor_left {
            renderer.pointer_leave();
        }
    }
}

/// Single-finger touch control. The drag follows the touch that started it inside the view
/// and ends when that touch is released or cancelled.
#[cfg(feature = "pointer_input")]
fn touch_input(
    touches: Res<Touches>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut views: Query<(&mut SurfaceView, &GlobalTransform)>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let size = window.size();

    for (mut view, transform) in views.iter_mut() {
        let center = transform.translation().truncate();
        let viewport = view.canvas.viewport();
        let local = |position: Vec2| canvas_local(size, position, center, viewport);

        let active = view.touch;
        match active {
            None => {
                let started = touches.iter_just_pressed().find_map(|touch| {
                    let point = local(touch.position());
                    contains(viewport, &point).then_some((touch.id(), point))
                });
                if let Some((id, point)) = started {
                    view.touch = Some(id);
                    view.render_loop.renderer_mut().touch_start(point.x);
                }
            }
            Some(id) => match touches.get_pressed(id) {
                Some(touch) => {
                    view.render_loop.renderer_mut().touch_move(local(touch.position()).x);
                }
                None => {
                    view.touch = None;
                    view.render_loop.renderer_mut().touch_end();
                }
            },
        }
    }
}

/// Runs one frame per running view and uploads its pixels.
///
/// A view whose image asset is gone has no drawable context: its frame is skipped and the
/// loop keeps going.
fn draw_views(mut views: Query<(&mut SurfaceView, &Sprite)>, mut images: ResMut<Assets<Image>>) {
    for (mut view, sprite) in views.iter_mut() {
        let SurfaceView {
            render_loop,
            canvas,
            frame,
            ..
        } = &mut *view;
        let Some(task) = frame.as_ref() else {
            continue;
        };

        let result = match images.get_mut(&sprite.image) {
            Some(mut image) => {
                let result = render_loop.run_frame(task, Some(&mut *canvas));
                if matches!(result, Ok(FrameOutcome::Drawn)) {
                    upload(canvas, &mut image);
                }
                result
            }
            None => render_loop.run_frame(task, None::<&mut PixelCanvas>),
        };
        if let Err(err) = result {
            warn!("surface frame failed: {err}");
        }
    }
}

/// Copies the canvas into `image`, following any backing-store resize.
fn upload(canvas: &PixelCanvas, image: &mut Image) {
    image.texture_descriptor.size = Extent3d {
        width: canvas.width(),
        height: canvas.height(),
        depth_or_array_layers: 1,
    };
    image.data = Some(canvas.pixels().to_vec());
}

/// Positions pooled label children on the text recorded by the last frame and hides the rest.
fn sync_labels(
    views: Query<&SurfaceView>,
    mut labels: Query<(
        &SurfaceLabel,
        &ChildOf,
        &mut Text2d,
        &mut TextColor,
        &mut Transform,
        &mut Visibility,
    )>,
) {
    for (slot, child_of, mut text, mut color, mut transform, mut visibility) in labels.iter_mut() {
        let Ok(view) = views.get(child_of.parent()) else {
            continue;
        };
        let Some(label) = view.canvas.labels().get(slot.0) else {
            *visibility = Visibility::Hidden;
            continue;
        };
        if text.0 != label.text {
            text.0.clone_from(&label.text);
        }
        color.0 = to_color(label.color);
        let viewport = view.canvas.viewport();
        transform.translation = Vec3::new(
            label.position.x - viewport.width * 0.5,
            viewport.height * 0.5 - label.position.y,
            1.0,
        );
        *visibility = Visibility::Inherited;
    }
}

fn to_color(color: Rgba) -> Color {
    let alpha = (color.a.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::srgba_u8(color.r, color.g, color.b, alpha)
}
