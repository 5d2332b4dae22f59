use std::f32::consts::TAU;

use tracing::trace;

use crate::types::Value;

/// Whether the user currently controls the camera.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CameraMode {
    /// Ambient rotation advances yaw every rendered frame.
    #[default]
    Idle,
    /// A pointer or touch is held; `anchor_x` is its last logical x position.
    Dragging { anchor_x: Value },
}

/// Camera yaw plus the drag/idle flag, owned by one renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraState {
    yaw: Value,
    mode: CameraMode,
}

impl CameraState {
    pub fn new(yaw: Value) -> Self {
        Self {
            yaw: wrap_angle(yaw),
            mode: CameraMode::Idle,
        }
    }

    /// Yaw in radians, always within `[0, 2π)`.
    pub fn yaw(&self) -> Value {
        self.yaw
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == CameraMode::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionConfig {
    /// Radians of yaw per logical pixel of horizontal drag.
    pub sensitivity: Value,
    /// Radians of yaw added per idle frame.
    pub ambient_increment: Value,
    pub initial_yaw: Value,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.008,
            ambient_increment: 0.0035,
            initial_yaw: 0.35,
        }
    }
}

impl InteractionConfig {
    pub fn with_sensitivity(mut self, sensitivity: Value) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn with_ambient_increment(mut self, ambient_increment: Value) -> Self {
        self.ambient_increment = ambient_increment;
        self
    }

    pub fn with_initial_yaw(mut self, initial_yaw: Value) -> Self {
        self.initial_yaw = initial_yaw;
        self
    }
}

/// Turns pointer/touch input and idle frames into yaw changes.
///
/// ```text
///            pointer_down / touch_start
///   Idle  ───────────────────────────────▶  Dragging { anchor_x }
///     ▲                                        │ pointer_move: yaw += (anchor_x - x) × sensitivity
///     └────────────────────────────────────────┘
///        pointer_up / pointer_leave / touch_end
/// ```
///
/// No momentum: yaw stops changing on release and ambient rotation resumes on the next
/// idle frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionController {
    camera: CameraState,
    config: InteractionConfig,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            camera: CameraState::new(config.initial_yaw),
            config,
        }
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn pointer_down(&mut self, x: Value) {
        trace!(x, "drag start");
        self.camera.mode = CameraMode::Dragging { anchor_x: x };
    }

    /// Rotates by the horizontal distance from the previous anchor. Ignored while idle.
    ///
    /// Returns `true` if yaw changed.
    pub fn pointer_move(&mut self, x: Value) -> bool {
        let CameraMode::Dragging { anchor_x } = self.camera.mode else {
            return false;
        };
        self.camera.mode = CameraMode::Dragging { anchor_x: x };
        self.apply_drag(anchor_x - x);
        true
    }

    pub fn pointer_up(&mut self) {
        if !self.camera.is_idle() {
            trace!(yaw = self.camera.yaw, "drag end");
        }
        self.camera.mode = CameraMode::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.pointer_up();
    }

    pub fn touch_start(&mut self, x: Value) {
        self.pointer_down(x);
    }

    pub fn touch_move(&mut self, x: Value) -> bool {
        self.pointer_move(x)
    }

    pub fn touch_end(&mut self) {
        self.pointer_up();
    }

    /// `yaw += delta × sensitivity`, where `delta` is previous x minus current x.
    pub fn apply_drag(&mut self, delta: Value) {
        self.camera.yaw = wrap_angle(self.camera.yaw + delta * self.config.sensitivity);
    }

    /// Advances yaw by the ambient increment if no drag is active.
    ///
    /// Returns `true` if yaw changed.
    pub fn apply_idle_tick(&mut self) -> bool {
        if !self.camera.is_idle() {
            return false;
        }
        self.camera.yaw = wrap_angle(self.camera.yaw + self.config.ambient_increment);
        true
    }
}

/// Wraps an angle into `[0, 2π)`.
pub fn wrap_angle(angle: Value) -> Value {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}
