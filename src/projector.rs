use nalgebra::{Rotation3, Vector3};

use crate::{
    error::{Result, SurfaceError},
    types::{Point, ScreenPoint, Value},
};

/// Logical size of the host canvas plus its device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Logical (CSS) width.
    pub width: Value,
    /// Logical (CSS) height.
    pub height: Value,
    /// Device pixels per logical pixel.
    pub pixel_ratio: Value,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            pixel_ratio: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(width: Value, height: Value, pixel_ratio: Value) -> Result<Self> {
        let valid = |v: Value| v.is_finite() && v > 0.0;
        if !(valid(width) && valid(height) && valid(pixel_ratio)) {
            return Err(SurfaceError::InvalidViewport {
                width,
                height,
                pixel_ratio,
            });
        }
        Ok(Self {
            width,
            height,
            pixel_ratio,
        })
    }

    /// Backing-store size in device pixels: logical size × pixel ratio, at least 1×1.
    pub fn backing_size(&self) -> (u32, u32) {
        let px = |logical: Value| ((logical * self.pixel_ratio).round() as u32).max(1);
        (px(self.width), px(self.height))
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Fixed camera constants.
///
/// The perspective divisor `fov + depth × depth_scale + depth_offset` must stay positive
/// for every point that is projected. The defaults keep it above `3.0` for any point within
/// `[-3.1, 3.1]²` and heights up to `2.0`, which covers the default surface and its labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    /// Downward camera pitch in radians.
    pub tilt: Value,
    pub fov: Value,
    pub depth_scale: Value,
    pub depth_offset: Value,
    /// World units to logical pixels, as a fraction of the smaller viewport side.
    pub zoom: Value,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            tilt: 0.55,
            fov: 6.0,
            depth_scale: 1.0,
            depth_offset: 2.0,
            zoom: 0.14,
        }
    }
}

impl ProjectionParams {
    /// Smallest perspective divisor any of `points` reaches over a full turn of yaw.
    ///
    /// Yaw only swings a point's horizontal offset `h` around the vertical axis, so after
    /// the tilt its view depth sweeps `-y·sin(tilt) ± h·cos(tilt)`. Non-finite points are
    /// ignored.
    pub fn min_divisor<I: IntoIterator<Item = Point>>(&self, points: I) -> Value {
        let (sin, cos) = self.tilt.sin_cos();
        let base = self.fov + self.depth_offset;
        points
            .into_iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
            .map(|p| {
                let lift = -p.y * sin;
                let reach = p.x.hypot(p.z) * cos;
                let near = (self.depth_scale * (lift - reach)).min(self.depth_scale * (lift + reach));
                base + near
            })
            .fold(base, Value::min)
    }

    /// Smallest divisor a scene may reach; caps perspective magnification at 10×.
    pub fn min_clearance(&self) -> Value {
        self.fov * 0.1
    }
}

/// Screen position and depth of a projected point. Larger depth is farther from the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub screen: ScreenPoint,
    pub depth: Value,
}

/// Camera transform for one frame: yaw about the vertical axis, fixed tilt, perspective.
///
/// Holds no state beyond its inputs, so every point projected through one `Projector`
/// sees the identical transform.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    rotation: Rotation3<Value>,
    viewport: Viewport,
    params: ProjectionParams,
}

impl Projector {
    pub fn new(yaw: Value, viewport: Viewport, params: ProjectionParams) -> Self {
        let yaw_rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), yaw);
        // negative angle tips far points (+z) up the screen and high points toward the viewer
        let tilt_rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), -params.tilt);
        Self {
            rotation: tilt_rotation * yaw_rotation,
            viewport,
            params,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn project(&self, point: &Point) -> Projected {
        let view = self.rotation * point;
        let divisor =
            self.params.fov + view.z * self.params.depth_scale + self.params.depth_offset;
        // NaN heights are tolerated; they only produce unpaintable faces
        debug_assert!(!(divisor <= 0.0), "point {point} projects behind the camera");
        let perspective = self.params.fov / divisor;
        let scale = self.viewport.width.min(self.viewport.height) * self.params.zoom * perspective;
        let center = self.viewport.center();
        Projected {
            screen: ScreenPoint::new(center.x + view.x * scale, center.y - view.y * scale),
            depth: view.z,
        }
    }
}

/// Projects `point` under `yaw` with the default camera constants.
pub fn project(point: &Point, yaw: Value, viewport: Viewport) -> Projected {
    Projector::new(yaw, viewport, ProjectionParams::default()).project(point)
}
