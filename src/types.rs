use nalgebra::{Point2, Point3};

/// Scalar field value and coordinate component.
pub type Value = f32;

/// A 3D point with [`Value`] components. `y` is the vertical (height) axis.
pub type Point = Point3<Value>;

/// A 2D point in logical canvas pixels, origin top-left, `y` pointing down.
pub type ScreenPoint = Point2<Value>;

/// A scalar field function: maps a domain point `(x, z)` to a density.
///
/// Densities are expected to be finite and non-negative over the domain. Nothing checks this;
/// malformed values only degrade the shading.
pub type FieldFunction = dyn Fn(Value, Value) -> Value + Send + Sync;
