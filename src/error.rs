use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, SurfaceError>;

#[derive(Debug, Display, From)]
pub enum SurfaceError {
    #[display("grid resolution must be at least 1, got {_0}")]
    #[from(skip)]
    InvalidResolution(usize),
    #[display("viewport must have a positive size and pixel ratio, got {width}x{height}@{pixel_ratio}")]
    #[from(skip)]
    InvalidViewport {
        width: f32,
        height: f32,
        pixel_ratio: f32,
    },
    #[display("correlation must lie strictly between -1 and 1, got {_0}")]
    #[from(skip)]
    InvalidCorrelation(f32),
    #[display("surface reaches too close to the camera: perspective divisor falls to {_0}")]
    #[from(skip)]
    BehindCamera(f32),
    #[display("render loop is already running")]
    #[from(skip)]
    AlreadyRunning,
    #[display("frame task is not scheduled on this render loop")]
    #[from(skip)]
    NotScheduled,
    #[display("grid shape error: {_0}")]
    Shape(ndarray::ShapeError),
}

impl std::error::Error for SurfaceError {}
