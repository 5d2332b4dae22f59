pub mod canvas;
pub mod error;
pub mod field;
pub mod interaction;
pub mod interp;
pub mod mesh;
pub mod painter;
pub mod plugin;
pub mod projector;
pub mod render_loop;
pub mod renderer;
pub mod scatter;
pub mod theme;
pub mod types;

pub use plugin::DensitySurfacePlugin;
