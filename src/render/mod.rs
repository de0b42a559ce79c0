//! Rendering modules
//!
//! Contains the 2D drawing path:
//! - Surface: The drawing trait a host implements (circles, radial gradients)
//! - Raster: Software surface on an RGBA image, used headlessly and in tests
//! - Painter: Depth-sorted bubbles with theme decorations, then particles

pub mod painter;
pub mod raster;
pub mod surface;

pub use painter::Renderer;
pub use raster::RasterSurface;
pub use surface::{GradientStop, Surface};
