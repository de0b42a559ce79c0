//! Export modules
//!
//! - Image: PNG export of single frames and numbered frame sequences

pub mod image_export;

pub use image_export::{ExportError, FrameSequence, export_frame, export_surface};
