//! Bubble Pop Simulation Library
//!
//! 2D simulation of floating, poppable bubbles with:
//! - Buoyancy, wobble, wind and breeze-zone forces
//! - Pooled bubbles and pop particles
//! - Size-aware pop sounds behind an activation gate
//! - Software rendering and PNG export

pub mod audio;
pub mod config;
pub mod export;
pub mod physics;
pub mod render;
pub mod simulation;
pub mod theme;

pub use config::SimulationConfig;
pub use simulation::{FrameStats, PopEvent, Simulation};
pub use theme::Theme;
