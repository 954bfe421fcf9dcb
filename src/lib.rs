//! Dotfield library - audio- and touch-reactive dot grid visualizer

pub mod audio;
pub mod cli;
pub mod frame;
pub mod params;
pub mod particles;
pub mod rendering;
pub mod touch;
