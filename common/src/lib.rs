//! Shared pieces of camtune: the camera pipeline, the brightness/contrast
//! model and transform, frame writing, configuration and logging.

pub mod adjust;
pub mod camera;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod image_frame;
pub mod logger;
pub mod mock_frame_generator;
pub mod pipeline;
pub mod settings;
pub mod writer;
