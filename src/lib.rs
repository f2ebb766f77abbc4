pub mod application;
pub mod audio;
pub mod bullets;
pub mod config;
pub mod input;
pub mod logging;
pub mod math;
pub mod rendering;
pub mod shader_manager;
pub mod sprite;
pub mod text;
pub mod texture;
pub mod timer;
pub mod wgpu_context;
