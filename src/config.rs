use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::math::Vector2;

/// Environment variable overriding [DemoConfig::resource_root]
pub const RESOURCE_ROOT_VAR: &str = "SPRITE_DEMO_RESOURCES";

/// Directory the WGSL sources are read from during development.
///
/// Debug builds read shaders from here so they can be hot-reloaded,
/// release builds use the copies compiled into the binary.
pub const SHADER_DIRECTORY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/shaders/");

/// Every tunable value of the demo.
///
/// Asset paths are relative to [Self::resource_root], use [Self::resolve]
/// to get the path to open.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
	pub title: String,
	pub window_size: [u32; 2],
	pub clear_color: [f64; 4],

	pub resource_root: PathBuf,
	/// `None` uses the shader sources compiled into the binary
	pub shader_directory: Option<PathBuf>,

	pub sprite_texture: PathBuf,
	pub sprite_scale: f32,
	/// Pixels per second
	pub sprite_speed: f32,
	/// Distance of the sprite's starting center from the bottom edge
	pub sprite_bottom_offset: f32,

	pub font: PathBuf,
	pub font_size: f32,
	pub text: String,
	pub text_scale: f32,
	pub text_color: [u8; 4],
	/// `false` renders hard edged glyphs
	pub text_antialias: bool,

	pub music: PathBuf,
	pub music_volume: f32,

	pub bullet_count: usize,
	/// Pixels per frame
	pub bullet_speed: f32,
	pub bullet_size: [f32; 2],
	pub bullet_color: [f32; 4],

	/// Seconds
	pub max_frame_delta: f32,
	pub frame_interval: Duration,
}

impl Default for DemoConfig {
	fn default() -> Self {
		Self {
			title: "Hello world !!".to_owned(),
			window_size: [1024, 768],
			clear_color: [0., 0., 0., 1.],

			resource_root: PathBuf::from("resources"),
			shader_directory: cfg!(debug_assertions).then(|| PathBuf::from(SHADER_DIRECTORY)),

			sprite_texture: PathBuf::from("texture/example.png"),
			sprite_scale: 5.,
			sprite_speed: 300.,
			sprite_bottom_offset: 200.,

			font: PathBuf::from("font/Roboto-Bold.ttf"),
			font_size: 28.,
			text: "Hello World !!".to_owned(),
			text_scale: 3.,
			text_color: [255, 255, 255, 255],
			text_antialias: false,

			music: PathBuf::from("music/test.mp3"),
			music_volume: 1.,

			bullet_count: 4,
			bullet_speed: 1.,
			bullet_size: [200., 200.],
			bullet_color: [1., 0.35, 0.6, 1.],

			max_frame_delta: 0.05,
			frame_interval: Duration::from_millis(16),
		}
	}
}

impl DemoConfig {
	/// Defaults with the resource root taken from [RESOURCE_ROOT_VAR] if set
	pub fn from_env() -> Self {
		let config = Self::default();
		match std::env::var_os(RESOURCE_ROOT_VAR) {
			Some(root) if !root.is_empty() => config.with_resource_root(root),
			_ => config,
		}
	}

	pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.resource_root = root.into();
		self
	}

	pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
		self.window_size = [width, height];
		self
	}

	pub fn with_bullets(mut self, count: usize, speed: f32) -> Self {
		self.bullet_count = count;
		self.bullet_speed = speed;
		self
	}

	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.text = text.into();
		self
	}

	/// Path of an asset relative to the resource root
	pub fn resolve(&self, asset: &Path) -> PathBuf {
		self.resource_root.join(asset)
	}

	pub fn window_size_f32(&self) -> Vector2 {
		Vector2::new(self.window_size[0] as f32, self.window_size[1] as f32)
	}

	pub fn window_center(&self) -> Vector2 {
		self.window_size_f32() / 2.
	}

	pub fn sprite_start_position(&self) -> Vector2 {
		let size = self.window_size_f32();
		Vector2::new(size.x / 2., size.y - self.sprite_bottom_offset)
	}

	pub fn text_position(&self) -> Vector2 {
		Vector2::new(self.window_size_f32().x / 2., 0.)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_demo_constants() {
		let config = DemoConfig::default();
		assert_eq!(config.window_size, [1024, 768]);
		assert_eq!(config.sprite_start_position(), Vector2::new(512., 568.));
		assert_eq!(config.text_position(), Vector2::new(512., 0.));
		assert_eq!(config.window_center(), Vector2::new(512., 384.));
		assert_eq!(config.bullet_count, 4);
		assert_eq!(config.max_frame_delta, 0.05);
		assert_eq!(config.frame_interval, Duration::from_millis(16));
	}

	#[test]
	fn assets_resolve_under_root() {
		let config = DemoConfig::default().with_resource_root("/opt/demo");
		assert_eq!(
			config.resolve(&config.sprite_texture),
			PathBuf::from("/opt/demo/texture/example.png")
		);
		assert_eq!(
			config.resolve(&config.music),
			PathBuf::from("/opt/demo/music/test.mp3")
		);
	}

	#[test]
	fn builders_override_single_values() {
		let config = DemoConfig::default()
			.with_window_size(640, 480)
			.with_bullets(12, 2.5)
			.with_text("Bye");
		assert_eq!(config.window_size, [640, 480]);
		assert_eq!(config.bullet_count, 12);
		assert_eq!(config.bullet_speed, 2.5);
		assert_eq!(config.text, "Bye");
		assert_eq!(config.sprite_start_position(), Vector2::new(320., 280.));
	}
}
