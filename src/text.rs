use std::fmt;
use std::path::{Path, PathBuf};

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};

use crate::texture::TextureImage;

#[derive(Debug)]
pub enum FontLoadError {
	Io {
		path: PathBuf,
		source: std::io::Error,
	},
	Parse {
		path: PathBuf,
		reason: &'static str,
	},
}

impl fmt::Display for FontLoadError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Io { path, source } => write!(f, "Failed to open font {}: {source}", path.display()),
			Self::Parse { path, reason } => write!(f, "Failed to parse font {}: {reason}", path.display()),
		}
	}
}

impl std::error::Error for FontLoadError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Io { source, .. } => Some(source),
			Self::Parse { .. } => None,
		}
	}
}

/// Coverage at or above this is drawn when antialiasing is off
const SOLID_THRESHOLD: u8 = 128;

/// Rasterizes single lines of text with one font at one pixel size
pub struct FontRasterizer {
	font: fontdue::Font,
	px: f32,
	antialias: bool,
}

impl FontRasterizer {
	pub fn from_bytes(path: &Path, bytes: &[u8], px: f32) -> Result<Self, FontLoadError> {
		let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings {
			scale: px,
			..Default::default()
		})
		.map_err(|reason| FontLoadError::Parse {
			path: path.to_owned(),
			reason,
		})?;
		Ok(Self {
			font,
			px,
			antialias: false,
		})
	}

	pub fn from_file(path: &Path, px: f32) -> Result<Self, FontLoadError> {
		let bytes = std::fs::read(path).map_err(|source| FontLoadError::Io {
			path: path.to_owned(),
			source,
		})?;
		Self::from_bytes(path, &bytes, px)
	}

	/// With antialiasing off glyph edges are hard, every texel is either
	/// fully colored or fully transparent
	pub fn with_antialias(mut self, antialias: bool) -> Self {
		self.antialias = antialias;
		self
	}

	/// Lays out `text` on one line and draws it tightly into an RGBA image.
	///
	/// Color channels are `color`'s, alpha is `color[3]` scaled by glyph coverage.
	pub fn render_line(&self, text: &str, color: [u8; 4]) -> TextureImage {
		let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
		layout.reset(&LayoutSettings::default());
		layout.append(&[&self.font], &TextStyle::new(text, self.px, 0));

		let glyphs = layout.glyphs();
		let width = glyphs
			.iter()
			.map(|glyph| (glyph.x.max(0.) as usize + glyph.width) as u32)
			.max()
			.unwrap_or(0);
		let height = layout.height().ceil().max(0.) as u32;

		let mut pixels = vec![0u8; width as usize * height as usize * 4];
		for glyph in glyphs.iter().filter(|glyph| glyph.width > 0 && glyph.height > 0) {
			let (metrics, coverage) = self.font.rasterize_config(glyph.key);
			let origin_x = glyph.x.max(0.) as usize;
			let origin_y = glyph.y.max(0.) as usize;

			for row in 0..metrics.height {
				let y = origin_y + row;
				if y >= height as usize {
					break;
				}
				for column in 0..metrics.width {
					let x = origin_x + column;
					if x >= width as usize {
						break;
					}
					let alpha = coverage_to_alpha(coverage[row * metrics.width + column], color[3], self.antialias);
					let texel = (y * width as usize + x) * 4;
					// Glyphs can overlap by a texel, keep the stronger coverage
					if alpha > pixels[texel + 3] {
						pixels[texel..texel + 3].copy_from_slice(&color[..3]);
						pixels[texel + 3] = alpha;
					}
				}
			}
		}

		TextureImage {
			width,
			height,
			pixels,
		}
	}
}

fn coverage_to_alpha(coverage: u8, opacity: u8, antialias: bool) -> u8 {
	let coverage = match antialias {
		true => coverage,
		false if coverage >= SOLID_THRESHOLD => 255,
		false => 0,
	};
	((coverage as u16 * opacity as u16) / 255) as u8
}

/// Smallest power of two that is `>= value`, 1 for 0
pub fn next_power_of_two(value: u32) -> u32 {
	value.next_power_of_two()
}

/// Places a text bitmap into a texture with a one texel transparent border
/// and a power of two height. The text sits against the bottom border.
pub fn pad_for_upload(text: &TextureImage) -> TextureImage {
	let width = text.width + 2;
	let height = next_power_of_two(text.height + 2);
	let offset_x = 1;
	let offset_y = (height - text.height - 1) as usize;

	let mut pixels = vec![0u8; width as usize * height as usize * 4];
	let row_len = text.width as usize * 4;
	for row in 0..text.height as usize {
		let src = row * row_len;
		let dst = ((offset_y + row) * width as usize + offset_x) * 4;
		pixels[dst..dst + row_len].copy_from_slice(&text.pixels[src..src + row_len]);
	}

	TextureImage {
		width,
		height,
		pixels,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const TEST_FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/resources/font/DejaVuSans-Bold.ttf");

	fn test_font() -> FontRasterizer {
		FontRasterizer::from_file(Path::new(TEST_FONT), 28.).unwrap()
	}

	#[test]
	fn every_covered_texel_is_drawn() {
		let rasterizer = test_font().with_antialias(true);
		for text in ["gjpqy", "Hello World !!", "ÅÉÎ"] {
			let image = rasterizer.render_line(text, [255; 4]);

			let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
			layout.reset(&LayoutSettings::default());
			layout.append(&[&rasterizer.font], &TextStyle::new(text, rasterizer.px, 0));

			let mut covered = 0;
			for glyph in layout.glyphs() {
				let (metrics, coverage) = rasterizer.font.rasterize_config(glyph.key);
				for row in 0..metrics.height {
					for column in 0..metrics.width {
						let value = coverage[row * metrics.width + column];
						if value == 0 {
							continue;
						}
						let x = glyph.x.max(0.) as u32 + column as u32;
						let y = glyph.y.max(0.) as u32 + row as u32;
						assert!(x < image.width && y < image.height, "{text:?} clipped at ({x}, {y})");
						assert!(image.pixel(x, y)[3] >= value, "{text:?} lost coverage at ({x}, {y})");
						covered += 1;
					}
				}
			}
			assert!(covered > 0, "{text:?} drew nothing");
		}
	}

	#[test]
	fn solid_text_is_fully_opaque_or_clear() {
		let image = test_font().render_line("Hello World !!", [200, 100, 50, 255]);
		assert!(image.width > 0 && image.height > 0);

		let mut opaque = 0;
		for texel in image.pixels.chunks_exact(4) {
			match texel[3] {
				0 => (),
				255 => {
					assert_eq!(&texel[..3], &[200, 100, 50]);
					opaque += 1;
				}
				alpha => panic!("partial alpha {alpha} in solid text"),
			}
		}
		assert!(opaque > 0);
	}

	#[test]
	fn empty_line_is_empty_image() {
		let image = test_font().render_line("", [255; 4]);
		assert_eq!((image.width, image.height), (0, 0));
		assert!(image.pixels.is_empty());
	}

	#[test]
	fn power_of_two_rounds_up() {
		assert_eq!(next_power_of_two(0), 1);
		assert_eq!(next_power_of_two(1), 1);
		assert_eq!(next_power_of_two(2), 2);
		assert_eq!(next_power_of_two(3), 4);
		assert_eq!(next_power_of_two(30), 32);
		assert_eq!(next_power_of_two(35), 64);
		assert_eq!(next_power_of_two(64), 64);
	}

	#[test]
	fn solid_mode_thresholds_coverage() {
		assert_eq!(coverage_to_alpha(127, 255, false), 0);
		assert_eq!(coverage_to_alpha(128, 255, false), 255);
		assert_eq!(coverage_to_alpha(128, 255, true), 128);
		assert_eq!(coverage_to_alpha(255, 128, false), 128);
		assert_eq!(coverage_to_alpha(0, 255, true), 0);
	}

	#[test]
	fn padding_adds_border_and_bottom_aligns() {
		// 3x2 opaque white text
		let text = TextureImage::new(3, 2, vec![255; 3 * 2 * 4]).unwrap();
		let padded = pad_for_upload(&text);

		assert_eq!(padded.width, 5);
		assert_eq!(padded.height, 4);
		// rows 0 and 3 and columns 0 and 4 are the transparent border
		for x in 0..5 {
			assert_eq!(padded.pixel(x, 0), [0; 4]);
			assert_eq!(padded.pixel(x, 3), [0; 4]);
		}
		for y in 0..4 {
			assert_eq!(padded.pixel(0, y), [0; 4]);
			assert_eq!(padded.pixel(4, y), [0; 4]);
		}
		for y in 1..3 {
			for x in 1..4 {
				assert_eq!(padded.pixel(x, y), [255; 4]);
			}
		}
	}

	#[test]
	fn padding_keeps_text_pixels_in_order() {
		let mut pixels = Vec::new();
		for i in 0..6u8 {
			pixels.extend_from_slice(&[i, i, i, 255]);
		}
		let text = TextureImage::new(2, 3, pixels).unwrap();
		let padded = pad_for_upload(&text);

		// height 3 + 2 = 5 -> 8, text rows start at 8 - 3 - 1 = 4
		assert_eq!(padded.height, 8);
		assert_eq!(padded.pixel(1, 4), [0, 0, 0, 255]);
		assert_eq!(padded.pixel(2, 4), [1, 1, 1, 255]);
		assert_eq!(padded.pixel(2, 6), [5, 5, 5, 255]);
		assert_eq!(padded.pixel(1, 3), [0; 4]);
		assert_eq!(padded.pixel(1, 7), [0; 4]);
	}

	#[test]
	fn padding_empty_text() {
		let padded = pad_for_upload(&TextureImage::new(0, 0, Vec::new()).unwrap());
		assert_eq!((padded.width, padded.height), (2, 2));
		assert!(padded.pixels.iter().all(|x| *x == 0));
	}

	#[test]
	fn invalid_font_bytes_are_rejected() {
		let err = FontRasterizer::from_bytes(Path::new("broken.ttf"), b"not a font", 28.)
			.err()
			.unwrap();
		assert!(matches!(err, FontLoadError::Parse { .. }));
		assert!(err.to_string().contains("broken.ttf"));
	}

	#[test]
	fn missing_font_is_io_error() {
		let err = FontRasterizer::from_file(Path::new("no/such/font.ttf"), 28.)
			.err()
			.unwrap();
		assert!(matches!(err, FontLoadError::Io { .. }));
	}
}
