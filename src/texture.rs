use std::fmt;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use wgpu::*;

use crate::math::Vector2;
use crate::wgpu_context::WGPUContext;

#[derive(Debug)]
pub enum TextureError {
	Io {
		path: PathBuf,
		source: std::io::Error,
	},
	Decode {
		path: Option<PathBuf>,
		source: image::ImageError,
	},
	/// Pixel buffer does not hold `width * height` RGBA texels
	InvalidSize {
		width: u32,
		height: u32,
		len: usize,
	},
	/// Larger than the device allows for a 2D texture
	TooLarge {
		width: u32,
		height: u32,
		limit: u32,
	},
}

impl fmt::Display for TextureError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Io { path, source } => write!(f, "Failed to open image file {}: {source}", path.display()),
			Self::Decode { path: Some(path), source } => {
				write!(f, "Failed to decode PNG {}: {source}", path.display())
			}
			Self::Decode { path: None, source } => write!(f, "Failed to decode PNG: {source}"),
			Self::InvalidSize { width, height, len } => {
				write!(f, "{len} bytes is not a {width}x{height} RGBA image")
			}
			Self::TooLarge { width, height, limit } => {
				write!(f, "{width}x{height} texture exceeds the device limit of {limit} texels per side")
			}
		}
	}
}

impl std::error::Error for TextureError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Io { source, .. } => Some(source),
			Self::Decode { source, .. } => Some(source),
			Self::InvalidSize { .. } | Self::TooLarge { .. } => None,
		}
	}
}

/// Tightly packed RGBA8 pixels, rows top to bottom
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
	pub width: u32,
	pub height: u32,
	pub pixels: Vec<u8>,
}

impl TextureImage {
	pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, TextureError> {
		if pixels.len() != width as usize * height as usize * 4 {
			return Err(TextureError::InvalidSize { width, height, len: pixels.len() });
		}
		Ok(Self { width, height, pixels })
	}

	/// Decodes a PNG. Images without alpha get an opaque alpha channel
	pub fn decode_png(bytes: &[u8]) -> Result<Self, TextureError> {
		let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
			.map_err(|source| TextureError::Decode { path: None, source })?;
		log::debug!("Decoded {}x{} PNG with color type {:?}", image.width(), image.height(), image.color());

		let rgba = image.to_rgba8();
		let (width, height) = rgba.dimensions();
		Self::new(width, height, rgba.into_raw())
	}

	pub fn load(path: &Path) -> Result<Self, TextureError> {
		let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
			path: path.to_owned(),
			source,
		})?;
		Self::decode_png(&bytes).map_err(|err| match err {
			TextureError::Decode { source, .. } => TextureError::Decode {
				path: Some(path.to_owned()),
				source,
			},
			other => other,
		})
	}

	pub fn size(&self) -> Vector2 {
		Vector2::new(self.width as f32, self.height as f32)
	}

	/// RGBA texel at `(x, y)`
	pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
		let start = (y as usize * self.width as usize + x as usize) * 4;
		let mut texel = [0; 4];
		texel.copy_from_slice(&self.pixels[start..start + 4]);
		texel
	}
}

/// How a texture is sampled when it is scaled on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
	/// Bilinear filtering, used for the sprite
	Smooth,
	/// Nearest texel and clamped edges, used for text
	Pixelated,
}

/// A sampled 2D texture on the GPU
pub struct GpuTexture {
	#[allow(dead_code)]
	texture: Texture,
	view: TextureView,
	sampler: Sampler,
	size: Vector2,
}

impl GpuTexture {
	/// Fails with [TextureError::TooLarge] instead of raising a device error
	/// when the image does not fit the device limits
	pub fn upload(label: &str, image: &TextureImage, sampling: Sampling, context: &WGPUContext) -> Result<Self, TextureError> {
		check_dimensions(image.width, image.height, context.device().limits().max_texture_dimension_2d)?;

		let extent = Extent3d {
			width: image.width.max(1),
			height: image.height.max(1),
			depth_or_array_layers: 1,
		};

		let texture = context.device().create_texture(&TextureDescriptor {
			label: Some(label),
			size: extent,
			mip_level_count: 1,
			sample_count: 1,
			dimension: TextureDimension::D2,
			format: TextureFormat::Rgba8UnormSrgb,
			usage: TextureUsages::COPY_DST | TextureUsages::TEXTURE_BINDING,
			view_formats: &[],
		});

		if !image.pixels.is_empty() {
			context.queue().write_texture(
				TexelCopyTextureInfo {
					texture: &texture,
					mip_level: 0,
					origin: Origin3d::ZERO,
					aspect: TextureAspect::All,
				},
				&image.pixels,
				TexelCopyBufferLayout {
					offset: 0,
					bytes_per_row: Some(image.width * 4),
					rows_per_image: Some(image.height),
				},
				extent,
			);
		}

		let view = texture.create_view(&TextureViewDescriptor {
			label: Some(label),
			..Default::default()
		});

		let (filter, address_mode) = match sampling {
			Sampling::Smooth => (FilterMode::Linear, AddressMode::Repeat),
			Sampling::Pixelated => (FilterMode::Nearest, AddressMode::ClampToEdge),
		};
		let sampler = context.device().create_sampler(&SamplerDescriptor {
			label: Some(label),
			address_mode_u: address_mode,
			address_mode_v: address_mode,
			address_mode_w: address_mode,
			mag_filter: filter,
			min_filter: filter,
			mipmap_filter: FilterMode::Nearest,
			..Default::default()
		});

		log::info!("Uploaded texture {label} ({}x{}, {sampling:?})", image.width, image.height);

		Ok(Self {
			texture,
			view,
			sampler,
			size: image.size(),
		})
	}

	pub fn view(&self) -> &TextureView {
		&self.view
	}

	pub fn sampler(&self) -> &Sampler {
		&self.sampler
	}

	/// Size in texels
	pub fn size(&self) -> Vector2 {
		self.size
	}
}

fn check_dimensions(width: u32, height: u32, limit: u32) -> Result<(), TextureError> {
	if width > limit || height > limit {
		return Err(TextureError::TooLarge { width, height, limit });
	}
	Ok(())
}
