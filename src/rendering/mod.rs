mod quad {
	use wgpu::*;

	use crate::wgpu_context::{WGPUBuffer, WGPUContext};

	use bytemuck::{Pod, Zeroable};

	#[repr(C)]
	#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
	pub struct QuadVertex {
		pub position: [f32; 3],
		pub uv: [f32; 2],
	}

	/// Unit quad spanning -1..1, y up, with the texture's top left at the top left corner
	pub const QUAD_VERTICES: [QuadVertex; 4] = [
		QuadVertex { position: [-1., 1., 0.], uv: [0., 0.] },  // top left
		QuadVertex { position: [1., 1., 0.], uv: [1., 0.] },   // top right
		QuadVertex { position: [1., -1., 0.], uv: [1., 1.] },  // bottom right
		QuadVertex { position: [-1., -1., 0.], uv: [0., 1.] }, // bottom left
	];

	pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

	pub const QUAD_ATTRIBUTES: [VertexAttribute; 2] = vertex_attr_array![0 => Float32x3, 1 => Float32x2];

	/// Vertex and index buffer of the quad every sprite, text label and bullet is drawn with
	pub struct QuadMesh {
		vertices: WGPUBuffer,
		indices: WGPUBuffer,
	}

	impl QuadMesh {
		pub fn new(context: &WGPUContext) -> Self {
			let vertex_bytes: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
			let index_bytes: &[u8] = bytemuck::cast_slice(&QUAD_INDICES);

			let mut vertices = WGPUBuffer::new_vertex(vertex_bytes.len() as u64, context);
			vertices.write_data(vertex_bytes, context);
			let mut indices = WGPUBuffer::new_index(index_bytes.len() as u64, context);
			indices.write_data(index_bytes, context);

			Self { vertices, indices }
		}

		/// Binds the quad to vertex slot 0 and as the index buffer
		pub fn bind(&self, render_pass: &mut RenderPass) {
			render_pass.set_vertex_buffer(0, self.vertices.slice(..));
			render_pass.set_index_buffer(self.indices.slice(..), IndexFormat::Uint32);
		}

		pub fn index_count(&self) -> u32 {
			QUAD_INDICES.len() as u32
		}
	}
}

/// Alpha blending for premultiplied colors, every fragment shader outputs premultiplied alpha
fn premultiplied_target(format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
	use wgpu::*;
	ColorTargetState {
		format,
		blend: Some(BlendState::PREMULTIPLIED_ALPHA_BLENDING),
		write_mask: ColorWrites::ALL,
	}
}

mod sprite {
	use derive::UniformBufferData;
	use wgpu::*;

	use crate::math::Vector2;
	use crate::shader_manager::*;
	use crate::texture::GpuTexture;
	use crate::wgpu_context::{BufferAndData, WGPUContext};

	use super::quad::*;

	use bytemuck::{Pod, Zeroable};

	#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq, UniformBufferData)]
	#[repr(C)]
	pub struct QuadUniform {
		pub position: Vector2,
		pub texture_size: Vector2,
		pub scale: f32,
		_padding: f32,
	}

	/// A texture drawn on the shared quad, the player sprite or a text label
	pub struct TexturedQuad {
		uniform: BufferAndData<QuadUniform>,
		#[allow(dead_code)]
		texture: GpuTexture,
		bind_group: BindGroup,
	}

	impl TexturedQuad {
		pub fn set_position(&mut self, position: Vector2, context: &WGPUContext) {
			if self.uniform.data.position != position {
				self.uniform.data.position = position;
				self.uniform.update_buffer(context);
			}
		}
	}

	static SPRITE_BUFFERS: [VertexBufferLayout<'static>; 1] = [VertexBufferLayout {
		array_stride: std::mem::size_of::<QuadVertex>() as u64,
		step_mode: VertexStepMode::Vertex,
		attributes: &QUAD_ATTRIBUTES,
	}];

	pub struct SpriteRenderer {
		bind_group_layout: BindGroupLayout,
	}

	impl SpriteRenderer {
		pub const PIPELINE: &'static str = "Sprite Pipeline";

		pub fn new(uniform_bind_group_layout: &BindGroupLayout, context: &WGPUContext, shader_manager: &mut ShaderManager) -> Self {
			let entry = |binding, ty| BindGroupLayoutEntry {
				binding,
				visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
				ty,
				count: None,
			};
			let bind_group_layout = context.device().create_bind_group_layout(&BindGroupLayoutDescriptor {
				label: Some("Sprite bind group layout"),
				entries: &[
					entry(0, BindingType::Buffer {
						ty: BufferBindingType::Uniform,
						has_dynamic_offset: false,
						min_binding_size: None,
					}),
					entry(1, BindingType::Texture {
						sample_type: TextureSampleType::Float { filterable: true },
						view_dimension: TextureViewDimension::D2,
						multisampled: false,
					}),
					entry(2, BindingType::Sampler(SamplerBindingType::Filtering)),
				],
			});

			let pipeline_layout = context.device().create_pipeline_layout(&PipelineLayoutDescriptor {
				label: Some("Sprite pipeline layout"),
				bind_group_layouts: &[uniform_bind_group_layout, &bind_group_layout],
				push_constant_ranges: &[],
			});

			shader_manager.register_render_pipeline(Self::PIPELINE, RenderPipelineDescriptorTemplate {
				label: Some(Self::PIPELINE),
				layout: Some(pipeline_layout),
				module_path: "sprite.wgsl",
				vertex: VertexStateTemplate {
					entry_point: None,
					buffers: &SPRITE_BUFFERS,
				},
				primitive: PrimitiveState {
					topology: PrimitiveTopology::TriangleList,
					..Default::default()
				},
				fragment: Some(FragmentStateTemplate {
					entry_point: None,
					targets: Box::new([Some(super::premultiplied_target(context.config().format))]),
				}),
			});

			Self { bind_group_layout }
		}

		/// Centers `texture` on `position`, drawn at `texture size * scale / 2`
		pub fn create_quad(&self, label: &str, texture: GpuTexture, position: Vector2, scale: f32, context: &WGPUContext) -> TexturedQuad {
			let uniform = BufferAndData::new(QuadUniform {
				position,
				texture_size: texture.size(),
				scale,
				_padding: 0.,
			}, context);

			let bind_group = context.device().create_bind_group(&BindGroupDescriptor {
				label: Some(label),
				layout: &self.bind_group_layout,
				entries: &[
					BindGroupEntry {
						binding: 0,
						resource: uniform.buffers.as_entire_binding(),
					},
					BindGroupEntry {
						binding: 1,
						resource: BindingResource::TextureView(texture.view()),
					},
					BindGroupEntry {
						binding: 2,
						resource: BindingResource::Sampler(texture.sampler()),
					},
				],
			});

			TexturedQuad {
				uniform,
				texture,
				bind_group,
			}
		}

		/// Draws the quads in order, later quads on top
		pub fn render(&self, render_pass: &mut RenderPass, quads: &[&TexturedQuad], mesh: &QuadMesh, shader_manager: &ShaderManager) -> Result<(), ShaderError> {
			render_pass.set_pipeline(shader_manager.get_render_pipeline(Self::PIPELINE)?);
			mesh.bind(render_pass);
			for quad in quads {
				render_pass.set_bind_group(1, &quad.bind_group, &[]);
				render_pass.draw_indexed(0..mesh.index_count(), 0, 0..1);
			}
			Ok(())
		}
	}
}

mod bullet {
	use derive::VertexBufferData;
	use wgpu::*;

	use crate::bullets::BulletPattern;
	use crate::math::Vector2;
	use crate::shader_manager::*;
	use crate::vertex_buffer_layout;
	use crate::wgpu_context::{BufferAndData, WGPUContext};

	use super::quad::*;

	use bytemuck::{Pod, Zeroable};

	#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq, VertexBufferData)]
	#[repr(C)]
	pub struct BulletInstance {
		pub position: Vector2,
		pub size: [f32; 2],
		pub color: [f32; 4],
	}

	static BULLET_BUFFERS: [VertexBufferLayout<'static>; 4] = vertex_buffer_layout!(
		(QuadVertex, Vertex, &QUAD_ATTRIBUTES),
		(Vector2, Instance, &vertex_attr_array![2 => Float32x2]),
		([f32; 2], Instance, &vertex_attr_array![3 => Float32x2]),
		([f32; 4], Instance, &vertex_attr_array![4 => Float32x4]),
	);

	/// Draws every bullet of a [BulletPattern] as one instanced quad draw
	pub struct BulletRenderer {
		instances: BufferAndData<Vec<BulletInstance>>,
	}

	impl BulletRenderer {
		pub const PIPELINE: &'static str = "Bullet Pipeline";

		pub fn new(
			pattern: &BulletPattern,
			size: [f32; 2],
			color: [f32; 4],
			uniform_bind_group_layout: &BindGroupLayout,
			context: &WGPUContext,
			shader_manager: &mut ShaderManager,
		) -> Self {
			let pipeline_layout = context.device().create_pipeline_layout(&PipelineLayoutDescriptor {
				label: Some("Bullet pipeline layout"),
				bind_group_layouts: &[uniform_bind_group_layout],
				push_constant_ranges: &[],
			});

			shader_manager.register_render_pipeline(Self::PIPELINE, RenderPipelineDescriptorTemplate {
				label: Some(Self::PIPELINE),
				layout: Some(pipeline_layout),
				module_path: "bullet.wgsl",
				vertex: VertexStateTemplate {
					entry_point: None,
					buffers: &BULLET_BUFFERS,
				},
				primitive: PrimitiveState {
					topology: PrimitiveTopology::TriangleList,
					..Default::default()
				},
				fragment: Some(FragmentStateTemplate {
					entry_point: None,
					targets: Box::new([Some(super::premultiplied_target(context.config().format))]),
				}),
			});

			let instances = pattern
				.bullets()
				.iter()
				.map(|bullet| BulletInstance {
					position: bullet.position,
					size,
					color,
				})
				.collect::<Vec<_>>();

			Self {
				instances: BufferAndData::new(instances, context),
			}
		}

		/// Copies the current bullet positions to the GPU
		pub fn update(&mut self, pattern: &BulletPattern, context: &WGPUContext) {
			self.instances
				.data
				.iter_mut()
				.zip(pattern.bullets())
				.for_each(|(instance, bullet)| instance.position = bullet.position);
			self.instances.update_buffer(context);
		}

		pub fn render(&self, render_pass: &mut RenderPass, mesh: &QuadMesh, shader_manager: &ShaderManager) -> Result<(), ShaderError> {
			if self.instances.data.is_empty() {
				return Ok(());
			}
			render_pass.set_pipeline(shader_manager.get_render_pipeline(Self::PIPELINE)?);
			mesh.bind(render_pass);
			render_pass.set_vertex_buffer(1, self.instances.buffers.0.slice(..));
			render_pass.set_vertex_buffer(2, self.instances.buffers.1.slice(..));
			render_pass.set_vertex_buffer(3, self.instances.buffers.2.slice(..));
			render_pass.draw_indexed(0..mesh.index_count(), 0, 0..self.instances.data.len() as u32);
			Ok(())
		}
	}
}

use derive::UniformBufferData;
use bytemuck::{Pod, Zeroable};
#[derive(Pod, Zeroable, Clone, Copy, UniformBufferData)]
#[repr(C)]
pub struct Uniform {
	window_size: [f32; 2],
}

pub use bullet::*;
pub use quad::*;
pub use sprite::*;

#[macro_export]
macro_rules! vertex_buffer_layout {
	($(($stridetype: ty, $mode: ident, $attributes: expr)),+ $(,)?) => {
		[
		$(::wgpu::VertexBufferLayout {
			array_stride: ::std::mem::size_of::<$stridetype>() as u64,
			step_mode: ::wgpu::VertexStepMode::$mode,
			attributes: $attributes,
		},)+
		]
	}
}

/// WGSL sources compiled into the binary, used when no shader directory is configured
pub const EMBEDDED_SHADERS: &[(&str, &str)] = &[
	("common.wgsl", include_str!("../shaders/common.wgsl")),
	("sprite.wgsl", include_str!("../shaders/sprite.wgsl")),
	("bullet.wgsl", include_str!("../shaders/bullet.wgsl")),
];

pub use renderer::*;
mod renderer {
	use std::fmt;

	use super::*;
	use crate::shader_manager::ShaderError;
	use crate::wgpu_context::{BufferAndData, WGPUContext};

	use wgpu::*;

	#[derive(Debug)]
	pub enum RenderError {
		/// The surface cannot produce frames anymore
		Surface(SurfaceError),
		Shader(ShaderError),
	}

	impl fmt::Display for RenderError {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			match self {
				Self::Surface(err) => write!(f, "could not acquire a frame: {err}"),
				Self::Shader(err) => write!(f, "{err}"),
			}
		}
	}

	impl std::error::Error for RenderError {
		fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
			match self {
				Self::Surface(err) => Some(err),
				Self::Shader(err) => Some(err),
			}
		}
	}

	impl From<ShaderError> for RenderError {
		fn from(err: ShaderError) -> Self {
			Self::Shader(err)
		}
	}

	/// Window size uniform, the shared quad and frame submission
	pub struct Renderer2D {
		uniform: BufferAndData<Uniform>,
		uniform_bind_group_layout: BindGroupLayout,
		uniform_bind_group: BindGroup,
		mesh: QuadMesh,
		clear_color: Color,
	}

	impl Renderer2D {
		pub fn new(clear_color: [f64; 4], context: &WGPUContext) -> Self {
			let uniform = BufferAndData::new(Uniform {
				window_size: [context.config().width as f32, context.config().height as f32],
			}, context);

			let uniform_bind_group_layout = context.device().create_bind_group_layout(&BindGroupLayoutDescriptor {
				label: Some("Globals bind group layout"),
				entries: &[
					BindGroupLayoutEntry {
						binding: 0,
						visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
						ty: BindingType::Buffer {
							ty: BufferBindingType::Uniform,
							has_dynamic_offset: false,
							min_binding_size: None,
						},
						count: None,
					},
				],
			});

			let uniform_bind_group = context.device().create_bind_group(&BindGroupDescriptor {
				label: Some("Globals bind group"),
				layout: &uniform_bind_group_layout,
				entries: &[
					BindGroupEntry {
						binding: 0,
						resource: uniform.buffers.as_entire_binding(),
					},
				],
			});

			let [r, g, b, a] = clear_color;
			Self {
				uniform,
				uniform_bind_group_layout,
				uniform_bind_group,
				mesh: QuadMesh::new(context),
				clear_color: Color { r, g, b, a },
			}
		}

		pub fn uniform_bind_group_layout(&self) -> &BindGroupLayout {
			&self.uniform_bind_group_layout
		}

		/// Call after the surface was resized
		pub fn update_uniform(&mut self, context: &WGPUContext) {
			self.uniform.data.window_size = [context.config().width as f32, context.config().height as f32];
			self.uniform.update_buffer(context);
		}

		/// Clears the frame, lets `draw` record into the render pass and presents
		///
		/// Lost or outdated surfaces are reconfigured and the frame is skipped.
		pub fn render_frame<F>(&self, context: &WGPUContext, draw: F) -> Result<(), RenderError>
		where
			F: FnOnce(&mut RenderPass, &QuadMesh) -> Result<(), ShaderError>,
		{
			let surface_texture = match context.surface().get_current_texture() {
				Ok(texture) => texture,
				Err(SurfaceError::Lost | SurfaceError::Outdated) => {
					log::debug!("Surface lost or outdated, reconfiguring");
					context.reconfigure();
					return Ok(());
				}
				Err(err @ SurfaceError::OutOfMemory) => return Err(RenderError::Surface(err)),
				Err(err) => {
					log::warn!("Skipping frame: {err}");
					return Ok(());
				}
			};

			let texture_view = surface_texture.texture.create_view(&TextureViewDescriptor {
				label: Some("Render Texture"),
				..Default::default()
			});

			let mut encoder = context.get_encoder();
			let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
				label: None,
				color_attachments: &[
					Some(RenderPassColorAttachment {
						view: &texture_view,
						resolve_target: None,
						ops: Operations {
							load: LoadOp::Clear(self.clear_color),
							store: StoreOp::Store,
						},
					}),
				],
				..Default::default()
			});

			render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
			let drawn = draw(&mut render_pass, &self.mesh);

			std::mem::drop(render_pass);
			context.queue().submit([encoder.finish()]);
			surface_texture.present();
			drawn.map_err(RenderError::from)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quad_indices_cover_two_triangles() {
		assert_eq!(QUAD_INDICES, [0, 1, 2, 2, 3, 0]);
		assert!(QUAD_INDICES.iter().all(|&x| (x as usize) < QUAD_VERTICES.len()));
	}

	#[test]
	fn quad_uvs_put_texture_top_at_quad_top() {
		for vertex in QUAD_VERTICES {
			// u grows with x, v grows downward while y grows upward
			assert_eq!(vertex.uv[0], (vertex.position[0] + 1.) / 2.);
			assert_eq!(vertex.uv[1], (1. - vertex.position[1]) / 2.);
		}
	}

	#[test]
	fn buffer_layouts_match_wgsl_structs() {
		assert_eq!(std::mem::size_of::<QuadVertex>(), 20);
		// position, texture_size, scale and padding to WGSL's 8 byte struct alignment
		assert_eq!(std::mem::size_of::<QuadUniform>(), 24);
		assert_eq!(std::mem::size_of::<Uniform>(), 8);
		assert_eq!(std::mem::size_of::<BulletInstance>(), 32);
	}

	#[test]
	fn embedded_shaders_resolve() {
		let mut manager = crate::shader_manager::ShaderManager::new(None);
		for (path, source) in EMBEDDED_SHADERS {
			manager.register_constant_source(path, source).unwrap();
		}
		for module in ["sprite.wgsl", "bullet.wgsl"] {
			let source = manager.resolve_source(module).unwrap();
			assert!(!source.contains("#include"));
			assert!(source.contains("fn pixel_to_clip"));
			assert!(source.contains("fn vs_main"));
			assert!(source.contains("fn fs_main"));
		}
	}
}
