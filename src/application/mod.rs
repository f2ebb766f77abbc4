use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::audio::MusicPlayer;
use crate::bullets::BulletPattern;
use crate::config::DemoConfig;
use crate::input::KeyMap;
use crate::math::Vector2;
use crate::rendering::*;
use crate::shader_manager::ShaderManager;
use crate::sprite::Sprite;
use crate::text::{pad_for_upload, FontRasterizer};
use crate::texture::{GpuTexture, Sampling, TextureImage};
use crate::timer::FrameClock;
use crate::wgpu_context::WGPUContext;

/// Opens the window and runs the demo until it is closed
pub fn run(config: DemoConfig) -> anyhow::Result<()> {
	let event_loop = EventLoop::new().context("Could not create event loop")?;
	let mut app = App::new(config);
	event_loop.run_app(&mut app).context("Event loop failed")?;
	match app.error.take() {
		Some(err) => Err(err),
		None => Ok(()),
	}
}

pub struct App {
	config: DemoConfig,
	inner: Option<AppInner>,
	/// Start-up failure, reported once the event loop has exited
	error: Option<anyhow::Error>,
}

impl App {
	pub fn new(config: DemoConfig) -> Self {
		Self {
			config,
			inner: None,
			error: None,
		}
	}
}

impl ApplicationHandler for App {
	fn resumed(&mut self, event_loop: &ActiveEventLoop) {
		if self.inner.is_some() {
			return;
		}
		match AppInner::init(&self.config, event_loop) {
			Ok(inner) => {
				inner.window.request_redraw();
				self.inner = Some(inner);
			}
			Err(err) => {
				log::error!("{err:#}");
				self.error = Some(err);
				event_loop.exit();
			}
		}
	}

	fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
		let Some(inner) = self.inner.as_mut() else {
			return;
		};
		match event {
			WindowEvent::CloseRequested => {
				log::info!("Close requested, stopping");
				event_loop.exit();
			}
			WindowEvent::KeyboardInput { event, .. } => match (event.physical_key, event.state) {
				(PhysicalKey::Code(KeyCode::Escape), ElementState::Pressed) => event_loop.exit(),
				(PhysicalKey::Code(KeyCode::F5), ElementState::Pressed) if !event.repeat => {
					match inner.shader_manager.reload(&inner.context) {
						Ok(()) => log::info!("Shaders reloaded"),
						Err(err) => log::error!("Shader reload failed, keeping previous shaders: {err}"),
					}
				}
				(PhysicalKey::Code(KeyCode::KeyM), ElementState::Pressed) if !event.repeat => inner.toggle_music(),
				(key, state) => inner.key_map.handle_key(key, state),
			},
			WindowEvent::Focused(false) => inner.key_map.release_all(),
			WindowEvent::Resized(size) => inner.resize(size),
			WindowEvent::RedrawRequested => {
				if let Err(err) = inner.frame() {
					log::error!("{err:#}");
					self.error = Some(err);
					event_loop.exit();
				}
			}
			_ => (),
		}
	}

	fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
		let Some(inner) = self.inner.as_ref() else {
			return;
		};
		if inner.clock.frame_due(Instant::now()) {
			inner.window.request_redraw();
		}
		event_loop.set_control_flow(ControlFlow::WaitUntil(inner.clock.next_deadline()));
	}

	fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
		if let Some(inner) = self.inner.as_ref() {
			log::info!("Exiting after {:.1}s", inner.clock.uptime());
		}
		// Drop GPU objects and the audio stream before the window
		self.inner = None;
	}
}

/// A texture quad and the movement state it is drawn from
struct Label {
	quad: TexturedQuad,
	sprite: Sprite,
}

/// Everything that needs a window to exist.
///
/// Fields drop in declaration order, so the music and GPU objects go before
/// the context and the window.
struct AppInner {
	music: MusicPlayer,
	bullets: BulletPattern,
	bullet_renderer: BulletRenderer,
	player: Label,
	text: Option<Label>,
	sprite_renderer: SpriteRenderer,
	renderer: Renderer2D,
	shader_manager: ShaderManager,
	key_map: KeyMap,
	clock: FrameClock,
	context: WGPUContext,
	window: Arc<Window>,
}

impl AppInner {
	fn init(config: &DemoConfig, event_loop: &ActiveEventLoop) -> anyhow::Result<Self> {
		let [width, height] = config.window_size;
		let window = event_loop
			.create_window(
				Window::default_attributes()
					.with_title(config.title.clone())
					.with_inner_size(PhysicalSize::new(width, height)),
			)
			.context("Could not create window")?;
		let window = Arc::new(window);

		let size = window.inner_size();
		let context = WGPUContext::new(window.clone(), [size.width, size.height])
			.context("Could not initialize the GPU")?;

		let mut shader_manager = ShaderManager::new(config.shader_directory.as_deref());
		if config.shader_directory.is_none() {
			for (path, source) in EMBEDDED_SHADERS {
				shader_manager.register_constant_source(path, source)?;
			}
		}

		let renderer = Renderer2D::new(config.clear_color, &context);
		let bullets = BulletPattern::radial(config.bullet_count, config.bullet_speed, config.window_center());
		let bullet_renderer = BulletRenderer::new(
			&bullets,
			config.bullet_size,
			config.bullet_color,
			renderer.uniform_bind_group_layout(),
			&context,
			&mut shader_manager,
		);
		let sprite_renderer = SpriteRenderer::new(renderer.uniform_bind_group_layout(), &context, &mut shader_manager);
		shader_manager.compile_all(&context).context("Could not build shaders")?;

		let window_size = window_size(&context);

		let sprite_path = config.resolve(&config.sprite_texture);
		let sprite_image = TextureImage::load(&sprite_path).context("Could not load the sprite")?;
		let sprite_texture = GpuTexture::upload("Sprite", &sprite_image, Sampling::Smooth, &context)
			.context("Could not upload the sprite")?;
		let mut sprite = Sprite::new(
			config.sprite_start_position(),
			config.sprite_scale,
			sprite_texture.size(),
			config.sprite_speed,
		);
		sprite.clamp_to(window_size);
		let player = Label {
			quad: sprite_renderer.create_quad("Sprite", sprite_texture, sprite.position, sprite.scale, &context),
			sprite,
		};

		let text = match load_text(config, &context) {
			Ok(texture) => {
				// Text does not move, a speed of zero keeps it where it is placed
				let mut sprite = Sprite::new(config.text_position(), config.text_scale, texture.size(), 0.);
				sprite.clamp_to(window_size);
				Some(Label {
					quad: sprite_renderer.create_quad("Text", texture, sprite.position, sprite.scale, &context),
					sprite,
				})
			}
			Err(err) => {
				log::warn!("{err:#}, continuing without text");
				None
			}
		};

		let music_path = config.resolve(&config.music);
		let music = MusicPlayer::load(&music_path).context("Could not load music")?;
		music.set_volume(config.music_volume);
		music.play();

		log::info!("Initialized with {} bullets", bullets.len());

		Ok(Self {
			music,
			bullets,
			bullet_renderer,
			player,
			text,
			sprite_renderer,
			renderer,
			shader_manager,
			key_map: KeyMap::new(),
			clock: FrameClock::new(config.max_frame_delta, config.frame_interval),
			context,
			window,
		})
	}

	fn resize(&mut self, size: PhysicalSize<u32>) {
		self.context.resize([size.width, size.height]);
		self.renderer.update_uniform(&self.context);

		let window_size = window_size(&self.context);
		for label in std::iter::once(&mut self.player).chain(self.text.as_mut()) {
			label.sprite.clamp_to(window_size);
			label.quad.set_position(label.sprite.position, &self.context);
		}
	}

	fn toggle_music(&self) {
		if self.music.is_paused() {
			self.music.play();
		} else {
			self.music.pause();
		}
	}

	/// Advances the simulation by one frame and draws it
	fn frame(&mut self) -> anyhow::Result<()> {
		let delta = self.clock.tick();
		let window_size = window_size(&self.context);

		self.player.sprite.process_input(&self.key_map, delta, window_size);
		self.player.quad.set_position(self.player.sprite.position, &self.context);

		self.bullets.update();
		self.bullet_renderer.update(&self.bullets, &self.context);

		let mut quads = vec![&self.player.quad];
		quads.extend(self.text.as_ref().map(|text| &text.quad));

		self.renderer
			.render_frame(&self.context, |render_pass, mesh| {
				self.bullet_renderer.render(render_pass, mesh, &self.shader_manager)?;
				self.sprite_renderer.render(render_pass, &quads, mesh, &self.shader_manager)
			})
			.context("Could not render frame")?;
		Ok(())
	}
}

fn window_size(context: &WGPUContext) -> Vector2 {
	Vector2::new(context.config().width as f32, context.config().height as f32)
}

fn load_text(config: &DemoConfig, context: &WGPUContext) -> anyhow::Result<GpuTexture> {
	let font_path = config.resolve(&config.font);
	let rasterizer = FontRasterizer::from_file(&font_path, config.font_size)
		.context("Could not load font")?
		.with_antialias(config.text_antialias);
	let line = rasterizer.render_line(&config.text, config.text_color);
	let texture = GpuTexture::upload("Text", &pad_for_upload(&line), Sampling::Pixelated, context)
		.context("Could not upload text")?;
	Ok(texture)
}
