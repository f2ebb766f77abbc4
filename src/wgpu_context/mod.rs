use std::fmt;

use wgpu::*;

pub use buffers::*;

#[derive(Debug)]
pub enum ContextError {
    Surface(CreateSurfaceError),
    NoAdapter,
    Device(RequestDeviceError),
    NoSurfaceFormat,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(err) => write!(f, "could not create surface: {err}"),
            Self::NoAdapter => write!(f, "no GPU adapter can present to this window"),
            Self::Device(err) => write!(f, "could not create device and queue: {err}"),
            Self::NoSurfaceFormat => write!(f, "surface reports no supported formats"),
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Surface(err) => Some(err),
            Self::Device(err) => Some(err),
            _ => None,
        }
    }
}

pub struct WGPUContext {
    #[allow(dead_code)]
    instance: Instance,
    surface: Surface<'static>,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
}

impl WGPUContext {
    pub fn new(window: impl Into<SurfaceTarget<'static>>, size: [u32; 2]) -> Result<Self, ContextError> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: InstanceFlags::from_build_config(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(ContextError::Surface)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            compatible_surface: Some(&surface),
            ..Default::default()
        }))
        .ok_or(ContextError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let capabilities = surface.get_capabilities(&adapter);
        // Textures are uploaded as sRGB so the surface should match
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(ContextError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size[0].max(1),
            height: size[1].max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![format],
        };

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: MemoryHints::Performance,
            },
            None,
        ))
        .map_err(ContextError::Device)?;

        // Errors raised inside an error scope (shader compilation) never get here
        device.on_uncaptured_error(Box::new(|error| {
            log::error!("Uncaptured GPU error: {error}");
        }));

        surface.configure(&device, &config);
        Ok(Self {
            instance,
            surface,
            device,
            queue,
            config,
        })
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn config(&self) -> &SurfaceConfiguration {
        &self.config
    }

    /// Zero sized surfaces cannot be configured, minimized windows keep the old size
    pub fn resize(&mut self, new_size: [u32; 2]) {
        if new_size[0] == 0 || new_size[1] == 0 {
            return;
        }
        self.config.width = new_size[0];
        self.config.height = new_size[1];
        self.surface.configure(&self.device, &self.config);
    }

    /// Reconfigures the surface with its current size, used after a lost or outdated surface
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn get_encoder(&self) -> CommandEncoder {
        self.device
            .create_command_encoder(&CommandEncoderDescriptor { label: None })
    }
}

pub trait BufferData {
    /// One buffer, or a tuple with one buffer per vertex attribute stream
    type Buffers;
    fn create_buffers(&self, context: &WGPUContext) -> Self::Buffers;
    fn fill_buffers(&self, buffers: &mut Self::Buffers, context: &WGPUContext);
}

/// CPU side data and the GPU buffers mirroring it
pub struct BufferAndData<T: BufferData> {
    pub data: T,
    pub buffers: T::Buffers,
}

impl<T: BufferData> BufferAndData<T> {
    pub fn new(data: T, context: &WGPUContext) -> Self {
        let mut buffers = T::create_buffers(&data, context);
        T::fill_buffers(&data, &mut buffers, context);
        Self { data, buffers }
    }

    pub fn update_buffer(&mut self, context: &WGPUContext) {
        self.data.fill_buffers(&mut self.buffers, context);
    }
}

mod buffers {
    use super::WGPUContext;

    use wgpu::*;

    use bytemuck::Pod;

    use std::num::NonZero;

    pub struct WGPUBuffer {
        buffer: Buffer,
    }

    impl WGPUBuffer {
        pub fn new_uniform(size: u64, context: &WGPUContext) -> Self {
            const UNIFORM_BUFFER_ALIGNMENT: u64 = 16;
            Self {
                buffer: Self::new(
                    size.max(1).div_ceil(UNIFORM_BUFFER_ALIGNMENT) * UNIFORM_BUFFER_ALIGNMENT,
                    BufferUsages::COPY_DST | BufferUsages::UNIFORM,
                    context,
                ),
            }
        }

        pub fn new_vertex(size: u64, context: &WGPUContext) -> Self {
            Self {
                buffer: Self::new(size, BufferUsages::COPY_DST | BufferUsages::VERTEX, context),
            }
        }

        pub fn new_index(size: u64, context: &WGPUContext) -> Self {
            Self {
                buffer: Self::new(size, BufferUsages::COPY_DST | BufferUsages::INDEX, context),
            }
        }

        pub fn size(&self) -> u64 {
            self.buffer.size()
        }

        fn new(size: u64, usage: BufferUsages, context: &WGPUContext) -> Buffer {
            context.device().create_buffer(&BufferDescriptor {
                label: None,
                size: size.next_multiple_of(COPY_BUFFER_ALIGNMENT),
                usage,
                mapped_at_creation: false,
            })
        }

        /// Grows the buffer, the contents are lost when it does
        pub fn resize(&mut self, new_size: u64, context: &WGPUContext) {
            if self.size() < new_size {
                self.buffer.destroy();
                self.buffer = Self::new(new_size, self.buffer.usage(), context);
            }
        }

        pub fn destroy(&self) {
            self.buffer.destroy();
        }

        /// Writes `data` element by element from the start of the buffer.
        ///
        /// Elements that do not fit are dropped with a warning.
        pub fn write_iter<'a, I, T>(&mut self, data: I, context: &WGPUContext)
        where
            I: Iterator<Item = &'a T>,
            T: Pod + Sized,
        {
            let Some(size) = NonZero::new(self.size()) else {
                return;
            };
            let Some(mut buffer_view) = context.queue().write_buffer_with(&self.buffer, 0, size) else {
                log::error!("Could not map buffer of size {size} for writing");
                return;
            };
            let mut chunks = buffer_view.chunks_mut(std::mem::size_of::<T>());
            for (index, element) in data.enumerate() {
                match chunks.next() {
                    Some(chunk) if chunk.len() == std::mem::size_of::<T>() => {
                        chunk.copy_from_slice(bytemuck::bytes_of(element))
                    }
                    _ => {
                        log::warn!("Buffer of size {size} is full, dropping elements from index {index}");
                        break;
                    }
                }
            }
        }

        pub fn write_data(&mut self, data: &[u8], context: &WGPUContext) {
            self.resize(data.len() as u64, context);
            context.queue().write_buffer(&self.buffer, 0, data);
        }
    }

    impl std::ops::Deref for WGPUBuffer {
        type Target = Buffer;
        fn deref(&self) -> &Self::Target {
            &self.buffer
        }
    }

    impl Drop for WGPUBuffer {
        fn drop(&mut self) {
            self.destroy();
        }
    }
}
