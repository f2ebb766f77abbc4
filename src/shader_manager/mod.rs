use crate::wgpu_context::WGPUContext;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::ErrorKind;
use std::ops::Range;
use std::path::{Path, PathBuf};
use wgpu::*;

#[derive(Debug)]
pub enum ShaderError {
	/// Path is neither in the shader directory nor registered as a constant source
	NotFound { path: Box<str> },
	/// Path exists on disk and as a constant source
	Ambiguous { path: Box<str> },
	Io { path: PathBuf, source: std::io::Error },
	/// The same file was included twice while expanding `path`
	DuplicateInclude { include: Box<str>, path: Box<str> },
	ConflictingSource { path: Box<str> },
	Compile { path: Box<str>, message: String },
	Link { label: Box<str>, message: String },
	NotRegistered { label: Box<str> },
	NotCompiled { label: Box<str> },
}

impl fmt::Display for ShaderError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotFound { path } => write!(f, "Shader file not found: {path}"),
			Self::Ambiguous { path } => {
				write!(f, "Shader path {path} is available on disk and in constant shaders")
			}
			Self::Io { path, source } => write!(f, "Could not read shader {}: {source}", path.display()),
			Self::DuplicateInclude { include, path } => {
				write!(f, "Include {include} already seen when processing {path}")
			}
			Self::ConflictingSource { path } => {
				write!(f, "Conflicting constant sources registered at {path}")
			}
			Self::Compile { path, message } => write!(f, "Failed to compile shader {path}: {message}"),
			Self::Link { label, message } => write!(f, "Failed to link pipeline {label}: {message}"),
			Self::NotRegistered { label } => write!(f, "No render pipeline registered as {label}"),
			Self::NotCompiled { label } => write!(f, "Render pipeline {label} has not been compiled"),
		}
	}
}

impl std::error::Error for ShaderError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Io { source, .. } => Some(source),
			_ => None,
		}
	}
}

/// Loads, compiles and caches WGSL shaders and the render pipelines using them
///
/// Sources come from a directory on disk (re-read on [Self::reload]) or
/// are registered as constants compiled into the binary. A source may pull
/// in others with a line of the form `#include <common.wgsl>`.
///
/// Pipelines are registered from a [RenderPipelineDescriptorTemplate] under
/// a label and built by [Self::compile_all]. Compilation and link problems
/// are reported as [ShaderError] and every compiler message is logged.
pub struct ShaderManager {
	/// Directory to search for dynamic shaders
	directory_path: Option<PathBuf>,
	/// Disk sources keyed by path relative to the directory.
	///
	/// Cleared by [Self::reload]
	source_files: HashMap<Box<str>, Box<str>>,
	/// Sources stored within the binary. Never cleared
	constant_source_files: HashMap<Box<str>, Box<str>>,
	shader_modules: HashMap<Box<str>, ShaderModule>,
	render_pipelines: HashMap<Box<str>, (RenderPipelineDescriptorTemplate, Option<RenderPipeline>)>,
}

/// Internal Implementations
impl ShaderManager {
	/// Returns the cached disk source or reads it. `None` when the file does not exist
	fn get_file_from_disk(&mut self, path: &str) -> Result<Option<Box<str>>, ShaderError> {
		let Some(directory) = &self.directory_path else {
			return Ok(None);
		};
		if let Some(file) = self.source_files.get(path) {
			return Ok(Some(file.clone()));
		}
		let full_path = directory.join(path);
		match std::fs::read_to_string(&full_path) {
			Ok(file) => {
				let file: Box<str> = file.into();
				self.source_files.insert(path.into(), file.clone());
				Ok(Some(file))
			}
			Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
			Err(source) => Err(ShaderError::Io { path: full_path, source }),
		}
	}

	fn get_file(&mut self, path: &str) -> Result<Box<str>, ShaderError> {
		let disk_source_file = self.get_file_from_disk(path)?;
		let const_source_file = self.constant_source_files.get(path).cloned();

		match (disk_source_file, const_source_file) {
			(Some(source), None) | (None, Some(source)) => Ok(source),
			(Some(_), Some(_)) => Err(ShaderError::Ambiguous { path: path.into() }),
			(None, None) => Err(ShaderError::NotFound { path: path.into() }),
		}
	}

	/// Creates a [ShaderModule] inside a validation error scope and logs the
	/// compiler's messages
	fn read_and_get_module(&mut self, path: &str, context: &WGPUContext) -> Result<ShaderModule, ShaderError> {
		let source = self.resolve_source(path)?;

		context.device().push_error_scope(ErrorFilter::Validation);
		let module = context.device().create_shader_module(ShaderModuleDescriptor {
			label: Some(path),
			source: ShaderSource::Wgsl(Cow::Owned(source)),
		});

		let info = pollster::block_on(module.get_compilation_info());
		for message in &info.messages {
			let line = message.location.as_ref().map(|x| x.line_number).unwrap_or(0);
			match message.message_type {
				CompilationMessageType::Error => log::error!("{path}:{line}: {}", message.message),
				CompilationMessageType::Warning => log::warn!("{path}:{line}: {}", message.message),
				CompilationMessageType::Info => log::info!("{path}:{line}: {}", message.message),
			}
		}

		match pollster::block_on(context.device().pop_error_scope()) {
			Some(error) => Err(ShaderError::Compile {
				path: path.into(),
				message: error.to_string(),
			}),
			None => {
				log::info!("compile WGSL status for {path}: ok");
				Ok(module)
			}
		}
	}

	fn get_module(&mut self, path: &str, context: &WGPUContext) -> Result<ShaderModule, ShaderError> {
		if let Some(module) = self.shader_modules.get(path) {
			return Ok(module.clone());
		}
		let module = self.read_and_get_module(path, context)?;
		self.shader_modules.insert(path.into(), module.clone());
		Ok(module)
	}

	/// Builds the pipeline inside a validation error scope
	fn compile_pipeline(
		&mut self,
		label: &str,
		template: &RenderPipelineDescriptorTemplate,
		context: &WGPUContext,
	) -> Result<RenderPipeline, ShaderError> {
		let module = self.get_module(template.module_path, context)?;
		let descriptor = template.resolve(&module);

		context.device().push_error_scope(ErrorFilter::Validation);
		let pipeline = context.device().create_render_pipeline(&descriptor);
		match pollster::block_on(context.device().pop_error_scope()) {
			Some(error) => Err(ShaderError::Link {
				label: label.into(),
				message: error.to_string(),
			}),
			None => {
				log::info!("Pipeline link status for {label}: ok");
				Ok(pipeline)
			}
		}
	}
}

/// Public Interface
impl ShaderManager {
	/// `directory_path` of `None` restricts lookups to constant sources
	pub fn new(directory_path: Option<&Path>) -> Self {
		Self {
			directory_path: directory_path.map(Path::to_owned),
			source_files: HashMap::new(),
			constant_source_files: HashMap::new(),
			shader_modules: HashMap::new(),
			render_pipelines: HashMap::new(),
		}
	}

	/// Returns the source at `path` with every include directive replaced by
	/// the included file's contents
	pub fn resolve_source(&mut self, path: &str) -> Result<String, ShaderError> {
		log::debug!("resolving shader source {path:?}");
		let mut source = self.get_file(path)?.into_string();
		let mut includes: HashSet<Box<str>> = HashSet::new();

		while let Some((line, include)) = find_next_include(&source) {
			if !includes.insert(include.as_str().into()) {
				return Err(ShaderError::DuplicateInclude {
					include: include.into(),
					path: path.into(),
				});
			}
			let included = self.get_file(&include)?;
			source.replace_range(line, &included);
		}

		Ok(source)
	}

	/// Registers a shader source that ships inside the binary
	///
	/// Registering the same contents twice is allowed, different contents
	/// at the same path are not.
	pub fn register_constant_source(&mut self, path: &str, source: &str) -> Result<(), ShaderError> {
		match self.constant_source_files.get(path) {
			Some(old_source) if **old_source == *source => Ok(()),
			Some(_) => Err(ShaderError::ConflictingSource { path: path.into() }),
			None => {
				self.constant_source_files.insert(path.into(), source.into());
				Ok(())
			}
		}
	}

	/// Registers a template under `label`. An existing registration is kept
	pub fn register_render_pipeline(&mut self, label: &str, template: RenderPipelineDescriptorTemplate) {
		self.render_pipelines
			.entry(label.into())
			.or_insert((template, None));
	}

	/// Compiles every registered pipeline that is not compiled yet
	pub fn compile_all(&mut self, context: &WGPUContext) -> Result<(), ShaderError> {
		let pending = self
			.render_pipelines
			.iter()
			.filter(|(_, (_, pipeline))| pipeline.is_none())
			.map(|(label, (template, _))| (label.clone(), template.clone()))
			.collect::<Vec<_>>();

		for (label, template) in pending {
			let pipeline = self.compile_pipeline(&label, &template, context)?;
			if let Some(entry) = self.render_pipelines.get_mut(&label) {
				entry.1 = Some(pipeline);
			}
		}
		Ok(())
	}

	pub fn get_render_pipeline(&self, label: &str) -> Result<&RenderPipeline, ShaderError> {
		match self.render_pipelines.get(label) {
			Some((_, Some(pipeline))) => Ok(pipeline),
			Some((_, None)) => Err(ShaderError::NotCompiled { label: label.into() }),
			None => Err(ShaderError::NotRegistered { label: label.into() }),
		}
	}

	/// Re-reads disk sources and recompiles every pipeline
	///
	/// When anything fails the previously compiled shaders stay in use
	pub fn reload(&mut self, context: &WGPUContext) -> Result<(), ShaderError> {
		let old_sources = std::mem::take(&mut self.source_files);
		let old_modules = std::mem::take(&mut self.shader_modules);
		let old_pipelines = self
			.render_pipelines
			.iter_mut()
			.map(|(label, (_, pipeline))| (label.clone(), pipeline.take()))
			.collect::<Vec<_>>();

		match self.compile_all(context) {
			Ok(()) => {
				log::info!("Reloaded {} render pipelines", self.render_pipelines.len());
				Ok(())
			}
			Err(err) => {
				self.source_files = old_sources;
				self.shader_modules = old_modules;
				for (label, pipeline) in old_pipelines {
					if let Some(entry) = self.render_pipelines.get_mut(&label) {
						entry.1 = pipeline;
					}
				}
				Err(err)
			}
		}
	}
}

/// Finds the first `#include <path>` line. Returns the byte range of the line
/// without its line ending and the included path
fn find_next_include(input: &str) -> Option<(Range<usize>, String)> {
	let mut offset = 0;
	for line in input.split_inclusive('\n') {
		let content = line.trim_end_matches(['\n', '\r']);
		let include = content
			.trim()
			.strip_prefix("#include")
			.and_then(|rest| rest.trim().strip_prefix('<'))
			.and_then(|rest| rest.strip_suffix('>'));
		if let Some(include) = include {
			return Some((offset..offset + content.len(), include.trim().to_owned()));
		}
		offset += line.len();
	}
	None
}

/// A template that can be used to instantiate a [`RenderPipelineDescriptor`]
///
/// The vertex and fragment stages share one WGSL module, `module_path`,
/// resolved through the [ShaderManager] the template is registered with.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptorTemplate {
	pub label: Label<'static>,
	pub layout: Option<PipelineLayout>,
	/// Path of the WGSL file relative to the [ShaderManager]'s sources
	pub module_path: &'static str,
	pub vertex: VertexStateTemplate,
	pub primitive: PrimitiveState,
	pub fragment: Option<FragmentStateTemplate>,
}

impl RenderPipelineDescriptorTemplate {
	fn resolve<'a>(&'a self, module: &'a ShaderModule) -> RenderPipelineDescriptor<'a> {
		RenderPipelineDescriptor {
			label: self.label,
			layout: self.layout.as_ref(),
			vertex: VertexState {
				module,
				entry_point: self.vertex.entry_point,
				// We do not support overridable constants here
				compilation_options: Default::default(),
				buffers: self.vertex.buffers,
			},
			primitive: self.primitive,
			depth_stencil: None,
			multisample: MultisampleState::default(),
			fragment: self.fragment.as_ref().map(|fragment| FragmentState {
				module,
				entry_point: fragment.entry_point,
				compilation_options: Default::default(),
				targets: &fragment.targets,
			}),
			multiview: None,
			cache: None,
		}
	}
}

#[derive(Debug, Clone)]
pub struct VertexStateTemplate {
	pub entry_point: Option<&'static str>,
	pub buffers: &'static [VertexBufferLayout<'static>],
}

#[derive(Debug, Clone)]
pub struct FragmentStateTemplate {
	pub entry_point: Option<&'static str>,
	pub targets: Box<[Option<ColorTargetState>]>,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn manager_with(sources: &[(&str, &str)]) -> ShaderManager {
		let mut manager = ShaderManager::new(None);
		for (path, source) in sources {
			manager.register_constant_source(path, source).unwrap();
		}
		manager
	}

	#[test]
	fn expands_nested_includes() {
		let mut manager = manager_with(&[
			("main.wgsl", "#include <a.wgsl>\nfn main() {}\n"),
			("a.wgsl", "// a\n#include <b.wgsl>"),
			("b.wgsl", "// b"),
		]);
		assert_eq!(manager.resolve_source("main.wgsl").unwrap(), "// a\n// b\nfn main() {}\n");
	}

	#[test]
	fn include_keeps_crlf_line_endings() {
		let mut manager = manager_with(&[
			("main.wgsl", "first\r\n  #include < common.wgsl >\r\nlast"),
			("common.wgsl", "common"),
		]);
		assert_eq!(manager.resolve_source("main.wgsl").unwrap(), "first\r\ncommon\r\nlast");
	}

	#[test]
	fn recursive_include_is_an_error() {
		let mut manager = manager_with(&[
			("a.wgsl", "#include <b.wgsl>"),
			("b.wgsl", "#include <b.wgsl>"),
		]);
		assert!(matches!(
			manager.resolve_source("a.wgsl"),
			Err(ShaderError::DuplicateInclude { .. })
		));
	}

	#[test]
	fn missing_include_is_not_found() {
		let mut manager = manager_with(&[("a.wgsl", "#include <gone.wgsl>")]);
		match manager.resolve_source("a.wgsl") {
			Err(ShaderError::NotFound { path }) => assert_eq!(&*path, "gone.wgsl"),
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn constant_sources_must_not_conflict() {
		let mut manager = manager_with(&[("a.wgsl", "one")]);
		assert!(manager.register_constant_source("a.wgsl", "one").is_ok());
		assert!(matches!(
			manager.register_constant_source("a.wgsl", "two"),
			Err(ShaderError::ConflictingSource { .. })
		));
	}

	#[test]
	fn disk_and_constant_source_at_same_path_is_ambiguous() {
		let directory = std::env::temp_dir().join(format!("sprite_demo_shaders_{}", std::process::id()));
		std::fs::create_dir_all(&directory).unwrap();
		std::fs::write(directory.join("disk.wgsl"), "#include <shared.wgsl>\n").unwrap();
		std::fs::write(directory.join("shared.wgsl"), "// disk").unwrap();

		let mut manager = ShaderManager::new(Some(&directory));
		assert_eq!(manager.resolve_source("disk.wgsl").unwrap(), "// disk\n");

		manager.register_constant_source("shared.wgsl", "// constant").unwrap();
		assert!(matches!(
			manager.resolve_source("disk.wgsl"),
			Err(ShaderError::Ambiguous { .. })
		));

		std::fs::remove_dir_all(&directory).unwrap();
	}

	#[test]
	fn unknown_pipeline_label() {
		let manager = ShaderManager::new(None);
		assert!(matches!(
			manager.get_render_pipeline("sprite"),
			Err(ShaderError::NotRegistered { .. })
		));
	}
}
