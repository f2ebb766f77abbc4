use std::sync::Once;

use log::LevelFilter;

/// Environment variable holding the log level for this crate (`trace`..`off`)
pub const LOG_LEVEL_VAR: &str = "SPRITE_DEMO_LOG";

static INIT: Once = Once::new();

/// Installs the global logger. Later calls are ignored.
///
/// Other crates (wgpu, naga, rodio) only get through at `Warn` so the
/// shader and asset messages of the demo stay readable.
pub fn init_logger() {
	INIT.call_once(|| {
		let level = std::env::var(LOG_LEVEL_VAR)
			.ok()
			.and_then(|level| parse_level(&level))
			.unwrap_or(LevelFilter::Info);

		let result = simple_logger::SimpleLogger::new()
			.with_level(LevelFilter::Warn)
			.with_module_level("sprite_demo", level)
			.init();

		if let Err(err) = result {
			eprintln!("Could not install logger: {err}");
		}
	});
}

fn parse_level(level: &str) -> Option<LevelFilter> {
	level.trim().parse().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_level_names() {
		assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
		assert_eq!(parse_level(" TRACE "), Some(LevelFilter::Trace));
		assert_eq!(parse_level("off"), Some(LevelFilter::Off));
		assert_eq!(parse_level("loud"), None);
	}

	#[test]
	fn init_twice_is_harmless() {
		init_logger();
		init_logger();
		log::info!("logger initialized twice");
	}
}
