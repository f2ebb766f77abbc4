//#![windows_subsystem = "windows"]
use std::process::ExitCode;

use sprite_demo::config::DemoConfig;
use sprite_demo::logging::init_logger;

fn main() -> ExitCode {
	init_logger();
	let config = DemoConfig::from_env();
	log::info!("Loading resources from {}", config.resource_root.display());

	match sprite_demo::application::run(config) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			log::error!("Fatal: {err:?}");
			ExitCode::FAILURE
		}
	}
}
