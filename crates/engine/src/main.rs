//! Arclight Engine entry point.

use arclight_engine::{appdata, args, logging, Engine};
use arclight_engine::{ENGINE_DESCRIPTION, ENGINE_NAME, ENGINE_VERSION};
use subsystem_manager::SubsystemConfig;

fn main() {
    let parsed = args::parse_args();
    let _log_guard = logging::init(parsed.verbose);

    tracing::info!("{} v{}", ENGINE_NAME, ENGINE_VERSION);
    tracing::info!("{}", ENGINE_DESCRIPTION);

    match run(parsed) {
        Ok(status) => std::process::exit(status),
        Err(error) => {
            tracing::error!("CRITICAL: {:#}", error);
            std::process::exit(1);
        }
    }
}

fn run(parsed: args::ParsedArgs) -> anyhow::Result<i32> {
    let config_path = match parsed.config_path {
        Some(path) => path,
        None => appdata::setup_appdata()?.config_file,
    };
    tracing::info!("Loading subsystem configuration from {:?}", config_path);
    let config = SubsystemConfig::load(&config_path)?;

    let mut engine = Engine::new(config);
    engine.set_logging_active(true);
    if let Some(limit) = parsed.frame_limit {
        engine.set_frame_limit(limit);
    }
    Ok(engine.execute())
}
