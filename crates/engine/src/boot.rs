//! Boot and shutdown routines.
//
// Thin wrappers around the subsystem manager's lifecycle, plus the critical
// reporting path that must reach a stream even when logging never came up.

use anyhow::Context;
use subsystem_manager::{SubsystemConfig, SubsystemManager};

/// Bring up every configured subsystem. A failure here has already been
/// unwound by the manager; the engine only has to report it and exit.
pub fn startup_routine(
    manager: &mut SubsystemManager,
    config: &SubsystemConfig,
) -> anyhow::Result<()> {
    tracing::info!("Engine boot: bringing up subsystems");
    manager
        .startup(config)
        .context("subsystem startup failed")?;
    Ok(())
}

/// Tear down whatever is bound. Shutdown problems are logged, never fatal.
pub fn shutdown_routine(manager: &mut SubsystemManager) {
    tracing::info!("Engine shutdown: tearing down subsystems");
    if let Err(error) = manager.shutdown() {
        tracing::error!("Subsystem shutdown reported: {}", error);
    }
}

/// Surface a critical boot failure. Goes through the logging sink when one is
/// installed, and falls back to raw stderr otherwise so the diagnostic is
/// never swallowed.
pub fn report_critical(error: &anyhow::Error, logging_active: bool) {
    if logging_active {
        tracing::error!("CRITICAL: {:#}", error);
    } else {
        eprintln!("arclight: critical boot failure: {:#}", error);
    }
}
