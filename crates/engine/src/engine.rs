//! The engine context and run-loop handoff.

use crate::boot;
use anyhow::Context;
use subsystem_api::Role;
use subsystem_manager::{SubsystemConfig, SubsystemManager};

/// Top-level engine context.
///
/// Constructed once at process entry and torn down when `execute` returns;
/// there is no global engine state. The engine owns the subsystem manager and
/// hands the main loop to the primary window-manager subsystem, which calls
/// back into the engine cycle once per iteration of its native loop.
pub struct Engine {
    manager: SubsystemManager,
    config: SubsystemConfig,
    frame: u64,
    /// Stop after this many cycles; 0 means run until stopped
    frame_limit: u64,
    stop_requested: bool,
    logging_active: bool,
}

impl Engine {
    pub fn new(config: SubsystemConfig) -> Self {
        Self::with_manager(SubsystemManager::new(), config)
    }

    /// Build an engine around a pre-configured manager (custom loaders,
    /// built-in subsystems).
    pub fn with_manager(manager: SubsystemManager, config: SubsystemConfig) -> Self {
        Self {
            manager,
            config,
            frame: 0,
            frame_limit: 0,
            stop_requested: false,
            logging_active: false,
        }
    }

    pub fn set_frame_limit(&mut self, limit: u64) {
        self.frame_limit = limit;
    }

    /// Tell `report_critical` it can rely on the tracing subscriber.
    pub fn set_logging_active(&mut self, active: bool) {
        self.logging_active = active;
    }

    /// Ask the main loop to wind down at the next engine cycle.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn manager(&self) -> &SubsystemManager {
        &self.manager
    }

    /// Run the whole engine lifecycle: boot, main loop, shutdown.
    ///
    /// Returns the process exit status. Boot failures exit without any
    /// teardown beyond what startup's own unwinding already performed.
    pub fn execute(&mut self) -> i32 {
        if let Err(error) = boot::startup_routine(&mut self.manager, &self.config) {
            boot::report_critical(&error, self.logging_active);
            return 1;
        }

        let status = match self.hand_off_main_loop() {
            Ok(()) => 0,
            Err(error) => {
                boot::report_critical(&error, self.logging_active);
                1
            }
        };

        boot::shutdown_routine(&mut self.manager);
        status
    }

    /// Block on the window-manager subsystem's native loop, feeding it the
    /// engine-cycle callback until it reports the engine should stop.
    fn hand_off_main_loop(&mut self) -> anyhow::Result<()> {
        let Self {
            manager,
            frame,
            frame_limit,
            stop_requested,
            ..
        } = self;

        let window_manager = manager
            .get_subsystem_mut(Role::WINDOW_MANAGER)
            .context("no window-manager subsystem to drive the main loop")?;
        tracing::info!(
            "Handing main loop to '{}'",
            window_manager.metadata().name
        );

        let mut cycle = || {
            *frame += 1;
            tracing::trace!("Engine cycle {}", *frame);
            if *stop_requested {
                return false;
            }
            !(*frame_limit > 0 && *frame >= *frame_limit)
        };

        window_manager
            .run_main_loop(&mut cycle)
            .context("main loop terminated abnormally")?;

        tracing::info!("Main loop exited after {} cycle(s)", self.frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subsystem_api::{Subsystem, SubsystemError, SubsystemId, SubsystemMetadata};

    struct LoopingShell;

    impl Subsystem for LoopingShell {
        fn metadata(&self) -> SubsystemMetadata {
            SubsystemMetadata {
                id: SubsystemId::new("test.looping-shell"),
                name: "Looping Shell".into(),
                version: "0.0.0".into(),
                author: "tests".into(),
                description: "".into(),
            }
        }

        fn roles(&self) -> Role {
            Role::WINDOW_MANAGER
        }

        fn run_main_loop(
            &mut self,
            cycle: &mut dyn FnMut() -> bool,
        ) -> Result<(), SubsystemError> {
            while cycle() {}
            Ok(())
        }
    }

    fn shell_config() -> SubsystemConfig {
        let mut config = SubsystemConfig::default();
        config
            .roles
            .insert("window_manager".to_string(), vec!["shell".to_string()]);
        config
    }

    #[test]
    fn execute_runs_the_cycle_until_the_frame_limit() {
        let mut manager = SubsystemManager::new();
        manager.register_builtin("shell", || Box::new(LoopingShell));

        let mut engine = Engine::with_manager(manager, shell_config());
        engine.set_frame_limit(5);

        assert_eq!(engine.execute(), 0);
        assert_eq!(engine.frame(), 5);
        // Shutdown ran: the manager is back to uninitialized.
        assert!(!engine.manager().is_initialized());
    }

    #[test]
    fn execute_fails_cleanly_without_a_window_manager() {
        // An empty role table boots successfully but leaves nothing to drive
        // the loop, which is a clean non-zero exit, not a panic.
        let engine_config = SubsystemConfig::default();
        let mut engine = Engine::with_manager(SubsystemManager::new(), engine_config);

        assert_eq!(engine.execute(), 1);
        assert_eq!(engine.frame(), 0);
    }

    #[test]
    fn execute_reports_boot_failure_without_running_the_loop() {
        let mut config = SubsystemConfig::default();
        config
            .roles
            .insert("renderer".to_string(), vec!["missing".to_string()]);

        let mut engine = Engine::with_manager(SubsystemManager::new(), config);
        assert_eq!(engine.execute(), 1);
        assert_eq!(engine.frame(), 0);
    }

    #[test]
    fn stop_request_before_execute_exits_after_one_cycle() {
        let mut manager = SubsystemManager::new();
        manager.register_builtin("shell", || Box::new(LoopingShell));

        let mut engine = Engine::with_manager(manager, shell_config());
        engine.request_stop();

        assert_eq!(engine.execute(), 0);
        assert_eq!(engine.frame(), 1);
    }
}
