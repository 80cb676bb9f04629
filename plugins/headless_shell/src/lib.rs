//! Headless shell subsystem.
//!
//! Stands in for a real windowing stack: it claims the window-manager, input,
//! and UI roles and drives the engine cycle from a plain thread loop, which
//! makes it the default main-loop host for headless and test runs.

use std::time::Duration;
use subsystem_api::{
    export_subsystem, Role, Subsystem, SubsystemError, SubsystemId, SubsystemMetadata,
};

#[derive(Default)]
pub struct HeadlessShell {
    frames: u64,
}

impl Subsystem for HeadlessShell {
    fn metadata(&self) -> SubsystemMetadata {
        SubsystemMetadata {
            id: SubsystemId::new("arclight.headless-shell"),
            name: "Headless Shell".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: "Arclight Contributors".to_string(),
            description: "Headless window-manager, input, and UI subsystem".to_string(),
        }
    }

    fn roles(&self) -> Role {
        Role::WINDOW_MANAGER | Role::INPUT | Role::UI
    }

    fn startup(&mut self) -> Result<(), SubsystemError> {
        tracing::info!("Headless shell online (no native window)");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), SubsystemError> {
        tracing::info!("Headless shell offline after {} frame(s)", self.frames);
        Ok(())
    }

    fn run_main_loop(&mut self, cycle: &mut dyn FnMut() -> bool) -> Result<(), SubsystemError> {
        tracing::debug!("Headless shell entering main loop");
        while cycle() {
            self.frames += 1;
            // No native event queue to pump.
            std::thread::sleep(Duration::from_millis(1));
        }
        tracing::debug!("Headless shell leaving main loop");
        Ok(())
    }
}

export_subsystem!(HeadlessShell);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_the_three_shell_roles() {
        let shell = HeadlessShell::default();
        assert!(shell.roles().contains(Role::WINDOW_MANAGER));
        assert!(shell.roles().contains(Role::INPUT));
        assert!(shell.roles().contains(Role::UI));
        assert!(!shell.roles().contains(Role::RENDERER));
    }

    #[test]
    fn main_loop_runs_until_the_cycle_says_stop() {
        let mut shell = HeadlessShell::default();
        shell.startup().unwrap();

        let mut remaining = 3;
        let mut cycle = || {
            remaining -= 1;
            remaining > 0
        };
        shell.run_main_loop(&mut cycle).unwrap();
        assert_eq!(shell.frames, 2);

        shell.shutdown().unwrap();
    }
}
