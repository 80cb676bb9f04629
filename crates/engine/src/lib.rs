//! # Arclight Engine
//!
//! Top-level engine crate. The interesting machinery lives in
//! `subsystem_manager`; this crate owns the boot sequence: argument parsing,
//! logging, configuration paths, and the [`Engine`] context that hands the
//! main loop to whichever subsystem holds the window-manager role.

pub mod appdata;
pub mod args;
pub mod boot;
pub mod engine;
pub mod logging;

pub use engine::Engine;

// Engine constants
pub const ENGINE_NAME: &str = env!("CARGO_PKG_NAME");
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ENGINE_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
