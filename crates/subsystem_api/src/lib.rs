//! # Arclight Subsystem API
//!
//! This crate defines the capability contract that every engine subsystem must
//! satisfy. Subsystems are compiled as dynamic libraries (.dll/.so/.dylib) and
//! loaded by the subsystem manager at boot, selected through the engine
//! configuration rather than compile-time linkage.
//!
//! ## Roles
//!
//! A subsystem declares the engine capabilities it fulfills as a [`Role`]
//! bit-field fixed at construction. A single library may provide several roles
//! at once: a desktop shell is typically window manager, input provider, and
//! UI host in one instance.
//!
//! ## Creating a Subsystem
//!
//! 1. Create a new crate with `crate-type = ["cdylib"]`
//! 2. Implement the `Subsystem` trait on a `Default`-constructible type
//! 3. Use the `export_subsystem!` macro to export it
//! 4. Build as a dynamic library and place it in a configured search path
//!
//! ## Example
//!
//! ```rust,ignore
//! use subsystem_api::*;
//!
//! #[derive(Default)]
//! struct NullAudio;
//!
//! impl Subsystem for NullAudio {
//!     fn metadata(&self) -> SubsystemMetadata {
//!         SubsystemMetadata {
//!             id: SubsystemId::new("com.example.null-audio"),
//!             name: "Null Audio".into(),
//!             version: "1.0.0".into(),
//!             author: "Example Corp".into(),
//!             description: "Audio device that swallows everything".into(),
//!         }
//!     }
//!
//!     fn roles(&self) -> Role {
//!         Role::AUDIO
//!     }
//! }
//!
//! export_subsystem!(NullAudio);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Capability Roles
// ============================================================================

bitflags::bitflags! {
    /// Engine capability bit-field.
    ///
    /// Each bit denotes one capability a subsystem may fulfill. A subsystem's
    /// role set is the bitwise OR of every capability it declares; the set is
    /// established at construction and never mutated afterward.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Role: u32 {
        const WINDOW_MANAGER = 1 << 0;
        const INPUT          = 1 << 1;
        const UI             = 1 << 2;
        const RENDERER       = 1 << 3;
        const PHYSICS        = 1 << 4;
        const AUDIO          = 1 << 5;
    }
}

impl Role {
    /// Look up a single role bit by its configuration key.
    ///
    /// These are the keys used in the `[roles]` table of the subsystem
    /// configuration file.
    pub fn from_config_key(key: &str) -> Option<Role> {
        match key {
            "window_manager" => Some(Role::WINDOW_MANAGER),
            "input" => Some(Role::INPUT),
            "ui" => Some(Role::UI),
            "renderer" => Some(Role::RENDERER),
            "physics" => Some(Role::PHYSICS),
            "audio" => Some(Role::AUDIO),
            _ => None,
        }
    }

    /// The configuration key for a single role bit.
    ///
    /// Returns `None` for empty or multi-bit sets.
    pub fn config_key(&self) -> Option<&'static str> {
        match *self {
            Role::WINDOW_MANAGER => Some("window_manager"),
            Role::INPUT => Some("input"),
            Role::UI => Some("ui"),
            Role::RENDERER => Some("renderer"),
            Role::PHYSICS => Some("physics"),
            Role::AUDIO => Some("audio"),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(none)");
        }
        let mut first = true;
        for bit in self.iter() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{}", bit.config_key().unwrap_or("unknown"))?;
            first = false;
        }
        Ok(())
    }
}

// ============================================================================
// Subsystem Identification
// ============================================================================

/// Unique identifier for a subsystem.
///
/// Uses reverse domain notation (e.g., "com.arclight.headless-shell")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubsystemId(String);

impl SubsystemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata describing a subsystem implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsystemMetadata {
    /// Unique identifier for this subsystem
    pub id: SubsystemId,
    /// Human-readable name
    pub name: String,
    /// Version string (semver)
    pub version: String,
    /// Author or vendor
    pub author: String,
    /// Short description
    pub description: String,
}

// ============================================================================
// Subsystem Errors
// ============================================================================

/// Errors a subsystem implementation may surface to the manager.
#[derive(Debug, Clone)]
pub enum SubsystemError {
    /// The subsystem failed to bring up its internal resources
    StartupFailed { message: String },

    /// The subsystem failed to release its internal resources
    ShutdownFailed { message: String },

    /// The operation is not supported by this subsystem's role set
    UnsupportedOperation { operation: String },

    /// Anything else
    Other { message: String },
}

impl fmt::Display for SubsystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartupFailed { message } => {
                write!(f, "Subsystem startup failed: {}", message)
            }
            Self::ShutdownFailed { message } => {
                write!(f, "Subsystem shutdown failed: {}", message)
            }
            Self::UnsupportedOperation { operation } => {
                write!(f, "Operation not supported by this subsystem: {}", operation)
            }
            Self::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for SubsystemError {}

// ============================================================================
// Core Subsystem Trait
// ============================================================================

/// The trait every engine subsystem must implement.
///
/// Implementations are constructed inside their own dynamic library and handed
/// to the host across the binary boundary; the manager owns them from then on
/// and guarantees `startup()` and `shutdown()` each run exactly once per
/// instance, regardless of how many roles the instance fulfills.
///
/// Idempotency of `startup()`/`shutdown()` is NOT part of this contract; the
/// caller is responsible for exactly-once invocation.
pub trait Subsystem: Send {
    /// Metadata about this subsystem.
    fn metadata(&self) -> SubsystemMetadata;

    /// The capability roles this subsystem fulfills.
    ///
    /// The returned set is fixed for the lifetime of the instance and
    /// querying it has no side effects.
    fn roles(&self) -> Role;

    /// Bring up the subsystem's resources.
    ///
    /// Invoked exactly once by the manager after a successful load, before
    /// the manager reports overall boot success.
    fn startup(&mut self) -> Result<(), SubsystemError> {
        Ok(())
    }

    /// Release the subsystem's resources.
    ///
    /// Invoked exactly once by the manager before the owning library is
    /// unloaded.
    fn shutdown(&mut self) -> Result<(), SubsystemError> {
        Ok(())
    }

    /// Drive the engine main loop.
    ///
    /// Only meaningful for subsystems holding [`Role::WINDOW_MANAGER`]: the
    /// implementation must invoke `cycle` once per iteration of its native
    /// event/render loop and return once `cycle` yields `false`. The call
    /// blocks the boot thread for the lifetime of the engine.
    fn run_main_loop(
        &mut self,
        cycle: &mut dyn FnMut() -> bool,
    ) -> Result<(), SubsystemError> {
        let _ = cycle;
        Err(SubsystemError::UnsupportedOperation {
            operation: "run_main_loop".into(),
        })
    }
}

// ============================================================================
// Subsystem Declaration and Export
// ============================================================================

/// Symbol name of the registration entry point every subsystem library must
/// export. Identical across all subsystem libraries, independent of the
/// concrete type name, so the host can resolve it generically.
pub const CREATE_SYMBOL: &str = "_subsystem_create";

/// Symbol name of the matching destroy entry point. Destruction always goes
/// back through the library that allocated the instance, so allocator and
/// layout never disagree across independently built binaries.
pub const DESTROY_SYMBOL: &str = "_subsystem_destroy";

/// Type alias for the subsystem constructor function.
///
/// Subsystem libraries must export a function with this signature under
/// [`CREATE_SYMBOL`]. Ownership of the returned instance transfers to the
/// host.
pub type SubsystemCreate = unsafe extern "C" fn() -> Option<&'static mut dyn Subsystem>;

/// Type alias for the subsystem destructor function.
///
/// Subsystem libraries must export a function with this signature under
/// [`DESTROY_SYMBOL`].
pub type SubsystemDestroy = unsafe extern "C" fn(*mut dyn Subsystem);

/// Macro to export a subsystem from a dynamic library.
///
/// Generates the fixed-name FFI entry points the manager resolves at load
/// time. The subsystem type must implement `Default` and `Subsystem`.
///
/// WARNING: This macro must be used in the root of the subsystem crate.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct MySubsystem;
/// impl Subsystem for MySubsystem { /* ... */ }
///
/// export_subsystem!(MySubsystem);
/// ```
#[macro_export]
macro_rules! export_subsystem {
    ($subsystem_type:ty) => {
        #[no_mangle]
        pub unsafe extern "C" fn _subsystem_create(
        ) -> Option<&'static mut dyn $crate::Subsystem> {
            let subsystem = <$subsystem_type>::default();
            let boxed: Box<dyn $crate::Subsystem> = Box::new(subsystem);
            Some(Box::leak(boxed))
        }

        #[no_mangle]
        pub unsafe extern "C" fn _subsystem_destroy(ptr: *mut dyn $crate::Subsystem) {
            if ptr.is_null() {
                tracing::warn!("[Subsystem] Attempted to destroy null subsystem pointer");
                return;
            }
            // Re-box and drop inside the library that allocated it.
            drop(unsafe { Box::from_raw(ptr) });
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shell;

    impl Subsystem for Shell {
        fn metadata(&self) -> SubsystemMetadata {
            SubsystemMetadata {
                id: SubsystemId::new("test.shell"),
                name: "Shell".into(),
                version: "0.0.0".into(),
                author: "tests".into(),
                description: "".into(),
            }
        }

        fn roles(&self) -> Role {
            Role::WINDOW_MANAGER | Role::INPUT | Role::UI
        }
    }

    #[test]
    fn role_union_accumulates_each_bit_once() {
        let roles = Role::WINDOW_MANAGER | Role::INPUT | Role::WINDOW_MANAGER;
        assert_eq!(roles, Role::WINDOW_MANAGER | Role::INPUT);
        assert_eq!(roles.iter().count(), 2);
    }

    #[test]
    fn role_config_keys_round_trip() {
        for bit in Role::all().iter() {
            let key = bit.config_key().expect("single bit has a key");
            assert_eq!(Role::from_config_key(key), Some(bit));
        }
        assert_eq!(Role::from_config_key("teleporter"), None);
        assert_eq!((Role::INPUT | Role::UI).config_key(), None);
    }

    #[test]
    fn role_display_lists_set_bits() {
        let roles = Role::WINDOW_MANAGER | Role::UI;
        assert_eq!(roles.to_string(), "window_manager|ui");
        assert_eq!(Role::empty().to_string(), "(none)");
    }

    #[test]
    fn multi_role_subsystem_satisfies_each_declared_role() {
        let shell = Shell;
        for role in [Role::WINDOW_MANAGER, Role::INPUT, Role::UI] {
            assert_eq!(shell.roles() & role, role);
        }
        assert!(!shell.roles().contains(Role::RENDERER));
    }

    #[test]
    fn lifecycle_defaults_are_no_ops() {
        let mut shell = Shell;
        assert!(shell.startup().is_ok());
        assert!(shell.shutdown().is_ok());
    }

    #[test]
    fn main_loop_default_is_unsupported() {
        struct Mute;
        impl Subsystem for Mute {
            fn metadata(&self) -> SubsystemMetadata {
                SubsystemMetadata {
                    id: SubsystemId::new("test.mute"),
                    name: "Mute".into(),
                    version: "0.0.0".into(),
                    author: "tests".into(),
                    description: "".into(),
                }
            }
            fn roles(&self) -> Role {
                Role::AUDIO
            }
        }

        let mut mute = Mute;
        let mut cycle = || false;
        assert!(matches!(
            mute.run_main_loop(&mut cycle),
            Err(SubsystemError::UnsupportedOperation { .. })
        ));
    }
}
