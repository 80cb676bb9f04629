//! Dynamic library loading for subsystem plugins.
//!
//! The manager never touches platform loading APIs directly; it only sees the
//! three-operation contract expressed here: open a library, resolve the
//! registration entry point to construct an instance, and close the library
//! by dropping the last handle. The production implementation wraps
//! `libloading`; tests substitute their own loader.

use libloading::{Library, Symbol};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use subsystem_api::{Subsystem, SubsystemCreate, SubsystemDestroy, DESTROY_SYMBOL};

// ============================================================================
// Loader Errors
// ============================================================================

/// Errors surfaced while opening a library or constructing its subsystem.
#[derive(Debug, Clone)]
pub enum LoaderError {
    /// The OS failed to open the candidate shared library
    LibraryLoad { path: PathBuf, message: String },

    /// A loaded library lacks a required entry point
    MissingSymbol {
        path: PathBuf,
        symbol: String,
        message: String,
    },

    /// The registration entry point returned null
    CreationFailed { path: PathBuf, message: String },
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LibraryLoad { path, message } => {
                write!(f, "Failed to load library {:?}: {}", path, message)
            }
            Self::MissingSymbol {
                path,
                symbol,
                message,
            } => {
                write!(f, "Missing symbol '{}' in {:?}: {}", symbol, path, message)
            }
            Self::CreationFailed { path, message } => {
                write!(f, "Failed to create subsystem from {:?}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for LoaderError {}

// ============================================================================
// Library Contract
// ============================================================================

/// A freshly constructed subsystem together with the function that must
/// eventually destroy it.
///
/// `destroy` is `None` only for in-process instances; for instances created
/// across a binary boundary it is the destroy entry point resolved from the
/// same library, so the allocating binary releases the memory.
pub struct RawSubsystem {
    ptr: *mut dyn Subsystem,
    destroy: Option<SubsystemDestroy>,
}

impl RawSubsystem {
    /// Wrap an in-process subsystem. Destruction happens locally via `Box`.
    pub fn from_boxed(subsystem: Box<dyn Subsystem>) -> Self {
        Self {
            ptr: Box::into_raw(subsystem),
            destroy: None,
        }
    }

    /// Wrap an instance handed across a binary boundary.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live subsystem allocated by the library that
    /// exported `destroy`, and ownership must transfer to the caller.
    pub unsafe fn from_ffi(ptr: *mut dyn Subsystem, destroy: SubsystemDestroy) -> Self {
        Self {
            ptr,
            destroy: Some(destroy),
        }
    }
}

/// An opened subsystem library.
///
/// One handle exists per distinct library path; dropping the last `Arc`
/// closes the OS mapping. The manager guarantees every instance created from
/// a handle is destroyed before the handle itself is released.
pub trait SubsystemLibrary: Send + Sync {
    /// The path this library was opened from.
    fn path(&self) -> &Path;

    /// Resolve the registration entry point under `create_symbol` and invoke
    /// it, transferring ownership of the new instance to the caller.
    fn create(&self, create_symbol: &str) -> Result<RawSubsystem, LoaderError>;
}

/// Opens subsystem libraries by path.
pub trait LibraryLoader: Send {
    fn open(&self, path: &Path) -> Result<Arc<dyn SubsystemLibrary>, LoaderError>;
}

// ============================================================================
// Bound Instance
// ============================================================================

/// A bound subsystem instance, owned by the manager.
///
/// Holds the raw instance pointer, the destroy function that releases it, and
/// an `Arc` of the backing library so the code the pointer refers to stays
/// mapped for at least as long as the instance lives.
pub struct SubsystemInstance {
    ptr: *mut dyn Subsystem,
    destroy: Option<SubsystemDestroy>,
    // Dropped after `ptr`, keeping the mapping alive through destruction.
    #[allow(dead_code)]
    library: Option<Arc<dyn SubsystemLibrary>>,
}

// The instance pointer is exclusively owned here and `Subsystem: Send`.
unsafe impl Send for SubsystemInstance {}

impl SubsystemInstance {
    /// Bind an instance created from a loaded library.
    pub fn new(raw: RawSubsystem, library: Arc<dyn SubsystemLibrary>) -> Self {
        Self {
            ptr: raw.ptr,
            destroy: raw.destroy,
            library: Some(library),
        }
    }

    /// Bind an in-process (built-in) instance with no backing library.
    pub fn from_boxed(subsystem: Box<dyn Subsystem>) -> Self {
        let raw = RawSubsystem::from_boxed(subsystem);
        Self {
            ptr: raw.ptr,
            destroy: raw.destroy,
            library: None,
        }
    }
}

impl Deref for SubsystemInstance {
    type Target = dyn Subsystem;

    fn deref(&self) -> &Self::Target {
        // Invariant: `ptr` is live until Drop runs.
        unsafe { &*self.ptr }
    }
}

impl DerefMut for SubsystemInstance {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.ptr }
    }
}

impl Drop for SubsystemInstance {
    fn drop(&mut self) {
        unsafe {
            match self.destroy {
                // Cross-binary instance: release through the allocating library.
                Some(destroy) => destroy(self.ptr),
                // In-process instance: plain Box drop.
                None => drop(Box::from_raw(self.ptr)),
            }
        }
    }
}

// ============================================================================
// libloading-backed Implementation
// ============================================================================

/// A subsystem library opened through `libloading`.
pub struct DynamicLibrary {
    path: PathBuf,
    library: Library,
}

impl SubsystemLibrary for DynamicLibrary {
    fn path(&self) -> &Path {
        &self.path
    }

    fn create(&self, create_symbol: &str) -> Result<RawSubsystem, LoaderError> {
        tracing::debug!(
            "Resolving '{}' in {:?}",
            create_symbol,
            self.path
        );

        let create: Symbol<SubsystemCreate> = unsafe {
            self.library
                .get(create_symbol.as_bytes())
                .map_err(|e| LoaderError::MissingSymbol {
                    path: self.path.clone(),
                    symbol: create_symbol.to_string(),
                    message: e.to_string(),
                })?
        };

        // The destroy entry point must come from the same library as the
        // constructor, never from the host or another plugin.
        let destroy: Symbol<SubsystemDestroy> = unsafe {
            self.library
                .get(DESTROY_SYMBOL.as_bytes())
                .map_err(|e| LoaderError::MissingSymbol {
                    path: self.path.clone(),
                    symbol: DESTROY_SYMBOL.to_string(),
                    message: e.to_string(),
                })?
        };

        let instance = unsafe { create() }.ok_or_else(|| LoaderError::CreationFailed {
            path: self.path.clone(),
            message: "registration entry point returned null".to_string(),
        })?;

        Ok(unsafe { RawSubsystem::from_ffi(instance as *mut dyn Subsystem, *destroy) })
    }
}

/// The production loader.
pub struct DynamicLibraryLoader;

impl LibraryLoader for DynamicLibraryLoader {
    fn open(&self, path: &Path) -> Result<Arc<dyn SubsystemLibrary>, LoaderError> {
        tracing::debug!("Opening subsystem library {:?}", path);

        // Safety: executing arbitrary initialization code from the library is
        // inherent to plugin loading; the library must be built against the
        // same engine ABI.
        let library = unsafe {
            Library::new(path).map_err(|e| LoaderError::LibraryLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        Ok(Arc::new(DynamicLibrary {
            path: path.to_path_buf(),
            library,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use subsystem_api::{Role, SubsystemError, SubsystemId, SubsystemMetadata};

    struct CountingSubsystem {
        drops: Arc<AtomicUsize>,
    }

    impl Subsystem for CountingSubsystem {
        fn metadata(&self) -> SubsystemMetadata {
            SubsystemMetadata {
                id: SubsystemId::new("test.counting"),
                name: "Counting".into(),
                version: "0.0.0".into(),
                author: "tests".into(),
                description: "".into(),
            }
        }

        fn roles(&self) -> Role {
            Role::AUDIO
        }

        fn startup(&mut self) -> Result<(), SubsystemError> {
            Ok(())
        }
    }

    impl Drop for CountingSubsystem {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn boxed_instance_is_destroyed_exactly_once_on_drop() {
        let drops = Arc::new(AtomicUsize::new(0));
        let instance = SubsystemInstance::from_boxed(Box::new(CountingSubsystem {
            drops: drops.clone(),
        }));

        assert_eq!(instance.roles(), Role::AUDIO);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(instance);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn instance_derefs_to_subsystem() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut instance = SubsystemInstance::from_boxed(Box::new(CountingSubsystem {
            drops: drops.clone(),
        }));

        assert!(instance.startup().is_ok());
        assert_eq!(instance.metadata().id.as_str(), "test.counting");
    }

    #[test]
    fn opening_a_missing_library_is_a_load_error() {
        let loader = DynamicLibraryLoader;
        let result = loader.open(Path::new("/nonexistent/libnothing.so"));
        assert!(matches!(result, Err(LoaderError::LibraryLoad { .. })));
    }
}
