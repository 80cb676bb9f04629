//! # Subsystem Manager
//!
//! This crate is the single authority for discovery, binding, role
//! assignment, and ordered lifecycle of all subsystem plugins in the Arclight
//! engine. It handles:
//!
//! - Scanning configured search paths for candidate dynamic libraries
//! - Loading each library at most once, however many roles request it
//! - Resolving the fixed registration symbol and binding instances
//! - Assigning one primary + N secondary implementations per role
//! - Driving `startup()`/`shutdown()` exactly once per distinct instance
//!
//! ## Usage
//!
//! ```rust,ignore
//! use subsystem_manager::{SubsystemConfig, SubsystemManager};
//! use subsystem_api::Role;
//!
//! let config = SubsystemConfig::load(&config_path)?;
//! let mut manager = SubsystemManager::new();
//! manager.startup(&config)?;
//!
//! let renderer = manager.get_subsystem(Role::RENDERER)?;
//!
//! manager.shutdown()?;
//! ```
//!
//! Startup is transactional: any failure unwinds whatever was partially
//! loaded or started and leaves the manager uninitialized, so a failed boot
//! never exposes a degraded engine.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use subsystem_api::{Role, Subsystem, SubsystemError};

mod config;
mod loader;
mod registry;

pub use config::{platform_library_extension, SubsystemConfig};
pub use loader::{
    DynamicLibrary, DynamicLibraryLoader, LibraryLoader, LoaderError, RawSubsystem,
    SubsystemInstance, SubsystemLibrary,
};
pub use registry::{PotentialSubsystemIndex, RoleAssignmentTable};

// ============================================================================
// Candidate Name Resolution
// ============================================================================

/// Derives the declared name of a candidate library during the discovery
/// scan, before the library is opened.
///
/// Name derivation is deliberately pluggable: the default implementation is
/// filename-based, but content- or metadata-based resolvers can be injected
/// without touching the manager.
pub trait SubsystemNameResolver: Send {
    /// The declared name for a candidate, or `None` to skip it.
    fn resolve(&self, path: &Path) -> Option<String>;
}

/// Default resolver: the file stem with any platform `lib` prefix stripped,
/// so `libforward_renderer.so` resolves to `forward_renderer`.
pub struct FileStemResolver;

impl SubsystemNameResolver for FileStemResolver {
    fn resolve(&self, path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        Some(stem.strip_prefix("lib").unwrap_or(stem).to_string())
    }
}

// ============================================================================
// Manager Errors
// ============================================================================

/// Errors that can occur in the subsystem manager.
#[derive(Debug)]
pub enum SubsystemManagerError {
    /// A required role has no resolvable candidate, or configuration data is
    /// malformed
    Configuration { message: String },

    /// A candidate library could not be opened or lacks a required symbol
    Loader(LoaderError),

    /// A bound subsystem failed its own lifecycle call
    Subsystem {
        path: PathBuf,
        error: SubsystemError,
    },

    /// The role has no assigned implementation
    RoleUnassigned { role: Role },
}

impl fmt::Display for SubsystemManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { message } => write!(f, "Configuration error: {}", message),
            Self::Loader(error) => write!(f, "{}", error),
            Self::Subsystem { path, error } => {
                write!(f, "Subsystem from {:?} failed: {}", path, error)
            }
            Self::RoleUnassigned { role } => {
                write!(f, "No subsystem assigned to role {}", role)
            }
        }
    }
}

impl std::error::Error for SubsystemManagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Loader(error) => Some(error),
            Self::Subsystem { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<LoaderError> for SubsystemManagerError {
    fn from(error: LoaderError) -> Self {
        Self::Loader(error)
    }
}

// ============================================================================
// Subsystem Manager
// ============================================================================

/// A bound subsystem with its lifecycle state.
struct BoundSubsystem {
    instance: SubsystemInstance,
    started: bool,
}

type BuiltinFactory = Box<dyn Fn() -> Box<dyn Subsystem> + Send>;

/// Manages all subsystem plugins in the engine.
///
/// Exclusively owns the discovery index, the bind-storage table, and the role
/// assignment table; no other component loads or unloads subsystem libraries.
/// All operations are synchronous and run on the boot thread.
pub struct SubsystemManager {
    loader: Box<dyn LibraryLoader>,
    resolver: Box<dyn SubsystemNameResolver>,

    /// Discovered candidates, name → path, built before any library is opened
    index: PotentialSubsystemIndex,

    /// Bound instances keyed by library path (or a synthetic built-in key)
    bound: HashMap<PathBuf, BoundSubsystem>,

    /// Binding order; startup runs in this order, shutdown in reverse
    load_order: Vec<PathBuf>,

    /// Role → ordered instance keys, index 0 primary
    assignments: RoleAssignmentTable,

    /// In-process subsystems available by name without a library on disk
    builtins: HashMap<String, BuiltinFactory>,

    initialized: bool,
}

impl SubsystemManager {
    /// Create a manager backed by the platform dynamic loader.
    pub fn new() -> Self {
        Self::with_loader(Box::new(DynamicLibraryLoader), Box::new(FileStemResolver))
    }

    /// Create a manager with a custom loader and name resolver.
    pub fn with_loader(
        loader: Box<dyn LibraryLoader>,
        resolver: Box<dyn SubsystemNameResolver>,
    ) -> Self {
        Self {
            loader,
            resolver,
            index: PotentialSubsystemIndex::new(),
            bound: HashMap::new(),
            load_order: Vec::new(),
            assignments: RoleAssignmentTable::new(),
            builtins: HashMap::new(),
            initialized: false,
        }
    }

    /// Register an in-process subsystem constructible by name, without a
    /// library on disk. Built-ins are bound lazily, only when a configured
    /// role names them, and go through the same lifecycle as plugin
    /// instances.
    pub fn register_builtin(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Subsystem> + Send + 'static,
    ) {
        self.builtins.insert(name.into(), Box::new(factory));
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Discover, load, bind, assign, and start all configured subsystems.
    ///
    /// A second call on an already-initialized manager is a warning no-op.
    /// Any failure unwinds partial state (started instances are shut down,
    /// opened libraries closed) before the error is returned.
    pub fn startup(&mut self, config: &SubsystemConfig) -> Result<(), SubsystemManagerError> {
        if self.initialized {
            tracing::warn!("Subsystem manager already initialized; ignoring startup request");
            return Ok(());
        }

        match self.try_startup(config) {
            Ok(()) => {
                self.initialized = true;
                tracing::info!(
                    "Subsystem startup complete: {} instance(s) from {} candidate(s)",
                    self.bound.len(),
                    self.index.len()
                );
                Ok(())
            }
            Err(error) => {
                tracing::error!("Subsystem startup failed: {}", error);
                self.unwind();
                Err(error)
            }
        }
    }

    /// Shut down every started instance exactly once, release all instances
    /// through their owning libraries, close all handles, and clear the
    /// tables. Safe to call at any point, including after a failed or absent
    /// startup.
    pub fn shutdown(&mut self) -> Result<(), SubsystemManagerError> {
        if !self.initialized && self.bound.is_empty() {
            tracing::warn!("Subsystem manager shutdown requested before startup; nothing to do");
            return Ok(());
        }

        tracing::info!(
            "Shutting down {} subsystem instance(s)",
            self.bound.len()
        );
        self.unwind();
        Ok(())
    }

    /// The primary implementation for a role.
    pub fn get_subsystem(&self, role: Role) -> Result<&dyn Subsystem, SubsystemManagerError> {
        let path = self
            .assignments
            .primary(role)
            .ok_or(SubsystemManagerError::RoleUnassigned { role })?;
        let bound = self
            .bound
            .get(path)
            .ok_or(SubsystemManagerError::RoleUnassigned { role })?;
        Ok(&*bound.instance)
    }

    /// Mutable access to the primary implementation for a role. Needed by the
    /// engine to hand the main loop to the window manager.
    pub fn get_subsystem_mut(
        &mut self,
        role: Role,
    ) -> Result<&mut dyn Subsystem, SubsystemManagerError> {
        let path = self
            .assignments
            .primary(role)
            .map(Path::to_path_buf)
            .ok_or(SubsystemManagerError::RoleUnassigned { role })?;
        let bound = self
            .bound
            .get_mut(&path)
            .ok_or(SubsystemManagerError::RoleUnassigned { role })?;
        Ok(&mut *bound.instance)
    }

    /// Every implementation assigned to a role, primary first. Empty if the
    /// role has no assignment.
    pub fn get_subsystems(&self, role: Role) -> Vec<&dyn Subsystem> {
        self.assignments
            .all(role)
            .iter()
            .filter_map(|path| self.bound.get(path))
            .map(|bound| &*bound.instance)
            .collect()
    }

    // ------------------------------------------------------------------
    // Startup internals
    // ------------------------------------------------------------------

    fn try_startup(&mut self, config: &SubsystemConfig) -> Result<(), SubsystemManagerError> {
        self.discover(config);

        let role_table = config.role_assignments()?;
        if role_table.is_empty() {
            tracing::warn!("No subsystem roles configured; engine boots with no subsystems");
        }

        for (role, names) in role_table {
            for name in names {
                let key = self.bind_candidate(role, name, config)?;
                self.assignments.assign(role, key);
            }
        }

        self.start_all()
    }

    /// Scan each configured search path and record name → path for every file
    /// matching the configured extension. Nothing is loaded here.
    fn discover(&mut self, config: &SubsystemConfig) {
        for dir in &config.search_paths {
            if !dir.exists() {
                tracing::warn!("Subsystem search path does not exist: {:?}", dir);
                continue;
            }

            tracing::info!("Scanning for subsystem libraries in {:?}", dir);
            for entry in walkdir::WalkDir::new(dir)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str())
                    != Some(config.library_extension.as_str())
                {
                    continue;
                }

                match self.resolver.resolve(path) {
                    Some(name) => {
                        tracing::debug!("  Candidate '{}' at {:?}", name, path);
                        self.index.insert(name, path.to_path_buf());
                    }
                    None => {
                        tracing::debug!("  Skipping candidate with unresolvable name: {:?}", path);
                    }
                }
            }
        }

        tracing::info!("Discovered {} candidate subsystem(s)", self.index.len());
    }

    /// Resolve a configured name to a bound instance, loading its library if
    /// this is the first role to request it. Returns the bind-storage key.
    fn bind_candidate(
        &mut self,
        role: Role,
        name: &str,
        config: &SubsystemConfig,
    ) -> Result<PathBuf, SubsystemManagerError> {
        let path = if self.builtins.contains_key(name) {
            PathBuf::from(format!("builtin:{}", name))
        } else {
            self.index
                .resolve(name)
                .ok_or_else(|| SubsystemManagerError::Configuration {
                    message: format!(
                        "no discovered or built-in candidate named '{}' for role {}",
                        name, role
                    ),
                })?
                .to_path_buf()
        };

        if !self.bound.contains_key(&path) {
            let instance = if let Some(factory) = self.builtins.get(name) {
                tracing::info!("Binding built-in subsystem '{}'", name);
                SubsystemInstance::from_boxed(factory())
            } else {
                tracing::info!("Loading subsystem '{}' from {:?}", name, path);
                let library = self.loader.open(&path)?;
                let raw = library.create(&config.registration_symbol)?;
                SubsystemInstance::new(raw, library)
            };

            let metadata = instance.metadata();
            tracing::info!(
                "Bound subsystem: {} v{} roles={}",
                metadata.name,
                metadata.version,
                instance.roles()
            );

            self.bound.insert(
                path.clone(),
                BoundSubsystem {
                    instance,
                    started: false,
                },
            );
            self.load_order.push(path.clone());
        }

        let declared = self
            .bound
            .get(&path)
            .map(|bound| bound.instance.roles())
            .unwrap_or_else(Role::empty);
        if !declared.contains(role) {
            return Err(SubsystemManagerError::Configuration {
                message: format!(
                    "subsystem '{}' declares roles {} but is configured for role {}",
                    name, declared, role
                ),
            });
        }

        Ok(path)
    }

    /// Start every distinct bound instance exactly once, in load order. An
    /// instance fulfilling several roles is started once, not once per role.
    fn start_all(&mut self) -> Result<(), SubsystemManagerError> {
        let order = self.load_order.clone();
        for path in &order {
            if let Some(bound) = self.bound.get_mut(path) {
                if bound.started {
                    continue;
                }
                let name = bound.instance.metadata().name;
                tracing::info!("Starting subsystem: {}", name);
                bound
                    .instance
                    .startup()
                    .map_err(|error| SubsystemManagerError::Subsystem {
                        path: path.clone(),
                        error,
                    })?;
                bound.started = true;
            }
        }
        Ok(())
    }

    /// Idempotent cleanup over whatever subset is actually bound: shut down
    /// started instances in reverse load order, destroy every instance
    /// through its owning library, release the handles, clear the tables.
    fn unwind(&mut self) {
        let order = self.load_order.clone();

        for path in order.iter().rev() {
            if let Some(bound) = self.bound.get_mut(path) {
                if !bound.started {
                    continue;
                }
                let name = bound.instance.metadata().name;
                tracing::info!("Shutting down subsystem: {}", name);
                if let Err(error) = bound.instance.shutdown() {
                    tracing::error!("Subsystem '{}' failed to shut down cleanly: {}", name, error);
                }
                bound.started = false;
            }
        }

        // Instances are destroyed before any handle is released; each
        // instance holds its own reference to the backing library, dropped
        // as the final part of instance destruction.
        for path in order.iter().rev() {
            self.bound.remove(path);
        }

        self.load_order.clear();
        self.assignments.clear();
        self.index.clear();
        self.initialized = false;
    }
}

impl Default for SubsystemManager {
    fn default() -> Self {
        Self::new()
    }
}

// When the manager is dropped without an explicit shutdown, unwind anyway so
// instances are still destroyed through their owning libraries.
impl Drop for SubsystemManager {
    fn drop(&mut self) {
        if !self.bound.is_empty() {
            tracing::warn!(
                "Subsystem manager dropped with {} bound instance(s); shutting them down",
                self.bound.len()
            );
            self.unwind();
        }
    }
}
