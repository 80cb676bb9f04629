//! Bookkeeping tables for the subsystem manager.
//!
//! These registries maintain the mapping between discovered candidates, bound
//! instances, and the roles they are assigned to.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use subsystem_api::Role;

// ============================================================================
// Potential-Subsystem Index
// ============================================================================

/// Index of discovered candidate libraries, declared name → resolved path.
///
/// Built once during the discovery scan, before any library is actually
/// loaded, so that name-based configuration ("use subsystem named X for role
/// Y") can be resolved without opening every candidate.
pub struct PotentialSubsystemIndex {
    candidates: HashMap<String, PathBuf>,
}

impl PotentialSubsystemIndex {
    pub fn new() -> Self {
        Self {
            candidates: HashMap::new(),
        }
    }

    /// Record a discovered candidate. On a duplicate name the first discovery
    /// wins; later ones are logged and ignored.
    pub fn insert(&mut self, name: impl Into<String>, path: PathBuf) {
        let name = name.into();
        if let Some(existing) = self.candidates.get(&name) {
            tracing::warn!(
                "Duplicate subsystem name '{}': keeping {:?}, ignoring {:?}",
                name,
                existing,
                path
            );
            return;
        }
        self.candidates.insert(name, path);
    }

    /// Resolve a declared name to its library path.
    pub fn resolve(&self, name: &str) -> Option<&Path> {
        self.candidates.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
    }
}

impl Default for PotentialSubsystemIndex {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Role Assignment Table
// ============================================================================

/// Mapping from a single role bit to the ordered list of bound instances
/// fulfilling it.
///
/// Index 0 is the *primary* implementation driven by the engine; later
/// entries are secondaries available for explicit selection. Entries are
/// keyed by the library path of the bound instance.
pub struct RoleAssignmentTable {
    assignments: HashMap<Role, Vec<PathBuf>>,
}

impl RoleAssignmentTable {
    pub fn new() -> Self {
        Self {
            assignments: HashMap::new(),
        }
    }

    /// Append an instance key to a role's ordered list. The same key is never
    /// listed twice for one role.
    pub fn assign(&mut self, role: Role, key: PathBuf) {
        let list = self.assignments.entry(role).or_default();
        if list.contains(&key) {
            tracing::warn!(
                "Instance {:?} already assigned to role {}; ignoring duplicate",
                key,
                role
            );
            return;
        }
        list.push(key);
    }

    /// The primary (index 0) instance key for a role.
    pub fn primary(&self, role: Role) -> Option<&Path> {
        self.assignments
            .get(&role)
            .and_then(|list| list.first())
            .map(PathBuf::as_path)
    }

    /// The full ordered list for a role, empty if none assigned.
    pub fn all(&self, role: Role) -> &[PathBuf] {
        self.assignments
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn clear(&mut self) {
        self.assignments.clear();
    }
}

impl Default for RoleAssignmentTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_keeps_first_candidate_on_duplicate_name() {
        let mut index = PotentialSubsystemIndex::new();
        index.insert("shell", PathBuf::from("/plugins/libshell.so"));
        index.insert("shell", PathBuf::from("/other/libshell.so"));

        assert_eq!(index.len(), 1);
        assert_eq!(
            index.resolve("shell"),
            Some(Path::new("/plugins/libshell.so"))
        );
        assert_eq!(index.resolve("renderer"), None);
    }

    #[test]
    fn assignment_order_determines_primary() {
        let mut table = RoleAssignmentTable::new();
        table.assign(Role::RENDERER, PathBuf::from("/plugins/liba.so"));
        table.assign(Role::RENDERER, PathBuf::from("/plugins/libb.so"));

        assert_eq!(
            table.primary(Role::RENDERER),
            Some(Path::new("/plugins/liba.so"))
        );
        assert_eq!(table.all(Role::RENDERER).len(), 2);
        assert!(table.all(Role::PHYSICS).is_empty());
        assert_eq!(table.primary(Role::PHYSICS), None);
    }

    #[test]
    fn duplicate_assignment_for_one_role_is_ignored() {
        let mut table = RoleAssignmentTable::new();
        table.assign(Role::INPUT, PathBuf::from("/plugins/libshell.so"));
        table.assign(Role::INPUT, PathBuf::from("/plugins/libshell.so"));

        assert_eq!(table.all(Role::INPUT).len(), 1);
    }

    #[test]
    fn clear_empties_all_tables() {
        let mut index = PotentialSubsystemIndex::new();
        index.insert("shell", PathBuf::from("/plugins/libshell.so"));
        let mut table = RoleAssignmentTable::new();
        table.assign(Role::UI, PathBuf::from("/plugins/libshell.so"));

        index.clear();
        table.clear();

        assert!(index.is_empty());
        assert!(table.is_empty());
    }
}
