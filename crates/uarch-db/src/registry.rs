//! Microarchitecture registry.
//!
//! The registry is populated in one bulk call and read-only afterwards. A
//! registry value can be passed around as a handle, or installed once as the
//! process-wide instance with [`MicroArchitectureRegistry::init_global`].
//! Duplicate ids in a catalog are a corrupt build artifact and panic.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::{MicroArchitecture, MicroArchitectureCatalog};

static GLOBAL_REGISTRY: OnceLock<MicroArchitectureRegistry> = OnceLock::new();

/// Catalog of microarchitectures and of the CPU models implementing them.
#[derive(Debug, Clone, Default)]
pub struct MicroArchitectureRegistry {
    microarchitecture_id_by_model_id: HashMap<String, String>,
    microarchitectures_by_id: HashMap<String, MicroArchitecture>,
}

impl MicroArchitectureRegistry {
    /// Builds a registry holding every entry of `catalog`.
    ///
    /// # Panics
    ///
    /// See [`MicroArchitectureRegistry::register_catalog`].
    #[must_use]
    pub fn from_catalog(catalog: &MicroArchitectureCatalog) -> Self {
        let mut registry = Self::default();
        registry.register_catalog(catalog);
        registry
    }

    /// Registers every entry of `catalog`.
    ///
    /// # Panics
    ///
    /// Panics when a microarchitecture id or a CPU model id is already
    /// registered, or when an entry is malformed (see
    /// [`MicroArchitecture::new`]).
    pub fn register_catalog(&mut self, catalog: &MicroArchitectureCatalog) {
        for definition in &catalog.microarchitectures {
            for model_id in &definition.model_ids {
                match self.microarchitecture_id_by_model_id.entry(model_id.clone()) {
                    Entry::Occupied(existing) => panic!(
                        "Duplicate CPU model '{model_id}' in microarchitectures '{}' and '{}'",
                        existing.get(),
                        definition.id
                    ),
                    Entry::Vacant(slot) => {
                        slot.insert(definition.id.clone());
                    }
                }
            }
            match self.microarchitectures_by_id.entry(definition.id.clone()) {
                Entry::Occupied(_) => {
                    panic!("Duplicate micro-architecture: {}", definition.id)
                }
                Entry::Vacant(slot) => {
                    slot.insert(MicroArchitecture::new(definition));
                }
            }
        }
        log::debug!(
            "registered {} microarchitectures covering {} CPU models",
            self.microarchitectures_by_id.len(),
            self.microarchitecture_id_by_model_id.len()
        );
    }

    /// Installs the process-wide registry built from `catalog`.
    ///
    /// # Panics
    ///
    /// Panics when the process-wide registry is already initialized, and in
    /// the cases of [`MicroArchitectureRegistry::register_catalog`].
    pub fn init_global(catalog: &MicroArchitectureCatalog) -> &'static Self {
        let mut initialized = false;
        let registry = GLOBAL_REGISTRY.get_or_init(|| {
            initialized = true;
            Self::from_catalog(catalog)
        });
        assert!(initialized, "microarchitecture registry already initialized");
        registry
    }

    /// The process-wide registry, if [`MicroArchitectureRegistry::init_global`]
    /// has run.
    #[must_use]
    pub fn global() -> Option<&'static Self> {
        GLOBAL_REGISTRY.get()
    }

    /// Looks up a microarchitecture by id.
    #[must_use]
    pub fn microarchitecture(&self, microarchitecture_id: &str) -> Option<&MicroArchitecture> {
        self.microarchitectures_by_id.get(microarchitecture_id)
    }

    /// Looks up a microarchitecture that must exist.
    ///
    /// # Panics
    ///
    /// Panics when `microarchitecture_id` is not registered.
    #[must_use]
    pub fn microarchitecture_or_panic(&self, microarchitecture_id: &str) -> &MicroArchitecture {
        self.microarchitecture(microarchitecture_id)
            .unwrap_or_else(|| panic!("Unknown microarchitecture '{microarchitecture_id}'"))
    }

    /// Id of the microarchitecture implemented by `cpu_model_id`.
    ///
    /// # Panics
    ///
    /// Panics when `cpu_model_id` is not registered.
    #[must_use]
    pub fn microarchitecture_id_for_cpu_model(&self, cpu_model_id: &str) -> &str {
        self.microarchitecture_id_by_model_id
            .get(cpu_model_id)
            .unwrap_or_else(|| panic!("Unknown CPU model '{cpu_model_id}'"))
    }

    /// Microarchitecture implemented by `cpu_model_id`.
    ///
    /// # Panics
    ///
    /// Panics when `cpu_model_id` is not registered.
    #[must_use]
    pub fn microarchitecture_for_cpu_model(&self, cpu_model_id: &str) -> &MicroArchitecture {
        self.microarchitecture_or_panic(self.microarchitecture_id_for_cpu_model(cpu_model_id))
    }

    /// Registered microarchitecture ids, sorted.
    #[must_use]
    pub fn microarchitecture_ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.microarchitectures_by_id.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered microarchitectures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.microarchitectures_by_id.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.microarchitectures_by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::MicroArchitectureRegistry;
    use crate::{MicroArchitectureCatalog, MicroArchitectureDefinition};

    fn entry(id: &str, models: &[&str]) -> MicroArchitectureDefinition {
        MicroArchitectureDefinition {
            id: id.to_owned(),
            model_ids: models.iter().map(|m| (*m).to_owned()).collect(),
            protected_modes: vec![0],
            ..MicroArchitectureDefinition::default()
        }
    }

    #[test]
    fn lookups_after_registration() {
        let registry = MicroArchitectureRegistry::from_catalog(&MicroArchitectureCatalog {
            microarchitectures: vec![entry("hsw", &["intel:06_3C"]), entry("skl", &[])],
        });
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.microarchitecture_ids(), ["hsw", "skl"]);
        assert_eq!(registry.microarchitecture_id_for_cpu_model("intel:06_3C"), "hsw");
        assert_eq!(registry.microarchitecture("skl").map(|m| m.id()), Some("skl"));
        assert!(registry.microarchitecture("bdw").is_none());
    }

    #[test]
    #[should_panic(expected = "Unknown CPU model 'intel:06_FF'")]
    fn unknown_model_is_fatal() {
        let registry = MicroArchitectureRegistry::default();
        let _ = registry.microarchitecture_id_for_cpu_model("intel:06_FF");
    }

    #[test]
    #[should_panic(expected = "Unknown microarchitecture 'bdw'")]
    fn required_microarchitecture_is_fatal_when_absent() {
        let _ = MicroArchitectureRegistry::default().microarchitecture_or_panic("bdw");
    }
}
