//! Microarchitecture definitions and the immutable value built from them.

use crate::PortMask;

/// One entry of a microarchitecture catalog, as supplied by the catalog
/// loader.
///
/// Port mask indices are 1-based into `port_masks`; zero or a negative value
/// means the slot does not apply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct MicroArchitectureDefinition {
    /// Unique microarchitecture id (`skl`, `hsw`).
    pub id: String,
    /// CPU models implementing this microarchitecture.
    pub model_ids: Vec<String>,
    /// Port masks referenced by the slot indices and itineraries.
    pub port_masks: Vec<PortMask>,
    /// Slot of the load/store address generation ports.
    pub load_store_address_generation_port_mask_index: i32,
    /// Slot of the store address generation ports.
    pub store_address_generation_port_mask_index: i32,
    /// Slot of the store data ports.
    pub store_data_port_mask_index: i32,
    /// Privilege levels that count as protected.
    pub protected_modes: Vec<i32>,
    /// Privilege levels that count as user modes.
    pub user_modes: Vec<i32>,
}

/// Catalog of microarchitectures registered at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MicroArchitectureCatalog {
    /// Catalog entries.
    pub microarchitectures: Vec<MicroArchitectureDefinition>,
}

/// Which privilege levels are protected.
///
/// Exactly one of the two lists is given by a definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProtectionModes {
    /// The listed levels are protected; every other level is a user mode.
    Protected(Vec<i32>),
    /// The listed levels are user modes; every other level is protected.
    User(Vec<i32>),
}

impl ProtectionModes {
    /// Builds the configuration from the two lists of a definition.
    ///
    /// # Panics
    ///
    /// Panics when both lists or neither list is populated.
    #[must_use]
    pub fn from_lists(protected_modes: &[i32], user_modes: &[i32]) -> Self {
        match (protected_modes.is_empty(), user_modes.is_empty()) {
            (false, true) => Self::Protected(protected_modes.to_vec()),
            (true, false) => Self::User(user_modes.to_vec()),
            _ => panic!(
                "exactly one of protected modes {protected_modes:?} and user modes {user_modes:?} must be set"
            ),
        }
    }

    /// Returns `true` when `protection_mode` is a protected level.
    #[must_use]
    pub fn is_protected_mode(&self, protection_mode: i32) -> bool {
        match self {
            Self::Protected(modes) => modes.contains(&protection_mode),
            Self::User(modes) => !modes.contains(&protection_mode),
        }
    }
}

/// A microarchitecture. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroArchitecture {
    id: String,
    model_ids: Vec<String>,
    port_masks: Vec<PortMask>,
    load_store_address_generation: Option<usize>,
    store_address_generation: Option<usize>,
    store_data: Option<usize>,
    protection_modes: ProtectionModes,
}

impl MicroArchitecture {
    /// Builds a microarchitecture from its catalog entry.
    ///
    /// # Panics
    ///
    /// Panics when the protected/user mode lists are both or neither set, or
    /// when a port mask slot points past `port_masks`.
    #[must_use]
    pub fn new(definition: &MicroArchitectureDefinition) -> Self {
        let slot = |name: &str, index: i32| -> Option<usize> {
            let position = usize::try_from(index).ok()?.checked_sub(1)?;
            assert!(
                position < definition.port_masks.len(),
                "{name} port mask index {index} out of range for microarchitecture '{}'",
                definition.id
            );
            Some(position)
        };
        Self {
            id: definition.id.clone(),
            model_ids: definition.model_ids.clone(),
            port_masks: definition.port_masks.clone(),
            load_store_address_generation: slot(
                "load/store address generation",
                definition.load_store_address_generation_port_mask_index,
            ),
            store_address_generation: slot(
                "store address generation",
                definition.store_address_generation_port_mask_index,
            ),
            store_data: slot("store data", definition.store_data_port_mask_index),
            protection_modes: ProtectionModes::from_lists(
                &definition.protected_modes,
                &definition.user_modes,
            ),
        }
    }

    /// Unique id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// CPU models implementing this microarchitecture.
    #[must_use]
    pub fn model_ids(&self) -> &[String] {
        &self.model_ids
    }

    /// All port masks, in catalog order.
    #[must_use]
    pub fn port_masks(&self) -> &[PortMask] {
        &self.port_masks
    }

    /// Ports generating load and store addresses.
    #[must_use]
    pub fn load_store_address_generation(&self) -> Option<&PortMask> {
        self.port_mask_at(self.load_store_address_generation)
    }

    /// Ports generating store addresses.
    #[must_use]
    pub fn store_address_generation(&self) -> Option<&PortMask> {
        self.port_mask_at(self.store_address_generation)
    }

    /// Ports writing store data.
    #[must_use]
    pub fn store_data(&self) -> Option<&PortMask> {
        self.port_mask_at(self.store_data)
    }

    fn port_mask_at(&self, position: Option<usize>) -> Option<&PortMask> {
        position.and_then(|position| self.port_masks.get(position))
    }

    /// Protected-mode configuration.
    #[must_use]
    pub const fn protection_modes(&self) -> &ProtectionModes {
        &self.protection_modes
    }

    /// Returns `true` when an instruction with `protection_mode` requires a
    /// protected level on this microarchitecture.
    #[must_use]
    pub fn is_protected_mode(&self, protection_mode: i32) -> bool {
        self.protection_modes.is_protected_mode(protection_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::{MicroArchitecture, MicroArchitectureDefinition, ProtectionModes};
    use crate::PortMask;

    fn definition() -> MicroArchitectureDefinition {
        MicroArchitectureDefinition {
            id: "skl".to_owned(),
            model_ids: vec!["intel:06_4E".to_owned(), "intel:06_5E".to_owned()],
            port_masks: vec![
                PortMask::from_ports([2, 3]),
                PortMask::from_ports([2, 3, 7]),
                PortMask::from_ports([4]),
            ],
            load_store_address_generation_port_mask_index: 1,
            store_address_generation_port_mask_index: 2,
            store_data_port_mask_index: 3,
            protected_modes: vec![0, 1, 2],
            user_modes: vec![],
        }
    }

    #[test]
    fn slots_resolve_one_based_indices() {
        let microarchitecture = MicroArchitecture::new(&definition());
        assert_eq!(
            microarchitecture.load_store_address_generation(),
            Some(&PortMask::from_ports([2, 3]))
        );
        assert_eq!(
            microarchitecture.store_address_generation(),
            Some(&PortMask::from_ports([2, 3, 7]))
        );
        assert_eq!(microarchitecture.store_data(), Some(&PortMask::from_ports([4])));
    }

    #[test]
    fn non_positive_slot_is_not_applicable() {
        let mut definition = definition();
        definition.store_data_port_mask_index = 0;
        definition.store_address_generation_port_mask_index = -3;
        let microarchitecture = MicroArchitecture::new(&definition);
        assert_eq!(microarchitecture.store_data(), None);
        assert_eq!(microarchitecture.store_address_generation(), None);
    }

    #[test]
    #[should_panic(expected = "store data port mask index 4 out of range")]
    fn slot_past_port_masks_is_fatal() {
        let mut definition = definition();
        definition.store_data_port_mask_index = 4;
        let _ = MicroArchitecture::new(&definition);
    }

    #[test]
    fn protected_list_marks_listed_levels() {
        let microarchitecture = MicroArchitecture::new(&definition());
        assert!(microarchitecture.is_protected_mode(0));
        assert!(microarchitecture.is_protected_mode(2));
        assert!(!microarchitecture.is_protected_mode(3));
        assert!(!microarchitecture.is_protected_mode(-1));
    }

    #[test]
    fn user_list_marks_every_other_level() {
        let modes = ProtectionModes::from_lists(&[], &[3]);
        assert!(!modes.is_protected_mode(3));
        assert!(modes.is_protected_mode(0));
        assert!(modes.is_protected_mode(-1));
    }

    #[test]
    #[should_panic(expected = "exactly one of protected modes")]
    fn both_lists_are_fatal() {
        let _ = ProtectionModes::from_lists(&[0], &[3]);
    }

    #[test]
    #[should_panic(expected = "exactly one of protected modes")]
    fn neither_list_is_fatal() {
        let mut definition = definition();
        definition.protected_modes.clear();
        let _ = MicroArchitecture::new(&definition);
    }
}
