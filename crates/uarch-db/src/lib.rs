//! Microarchitecture registry and binding of itinerary tables to the
//! instruction database.

/// Execution port masks.
pub mod port_mask;
pub use port_mask::{PortMask, MAX_PORTS};

/// Microarchitecture catalog entries and values.
pub mod microarchitecture;
pub use microarchitecture::{
    MicroArchitecture, MicroArchitectureCatalog, MicroArchitectureDefinition, ProtectionModes,
};

/// Process-wide microarchitecture registry.
pub mod registry;
pub use registry::MicroArchitectureRegistry;

/// Architecture data and itinerary tables.
pub mod architecture;
pub use architecture::{Architecture, InstructionSetItineraries, Itinerary, MicroOperation};

/// Binder errors.
pub mod error;
pub use error::Error;

/// Architecture data bound to one microarchitecture.
pub mod data;
pub use data::MicroArchitectureData;

#[cfg(test)]
use env_logger as _;
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use serde_json as _;
