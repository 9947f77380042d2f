//! Instruction-set-wide architecture data: the instruction database and
//! one itinerary table per microarchitecture.
//!
//! Itinerary contents are produced elsewhere; this crate only relies on
//! their alignment with the instruction database.

use instruction_db::InstructionSet;

use crate::PortMask;

/// A micro-operation of an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct MicroOperation {
    /// Ports the micro-operation may issue to.
    pub port_mask: PortMask,
    /// Latency in cycles.
    pub latency: u32,
    /// Indices of the micro-operations of the same itinerary it depends on.
    pub dependencies: Vec<usize>,
}

/// Timing and resource usage of one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct Itinerary {
    /// Micro-operations issued by the instruction.
    pub micro_ops: Vec<MicroOperation>,
}

/// Itinerary table of one microarchitecture.
///
/// Entry `i` describes instruction `i` of the architecture's instruction set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionSetItineraries {
    /// Microarchitecture the table belongs to.
    pub microarchitecture_id: String,
    /// One itinerary per instruction, in instruction order.
    pub itineraries: Vec<Itinerary>,
}

/// Instruction database plus every microarchitecture's itinerary table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Architecture {
    /// Validated instruction database.
    pub instruction_set: InstructionSet,
    /// Itinerary tables, at most one per microarchitecture.
    pub per_microarchitecture_itineraries: Vec<InstructionSetItineraries>,
}

impl Architecture {
    /// Position of the itinerary table of `microarchitecture_id` in
    /// `per_microarchitecture_itineraries`, if any.
    #[must_use]
    pub fn itineraries_index(&self, microarchitecture_id: &str) -> Option<usize> {
        self.per_microarchitecture_itineraries
            .iter()
            .position(|itineraries| itineraries.microarchitecture_id == microarchitecture_id)
    }

    /// Itinerary table of `microarchitecture_id`, if any.
    #[must_use]
    pub fn itineraries_for(&self, microarchitecture_id: &str) -> Option<&InstructionSetItineraries> {
        self.itineraries_index(microarchitecture_id)
            .map(|index| &self.per_microarchitecture_itineraries[index])
    }
}
