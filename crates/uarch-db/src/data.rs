//! Binding of architecture data to one microarchitecture.

use std::sync::Arc;

use instruction_db::{InstructionSet, InstructionSpecification};

use crate::{
    Architecture, Error, InstructionSetItineraries, Itinerary, MicroArchitecture,
    MicroArchitectureRegistry,
};

/// Architecture data seen through one microarchitecture.
///
/// The architecture is shared; several bindings for different
/// microarchitectures can hold the same [`Arc`]. The itinerary table always
/// has one entry per instruction.
#[derive(Debug, Clone)]
pub struct MicroArchitectureData<'a> {
    architecture: Arc<Architecture>,
    microarchitecture: &'a MicroArchitecture,
    itineraries_index: usize,
}

impl<'a> MicroArchitectureData<'a> {
    /// Binds `architecture` to the microarchitecture registered as
    /// `microarchitecture_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMicroArchitecture`] when the id is not in
    /// `registry`, and the errors of [`MicroArchitectureData::create`].
    ///
    /// # Panics
    ///
    /// See [`MicroArchitectureData::create`].
    pub fn for_microarchitecture_id(
        registry: &'a MicroArchitectureRegistry,
        architecture: Arc<Architecture>,
        microarchitecture_id: &str,
    ) -> Result<Self, Error> {
        let microarchitecture = registry
            .microarchitecture(microarchitecture_id)
            .ok_or_else(|| Error::UnknownMicroArchitecture(microarchitecture_id.to_owned()))?;
        Self::create(architecture, microarchitecture)
    }

    /// Binds `architecture` to `microarchitecture`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingItineraries`] when `architecture` has no
    /// itinerary table for the microarchitecture.
    ///
    /// # Panics
    ///
    /// Panics when the itinerary table length differs from the number of
    /// instructions.
    pub fn create(
        architecture: Arc<Architecture>,
        microarchitecture: &'a MicroArchitecture,
    ) -> Result<Self, Error> {
        let itineraries_index = architecture
            .itineraries_index(microarchitecture.id())
            .ok_or_else(|| Error::MissingItineraries(microarchitecture.id().to_owned()))?;
        let itinerary_count =
            architecture.per_microarchitecture_itineraries[itineraries_index].itineraries.len();
        let instruction_count = architecture.instruction_set.len();
        assert_eq!(
            itinerary_count,
            instruction_count,
            "itinerary count mismatch for microarchitecture '{}'",
            microarchitecture.id()
        );
        log::debug!(
            "bound {instruction_count} instructions to microarchitecture '{}'",
            microarchitecture.id()
        );
        Ok(Self {
            architecture,
            microarchitecture,
            itineraries_index,
        })
    }

    /// The shared architecture.
    #[must_use]
    pub const fn architecture(&self) -> &Arc<Architecture> {
        &self.architecture
    }

    /// The instruction database.
    #[must_use]
    pub fn instruction_set(&self) -> &InstructionSet {
        &self.architecture.instruction_set
    }

    /// The bound microarchitecture.
    #[must_use]
    pub const fn microarchitecture(&self) -> &'a MicroArchitecture {
        self.microarchitecture
    }

    /// Itinerary table of the bound microarchitecture.
    #[must_use]
    pub fn itineraries(&self) -> &InstructionSetItineraries {
        &self.architecture.per_microarchitecture_itineraries[self.itineraries_index]
    }

    /// Itinerary of instruction `index`.
    #[must_use]
    pub fn itinerary(&self, index: usize) -> Option<&Itinerary> {
        self.itineraries().itineraries.get(index)
    }

    /// Instructions paired with their itineraries, in database order.
    pub fn iter(&self) -> impl Iterator<Item = (&InstructionSpecification, &Itinerary)> {
        self.instruction_set()
            .iter()
            .zip(self.itineraries().itineraries.iter())
    }
}
