//! Recoverable errors of the microarchitecture data binder.

use instruction_db::ErrorKind;
use thiserror::Error;

/// Errors returned when binding architecture data to a microarchitecture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The id is not in the registry.
    #[error("Unknown microarchitecture '{0}'")]
    UnknownMicroArchitecture(String),
    /// The architecture has no itinerary table for the microarchitecture.
    #[error("No itineraries for microarchitecture '{0}'")]
    MissingItineraries(String),
}

impl Error {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownMicroArchitecture(_) | Self::MissingItineraries(_) => {
                ErrorKind::InvalidArgument
            }
        }
    }
}
