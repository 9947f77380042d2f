//! Recoverable error taxonomy for checks, transforms, and the pipeline.
//!
//! Broken invariants of static tables and catalogs are not represented here;
//! they panic.

use std::fmt;

use thiserror::Error;

use crate::{InstructionSpecification, ModRmUsage};

/// Broad classification of a recoverable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input data or a caller-supplied argument is invalid.
    InvalidArgument,
}

/// Identifies an instruction in error messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstructionRef {
    /// Vendor mnemonic.
    pub mnemonic: String,
    /// Raw encoding specification.
    pub raw_encoding_specification: String,
}

impl From<&InstructionSpecification> for InstructionRef {
    fn from(instruction: &InstructionSpecification) -> Self {
        Self {
            mnemonic: instruction.mnemonic.clone(),
            raw_encoding_specification: instruction.raw_encoding_specification.clone(),
        }
    }
}

impl fmt::Display for InstructionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.mnemonic, self.raw_encoding_specification)
    }
}

/// Errors reported by checks and transforms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bits above the opcode byte do not form a known opcode map.
    #[error("Invalid opcode upper bytes: {upper_bytes:x} in {instruction}")]
    InvalidOpcodeUpperBytes {
        /// `opcode & 0xFFFF_FF00`.
        upper_bytes: u32,
        /// Offending instruction.
        instruction: InstructionRef,
    },
    /// The structured opcode differs from the bytes of the raw encoding.
    #[error("Opcode {opcode:x} does not match encoding specification (expected {expected:x}) in {instruction}")]
    OpcodeMismatch {
        /// Structured opcode value.
        opcode: u32,
        /// Opcode recovered from the raw encoding.
        expected: u32,
        /// Offending instruction.
        instruction: InstructionRef,
    },
    /// The raw encoding has no opcode byte.
    #[error("No opcode byte in encoding specification of {instruction}")]
    MissingOpcodeByte {
        /// Offending instruction.
        instruction: InstructionRef,
    },
    /// The ModRM usage differs from the ModRM marker of the raw encoding.
    #[error("ModRM usage {actual:?} does not match encoding specification (expected {expected:?}) in {instruction}")]
    ModRmUsageMismatch {
        /// Structured ModRM usage.
        actual: ModRmUsage,
        /// ModRM usage implied by the raw encoding.
        expected: ModRmUsage,
        /// Offending instruction.
        instruction: InstructionRef,
    },
    /// The immediate byte count differs from the immediate markers.
    #[error("Immediate value bytes {actual} do not match encoding specification (expected {expected}) in {instruction}")]
    ImmediateBytesMismatch {
        /// Structured immediate byte count.
        actual: u8,
        /// Byte count implied by the raw encoding.
        expected: u8,
        /// Offending instruction.
        instruction: InstructionRef,
    },
    /// The instruction has an empty mnemonic.
    #[error("Instruction without mnemonic: \"{raw_encoding_specification}\"")]
    MissingMnemonic {
        /// Raw encoding of the offending instruction.
        raw_encoding_specification: String,
    },
    /// A pipeline configuration names a transform that is not registered.
    #[error("Unknown transform '{0}'")]
    UnknownTransform(String),
}

impl Error {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOpcodeUpperBytes { .. }
            | Self::OpcodeMismatch { .. }
            | Self::MissingOpcodeByte { .. }
            | Self::ModRmUsageMismatch { .. }
            | Self::ImmediateBytesMismatch { .. }
            | Self::MissingMnemonic { .. }
            | Self::UnknownTransform(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// Failure of a transform pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The pipeline configuration was rejected before any transform ran.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(#[source] Error),
    /// A transform reported a failure. Earlier mutations are not rolled back.
    #[error("transform '{transform}' failed: {source}")]
    TransformFailed {
        /// Name of the failing transform.
        transform: &'static str,
        /// Error reported by the transform.
        #[source]
        source: Error,
    },
}

impl PipelineError {
    /// Returns the classification of the underlying error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(source) | Self::TransformFailed { source, .. } => source.kind(),
        }
    }

    /// Name of the failing transform, when a transform failed.
    #[must_use]
    pub const fn transform(&self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig(_) => None,
            Self::TransformFailed { transform, .. } => Some(transform),
        }
    }

    /// The underlying error.
    #[must_use]
    pub const fn error(&self) -> &Error {
        match self {
            Self::InvalidConfig(source) | Self::TransformFailed { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, InstructionRef, PipelineError};
    use crate::InstructionSpecification;

    #[test]
    fn upper_bytes_message_uses_unpadded_lowercase_hex() {
        let error = Error::InvalidOpcodeUpperBytes {
            upper_bytes: 0xD800,
            instruction: InstructionRef::from(&InstructionSpecification::new("FSUB", "D8 E0+i")),
        };
        assert_eq!(
            error.to_string(),
            "Invalid opcode upper bytes: d800 in FSUB \"D8 E0+i\""
        );
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn pipeline_error_names_failing_transform() {
        let error = PipelineError::TransformFailed {
            transform: "check_opcode_format",
            source: Error::UnknownTransform("x".to_owned()),
        };
        assert_eq!(error.transform(), Some("check_opcode_format"));
        assert!(error.to_string().starts_with("transform 'check_opcode_format' failed"));
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }
}
