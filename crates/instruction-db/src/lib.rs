//! Instruction database model, encoding checks, and the ordered transform
//! pipeline that normalizes raw instruction records.

/// Instruction record model.
pub mod model;
pub use model::{
    EncodingSpecification, InstructionSet, InstructionSpecification, LegacyPrefixes, MapSelect,
    ModRmUsage, Operand, OperandInOpcode, VectorSize, VexPrefix, VexPrefixType, VexWUsage,
    UNRESTRICTED_PROTECTION_MODE,
};

/// Recoverable error taxonomy.
pub mod error;
pub use error::{Error, ErrorKind, InstructionRef, PipelineError};

/// Raw encoding specification parsing.
pub mod encoding;
pub use encoding::{ModRmMarker, RawEncoding};

/// Consistency checks between raw and structured encodings.
pub mod checks;
pub use checks::{
    check_has_vendor_syntax, check_immediate_value_bytes, check_instruction_opcode,
    check_modrm_usage, check_opcode_format, check_opcode_format_with_policy, CheckPolicy,
    VALID_OPCODE_UPPER_BYTES,
};

/// Missing-feature and protection-mode annotation transforms.
pub mod cleanup;
pub use cleanup::{
    add_missing_cpu_flags, add_protection_modes, missing_cpu_flag, protection_mode_for,
    MISSING_CPU_FLAGS, PROTECTION_MODES_BY_ENCODING, PROTECTION_MODES_BY_MNEMONIC,
};

/// Transform registry and pipeline runner.
pub mod transform;
pub use transform::{
    default_registry, default_transforms, run_transform_pipeline, PipelineConfig, Transform,
    TransformFn, TransformRegistry, CHECK_PRIORITY, CLEANUP_PRIORITY,
};

#[cfg(test)]
use env_logger as _;
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
