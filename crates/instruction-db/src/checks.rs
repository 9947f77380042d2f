//! Consistency checks between raw encodings and structured encoding fields.
//!
//! Checks are transforms that never mutate the database. Each one visits
//! every instruction, logs each offending instruction, and returns the first
//! failure, unless run with [`CheckPolicy::FailFast`].

use crate::encoding::RawEncoding;
use crate::{Error, InstructionRef, InstructionSet, InstructionSpecification};

/// Values of `opcode & 0xFFFF_FF00` that denote a known opcode map.
pub const VALID_OPCODE_UPPER_BYTES: &[u32] = &[0x0000_0000, 0x0000_0F00, 0x000F_3800, 0x000F_3A00];

/// How a check reacts to an offending instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CheckPolicy {
    /// Visit every instruction and report the first failure.
    #[default]
    Aggregate,
    /// Stop at the first failure.
    FailFast,
}

fn check_each(
    instruction_set: &InstructionSet,
    policy: CheckPolicy,
    check: impl Fn(&InstructionSpecification) -> Result<(), Error>,
) -> Result<(), Error> {
    let mut first_error = None;
    for instruction in instruction_set {
        if let Err(error) = check(instruction) {
            log::error!("{error}");
            if policy == CheckPolicy::FailFast {
                return Err(error);
            }
            first_error.get_or_insert(error);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Checks the structured opcode of one instruction against its raw encoding.
///
/// The bits above the opcode byte must select a known opcode map, and the
/// whole value must equal the map escape bytes followed by the opcode byte
/// of the raw encoding.
///
/// # Errors
///
/// Returns [`Error::InvalidOpcodeUpperBytes`] when the upper bytes are not a
/// known map, [`Error::MissingOpcodeByte`] when the raw encoding has no
/// opcode byte, and [`Error::OpcodeMismatch`] when the values differ.
pub fn check_instruction_opcode(instruction: &InstructionSpecification) -> Result<(), Error> {
    let opcode = instruction.encoding.opcode;
    let upper_bytes = opcode & 0xFFFF_FF00;
    if !VALID_OPCODE_UPPER_BYTES.contains(&upper_bytes) {
        return Err(Error::InvalidOpcodeUpperBytes {
            upper_bytes,
            instruction: instruction.into(),
        });
    }
    let expected = RawEncoding::parse(&instruction.raw_encoding_specification)
        .opcode()
        .ok_or_else(|| Error::MissingOpcodeByte {
            instruction: instruction.into(),
        })?;
    if expected != opcode {
        return Err(Error::OpcodeMismatch {
            opcode,
            expected,
            instruction: instruction.into(),
        });
    }
    Ok(())
}

/// Runs [`check_instruction_opcode`] over the database with `policy`.
///
/// # Errors
///
/// Returns the first failure of [`check_instruction_opcode`].
pub fn check_opcode_format_with_policy(
    instruction_set: &InstructionSet,
    policy: CheckPolicy,
) -> Result<(), Error> {
    check_each(instruction_set, policy, check_instruction_opcode)
}

/// Transform form of the opcode check, aggregating over the database.
///
/// # Errors
///
/// Returns the first failure of [`check_instruction_opcode`].
pub fn check_opcode_format(instruction_set: &mut InstructionSet) -> Result<(), Error> {
    check_opcode_format_with_policy(instruction_set, CheckPolicy::Aggregate)
}

/// Checks that the ModRM usage agrees with the `/r` or `/digit` marker.
///
/// # Errors
///
/// Returns [`Error::ModRmUsageMismatch`] for the first offending instruction.
pub fn check_modrm_usage(instruction_set: &mut InstructionSet) -> Result<(), Error> {
    check_each(instruction_set, CheckPolicy::Aggregate, |instruction| {
        let expected = RawEncoding::parse(&instruction.raw_encoding_specification).modrm_usage();
        let actual = instruction.encoding.modrm_usage;
        if actual == expected {
            Ok(())
        } else {
            Err(Error::ModRmUsageMismatch {
                actual,
                expected,
                instruction: InstructionRef::from(instruction),
            })
        }
    })
}

/// Checks that the immediate byte count agrees with the immediate markers.
///
/// # Errors
///
/// Returns [`Error::ImmediateBytesMismatch`] for the first offending
/// instruction.
pub fn check_immediate_value_bytes(instruction_set: &mut InstructionSet) -> Result<(), Error> {
    check_each(instruction_set, CheckPolicy::Aggregate, |instruction| {
        let expected =
            RawEncoding::parse(&instruction.raw_encoding_specification).immediate_value_bytes;
        let actual = instruction.encoding.immediate_value_bytes;
        if actual == expected {
            Ok(())
        } else {
            Err(Error::ImmediateBytesMismatch {
                actual,
                expected,
                instruction: InstructionRef::from(instruction),
            })
        }
    })
}

/// Checks that every instruction has a mnemonic.
///
/// # Errors
///
/// Returns [`Error::MissingMnemonic`] for the first offending instruction.
pub fn check_has_vendor_syntax(instruction_set: &mut InstructionSet) -> Result<(), Error> {
    check_each(instruction_set, CheckPolicy::Aggregate, |instruction| {
        if instruction.mnemonic.trim().is_empty() {
            Err(Error::MissingMnemonic {
                raw_encoding_specification: instruction.raw_encoding_specification.clone(),
            })
        } else {
            Ok(())
        }
    })
}
