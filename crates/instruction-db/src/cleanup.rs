//! Cleanup transforms that annotate instructions the vendor data leaves
//! incomplete: missing CPUID features and privilege requirements.

use crate::{Error, InstructionSet, UNRESTRICTED_PROTECTION_MODE};

/// Features the vendor manual omits, keyed by mnemonic.
pub const MISSING_CPU_FLAGS: &[(&str, &str)] = &[
    ("CLFLUSH", "CLFSH"),
    ("CLFLUSHOPT", "CLFLUSHOPT"),
    ("MOVBE", "MOVBE"),
];

/// Minimum privilege level of privileged instructions, keyed by mnemonic.
///
/// I/O instructions assume the worst case `IOPL == 0`. Instructions that
/// run in SMM are treated as requiring CPL 0.
pub const PROTECTION_MODES_BY_MNEMONIC: &[(&str, i32)] = &[
    // Restricted operations.
    ("CLAC", 0),
    ("CLI", 0),
    ("CLTS", 0),
    ("HLT", 0),
    ("INVD", 0),
    ("INVPCID", 0),
    ("LGDT", 0),
    ("LIDT", 0),
    ("LLDT", 0),
    ("LMSW", 0),
    ("LTR", 0),
    ("MWAIT", 0),
    // IA32_KERNEL_GS_BASE is only reachable through RDMSR/WRMSR at CPL 0.
    ("RDMSR", 0),
    ("RDPMC", 0),
    ("STAC", 0),
    ("STD", 0),
    ("STI", 0),
    ("SWAPGR", 0),
    ("SWAPGS", 0),
    ("WBINVD", 0),
    ("WRMSR", 0),
    ("XRSTORS", 0),
    ("XRSTORS64", 0),
    // Input/output.
    ("IN", 0),
    ("INS", 0),
    ("INSB", 0),
    ("INSW", 0),
    ("INSD", 0),
    ("OUT", 0),
    ("OUTS", 0),
    ("OUTSB", 0),
    ("OUTSD", 0),
    ("OUTSW", 0),
    // SMM.
    ("RSM", 0),
];

/// Privileged encodings not covered by [`PROTECTION_MODES_BY_MNEMONIC`],
/// keyed by the exact raw encoding specification.
pub const PROTECTION_MODES_BY_ENCODING: &[(&str, i32)] = &[
    // MOV from/to debug registers.
    ("0F 21/r", 0),
    ("0F 23 /r", 0),
    // MOV from/to control registers.
    ("0F 20/r", 0),
    ("0F 22 /r", 0),
];

fn lookup<T: Copy>(table: &[(&'static str, T)], key: &str) -> Option<T> {
    table
        .iter()
        .find_map(|(entry_key, value)| (*entry_key == key).then_some(*value))
}

/// Returns the feature that the vendor data omits for `mnemonic`.
#[must_use]
pub fn missing_cpu_flag(mnemonic: &str) -> Option<&'static str> {
    lookup(MISSING_CPU_FLAGS, mnemonic)
}

/// Returns the privilege level required by an instruction, looking up the
/// mnemonic first and the raw encoding second.
#[must_use]
pub fn protection_mode_for(mnemonic: &str, raw_encoding_specification: &str) -> Option<i32> {
    lookup(PROTECTION_MODES_BY_MNEMONIC, mnemonic)
        .or_else(|| lookup(PROTECTION_MODES_BY_ENCODING, raw_encoding_specification))
}

/// Sets the feature name of instructions listed in [`MISSING_CPU_FLAGS`].
///
/// # Errors
///
/// Never fails; the signature matches the transform contract.
///
/// # Panics
///
/// Panics when an instruction already carries the feature from the table.
/// The entry is stale and must be removed from [`MISSING_CPU_FLAGS`].
pub fn add_missing_cpu_flags(instruction_set: &mut InstructionSet) -> Result<(), Error> {
    for instruction in instruction_set {
        if let Some(feature_name) = missing_cpu_flag(&instruction.mnemonic) {
            assert_ne!(
                instruction.feature_name.as_deref(),
                Some(feature_name),
                "stale missing CPU flag entry for {}",
                instruction.mnemonic
            );
            instruction.feature_name = Some(feature_name.to_owned());
        }
    }
    Ok(())
}

/// Sets the protection mode of every instruction, overwriting prior values.
///
/// Instructions found in neither table become
/// [`UNRESTRICTED_PROTECTION_MODE`].
///
/// # Errors
///
/// Never fails; the signature matches the transform contract.
pub fn add_protection_modes(instruction_set: &mut InstructionSet) -> Result<(), Error> {
    let mut privileged = 0_usize;
    for instruction in instruction_set {
        instruction.protection_mode =
            protection_mode_for(&instruction.mnemonic, &instruction.raw_encoding_specification)
                .unwrap_or(UNRESTRICTED_PROTECTION_MODE);
        if instruction.is_privileged() {
            privileged += 1;
        }
    }
    log::debug!("{privileged} privileged instructions");
    Ok(())
}
