//! Instruction record model.
//!
//! These types carry no behavior beyond small accessors. Transforms mutate
//! them in place; nothing in this crate removes an instruction once it is in
//! an [`InstructionSet`].

/// Protection mode of an instruction that any privilege level may execute.
pub const UNRESTRICTED_PROTECTION_MODE: i32 = -1;

/// A single operand of an instruction in vendor syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Operand {
    /// Operand name as written in the vendor manual (`xmm1`, `imm8`, ...).
    pub name: String,
}

impl Operand {
    /// Creates an operand with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// How the instruction uses the ModRM byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ModRmUsage {
    /// No ModRM byte.
    #[default]
    NoModRm,
    /// Both `reg` and `rm` fields encode operands (`/r`).
    FullModRm,
    /// The `reg` field is an opcode extension (`/0` .. `/7`).
    OpcodeExtensionInModRm,
}

/// Operand encoded in the low bits of the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum OperandInOpcode {
    /// The opcode carries no operand.
    #[default]
    None,
    /// A general purpose register (`+rb`, `+rw`, `+rd`, `+ro`).
    GeneralPurposeRegister,
    /// An x87 stack register (`+i`).
    FpStackRegister,
}

/// Mandatory legacy prefixes of the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct LegacyPrefixes {
    /// `66` is part of the opcode.
    pub has_mandatory_operand_size_override_prefix: bool,
    /// `F3` is part of the opcode.
    pub has_mandatory_repe_prefix: bool,
    /// `F2` is part of the opcode.
    pub has_mandatory_repne_prefix: bool,
    /// `REX.W` is required.
    pub has_rex_w_prefix: bool,
}

/// Encoding scheme of a VEX-like prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum VexPrefixType {
    /// Two- or three-byte VEX prefix.
    #[default]
    Vex,
    /// Four-byte EVEX prefix.
    Evex,
    /// AMD XOP prefix.
    Xop,
}

/// Opcode map selected by the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MapSelect {
    /// Two-byte opcode map (`0F`).
    #[default]
    Map0F,
    /// Three-byte opcode map (`0F 38`).
    Map0F38,
    /// Three-byte opcode map (`0F 3A`).
    Map0F3A,
}

impl MapSelect {
    /// Escape bytes that select this map, as they appear in the opcode value.
    #[must_use]
    pub const fn escape_bytes(self) -> u32 {
        match self {
            Self::Map0F => 0x0F,
            Self::Map0F38 => 0x0F38,
            Self::Map0F3A => 0x0F3A,
        }
    }

    /// Parses the map field of a VEX/EVEX prefix token (`0F`, `0F38`, `0F3A`).
    #[must_use]
    pub fn from_prefix_field(field: &str) -> Option<Self> {
        match field {
            "0F" => Some(Self::Map0F),
            "0F38" => Some(Self::Map0F38),
            "0F3A" => Some(Self::Map0F3A),
            _ => None,
        }
    }
}

/// Vector length encoded in `VEX.L` / `EVEX.L'L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum VectorSize {
    /// The bit is ignored (`LIG`).
    #[default]
    Ignored,
    /// The bit must be zero (`L0`, `LZ`).
    BitIsZero,
    /// The bit must be one (`L1`).
    BitIsOne,
    /// 128-bit vectors.
    Bits128,
    /// 256-bit vectors.
    Bits256,
    /// 512-bit vectors.
    Bits512,
}

/// Usage of the `W` bit in a VEX-like prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum VexWUsage {
    /// `WIG`.
    #[default]
    Ignored,
    /// `W0`.
    IsZero,
    /// `W1`.
    IsOne,
}

/// Structured view of a VEX, EVEX, or XOP prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct VexPrefix {
    /// Prefix encoding scheme.
    pub prefix_type: VexPrefixType,
    /// Opcode map selected by the prefix.
    pub map_select: MapSelect,
    /// Vector length.
    pub vector_size: VectorSize,
    /// `W` bit usage.
    pub w_usage: VexWUsage,
}

/// Structured encoding descriptor of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct EncodingSpecification {
    /// Opcode map escape bytes followed by the opcode byte (`0x0F3820`).
    pub opcode: u32,
    /// Operand encoded in the opcode byte, if any.
    pub operand_in_opcode: OperandInOpcode,
    /// ModRM byte usage.
    pub modrm_usage: ModRmUsage,
    /// Mandatory legacy prefixes.
    pub legacy_prefixes: LegacyPrefixes,
    /// VEX-like prefix, when the instruction uses one.
    pub vex_prefix: Option<VexPrefix>,
    /// Number of bytes of immediate values and code offsets.
    pub immediate_value_bytes: u8,
}

/// One encoding variant of an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct InstructionSpecification {
    /// Vendor mnemonic (`ADC`, `VFMSUB231PS`).
    pub mnemonic: String,
    /// Operands in vendor order.
    pub operands: Vec<Operand>,
    /// Encoding as written in the vendor manual (`"66 0F 38 20 /r"`).
    pub raw_encoding_specification: String,
    /// Structured encoding fields.
    pub encoding: EncodingSpecification,
    /// CPUID feature required to execute the instruction.
    pub feature_name: Option<String>,
    /// Minimum privilege level, or [`UNRESTRICTED_PROTECTION_MODE`].
    pub protection_mode: i32,
}

impl Default for InstructionSpecification {
    fn default() -> Self {
        Self {
            mnemonic: String::new(),
            operands: Vec::new(),
            raw_encoding_specification: String::new(),
            encoding: EncodingSpecification::default(),
            feature_name: None,
            protection_mode: UNRESTRICTED_PROTECTION_MODE,
        }
    }
}

impl InstructionSpecification {
    /// Creates an instruction with the given mnemonic and raw encoding and
    /// default structured fields.
    #[must_use]
    pub fn new(mnemonic: impl Into<String>, raw_encoding_specification: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            raw_encoding_specification: raw_encoding_specification.into(),
            ..Self::default()
        }
    }

    /// Returns `true` when some privilege level is required.
    #[must_use]
    pub const fn is_privileged(&self) -> bool {
        self.protection_mode >= 0
    }
}

/// Ordered instruction database.
///
/// Order is significant: itinerary tables are aligned with it by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionSet {
    /// Instructions in database order.
    pub instructions: Vec<InstructionSpecification>,
}

impl InstructionSet {
    /// Creates a database from instructions in order.
    #[must_use]
    pub const fn new(instructions: Vec<InstructionSpecification>) -> Self {
        Self { instructions }
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` when the database holds no instruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Iterates over instructions in database order.
    pub fn iter(&self) -> std::slice::Iter<'_, InstructionSpecification> {
        self.instructions.iter()
    }

    /// Iterates mutably over instructions in database order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, InstructionSpecification> {
        self.instructions.iter_mut()
    }
}

impl FromIterator<InstructionSpecification> for InstructionSet {
    fn from_iter<T: IntoIterator<Item = InstructionSpecification>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a InstructionSet {
    type Item = &'a InstructionSpecification;
    type IntoIter = std::slice::Iter<'a, InstructionSpecification>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut InstructionSet {
    type Item = &'a mut InstructionSpecification;
    type IntoIter = std::slice::IterMut<'a, InstructionSpecification>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        InstructionSet, InstructionSpecification, MapSelect, UNRESTRICTED_PROTECTION_MODE,
    };

    #[test]
    fn new_instruction_is_unrestricted() {
        let instruction = InstructionSpecification::new("ADC", "14 ib");
        assert_eq!(instruction.protection_mode, UNRESTRICTED_PROTECTION_MODE);
        assert!(!instruction.is_privileged());
        assert!(instruction.feature_name.is_none());
    }

    #[test]
    fn map_escape_bytes_match_opcode_layout() {
        assert_eq!(MapSelect::Map0F.escape_bytes(), 0x0F);
        assert_eq!(MapSelect::Map0F38.escape_bytes(), 0x0F38);
        assert_eq!(MapSelect::Map0F3A.escape_bytes(), 0x0F3A);
        assert_eq!(MapSelect::from_prefix_field("0F38"), Some(MapSelect::Map0F38));
        assert_eq!(MapSelect::from_prefix_field("W0"), None);
    }

    #[test]
    fn instruction_set_preserves_order() {
        let set: InstructionSet = ["HLT", "CLI", "STI"]
            .into_iter()
            .map(|mnemonic| InstructionSpecification::new(mnemonic, "F4"))
            .collect();
        let mnemonics: Vec<_> = set.iter().map(|i| i.mnemonic.as_str()).collect();
        assert_eq!(mnemonics, ["HLT", "CLI", "STI"]);
        assert_eq!(set.len(), 3);
    }
}
