//! Parsing of raw encoding specifications.
//!
//! A raw encoding is the token string from the vendor manual, for example
//! `"VEX.DDS.128.66.0F38.W0 BA /r"` or `"REX.W + 0F C7 /1"`. Parsing never
//! fails; it extracts whatever opcode-relevant structure is present and the
//! checks decide what is missing.
//!
//! Byte tokens are exactly two upper-case hex digits. This keeps the
//! lower-case code-offset markers `cb` and `cd` from being read as bytes.

use crate::{MapSelect, ModRmUsage, VexPrefixType};

/// Legacy prefix bytes skipped when another byte follows them.
const LEGACY_PREFIX_BYTES: &[&str] = &["66", "F0", "F2", "F3", "9B"];

/// Prefix markers that never contribute opcode bytes.
const PREFIX_MARKERS: &[&str] = &["NP", "NFx", "REX", "REX.W", "REX.R", "+"];

/// Immediate and code-offset markers with their sizes in bytes.
const IMMEDIATE_MARKERS: &[(&str, u8)] = &[
    ("ib", 1),
    ("iw", 2),
    ("id", 4),
    ("io", 8),
    ("cb", 1),
    ("cw", 2),
    ("cd", 4),
    ("cp", 6),
    ("co", 8),
    ("/is4", 1),
];

/// ModRM marker found in a raw encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModRmMarker {
    /// `/r`.
    Register,
    /// `/0` .. `/7`.
    Extension(u8),
}

impl ModRmMarker {
    /// ModRM usage implied by the marker.
    #[must_use]
    pub const fn usage(self) -> ModRmUsage {
        match self {
            Self::Register => ModRmUsage::FullModRm,
            Self::Extension(_) => ModRmUsage::OpcodeExtensionInModRm,
        }
    }
}

/// Opcode-relevant structure recovered from a raw encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEncoding {
    /// Scheme of a VEX-like prefix token, if one is present.
    pub prefix_type: Option<VexPrefixType>,
    /// Opcode map from escape bytes or from the VEX-like prefix token.
    pub map: Option<MapSelect>,
    /// The opcode byte.
    pub opcode_byte: Option<u8>,
    /// Fixed bytes after the opcode byte (ModRM or suffix bytes).
    pub suffix_bytes: Vec<u8>,
    /// `true` when the opcode byte carries an operand (`+rb`, `+i`).
    pub operand_in_opcode: bool,
    /// The ModRM marker, if any.
    pub modrm: Option<ModRmMarker>,
    /// Total size of immediate values and code offsets in bytes.
    pub immediate_value_bytes: u8,
}

impl RawEncoding {
    /// Parses a raw encoding specification.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let tokens = tokenize(raw);
        let mut encoding = Self::default();
        let mut index = 0;

        while let Some(token) = tokens.get(index) {
            if let Some(prefix_type) = vex_prefix_type(token) {
                encoding.prefix_type = Some(prefix_type);
                encoding.map = token.split('.').find_map(MapSelect::from_prefix_field);
            } else if !is_skipped_prefix(&tokens, index) {
                break;
            }
            index += 1;
        }

        if encoding.prefix_type.is_none() && tokens.get(index) == Some(&"0F") {
            index += 1;
            encoding.map = match tokens.get(index) {
                Some(&"38") if has_byte_at(&tokens, index + 1) => {
                    index += 1;
                    Some(MapSelect::Map0F38)
                }
                Some(&"3A") if has_byte_at(&tokens, index + 1) => {
                    index += 1;
                    Some(MapSelect::Map0F3A)
                }
                _ => Some(MapSelect::Map0F),
            };
        }

        for token in tokens.iter().skip(index) {
            if let Some((byte, in_opcode)) = byte_token(token) {
                if encoding.opcode_byte.is_none() {
                    encoding.opcode_byte = Some(byte);
                    encoding.operand_in_opcode |= in_opcode;
                } else {
                    encoding.suffix_bytes.push(byte);
                }
            } else if let Some(marker) = modrm_marker(token) {
                encoding.modrm = Some(marker);
            } else if let Some(size) = immediate_size(token) {
                encoding.immediate_value_bytes = encoding.immediate_value_bytes.saturating_add(size);
            } else if token.starts_with('+') && encoding.suffix_bytes.is_empty() {
                encoding.operand_in_opcode = true;
            }
        }

        encoding
    }

    /// Opcode value implied by the encoding: map escape bytes followed by
    /// the opcode byte. `None` when there is no opcode byte.
    #[must_use]
    pub fn opcode(&self) -> Option<u32> {
        let byte = u32::from(self.opcode_byte?);
        Some(self.map.map_or(byte, |map| (map.escape_bytes() << 8) | byte))
    }

    /// ModRM usage implied by the encoding.
    #[must_use]
    pub fn modrm_usage(&self) -> ModRmUsage {
        self.modrm.map_or(ModRmUsage::NoModRm, ModRmMarker::usage)
    }
}

/// Splits on whitespace, then separates glued ModRM markers (`20/r`).
fn tokenize(raw: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for token in raw.split_whitespace() {
        match token.find('/') {
            Some(position) if position > 0 => {
                tokens.push(&token[..position]);
                tokens.push(&token[position..]);
            }
            _ => tokens.push(token),
        }
    }
    tokens
}

/// A legacy prefix byte is only a prefix when a byte or a prefix marker
/// (`F3 REX.W 0F B8 /r`) follows it; otherwise it is the opcode byte.
fn is_skipped_prefix(tokens: &[&str], index: usize) -> bool {
    let token = tokens[index];
    PREFIX_MARKERS.contains(&token)
        || (LEGACY_PREFIX_BYTES.contains(&token)
            && (has_byte_at(tokens, index + 1) || has_prefix_marker_at(tokens, index + 1)))
}

fn has_prefix_marker_at(tokens: &[&str], index: usize) -> bool {
    tokens
        .get(index)
        .is_some_and(|token| PREFIX_MARKERS.contains(token))
}

fn vex_prefix_type(token: &str) -> Option<VexPrefixType> {
    let (scheme, _) = token.split_once('.')?;
    match scheme {
        "VEX" => Some(VexPrefixType::Vex),
        "EVEX" => Some(VexPrefixType::Evex),
        "XOP" => Some(VexPrefixType::Xop),
        _ => None,
    }
}

/// Parses `XX` or `XX+suffix`; the flag reports an operand-in-opcode suffix.
fn byte_token(token: &str) -> Option<(u8, bool)> {
    let (digits, in_opcode) = token
        .split_once('+')
        .map_or((token, false), |(digits, _)| (digits, true));
    let is_upper_hex = |c: char| c.is_ascii_digit() || ('A'..='F').contains(&c);
    if digits.len() != 2 || !digits.chars().all(is_upper_hex) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok().map(|byte| (byte, in_opcode))
}

fn has_byte_at(tokens: &[&str], index: usize) -> bool {
    tokens.get(index).is_some_and(|token| byte_token(token).is_some())
}

fn modrm_marker(token: &str) -> Option<ModRmMarker> {
    match token.strip_prefix('/')? {
        "r" => Some(ModRmMarker::Register),
        digit if digit.len() == 1 => digit
            .parse::<u8>()
            .ok()
            .filter(|extension| *extension < 8)
            .map(ModRmMarker::Extension),
        _ => None,
    }
}

fn immediate_size(token: &str) -> Option<u8> {
    IMMEDIATE_MARKERS
        .iter()
        .find_map(|(marker, size)| (*marker == token).then_some(*size))
}
