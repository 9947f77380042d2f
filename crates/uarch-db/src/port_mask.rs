//! Execution port masks.

use std::fmt;

/// Number of ports a [`PortMask`] can describe.
pub const MAX_PORTS: u8 = 64;

/// Set of execution ports a micro-operation may issue to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(transparent)
)]
pub struct PortMask(u64);

impl PortMask {
    /// Mask with no port.
    pub const EMPTY: Self = Self(0);

    /// Creates a mask from raw bits; bit `n` stands for port `n`.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Creates a mask from port numbers.
    ///
    /// # Panics
    ///
    /// Panics when a port number is not below [`MAX_PORTS`].
    #[must_use]
    pub fn from_ports(ports: impl IntoIterator<Item = u8>) -> Self {
        ports.into_iter().fold(Self::EMPTY, |mask, port| {
            assert!(port < MAX_PORTS, "port {port} out of range");
            Self(mask.0 | (1 << port))
        })
    }

    /// Raw bits of the mask.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns `true` when `port` is in the mask.
    #[must_use]
    pub const fn contains_port(self, port: u8) -> bool {
        port < MAX_PORTS && self.0 & (1 << port) != 0
    }

    /// Number of ports in the mask.
    #[must_use]
    pub const fn port_count(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns `true` when the mask has no port.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Port numbers in ascending order.
    pub fn ports(self) -> impl Iterator<Item = u8> {
        (0..MAX_PORTS).filter(move |port| self.contains_port(*port))
    }
}

/// Formats as `P` followed by the port numbers, e.g. `P0156`.
impl fmt::Display for PortMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("P")?;
        for port in self.ports() {
            write!(f, "{port}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PortMask;

    #[test]
    fn ports_roundtrip_through_bits() {
        let mask = PortMask::from_ports([0, 1, 5, 6]);
        assert_eq!(mask.bits(), 0b110_0011);
        assert_eq!(mask.ports().collect::<Vec<_>>(), [0, 1, 5, 6]);
        assert_eq!(mask.port_count(), 4);
        assert!(mask.contains_port(5));
        assert!(!mask.contains_port(2));
        assert!(!mask.contains_port(200));
    }

    #[test]
    fn display_lists_ports() {
        assert_eq!(PortMask::from_ports([0, 1, 5, 6]).to_string(), "P0156");
        assert_eq!(PortMask::from_ports([2, 3]).to_string(), "P23");
        assert_eq!(PortMask::EMPTY.to_string(), "P");
    }

    #[test]
    #[should_panic(expected = "port 64 out of range")]
    fn out_of_range_port_is_fatal() {
        let _ = PortMask::from_ports([64]);
    }
}
