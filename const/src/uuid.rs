use std::fmt::{Debug, Display, Formatter};
use std::num::NonZeroU128;
use std::str::FromStr;

use crate::Error;

const SHIFT: u32 = u128::BITS - u32::BITS;
const BASE: u128 = 0x00000000_0000_1000_8000_00805F9B34FB;
const MASK_16: u128 = !((u16::MAX as u128) << SHIFT);
const MASK_32: u128 = !((u32::MAX as u128) << SHIFT);

/// 16-, 32-, or 128-bit UUID ([Vol 3] Part B, Section 2.5.1).
///
/// Transports identify services, characteristics, and descriptors by the
/// string form produced by [`Display`]: four lowercase hex digits for
/// assigned 16-bit UUIDs and 32 lowercase hex digits otherwise.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Uuid(NonZeroU128);

impl Uuid {
    /// UUID size in bytes.
    pub const BYTES: usize = std::mem::size_of::<Self>();

    /// Creates a UUID from a `u128`.
    #[inline]
    #[must_use]
    pub const fn new(v: u128) -> Option<Self> {
        match NonZeroU128::new(v) {
            Some(nz) => Some(Self(nz)),
            None => None,
        }
    }

    /// Creates a UUID from an assigned 16-bit SIG value. Returns [`None`] for
    /// zero.
    #[inline]
    #[must_use]
    pub const fn from_u16(v: u16) -> Option<Self> {
        if v == 0 {
            return None;
        }
        Self::new((v as u128) << SHIFT | BASE)
    }

    /// Creates a UUID from an assigned 32-bit SIG value. Returns [`None`] for
    /// zero.
    #[inline]
    #[must_use]
    pub const fn from_u32(v: u32) -> Option<Self> {
        if v == 0 {
            return None;
        }
        Self::new((v as u128) << SHIFT | BASE)
    }

    /// Converts an assigned 16-bit Bluetooth SIG UUID to `u16`. This is
    /// mutually exclusive with `as_u32`.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> Option<u16> {
        #[allow(clippy::cast_possible_truncation)]
        let v = (self.0.get() >> SHIFT) as u16;
        if self.0.get() & MASK_16 == BASE && v > 0 {
            Some(v)
        } else {
            None
        }
    }

    /// Converts an assigned 32-bit Bluetooth SIG UUID to `u32`. This is
    /// mutually exclusive with `as_u16`.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> Option<u32> {
        #[allow(clippy::cast_possible_truncation)]
        let v = (self.0.get() >> SHIFT) as u32;
        if self.0.get() & MASK_32 == BASE && v > u16::MAX as u32 {
            Some(v)
        } else {
            None
        }
    }

    /// Returns the raw 128-bit value.
    #[inline(always)]
    #[must_use]
    pub const fn raw(self) -> u128 {
        self.0.get()
    }

    /// Returns the UUID as a little-endian byte array.
    #[inline]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; Self::BYTES] {
        self.0.get().to_le_bytes()
    }
}

impl FromStr for Uuid {
    type Err = Error;

    /// Parses the 4-, 8-, or 32-digit hex form, or the dashed 36-character
    /// form. Digits are case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidUuid(s.to_owned());
        let hex: String = if s.len() == 36 {
            let b = s.as_bytes();
            if [8, 13, 18, 23].iter().any(|&i| b[i] != b'-') {
                return Err(invalid());
            }
            let hex: String = s.chars().filter(|&c| c != '-').collect();
            if hex.len() != 32 {
                return Err(invalid());
            }
            hex
        } else {
            s.to_owned()
        };
        if !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let v = u128::from_str_radix(&hex, 16).map_err(|_| invalid())?;
        #[allow(clippy::cast_possible_truncation)]
        let u = match hex.len() {
            4 => Self::from_u16(v as u16),
            8 => Self::from_u32(v as u32),
            32 => Self::new(v),
            _ => None,
        };
        u.ok_or_else(invalid)
    }
}

impl Debug for Uuid {
    #[allow(clippy::cast_possible_truncation)]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(v) = self.as_u16() {
            write!(f, "{v:#06X}")
        } else if let Some(v) = self.as_u32() {
            write!(f, "{v:#010X}")
        } else {
            let v = self.0.get();
            write!(
                f,
                "{:08X}-{:04X}-{:04X}-{:04X}-{:012X}",
                (v >> 96) as u32,
                (v >> 80) as u16,
                (v >> 64) as u16,
                (v >> 48) as u16,
                (v & ((1 << 48) - 1)) as u64
            )
        }
    }
}

impl Display for Uuid {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.as_u16() {
            Some(v) => write!(f, "{v:04x}"),
            None => write!(f, "{:032x}", self.0.get()),
        }
    }
}

impl From<Uuid> for u128 {
    #[inline]
    fn from(u: Uuid) -> Self {
        u.0.get()
    }
}

impl serde::Serialize for Uuid {
    #[inline]
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}
