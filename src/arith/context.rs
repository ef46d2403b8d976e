//! Context identifiers.
//!
//! A context selects the frequency table a symbol is decoded with. The
//! numeric space is split the way U3D streams use it:
//!
//! | Range | Kind | Table |
//! |-------|------|-------|
//! | `0` | Byte | Uniform over 256 symbols `1..=256` |
//! | `1..0x400` | Dynamic | Adaptive histogram with escape symbol `0` |
//! | `0x401..=0x43FF` | Uniform | Uniform over `1..=n` where `n = ctx - 0x400` |
//! | everything else | Unsupported | Empty (total frequency 0) |

use std::fmt;

/// First context id of the static uniform range.
pub const STATIC_FULL: u32 = 0x400;

/// Largest size a uniform context can describe.
pub const MAX_UNIFORM_SIZE: u32 = 0x3FFF;

/// Last valid context id.
pub const MAX_RANGE: u32 = STATIC_FULL + MAX_UNIFORM_SIZE;

/// Frequency-table selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Context(u32);

/// Classification of a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Raw byte table.
    Byte,
    /// Adaptive histogram, with its index in `1..0x400`.
    Dynamic(u32),
    /// Static uniform table over `n` symbols.
    Uniform(u32),
    /// Outside every known range.
    Unsupported,
}

impl Context {
    /// Uniform 256-symbol context used for raw values.
    pub const BYTE: Self = Self(0);

    /// Wrap a raw context id as found in a stream.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Adaptive context `index`, valid for `1..0x400`.
    pub const fn dynamic(index: u32) -> Option<Self> {
        if index >= 1 && index < STATIC_FULL {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Static context over `size` equiprobable values `0..size`.
    pub const fn uniform(size: u32) -> Option<Self> {
        if size >= 1 && size <= MAX_UNIFORM_SIZE {
            Some(Self(STATIC_FULL + size))
        } else {
            None
        }
    }

    /// Raw context id.
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn kind(self) -> ContextKind {
        match self.0 {
            0 => ContextKind::Byte,
            n if n < STATIC_FULL => ContextKind::Dynamic(n),
            n if n > STATIC_FULL && n <= MAX_RANGE => ContextKind::Uniform(n - STATIC_FULL),
            _ => ContextKind::Unsupported,
        }
    }

    pub const fn is_dynamic(self) -> bool {
        matches!(self.kind(), ContextKind::Dynamic(_))
    }
}

impl From<u32> for Context {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}
