//! Safety flags and the small set type used to combine them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A capability claim made by instrumented code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Safety {
    /// Memory use is bounded and fully declared.
    MemSafe,
    /// CPU use is bounded and fully declared.
    CPUSafe,
    /// Wall-clock time is bounded.
    TimeSafe,
    /// No uncontrolled I/O is performed.
    IOSafe,
}

impl Safety {
    /// Every flag, in declaration order.
    pub const ALL: [Safety; 4] = [
        Safety::MemSafe,
        Safety::CPUSafe,
        Safety::TimeSafe,
        Safety::IOSafe,
    ];

    const fn bit(self) -> u8 {
        match self {
            Safety::MemSafe => 1 << 0,
            Safety::CPUSafe => 1 << 1,
            Safety::TimeSafe => 1 << 2,
            Safety::IOSafe => 1 << 3,
        }
    }

    /// Canonical name of the flag.
    pub fn name(self) -> &'static str {
        match self {
            Safety::MemSafe => "MemSafe",
            Safety::CPUSafe => "CPUSafe",
            Safety::TimeSafe => "TimeSafe",
            Safety::IOSafe => "IOSafe",
        }
    }

    /// Parse a flag name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Result<Self, ParseSafetyError> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ParseSafetyError::UnknownFlag(name.to_string()))
    }
}

impl fmt::Display for Safety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a safety flag name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseSafetyError {
    /// The name does not match any flag.
    #[error("unknown safety flag '{0}' (expected one of MemSafe, CPUSafe, TimeSafe, IOSafe)")]
    UnknownFlag(String),
}

/// A set of [`Safety`] flags.
///
/// Backed by a fixed-width bit set: union is a bitwise or, containment a
/// subset test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SafetyFlags(u8);

impl SafetyFlags {
    /// The empty set.
    pub const NONE: SafetyFlags = SafetyFlags(0);

    /// Every flag.
    pub const ALL: SafetyFlags = SafetyFlags(0b1111);

    /// Create an empty set.
    pub const fn empty() -> Self {
        Self::NONE
    }

    /// Set union.
    pub const fn union(self, other: SafetyFlags) -> Self {
        SafetyFlags(self.0 | other.0)
    }

    /// Return a copy with `flag` added.
    pub const fn with(self, flag: Safety) -> Self {
        SafetyFlags(self.0 | flag.bit())
    }

    /// Add `flag` in place.
    pub fn insert(&mut self, flag: Safety) {
        self.0 |= flag.bit();
    }

    /// Whether `flag` is a member.
    pub const fn has(self, flag: Safety) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Whether every flag in `other` is also in `self`.
    pub const fn contains(self, other: SafetyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Flags present in `required` but absent from `self`.
    pub const fn missing(self, required: SafetyFlags) -> SafetyFlags {
        SafetyFlags(required.0 & !self.0)
    }

    /// Whether the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Safety> {
        Safety::ALL.into_iter().filter(move |flag| self.has(*flag))
    }

    /// Parse a list of flag names.
    pub fn from_names<'a, I>(names: I) -> Result<Self, ParseSafetyError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .try_fold(Self::NONE, |set, name| Ok(set.with(Safety::from_name(name)?)))
    }
}

impl From<Safety> for SafetyFlags {
    fn from(flag: Safety) -> Self {
        SafetyFlags(flag.bit())
    }
}

impl std::ops::BitOr for SafetyFlags {
    type Output = SafetyFlags;

    fn bitor(self, rhs: SafetyFlags) -> SafetyFlags {
        self.union(rhs)
    }
}

impl std::ops::BitOr<Safety> for SafetyFlags {
    type Output = SafetyFlags;

    fn bitor(self, rhs: Safety) -> SafetyFlags {
        self.with(rhs)
    }
}

impl std::ops::BitOr for Safety {
    type Output = SafetyFlags;

    fn bitor(self, rhs: Safety) -> SafetyFlags {
        SafetyFlags::from(self).with(rhs)
    }
}

impl FromIterator<Safety> for SafetyFlags {
    fn from_iter<T: IntoIterator<Item = Safety>>(iter: T) -> Self {
        iter.into_iter().fold(Self::NONE, SafetyFlags::with)
    }
}

impl fmt::Display for SafetyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        let names: Vec<&str> = self.iter().map(Safety::name).collect();
        f.write_str(&names.join(" | "))
    }
}
