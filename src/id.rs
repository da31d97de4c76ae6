//! Task identifiers.
//!
//! A `TaskId` is a number rendered as a fixed-width, lowercase base-36 string,
//! so ids sort and line up in listings. Ids are drawn at random and re-rolled
//! when they collide with an id already in use.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Write};
use std::str::FromStr;

/// Number of characters in the textual form of an id.
pub const ID_LENGTH: usize = 4;

/// Radix of the textual form of an id.
pub const ID_RADIX: u32 = 36;

/// Number of distinct ids (36^4).
const ID_SPACE: u32 = ID_RADIX.pow(ID_LENGTH as u32);

/// Opaque identifier of a task within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u32);

impl TaskId {
    /// Build an id from its numeric value. Returns `None` if out of range.
    pub fn from_value(value: u32) -> Option<Self> {
        (value < ID_SPACE).then_some(Self(value))
    }

    /// The numeric value underlying this id. Ordering follows this value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Draw a fresh id that `is_taken` rejects.
    pub fn generate(is_taken: impl Fn(&TaskId) -> bool) -> Self {
        Self::generate_with(&mut rand::rng(), is_taken)
    }

    /// Draw a fresh id from the given source of randomness.
    pub fn generate_with<R: Rng>(rng: &mut R, is_taken: impl Fn(&TaskId) -> bool) -> Self {
        loop {
            let candidate = Self(rng.random_range(0..ID_SPACE));
            if !is_taken(&candidate) {
                return candidate;
            }
            log::debug!("Task id {} already taken, re-rolling", candidate);
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut digits = ['0'; ID_LENGTH];
        let mut rest = self.0;
        for slot in digits.iter_mut().rev() {
            *slot = std::char::from_digit(rest % ID_RADIX, ID_RADIX).unwrap_or('0');
            rest /= ID_RADIX;
        }
        digits.iter().try_for_each(|c| f.write_char(*c))
    }
}

/// Error parsing a textual task id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdError(pub String);

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid task id '{}': expected {} base-{} characters",
            self.0, ID_LENGTH, ID_RADIX
        )
    }
}

impl std::error::Error for IdError {}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().count() != ID_LENGTH {
            return Err(IdError(s.to_string()));
        }
        let mut value = 0u32;
        for c in s.chars() {
            let digit = c.to_digit(ID_RADIX).ok_or_else(|| IdError(s.to_string()))?;
            value = value * ID_RADIX + digit;
        }
        Ok(Self(value))
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
