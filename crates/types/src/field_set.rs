//! Bitmask sets of fields and their textual wire form

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};
use std::str::FromStr;

use crate::field::{Field, FIELD_COUNT};

/// A set of [`Field`]s stored as a 64-bit mask.
///
/// Bits outside the field universe are never set: every constructor masks
/// its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct FieldSet(u64);

/// Errors produced while decoding a textual field set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldSetParseError {
    #[error("empty field set payload")]
    Empty,
    #[error("invalid {radix_name} field set payload: {payload:?}")]
    Invalid {
        radix_name: &'static str,
        payload: String,
    },
}

impl FieldSet {
    /// No field
    pub const NONE: FieldSet = FieldSet(0);

    /// Every field in the universe
    pub const ALL: FieldSet = FieldSet((1u64 << FIELD_COUNT) - 1);

    /// Build a set from raw bits, dropping anything outside the universe
    pub const fn from_bits_truncate(bits: u64) -> Self {
        FieldSet(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn is_all(self) -> bool {
        self.0 == Self::ALL.0
    }

    pub const fn contains(self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    /// Whether any field of `other` is also in `self`
    pub const fn intersects(self, other: FieldSet) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: FieldSet) -> Self {
        FieldSet(self.0 | other.0)
    }

    pub const fn intersection(self, other: FieldSet) -> Self {
        FieldSet(self.0 & other.0)
    }

    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the members in bit order
    pub fn iter(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |field| self.contains(*field))
    }

    /// Canonical binary form: one digit per field, most significant first.
    ///
    /// This is the form written into the notification channel.
    pub fn to_binary_string(self) -> String {
        format!("{:0width$b}", self.0, width = FIELD_COUNT)
    }

    /// Decode a textual field set.
    ///
    /// Surrounding whitespace is ignored. `0b` and `0x` prefixes select
    /// binary and hexadecimal. A payload of exactly [`FIELD_COUNT`] binary
    /// digits is the canonical binary form; anything else is decimal.
    pub fn decode(payload: &str) -> Result<Self, FieldSetParseError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(FieldSetParseError::Empty);
        }

        let (digits, radix, radix_name) = if let Some(rest) = payload
            .strip_prefix("0b")
            .or_else(|| payload.strip_prefix("0B"))
        {
            (rest, 2, "binary")
        } else if let Some(rest) = payload
            .strip_prefix("0x")
            .or_else(|| payload.strip_prefix("0X"))
        {
            (rest, 16, "hexadecimal")
        } else if payload.len() == FIELD_COUNT && payload.bytes().all(|b| b == b'0' || b == b'1')
        {
            (payload, 2, "binary")
        } else {
            (payload, 10, "decimal")
        };

        // from_str_radix accepts a leading '+', the wire format does not
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(FieldSetParseError::Invalid {
                radix_name,
                payload: payload.to_string(),
            });
        }

        u64::from_str_radix(digits, radix)
            .map(Self::from_bits_truncate)
            .map_err(|_| FieldSetParseError::Invalid {
                radix_name,
                payload: payload.to_string(),
            })
    }
}

impl From<Field> for FieldSet {
    fn from(field: Field) -> Self {
        FieldSet(field.bit())
    }
}

impl From<u64> for FieldSet {
    fn from(bits: u64) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl From<FieldSet> for u64 {
    fn from(set: FieldSet) -> Self {
        set.0
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        iter.into_iter()
            .fold(FieldSet::NONE, |set, field| set | field)
    }
}

impl BitOr for FieldSet {
    type Output = FieldSet;

    fn bitor(self, rhs: FieldSet) -> FieldSet {
        self.union(rhs)
    }
}

impl BitOr<Field> for FieldSet {
    type Output = FieldSet;

    fn bitor(self, rhs: Field) -> FieldSet {
        self.union(rhs.into())
    }
}

impl BitOr for Field {
    type Output = FieldSet;

    fn bitor(self, rhs: Field) -> FieldSet {
        FieldSet::from(self) | rhs
    }
}

impl BitOrAssign for FieldSet {
    fn bitor_assign(&mut self, rhs: FieldSet) {
        self.0 |= rhs.0;
    }
}

impl BitOrAssign<Field> for FieldSet {
    fn bitor_assign(&mut self, rhs: Field) {
        self.insert(rhs);
    }
}

impl BitAnd for FieldSet {
    type Output = FieldSet;

    fn bitand(self, rhs: FieldSet) -> FieldSet {
        self.intersection(rhs)
    }
}

impl BitAndAssign for FieldSet {
    fn bitand_assign(&mut self, rhs: FieldSet) {
        self.0 &= rhs.0;
    }
}

/// Decimal form
impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FieldSet {
    type Err = FieldSetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
