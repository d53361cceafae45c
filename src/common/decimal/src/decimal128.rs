// Copyright 2023 Greptime Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Unscaled 128-bit decimal values with explicit carry reporting.
//!
//! A [`Decimal128`] is only the integer part of a decimal number: the scale
//! lives in the column type ([`Decimal128Type`]). Every arithmetic operation
//! that can leave `[-2^127, 2^127 - 1]` reports it instead of wrapping
//! silently.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt};

use crate::error::{
    ConstructionOutOfRangeSnafu, Error, InvalidPrecisionSnafu, InvalidScaleSnafu,
    NegateOverflowSnafu, Result,
};

/// The maximum precision of a 128-bit decimal.
pub const DECIMAL128_MAX_PRECISION: u8 = 38;

/// Decimals up to this precision fit in an `i64` unscaled value.
pub const DECIMAL64_MAX_PRECISION: u8 = 18;

/// The default scale of a decimal column declared without one.
pub const DECIMAL128_DEFAULT_SCALE: i8 = 10;

const BYTES_LEN: usize = 16;

/// Direction in which an addition left the 128-bit window.
///
/// Converted into `-1`, `0` or `+1`, it is exactly the number of times
/// `2^128` must be added to the wrapped result to recover the true value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Carry {
    /// The true result is below `-2^127`.
    Underflow,
    /// The true result is representable.
    Zero,
    /// The true result is above `2^127 - 1`.
    Overflow,
}

impl Carry {
    pub fn as_i64(self) -> i64 {
        match self {
            Carry::Underflow => -1,
            Carry::Zero => 0,
            Carry::Overflow => 1,
        }
    }

    pub fn is_zero(self) -> bool {
        self == Carry::Zero
    }
}

impl From<Carry> for i64 {
    fn from(carry: Carry) -> Self {
        carry.as_i64()
    }
}

/// Unscaled value of a decimal, stored as a 128-bit two's-complement integer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal128(i128);

impl Decimal128 {
    pub const ZERO: Decimal128 = Decimal128(0);
    pub const MIN: Decimal128 = Decimal128(i128::MIN);
    pub const MAX: Decimal128 = Decimal128(i128::MAX);

    pub const fn new(value: i128) -> Self {
        Self(value)
    }

    /// Returns the raw unscaled integer.
    pub const fn val(&self) -> i128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn signum(&self) -> i8 {
        self.0.signum() as i8
    }

    /// Adds `rhs`, returning the low 128 bits of the true sum and the
    /// direction in which the true sum left the representable range.
    pub fn overflowing_add(self, rhs: Decimal128) -> (Decimal128, Carry) {
        let (sum, overflowed) = self.0.overflowing_add(rhs.0);
        let carry = if !overflowed {
            Carry::Zero
        } else if rhs.0 > 0 {
            // Both operands are positive when a positive overflow happens.
            Carry::Overflow
        } else {
            Carry::Underflow
        };
        (Decimal128(sum), carry)
    }

    /// Two's-complement negation. Only `-MIN` is out of range, and it is
    /// reported as an error instead of returning `MIN` again.
    pub fn negate(self) -> Result<Decimal128> {
        self.0
            .checked_neg()
            .map(Decimal128)
            .context(NegateOverflowSnafu { value: self.0 })
    }

    /// Negation that wraps, reporting the carry like [`Self::overflowing_add`].
    pub fn overflowing_negate(self) -> (Decimal128, Carry) {
        let (neg, overflowed) = self.0.overflowing_neg();
        let carry = if overflowed {
            // -(-2^127) = 2^127 = 2^128 + (-2^127)
            Carry::Overflow
        } else {
            Carry::Zero
        };
        (Decimal128(neg), carry)
    }

    /// Builds a value from a big-endian two's-complement byte string of any
    /// length, the layout big-integer types export.
    ///
    /// Bytes beyond the low 16 are accepted only if they are sign extension.
    pub fn try_from_be_bytes(bytes: &[u8]) -> Result<Decimal128> {
        let Some(&first) = bytes.first() else {
            return Ok(Decimal128::ZERO);
        };

        if bytes.len() > BYTES_LEN {
            let (high, low) = bytes.split_at(bytes.len() - BYTES_LEN);
            let fill = sign_fill(low[0]);
            ensure!(
                high.iter().all(|b| *b == fill),
                ConstructionOutOfRangeSnafu {
                    reason: format!(
                        "{} bytes big-endian integer has significant bits above 128",
                        bytes.len()
                    ),
                }
            );
            let mut buf = [0u8; BYTES_LEN];
            buf.copy_from_slice(low);
            return Ok(Decimal128(i128::from_be_bytes(buf)));
        }

        let mut buf = [sign_fill(first); BYTES_LEN];
        buf[BYTES_LEN - bytes.len()..].copy_from_slice(bytes);
        Ok(Decimal128(i128::from_be_bytes(buf)))
    }

    pub fn to_be_bytes(self) -> [u8; BYTES_LEN] {
        self.0.to_be_bytes()
    }

    pub fn to_le_bytes(self) -> [u8; BYTES_LEN] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; BYTES_LEN]) -> Decimal128 {
        Decimal128(i128::from_le_bytes(bytes))
    }
}

fn sign_fill(most_significant: u8) -> u8 {
    if most_significant & 0x80 != 0 {
        0xFF
    } else {
        0x00
    }
}

impl From<i128> for Decimal128 {
    fn from(value: i128) -> Self {
        Decimal128(value)
    }
}

impl From<i64> for Decimal128 {
    fn from(value: i64) -> Self {
        Decimal128(value as i128)
    }
}

impl From<i32> for Decimal128 {
    fn from(value: i32) -> Self {
        Decimal128(value as i128)
    }
}

impl From<Decimal128> for i128 {
    fn from(value: Decimal128) -> Self {
        value.0
    }
}

impl TryFrom<u128> for Decimal128 {
    type Error = Error;

    fn try_from(value: u128) -> Result<Self> {
        i128::try_from(value).map(Decimal128).map_err(|_| {
            ConstructionOutOfRangeSnafu {
                reason: format!("{value} is greater than {}", i128::MAX),
            }
            .build()
        })
    }
}

/// Displays the raw unscaled integer. Use [`Decimal128Type::format`] to
/// render it with a scale.
impl Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Precision and scale of a decimal column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDecimal128Type")]
pub struct Decimal128Type {
    precision: u8,
    scale: i8,
}

#[derive(Deserialize)]
struct RawDecimal128Type {
    precision: u8,
    scale: i8,
}

impl TryFrom<RawDecimal128Type> for Decimal128Type {
    type Error = Error;

    fn try_from(raw: RawDecimal128Type) -> Result<Self> {
        Decimal128Type::new(raw.precision, raw.scale)
    }
}

impl Default for Decimal128Type {
    fn default() -> Self {
        Self {
            precision: DECIMAL128_MAX_PRECISION,
            scale: DECIMAL128_DEFAULT_SCALE,
        }
    }
}

impl Decimal128Type {
    pub fn new(precision: u8, scale: i8) -> Result<Self> {
        ensure!(
            (1..=DECIMAL128_MAX_PRECISION).contains(&precision),
            InvalidPrecisionSnafu {
                precision,
                max: DECIMAL128_MAX_PRECISION,
            }
        );
        ensure!(
            scale >= 0 && (scale as u8) <= precision,
            InvalidScaleSnafu { precision, scale }
        );
        Ok(Self { precision, scale })
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> i8 {
        self.scale
    }

    /// Returns true if every value of this type fits in an `i64`.
    pub fn is_short(&self) -> bool {
        self.precision <= DECIMAL64_MAX_PRECISION
    }

    /// Largest unscaled magnitude with `precision` digits, `10^precision - 1`.
    pub fn max_unscaled(&self) -> i128 {
        // 10^38 - 1 < i128::MAX, no overflow for any valid precision.
        10_i128.pow(self.precision as u32) - 1
    }

    /// Returns true if `value` has at most `precision` digits.
    pub fn contains(&self, value: Decimal128) -> bool {
        value.0.unsigned_abs() <= self.max_unscaled() as u128
    }

    /// Renders `value` with `scale` fractional digits, e.g. `12345` with
    /// scale 2 is `123.45`.
    pub fn format(&self, value: Decimal128) -> String {
        let digits = value.0.unsigned_abs().to_string();
        let sign = if value.is_negative() { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return format!("{sign}{digits}");
        }

        let padded = if digits.len() <= scale {
            format!("{digits:0>width$}", width = scale + 1)
        } else {
            digits
        };
        let (int, frac) = padded.split_at(padded.len() - scale);
        format!("{sign}{int}.{frac}")
    }
}

impl Display for Decimal128Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({}, {})", self.precision, self.scale)
    }
}
