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

//! Exact sum of 128-bit decimals that survives transient overflow.
//!
//! The state keeps the low 128 bits of the running sum and counts how many
//! times the true sum crossed the 128-bit window:
//!
//! ```text
//! true_sum = overflow * 2^128 + unscaled_sum
//! ```
//!
//! Rows and partial states can push the sum out of range and back again
//! without losing precision. Only [`DecimalSumState::finalize`] decides
//! whether the result is representable.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use common_decimal::{Carry, Decimal128, Decimal128Type};
use common_telemetry::debug;
use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt};

use crate::aggrs::DecomposableAggregate;
use crate::error::{
    DecodeStateSnafu, InternalCounterOverflowSnafu, NumericValueOutOfRangeSnafu, Result,
};
use crate::metrics::{
    DECIMAL_SUM_FINALIZE_OK, DECIMAL_SUM_FINALIZE_OUT_OF_RANGE, DECIMAL_SUM_MERGE_OVERFLOW_TOTAL,
};
use crate::options::DecimalSumOptions;

/// Version byte leading every encoded [`DecimalSumState`].
pub const STATE_FORMAT_VERSION: u8 = 1;

/// Length of an encoded [`DecimalSumState`]: version, 16 bytes sum, 8 bytes counter.
pub const ENCODED_STATE_LEN: usize = 1 + 16 + 8;

/// Partial state of `SUM` over 128-bit decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalSumState {
    /// The true sum modulo 2^128.
    unscaled_sum: Decimal128,
    /// Net number of crossings of the 128-bit window, negative for underflow.
    overflow: i64,
}

impl DecimalSumState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(unscaled_sum: Decimal128, overflow: i64) -> Self {
        Self {
            unscaled_sum,
            overflow,
        }
    }

    pub fn unscaled_sum(&self) -> Decimal128 {
        self.unscaled_sum
    }

    pub fn overflow(&self) -> i64 {
        self.overflow
    }

    /// Returns true if the current sum fits in 128 bits.
    pub fn is_representable(&self) -> bool {
        self.overflow == 0
    }

    /// Adds one row. Leaving the 128-bit range is recorded, not reported:
    /// later rows may bring the sum back.
    pub fn add_value(&mut self, value: Decimal128) -> Result<()> {
        let (sum, carry) = self.unscaled_sum.overflowing_add(value);
        if !carry.is_zero() {
            let overflow = self.shift_overflow(i128::from(carry.as_i64()))?;
            if self.overflow == 0 {
                debug!("Decimal sum leaves 128 bits, overflow: {}", overflow);
            }
            self.overflow = overflow;
        }
        self.unscaled_sum = sum;
        Ok(())
    }

    /// Merges `other` into this state in place.
    pub fn merge(&mut self, other: &DecimalSumState) -> Result<()> {
        let (sum, carry) = self.unscaled_sum.overflowing_add(other.unscaled_sum);
        let delta = i128::from(other.overflow) + i128::from(carry.as_i64());
        let overflow = self.shift_overflow(delta)?;
        if carry != Carry::Zero {
            DECIMAL_SUM_MERGE_OVERFLOW_TOTAL.inc();
            debug!(
                "Merging decimal sums carries {:?}, overflow: {} -> {}",
                carry, self.overflow, overflow
            );
        }
        self.unscaled_sum = sum;
        self.overflow = overflow;
        Ok(())
    }

    /// Returns the merge of two states, leaving both intact.
    pub fn combine(mut self, other: &DecimalSumState) -> Result<DecimalSumState> {
        self.merge(other)?;
        Ok(self)
    }

    /// Produces the sum as a value of `target`, checking its declared precision.
    pub fn finalize(self, target: &Decimal128Type) -> Result<Decimal128> {
        self.finalize_with_options(target, &DecimalSumOptions::default())
    }

    /// Produces the sum, or fails with `NumericValueOutOfRange` if it is not
    /// representable. No truncated value is ever returned.
    pub fn finalize_with_options(
        self,
        target: &Decimal128Type,
        options: &DecimalSumOptions,
    ) -> Result<Decimal128> {
        let result = self.check_range(target, options);
        match &result {
            Ok(_) => DECIMAL_SUM_FINALIZE_OK.inc(),
            Err(e) => {
                DECIMAL_SUM_FINALIZE_OUT_OF_RANGE.inc();
                debug!("Reject decimal sum {:?}: {}", self, e);
            }
        }
        result
    }

    fn check_range(
        &self,
        target: &Decimal128Type,
        options: &DecimalSumOptions,
    ) -> Result<Decimal128> {
        ensure!(
            self.overflow == 0,
            NumericValueOutOfRangeSnafu {
                data_type: *target,
                reason: format!(
                    "sum exceeds 128 bits, crossed the {} bound {} time(s)",
                    if self.overflow > 0 { "upper" } else { "lower" },
                    self.overflow.unsigned_abs()
                ),
            }
        );
        ensure!(
            !options.enforce_declared_precision || target.contains(self.unscaled_sum),
            NumericValueOutOfRangeSnafu {
                data_type: *target,
                reason: format!(
                    "sum {} has more than {} digits",
                    self.unscaled_sum,
                    target.precision()
                ),
            }
        );
        Ok(self.unscaled_sum)
    }

    fn shift_overflow(&self, delta: i128) -> Result<i64> {
        let shifted = i128::from(self.overflow) + delta;
        i64::try_from(shifted).ok().context(InternalCounterOverflowSnafu {
            current: self.overflow,
            delta,
        })
    }

    /// Appends the fixed-size encoding of this state to `buf`.
    ///
    /// Layout: format version, `unscaled_sum` as 16 bytes little-endian two's
    /// complement, `overflow` as 8 bytes little-endian.
    pub fn encode_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(STATE_FORMAT_VERSION);
        buf.put_i128_le(self.unscaled_sum.val());
        buf.put_i64_le(self.overflow);
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENCODED_STATE_LEN);
        self.encode_to(&mut buf);
        buf.freeze()
    }

    /// Reads one encoded state from the front of `buf`, advancing it.
    pub fn decode_from<B: Buf>(buf: &mut B) -> Result<DecimalSumState> {
        ensure!(
            buf.remaining() >= ENCODED_STATE_LEN,
            DecodeStateSnafu {
                reason: format!(
                    "expect at least {} bytes, got {}",
                    ENCODED_STATE_LEN,
                    buf.remaining()
                ),
            }
        );
        let version = buf.get_u8();
        ensure!(
            version == STATE_FORMAT_VERSION,
            DecodeStateSnafu {
                reason: format!("unknown decimal sum state version {version}"),
            }
        );
        let unscaled_sum = Decimal128::new(buf.get_i128_le());
        let overflow = buf.get_i64_le();
        Ok(DecimalSumState {
            unscaled_sum,
            overflow,
        })
    }

    /// Decodes a state from exactly [`ENCODED_STATE_LEN`] bytes.
    pub fn decode(mut bytes: &[u8]) -> Result<DecimalSumState> {
        ensure!(
            bytes.len() == ENCODED_STATE_LEN,
            DecodeStateSnafu {
                reason: format!(
                    "expect {} bytes, got {}",
                    ENCODED_STATE_LEN,
                    bytes.len()
                ),
            }
        );
        Self::decode_from(&mut bytes)
    }
}

impl DecomposableAggregate for DecimalSumState {
    type Input = Decimal128;
    type Output = Decimal128;
    type Target = Decimal128Type;

    fn init() -> Self {
        DecimalSumState::new()
    }

    fn add_value(&mut self, value: Decimal128) -> Result<()> {
        DecimalSumState::add_value(self, value)
    }

    fn combine(self, other: &Self) -> Result<Self> {
        DecimalSumState::combine(self, other)
    }

    fn finalize(self, target: &Decimal128Type) -> Result<Decimal128> {
        DecimalSumState::finalize(self, target)
    }
}
