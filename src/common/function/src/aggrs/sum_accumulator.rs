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

use bytes::{Buf, BufMut, Bytes, BytesMut};
use common_decimal::decimal128::DECIMAL128_MAX_PRECISION;
use common_decimal::{Decimal128, Decimal128Type};
use common_telemetry::debug;
use snafu::{ensure, OptionExt, ResultExt};

use crate::aggrs::decimal_sum::{DecimalSumState, ENCODED_STATE_LEN};
use crate::aggrs::{aggr_merge_func_name, aggr_state_func_name};
use crate::error::{
    DecimalSnafu, DecodeStateSnafu, EvaluateAggregateSnafu, InvalidInputTypeSnafu, Result,
    RowCountOverflowSnafu,
};
use crate::options::DecimalSumOptions;

pub const DECIMAL_SUM_NAME: &str = "sum";

/// Length of a serialized accumulator: the sum state followed by the
/// number of non-null rows as `u64` little-endian.
pub const ENCODED_ACCUMULATOR_LEN: usize = ENCODED_STATE_LEN + 8;

/// `SUM` over one decimal column of one group.
///
/// Null rows are skipped. A group without any non-null row evaluates to
/// `None` (SQL `NULL`) instead of zero.
#[derive(Debug, Clone)]
pub struct DecimalSumAccumulator {
    state: DecimalSumState,
    non_nulls: u64,
    input_type: Decimal128Type,
    output_type: Decimal128Type,
    column: String,
    options: DecimalSumOptions,
}

impl DecimalSumAccumulator {
    pub fn update(&mut self, value: Option<Decimal128>) -> Result<()> {
        if let Some(value) = value {
            let non_nulls = self.count_rows(1)?;
            self.state.add_value(value)?;
            self.non_nulls = non_nulls;
        }
        Ok(())
    }

    /// Adds a row of a decimal column stored as 64-bit unscaled values.
    pub fn update_short(&mut self, value: Option<i64>) -> Result<()> {
        ensure!(
            self.input_type.is_short(),
            InvalidInputTypeSnafu {
                err_msg: format!(
                    "column {} of type {} is not stored in 64 bits",
                    self.column, self.input_type
                ),
            }
        );
        self.update(value.map(Decimal128::from))
    }

    pub fn update_batch(&mut self, values: &[Option<Decimal128>]) -> Result<()> {
        for value in values {
            self.update(*value)?;
        }
        Ok(())
    }

    pub fn update_short_batch(&mut self, values: &[Option<i64>]) -> Result<()> {
        for value in values {
            self.update_short(*value)?;
        }
        Ok(())
    }

    /// Serializes the partial state sent from a partial stage to the merge stage.
    pub fn state(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENCODED_ACCUMULATOR_LEN);
        self.state.encode_to(&mut buf);
        buf.put_u64_le(self.non_nulls);
        buf.freeze()
    }

    /// Merges one serialized partial state produced by [`Self::state`].
    pub fn merge_state(&mut self, mut bytes: &[u8]) -> Result<()> {
        ensure!(
            bytes.len() == ENCODED_ACCUMULATOR_LEN,
            DecodeStateSnafu {
                reason: format!(
                    "expect {} bytes of {} state, got {}",
                    ENCODED_ACCUMULATOR_LEN,
                    DECIMAL_SUM_NAME,
                    bytes.len()
                ),
            }
        );
        let state = DecimalSumState::decode_from(&mut bytes)?;
        let non_nulls = bytes.get_u64_le();
        self.merge_parts(&state, non_nulls)
    }

    pub fn merge_batch(&mut self, states: &[Bytes]) -> Result<()> {
        for state in states {
            self.merge_state(state)?;
        }
        Ok(())
    }

    /// Merges another accumulator of the same group. Both must produce the
    /// same scale, unscaled sums of different scales are not comparable.
    pub fn merge(&mut self, other: &DecimalSumAccumulator) -> Result<()> {
        ensure!(
            other.output_type.scale() == self.output_type.scale(),
            InvalidInputTypeSnafu {
                err_msg: format!(
                    "can't merge {} of {} ({}) into {} ({}), scales differ",
                    DECIMAL_SUM_NAME,
                    other.column,
                    other.output_type,
                    self.column,
                    self.output_type
                ),
            }
        );
        self.merge_parts(&other.state, other.non_nulls)
    }

    fn merge_parts(&mut self, state: &DecimalSumState, non_nulls: u64) -> Result<()> {
        let non_nulls = self.count_rows(non_nulls)?;
        self.state.merge(state)?;
        self.non_nulls = non_nulls;
        Ok(())
    }

    fn count_rows(&self, delta: u64) -> Result<u64> {
        self.non_nulls
            .checked_add(delta)
            .context(RowCountOverflowSnafu {
                current: self.non_nulls,
                delta,
            })
    }

    /// Returns the sum, `None` if every row was null.
    pub fn evaluate(&self) -> Result<Option<Decimal128>> {
        if self.non_nulls == 0 {
            return Ok(None);
        }
        self.state
            .finalize_with_options(&self.output_type, &self.options)
            .map(Some)
            .context(EvaluateAggregateSnafu {
                aggregate: DECIMAL_SUM_NAME,
                column: &self.column,
            })
    }

    pub fn output_type(&self) -> Decimal128Type {
        self.output_type
    }

    pub fn non_nulls(&self) -> u64 {
        self.non_nulls
    }

    pub fn sum_state(&self) -> &DecimalSumState {
        &self.state
    }
}

/// Creates [`DecimalSumAccumulator`]s for a decimal column.
#[derive(Debug, Clone)]
pub struct DecimalSumAccumulatorCreator {
    input_type: Decimal128Type,
    output_type: Option<Decimal128Type>,
    column: String,
    options: DecimalSumOptions,
}

impl DecimalSumAccumulatorCreator {
    pub fn new(input_type: Decimal128Type, column: impl Into<String>) -> Self {
        Self {
            input_type,
            output_type: None,
            column: column.into(),
            options: DecimalSumOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DecimalSumOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides the default output type `Decimal(38, input scale)`.
    pub fn with_output_type(mut self, output_type: Decimal128Type) -> Self {
        self.output_type = Some(output_type);
        self
    }

    pub fn input_type(&self) -> Decimal128Type {
        self.input_type
    }

    pub fn output_type(&self) -> Result<Decimal128Type> {
        match self.output_type {
            Some(output_type) => Ok(output_type),
            None => Decimal128Type::new(DECIMAL128_MAX_PRECISION, self.input_type.scale())
                .context(DecimalSnafu),
        }
    }

    pub fn state_func_name(&self) -> String {
        aggr_state_func_name(DECIMAL_SUM_NAME)
    }

    pub fn merge_func_name(&self) -> String {
        aggr_merge_func_name(DECIMAL_SUM_NAME)
    }

    pub fn create(&self) -> Result<DecimalSumAccumulator> {
        let output_type = self.output_type()?;
        ensure!(
            output_type.scale() == self.input_type.scale(),
            InvalidInputTypeSnafu {
                err_msg: format!(
                    "\"SUM\" aggregate function can't sum {} into {}, scales differ",
                    self.input_type, output_type
                ),
            }
        );
        debug!(
            "Create {} accumulator on column {}, input: {}, output: {}",
            DECIMAL_SUM_NAME, self.column, self.input_type, output_type
        );

        Ok(DecimalSumAccumulator {
            state: DecimalSumState::new(),
            non_nulls: 0,
            input_type: self.input_type,
            output_type,
            column: self.column.clone(),
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use common_error::ext::ErrorExt;
    use common_error::status_code::StatusCode;

    use super::*;
    use crate::error::Error;

    const TWO_126: i128 = 1 << 126;

    fn d(value: i128) -> Option<Decimal128> {
        Some(Decimal128::new(value))
    }

    fn creator(precision: u8, scale: i8) -> DecimalSumAccumulatorCreator {
        DecimalSumAccumulatorCreator::new(Decimal128Type::new(precision, scale).unwrap(), "price")
    }

    #[test]
    fn test_creator() {
        let creator = creator(10, 2);
        assert_eq!(
            Decimal128Type::new(38, 2).unwrap(),
            creator.output_type().unwrap()
        );
        assert_eq!("__sum_state", creator.state_func_name());
        assert_eq!("__sum_merge", creator.merge_func_name());

        let acc = creator.create().unwrap();
        assert_eq!(Decimal128Type::new(38, 2).unwrap(), acc.output_type());
        assert_eq!(0, acc.non_nulls());
    }

    #[test]
    fn test_creator_scale_mismatch() {
        let err = creator(10, 2)
            .with_output_type(Decimal128Type::new(38, 3).unwrap())
            .create()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInputType { .. }));
        assert_eq!(StatusCode::InvalidArguments, err.status_code());
    }

    #[test]
    fn test_update_batch() {
        // test update empty batch, expect not updating anything
        let mut acc = creator(10, 2).create().unwrap();
        assert!(acc.update_batch(&[]).is_ok());
        assert_eq!(None, acc.evaluate().unwrap());

        // test update null values only
        acc.update_batch(&[None, None]).unwrap();
        assert_eq!(0, acc.non_nulls());
        assert_eq!(None, acc.evaluate().unwrap());

        // nulls are skipped, zero is a value
        acc.update_batch(&[d(0), None]).unwrap();
        assert_eq!(Some(Decimal128::ZERO), acc.evaluate().unwrap());

        acc.update_batch(&[d(12_345), d(-345), None]).unwrap();
        assert_eq!(3, acc.non_nulls());
        assert_eq!(Some(Decimal128::new(12_000)), acc.evaluate().unwrap());
    }

    #[test]
    fn test_update_short() {
        let mut acc = creator(18, 0).create().unwrap();
        acc.update_short_batch(&[Some(i64::MAX), Some(i64::MAX), None, Some(2)])
            .unwrap();
        assert_eq!(
            Some(Decimal128::new(2 * i64::MAX as i128 + 2)),
            acc.evaluate().unwrap()
        );

        let mut acc = creator(20, 0).create().unwrap();
        let err = acc.update_short(Some(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidInputType { .. }));
        assert_eq!(0, acc.non_nulls());
    }

    #[test]
    fn test_evaluate_out_of_range() {
        let mut acc = creator(38, 0).create().unwrap();
        acc.update_batch(&[d(TWO_126), d(TWO_126)]).unwrap();
        let err = acc.evaluate().unwrap_err();
        assert!(matches!(err, Error::EvaluateAggregate { .. }));
        assert!(err.is_out_of_range());
        assert!(err.to_string().contains("column price"), "{err}");
        assert!(format!("{err:?}").contains("Numeric value out of range"));

        // later rows bring the sum back into range
        acc.update(d(-TWO_126)).unwrap();
        assert_eq!(Some(Decimal128::new(TWO_126)), acc.evaluate().unwrap());
        acc.update(d(-TWO_126)).unwrap();
        assert_eq!(Some(Decimal128::ZERO), acc.evaluate().unwrap());
    }

    #[test]
    fn test_evaluate_precision() {
        let mut acc = creator(10, 0)
            .with_output_type(Decimal128Type::new(5, 0).unwrap())
            .create()
            .unwrap();
        acc.update_batch(&[d(99_999), d(1)]).unwrap();
        assert!(acc.evaluate().unwrap_err().is_out_of_range());

        let mut acc = creator(10, 0)
            .with_output_type(Decimal128Type::new(5, 0).unwrap())
            .with_options(DecimalSumOptions {
                enforce_declared_precision: false,
            })
            .create()
            .unwrap();
        acc.update_batch(&[d(99_999), d(1)]).unwrap();
        assert_eq!(Some(Decimal128::new(100_000)), acc.evaluate().unwrap());
    }

    #[test]
    fn test_state_and_merge_batch() {
        let creator = creator(38, 0);
        let mut partial1 = creator.create().unwrap();
        partial1.update_batch(&[d(TWO_126), d(TWO_126)]).unwrap();
        let mut partial2 = creator.create().unwrap();
        partial2.update_batch(&[None]).unwrap();
        let mut partial3 = creator.create().unwrap();
        partial3.update_batch(&[d(-TWO_126), d(-TWO_126), d(5)]).unwrap();

        let states = [partial1.state(), partial2.state(), partial3.state()];
        assert!(states.iter().all(|s| s.len() == ENCODED_ACCUMULATOR_LEN));

        let mut final_acc = creator.create().unwrap();
        final_acc.merge_batch(&states).unwrap();
        assert_eq!(5, final_acc.non_nulls());
        assert_eq!(Some(Decimal128::new(5)), final_acc.evaluate().unwrap());

        // merging only empty states still evaluates to null
        let mut final_acc = creator.create().unwrap();
        final_acc.merge_batch(&[partial2.state()]).unwrap();
        assert_eq!(None, final_acc.evaluate().unwrap());
    }

    #[test]
    fn test_merge_accumulators() {
        let creator = creator(38, 0);
        let mut lhs = creator.create().unwrap();
        lhs.update(d(TWO_126)).unwrap();
        let mut rhs = creator.create().unwrap();
        rhs.update(d(TWO_126)).unwrap();

        lhs.merge(&rhs).unwrap();
        assert_eq!(1, lhs.sum_state().overflow());
        assert_eq!(2, lhs.non_nulls());
        assert!(lhs.evaluate().is_err());
    }

    #[test]
    fn test_merge_invalid_state() {
        let mut acc = creator(38, 0).create().unwrap();
        let state = acc.state();
        let err = acc.merge_state(&state[..ENCODED_STATE_LEN]).unwrap_err();
        assert!(matches!(err, Error::DecodeState { .. }));

        let mut bad_version = state.to_vec();
        bad_version[0] = 2;
        assert!(acc.merge_state(&bad_version).is_err());
        assert_eq!(None, acc.evaluate().unwrap());
    }

    #[test]
    fn test_merge_scale_mismatch() {
        let mut lhs = creator(10, 2).create().unwrap();
        lhs.update(d(100)).unwrap();
        let mut rhs = creator(10, 3).create().unwrap();
        rhs.update(d(1_000)).unwrap();

        let err = lhs.merge(&rhs).unwrap_err();
        assert!(matches!(err, Error::InvalidInputType { .. }));
        assert_eq!(StatusCode::InvalidArguments, err.status_code());
        // nothing is merged
        assert_eq!(1, lhs.non_nulls());
        assert_eq!(Some(Decimal128::new(100)), lhs.evaluate().unwrap());

        // same scale with a different precision is fine
        let mut wide = creator(20, 2)
            .with_output_type(Decimal128Type::new(30, 2).unwrap())
            .create()
            .unwrap();
        wide.update(d(5)).unwrap();
        lhs.merge(&wide).unwrap();
        assert_eq!(Some(Decimal128::new(105)), lhs.evaluate().unwrap());
    }

    #[test]
    fn test_row_count_overflow() {
        let creator = creator(38, 0);
        let mut acc = creator.create().unwrap();
        acc.update(d(1)).unwrap();

        // a partial state that claims u64::MAX rows
        let mut state = BytesMut::new();
        DecimalSumState::new().encode_to(&mut state);
        state.put_u64_le(u64::MAX);

        let err = acc.merge_state(&state).unwrap_err();
        assert!(matches!(err, Error::RowCountOverflow { .. }));
        assert_eq!(StatusCode::Internal, err.status_code());
        // neither the count nor the sum moved
        assert_eq!(1, acc.non_nulls());
        assert_eq!(Some(Decimal128::new(1)), acc.evaluate().unwrap());

        let mut full = creator.create().unwrap();
        full.merge_state(&state).unwrap();
        assert_eq!(u64::MAX, full.non_nulls());
        let err = full.update(d(7)).unwrap_err();
        assert!(matches!(err, Error::RowCountOverflow { .. }));
        assert_eq!(DecimalSumState::new(), *full.sum_state());
        // nulls are not counted
        full.update(None).unwrap();
    }
}
