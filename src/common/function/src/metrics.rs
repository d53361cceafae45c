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

use lazy_static::lazy_static;
use prometheus::*;

pub const RESULT_OK: &str = "ok";
pub const RESULT_OUT_OF_RANGE: &str = "out_of_range";

lazy_static! {
    /// Counter of finalized decimal sums, by result.
    pub static ref DECIMAL_SUM_FINALIZE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "greptime_decimal_sum_finalize_total",
        "decimal sum finalize total",
        &["result"]
    )
    .unwrap();
    pub static ref DECIMAL_SUM_FINALIZE_OK: IntCounter = DECIMAL_SUM_FINALIZE_TOTAL
        .with_label_values(&[RESULT_OK]);
    pub static ref DECIMAL_SUM_FINALIZE_OUT_OF_RANGE: IntCounter = DECIMAL_SUM_FINALIZE_TOTAL
        .with_label_values(&[RESULT_OUT_OF_RANGE]);

    /// Counter of merges whose partial sums crossed the 128-bit window.
    pub static ref DECIMAL_SUM_MERGE_OVERFLOW_TOTAL: IntCounter = register_int_counter!(
        "greptime_decimal_sum_merge_overflow_total",
        "decimal sum merges that carried out of 128 bits"
    )
    .unwrap();
}
