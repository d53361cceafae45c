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

use common_config::Configurable;
use common_telemetry::logging::LoggingOptions;
use serde::{Deserialize, Serialize};

/// Options of the decimal `SUM` aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimalSumOptions {
    /// Whether finalize rejects a sum with more digits than the declared
    /// precision of the output type. When disabled only sums outside 128 bits
    /// are rejected.
    pub enforce_declared_precision: bool,
}

impl Default for DecimalSumOptions {
    fn default() -> Self {
        Self {
            enforce_declared_precision: true,
        }
    }
}

/// Options of the function crate, loadable from a TOML file and environment
/// variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionOptions {
    pub logging: LoggingOptions,
    pub decimal_sum: DecimalSumOptions,
}

impl Configurable for FunctionOptions {}
