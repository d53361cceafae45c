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

use std::any::Any;
use std::fmt;

use common_decimal::Decimal128Type;
use common_error::ext::{fmt_stack_debug, ErrorExt, StackError};
use common_error::status_code::StatusCode;
use snafu::{Location, Snafu};

#[derive(Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Numeric value out of range for {}: {}", data_type, reason))]
    NumericValueOutOfRange {
        data_type: Decimal128Type,
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Overflow counter of decimal sum exceeds i64, current: {}, delta: {}",
        current,
        delta
    ))]
    InternalCounterOverflow {
        current: i64,
        delta: i128,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Row count of aggregate exceeds u64, current: {}, delta: {}",
        current,
        delta
    ))]
    RowCountOverflow {
        current: u64,
        delta: u64,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to decode aggregate state: {}", reason))]
    DecodeState {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid input type: {}", err_msg))]
    InvalidInputType {
        err_msg: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid decimal type"))]
    Decimal {
        source: common_decimal::error::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to evaluate aggregate {} on column {}", aggregate, column))]
    EvaluateAggregate {
        aggregate: String,
        column: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl StackError for Error {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
        match self {
            Error::NumericValueOutOfRange { location, .. }
            | Error::InternalCounterOverflow { location, .. }
            | Error::RowCountOverflow { location, .. }
            | Error::DecodeState { location, .. }
            | Error::InvalidInputType { location, .. } => {
                buf.push(format!("{layer}: {self}, at {location}"));
            }
            Error::Decimal { source, location } => {
                buf.push(format!("{layer}: {self}, at {location}"));
                source.debug_fmt(layer + 1, buf);
            }
            Error::EvaluateAggregate {
                source, location, ..
            } => {
                buf.push(format!("{layer}: {self}, at {location}"));
                source.debug_fmt(layer + 1, buf);
            }
        }
    }

    fn next(&self) -> Option<&dyn StackError> {
        match self {
            Error::Decimal { source, .. } => Some(source),
            Error::EvaluateAggregate { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_stack_debug(self, f)
    }
}

impl ErrorExt for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NumericValueOutOfRange { .. } => StatusCode::NumericValueOutOfRange,

            Error::InternalCounterOverflow { .. } | Error::RowCountOverflow { .. } => {
                StatusCode::Internal
            }

            Error::DecodeState { .. } | Error::InvalidInputType { .. } => {
                StatusCode::InvalidArguments
            }

            Error::Decimal { source, .. } => source.status_code(),
            Error::EvaluateAggregate { source, .. } => source.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Error {
    /// Returns true if the error means the sum does not fit its output type.
    pub fn is_out_of_range(&self) -> bool {
        self.status_code() == StatusCode::NumericValueOutOfRange
    }
}
