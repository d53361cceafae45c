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

use common_error::ext::{fmt_stack_debug, ErrorExt, StackError};
use common_error::status_code::StatusCode;
use snafu::{Location, Snafu};

#[derive(Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Value does not fit in 128 bits: {}", reason))]
    ConstructionOutOfRange {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Negating {} overflows 128 bits", value))]
    NegateOverflow {
        value: i128,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Invalid decimal precision {}, expect a value in [1, {}]",
        precision,
        max
    ))]
    InvalidPrecision {
        precision: u8,
        max: u8,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Invalid decimal scale {} for precision {}, expect a value in [0, precision]",
        scale,
        precision
    ))]
    InvalidScale {
        precision: u8,
        scale: i8,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    fn location(&self) -> &Location {
        match self {
            Error::ConstructionOutOfRange { location, .. }
            | Error::NegateOverflow { location, .. }
            | Error::InvalidPrecision { location, .. }
            | Error::InvalidScale { location, .. } => location,
        }
    }
}

impl StackError for Error {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
        buf.push(format!("{layer}: {self}, at {}", self.location()));
    }

    fn next(&self) -> Option<&dyn StackError> {
        None
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
            // Column types are validated upstream, hitting these is a bug.
            Error::ConstructionOutOfRange { .. } | Error::NegateOverflow { .. } => {
                StatusCode::Unexpected
            }

            Error::InvalidPrecision { .. } | Error::InvalidScale { .. } => {
                StatusCode::InvalidArguments
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
