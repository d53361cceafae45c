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
use config::ConfigError;
use snafu::{Location, Snafu};

#[derive(Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to load layered config"))]
    LoadLayeredConfig {
        #[snafu(source)]
        error: ConfigError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to serde json"))]
    SerdeJson {
        #[snafu(source)]
        error: serde_json::error::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to serialize options to TOML"))]
    TomlFormat {
        #[snafu(source)]
        error: toml::ser::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl StackError for Error {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
        match self {
            Error::LoadLayeredConfig { error, location } => {
                buf.push(format!("{layer}: {self}, at {location}"));
                buf.push(format!("{}: {error:?}", layer + 1));
            }
            Error::SerdeJson { error, location } => {
                buf.push(format!("{layer}: {self}, at {location}"));
                buf.push(format!("{}: {error:?}", layer + 1));
            }
            Error::TomlFormat { error, location } => {
                buf.push(format!("{layer}: {self}, at {location}"));
                buf.push(format!("{}: {error:?}", layer + 1));
            }
        }
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
            Error::LoadLayeredConfig { .. }
            | Error::SerdeJson { .. }
            | Error::TomlFormat { .. } => StatusCode::InvalidArguments,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
