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
use std::sync::Arc;

use crate::status_code::StatusCode;

/// Extension to [`Error`](std::error::Error) in std.
pub trait ErrorExt: StackError {
    /// Map this error to [StatusCode].
    fn status_code(&self) -> StatusCode {
        StatusCode::Unknown
    }

    /// Returns the error as [Any](std::any::Any) so that it can be
    /// downcast to a specific implementation.
    fn as_any(&self) -> &dyn Any;

    /// The message shown to the end user.
    fn output_msg(&self) -> String
    where
        Self: Sized,
    {
        match self.status_code() {
            StatusCode::Unknown | StatusCode::Internal => {
                // masks internal error from end user
                format!("Internal error: {}", self.status_code() as u32)
            }
            _ => {
                let error = self.last();
                match root_source(error) {
                    Some(external_root) if error.to_string().is_empty() => {
                        format!("{external_root}")
                    }
                    Some(external_root) => format!("{error}: {external_root}"),
                    None => format!("{error}"),
                }
            }
        }
    }

    /// Find out root level error for nested error
    fn root_cause(&self) -> Option<&dyn std::error::Error>
    where
        Self: Sized,
    {
        root_source(self.last())
    }
}

/// An error that knows its position in a chain of layered errors.
pub trait StackError: std::error::Error {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>);

    fn next(&self) -> Option<&dyn StackError>;

    fn last(&self) -> &dyn StackError
    where
        Self: Sized,
    {
        let Some(mut result) = self.next() else {
            return self;
        };
        while let Some(err) = result.next() {
            result = err;
        }
        result
    }
}

impl<T: ?Sized + StackError> StackError for Arc<T> {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
        self.as_ref().debug_fmt(layer, buf)
    }

    fn next(&self) -> Option<&dyn StackError> {
        self.as_ref().next()
    }
}

impl<T: StackError> StackError for Box<T> {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
        self.as_ref().debug_fmt(layer, buf)
    }

    fn next(&self) -> Option<&dyn StackError> {
        self.as_ref().next()
    }
}

/// Writes the layered debug output of `err`, one layer per line.
///
/// Used as the `Debug` implementation of error enums so that `{:?}` prints
/// the whole stack with locations instead of the derived struct dump.
pub fn fmt_stack_debug(err: &dyn StackError, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut buf = vec![];
    err.debug_fmt(0, &mut buf);
    write!(f, "{}", buf.join("\n"))
}

fn root_source(error: &dyn StackError) -> Option<&dyn std::error::Error> {
    let mut current = error.source()?;
    while let Some(next) = current.source() {
        current = next;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockError;

    #[test]
    fn test_output_msg_masks_internal() {
        let err = MockError::new(StatusCode::Internal);
        assert_eq!("Internal error: 1003", err.output_msg());
    }

    #[test]
    fn test_output_msg_with_layers() {
        let inner = MockError::new(StatusCode::NumericValueOutOfRange);
        let err = MockError::with_source(StatusCode::InvalidArguments, inner);

        assert_eq!(StatusCode::InvalidArguments, err.status_code());
        assert_eq!("NumericValueOutOfRange", err.output_msg());
        assert!(err.root_cause().is_none());

        let mut buf = vec![];
        err.debug_fmt(0, &mut buf);
        assert_eq!(
            vec![
                "0: InvalidArguments".to_string(),
                "1: NumericValueOutOfRange".to_string()
            ],
            buf
        );
    }
}
