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

//! The lifecycle shared by aggregates that can run in partial stages.
//!
//! A decomposable aggregate is created once per group and stage (`init`),
//! fed with rows (`add_value`), merged with sibling partial states
//! (`combine`), and finally turned into a scalar (`finalize`). `combine` must
//! be associative and commutative so the shape of the merge tree never
//! changes the result.

pub mod decimal_sum;
pub mod sum_accumulator;

pub use decimal_sum::DecimalSumState;
pub use sum_accumulator::{DecimalSumAccumulator, DecimalSumAccumulatorCreator};

use crate::error::Result;

/// Returns the name of the state function for the given aggregate function name.
/// The state function runs in partial stages and outputs serialized states.
/// The state function's name is in the format `__<aggr_name>_state`
pub fn aggr_state_func_name(aggr_name: &str) -> String {
    format!("__{}_state", aggr_name)
}

/// Returns the name of the merge function for the given aggregate function name.
/// The merge function combines serialized states and outputs the final value.
/// The merge function's name is in the format `__<aggr_name>_merge`
pub fn aggr_merge_func_name(aggr_name: &str) -> String {
    format!("__{}_merge", aggr_name)
}

/// An aggregate whose computation can be split into independent partial
/// states that are merged later without the raw input.
pub trait DecomposableAggregate: Sized {
    /// A single input row.
    type Input;
    /// The finalized scalar.
    type Output;
    /// What finalize validates the result against, e.g. the output type.
    type Target: ?Sized;

    /// Creates the empty state of a group.
    fn init() -> Self;

    /// Accumulates one row.
    fn add_value(&mut self, value: Self::Input) -> Result<()>;

    /// Merges two partial states into a new one, leaving both inputs intact.
    fn combine(self, other: &Self) -> Result<Self>;

    /// Consumes the state and produces the final value.
    fn finalize(self, target: &Self::Target) -> Result<Self::Output>;
}

/// Reduces partial states pairwise, level by level, like a balanced merge
/// tree. Returns an initial state when `states` is empty.
pub fn combine_tree<A: DecomposableAggregate>(mut states: Vec<A>) -> Result<A> {
    while states.len() > 1 {
        let mut next = Vec::with_capacity(states.len().div_ceil(2));
        let mut iter = states.into_iter();
        while let Some(lhs) = iter.next() {
            match iter.next() {
                Some(rhs) => next.push(lhs.combine(&rhs)?),
                None => next.push(lhs),
            }
        }
        states = next;
    }
    Ok(states.pop().unwrap_or_else(A::init))
}

/// Accumulates every partition into its own state, then merges the partial
/// states with [`combine_tree`].
pub fn aggregate_partitions<A, P>(partitions: P) -> Result<A>
where
    A: DecomposableAggregate,
    P: IntoIterator,
    P::Item: IntoIterator<Item = A::Input>,
{
    let partials = partitions
        .into_iter()
        .map(|partition| -> Result<A> {
            let mut state = A::init();
            for value in partition {
                state.add_value(value)?;
            }
            Ok(state)
        })
        .collect::<Result<Vec<_>>>()?;
    combine_tree(partials)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sum of i64 into i128, enough to check the tree helpers.
    #[derive(Debug, PartialEq)]
    struct Total(i128);

    impl DecomposableAggregate for Total {
        type Input = i64;
        type Output = i128;
        type Target = ();

        fn init() -> Self {
            Total(0)
        }

        fn add_value(&mut self, value: i64) -> Result<()> {
            self.0 += value as i128;
            Ok(())
        }

        fn combine(self, other: &Self) -> Result<Self> {
            Ok(Total(self.0 + other.0))
        }

        fn finalize(self, _target: &()) -> Result<i128> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_func_names() {
        assert_eq!("__sum_state", aggr_state_func_name("sum"));
        assert_eq!("__sum_merge", aggr_merge_func_name("sum"));
    }

    #[test]
    fn test_combine_tree() {
        assert_eq!(Total(0), combine_tree::<Total>(vec![]).unwrap());
        assert_eq!(Total(3), combine_tree(vec![Total(3)]).unwrap());
        // odd number of states keeps the last one for the next level
        let states = (1..=5).map(Total).collect::<Vec<_>>();
        assert_eq!(Total(15), combine_tree(states).unwrap());
    }

    #[test]
    fn test_aggregate_partitions() {
        let partitions = vec![vec![1_i64, 2], vec![], vec![3, 4, 5]];
        let total: Total = aggregate_partitions(partitions).unwrap();
        assert_eq!(15, total.finalize(&()).unwrap());
    }
}
