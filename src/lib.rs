//! A single-process MapReduce (lab) engine.
//!
//! Users pick an input [`Format`], hand the engine a mapper and a reducer,
//! and get back the results the reducer emitted. Everything runs in memory
//! in one process: records are mapped, values are grouped by key in an
//! [`IntermediateStore`], and every key is reduced once the map phase is
//! over. The [`workload`] module bundles a set of example applications.

use std::fmt;

use itertools::Itertools;
use serde::Serialize;

pub mod error;
pub mod format;
pub mod sink;
pub mod standalone;
pub mod store;
pub mod utils;
pub mod workload;

pub use error::{Error, Result};
pub use format::{Format, Image, Location, Record, Records, Source};
pub use sink::{Encoding, ResultSink};
pub use standalone::engine::{execute, execute_parallel, MapContext, Mode, ReduceContext};
pub use standalone::Job;
pub use store::IntermediateStore;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// Runs a whole application for a job and returns its results.
///
/// Applications parse their own auxiliary arguments from [`Job::args`].
pub type RunFn = fn(job: &Job) -> anyhow::Result<Vec<Value>>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    /// The format the application reads its input in.
    pub format: Format,
    pub run_fn: RunFn,
}

impl Workload {
    pub fn run(&self, job: &Job) -> anyhow::Result<Vec<Value>> {
        (self.run_fn)(job)
    }
}

/////////////////////////////////////////////////////////////////////////////
// Result values
/////////////////////////////////////////////////////////////////////////////

/// The shapes results of the bundled applications take.
///
/// Displayed as plain text for text jobs (tuples as comma-joined elements)
/// and serialized as JSON scalars and arrays for JSON jobs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Str(String),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    /// A tuple of strings.
    pub fn strings<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        Value::Tuple(items.into_iter().map(|s| Value::Str(s.into())).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Tuple(items) => write!(f, "{}", items.iter().format(",")),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_tuples_display_flat() {
        let value = Value::tuple([
            Value::from("0"),
            Value::strings(["no answers", "5", "10", "2"]),
        ]);
        assert_eq!(value.to_string(), "0,no answers,5,10,2");
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"["0",["no answers","5","10","2"]]"#
        );
    }
}
