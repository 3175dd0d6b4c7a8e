//! Converts MapReduce application names to actual application code.
//!
//! # Example
//!
//! To get the word count application:
//! ```
//! # use anyhow::Result;
//! use mrlab::workload;
//! # fn main() -> Result<()> {
//! let wc = workload::named("wc")?;
//! assert_eq!(wc.format, mrlab::Format::Text);
//! # Ok(())
//! # }
//! ```

use crate::format::Format;
use crate::Workload;
use anyhow::{bail, Result};

pub mod columns;
pub mod duplicate_images;
pub mod inverted_index;
pub mod matrix_mult;
pub mod recommend_books;
pub mod sql_group_by;
pub mod sql_join;
pub mod sql_select;
pub mod wc;

const REGISTRY: &[(&str, Workload)] = &[
    (
        "wc",
        Workload {
            format: wc::FORMAT,
            run_fn: wc::run,
        },
    ),
    (
        "matrix-mult",
        Workload {
            format: matrix_mult::FORMAT,
            run_fn: matrix_mult::run,
        },
    ),
    (
        "sql-select",
        Workload {
            format: Format::CsvSkipFirstLine,
            run_fn: sql_select::run_csv,
        },
    ),
    (
        "sql-select-xml",
        Workload {
            format: Format::XmlRow,
            run_fn: sql_select::run_xml,
        },
    ),
    (
        "sql-join",
        Workload {
            format: sql_join::FORMAT,
            run_fn: sql_join::run,
        },
    ),
    (
        "sql-group-by",
        Workload {
            format: sql_group_by::FORMAT,
            run_fn: sql_group_by::run,
        },
    ),
    (
        "duplicate-images",
        Workload {
            format: duplicate_images::FORMAT,
            run_fn: duplicate_images::run,
        },
    ),
    (
        "recommend-books",
        Workload {
            format: recommend_books::FORMAT,
            run_fn: recommend_books::run,
        },
    ),
    (
        "inverted-index",
        Workload {
            format: inverted_index::FORMAT,
            run_fn: inverted_index::run,
        },
    ),
];

/// Gets the [`Workload`] named `name`.
///
/// Returns [`None`] if no application with the given name was found.
pub fn try_named(name: &str) -> Option<Workload> {
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, workload)| *workload)
}

/// Gets the [`Workload`] named `name`.
///
/// Returns an [`anyhow::Error`] if no application with the given name was found.
pub fn named(name: &str) -> Result<Workload> {
    match try_named(name) {
        Some(app) => Ok(app),
        None => bail!("No app named `{}` found.", name),
    }
}

/// Names and input formats of every registered application.
pub fn list() -> impl Iterator<Item = (&'static str, Format)> {
    REGISTRY.iter().map(|(name, workload)| (*name, workload.format))
}
