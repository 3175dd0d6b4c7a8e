//! Second-level book recommendations.
//!
//! Each CSV row is a book followed by the books recommended for it. If A
//! recommends B, readers of A may like what B recommends too: the reducer
//! for the pair (A, B) recommends to A whatever B's list has that A's does
//! not, and the other way around.

use std::iter;

use anyhow::{bail, ensure, Result};
use itertools::Itertools;

use crate::format::{Format, Record};
use crate::standalone::engine::{self, MapContext, ReduceContext};
use crate::{Job, Value};

pub const FORMAT: Format = Format::Csv;

/// An unordered pair of books, smaller title first.
pub type Pair = (String, String);

pub fn map(record: Record, cx: &mut MapContext<Pair, Vec<String>, Value>) -> Result<()> {
    let books: Vec<String> = match record {
        Record::Row { fields, .. } => fields
            .into_iter()
            .map(|book| book.trim().to_string())
            .filter(|book| !book.is_empty())
            .collect(),
        other => bail!("recommendations read CSV rows, got {other:?}"),
    };

    let Some((book, recommended)) = books.split_first() else {
        return Ok(());
    };
    for other in recommended {
        let pair = if book <= other {
            (book.clone(), other.clone())
        } else {
            (other.clone(), book.clone())
        };
        cx.emit_intermediate(pair, books.clone());
    }
    Ok(())
}

pub fn reduce((a, b): &Pair, lists: Vec<Vec<String>>, cx: &mut ReduceContext<Value>) -> Result<()> {
    let mut for_a: &[String] = &[];
    let mut for_b: &[String] = &[];
    for list in &lists {
        if list.first() == Some(a) {
            for_a = list;
        } else {
            for_b = list;
        }
    }

    for recommendation in [second_level(a, for_a, for_b), second_level(b, for_b, for_a)]
        .into_iter()
        .flatten()
    {
        cx.emit(recommendation);
    }
    Ok(())
}

/// `book` followed by what `theirs` recommends and `ours` does not.
fn second_level(book: &str, ours: &[String], theirs: &[String]) -> Option<Value> {
    if ours.is_empty() {
        return None;
    }
    let new: Vec<&String> = theirs
        .iter()
        .filter(|&candidate| !ours.contains(candidate))
        .unique()
        .collect();
    if new.is_empty() {
        return None;
    }
    Some(Value::strings(iter::once(book).chain(new.into_iter().map(String::as_str))))
}

pub fn run(job: &Job) -> Result<Vec<Value>> {
    ensure!(job.args.is_empty(), "recommend-books takes no arguments");

    Ok(engine::run(job.mode, job.inputs.clone(), FORMAT, map, reduce)?)
}
