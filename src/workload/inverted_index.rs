//! Builds an inverted index from words to the documents containing them.
//!
//! Every input line is a JSON array `[document_id, text]`.

use anyhow::{bail, Result};
use itertools::Itertools;
use serde_json::Value as Json;

use crate::format::{Format, Record};
use crate::standalone::engine::{self, MapContext, ReduceContext};
use crate::{Job, Value};

pub const FORMAT: Format = Format::Json;

pub fn map(record: Record, cx: &mut MapContext<String, String, Value>) -> Result<()> {
    let document = match record {
        Record::Json(document) => document,
        other => bail!("inverted index reads JSON documents, got {other:?}"),
    };
    let (id, text) = match &document {
        Json::Array(items) => match items.as_slice() {
            [Json::String(id), Json::String(text)] => (id, text),
            _ => bail!("expected `[document_id, text]`, got {document}"),
        },
        _ => bail!("expected `[document_id, text]`, got {document}"),
    };

    for word in text.split_whitespace() {
        cx.emit_intermediate(word.to_string(), id.clone());
    }
    Ok(())
}

/// Emits `[word, [document_id, ...]]`, each document listed once.
pub fn reduce(word: &String, documents: Vec<String>, cx: &mut ReduceContext<Value>) -> Result<()> {
    cx.emit(Value::tuple([
        Value::from(word.as_str()),
        Value::strings(documents.into_iter().unique()),
    ]));
    Ok(())
}

pub fn run(job: &Job) -> Result<Vec<Value>> {
    Ok(engine::run(job.mode, job.inputs.clone(), FORMAT, map, reduce)?)
}
