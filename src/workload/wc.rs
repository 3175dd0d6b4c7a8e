//! A MapReduce-compatible implementation of word count.
//!
//! Every word of every line is sent to the reducer for that word, which
//! emits `(word, count)`. Words listed in the common-words file are left
//! out of the count.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use crate::format::{Format, Record};
use crate::standalone::engine::{self, MapContext, ReduceContext};
use crate::{utils, Job, Value};

pub const FORMAT: Format = Format::Text;

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    /// File of words to leave out of the count, whitespace separated
    #[clap(short, long)]
    common_words: Option<PathBuf>,

    /// Lowercase words and split on anything that is not a letter
    #[clap(short, long)]
    fold: bool,
}

pub struct WordCount {
    common_words: HashSet<String>,
    fold: bool,
}

impl WordCount {
    pub fn new<S: Into<String>>(common_words: impl IntoIterator<Item = S>, fold: bool) -> Self {
        Self {
            common_words: common_words.into_iter().map(Into::into).collect(),
            fold,
        }
    }

    pub fn map(&self, record: Record, cx: &mut MapContext<String, u64, Value>) -> Result<()> {
        let line = match record {
            Record::Line(line) => line,
            other => bail!("word count reads text lines, got {other:?}"),
        };

        let words: Vec<String> = if self.fold {
            line.split(|c: char| !c.is_alphabetic())
                .filter(|s| !s.is_empty())
                .map(|word| word.to_lowercase())
                .collect()
        } else {
            line.split_whitespace().map(str::to_owned).collect()
        };

        for word in words {
            if !self.common_words.contains(&word) {
                cx.emit_intermediate(word, 1);
            }
        }
        Ok(())
    }

    pub fn reduce(&self, word: &str, ones: Vec<u64>, cx: &mut ReduceContext<Value>) -> Result<()> {
        let count: u64 = ones.into_iter().sum();
        cx.emit(Value::tuple([Value::from(word), Value::Int(i64::try_from(count)?)]));
        Ok(())
    }
}

pub fn run(job: &Job) -> Result<Vec<Value>> {
    let args: Args = job.parse_args()?;
    let common_words = match &args.common_words {
        Some(path) => utils::read_to_string(path)?
            .split_whitespace()
            .map(str::to_owned)
            .collect(),
        None => Vec::new(),
    };
    let wc = WordCount::new(common_words, args.fold);

    Ok(engine::run(
        job.mode,
        job.inputs.clone(),
        FORMAT,
        |record, cx| wc.map(record, cx),
        |word, ones, cx| wc.reduce(word, ones, cx),
    )?)
}
