//! `SELECT Title, Score, ViewCount, CommentsCount FROM Posts WHERE AnswerCount = n`
//!
//! Every post is sent to the reducer for its answer count; only the reducer
//! for the wanted count emits anything. The posts table is read either as a
//! CSV export with a header row (`sql-select`) or as a StackExchange XML
//! dump with one `<row>` per post (`sql-select-xml`).

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::format::{Format, Record};
use crate::standalone::engine::{self, MapContext, ReduceContext};
use crate::workload::columns::Columns;
use crate::{Job, Value};

const SELECTED: [&str; 4] = ["Title", "Score", "ViewCount", "CommentsCount"];
const FILTERED: &str = "AnswerCount";

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    /// Answer count of the posts to select
    #[clap(long, default_value = "0")]
    answer_count: String,
}

pub struct Select {
    columns: Option<Columns>,
    answer_count: String,
}

impl Select {
    /// `columns` names the fields of CSV rows; XML rows carry their own.
    pub fn new(columns: Option<Columns>, answer_count: impl Into<String>) -> Self {
        Self {
            columns,
            answer_count: answer_count.into(),
        }
    }

    /// A missing XML attribute reads as the empty string.
    fn field<'r>(&self, record: &'r Record, name: &str) -> Result<&'r str> {
        match record {
            Record::Row { fields, .. } => match &self.columns {
                Some(columns) => columns.get(fields, name),
                None => bail!("no header to look up column `{name}` in"),
            },
            Record::Attributes(attributes) => Ok(attributes.get(name).map_or("", String::as_str)),
            other => bail!("select reads table rows, got {other:?}"),
        }
    }

    pub fn map(&self, record: Record, cx: &mut MapContext<String, Vec<String>, Value>) -> Result<()> {
        let answer_count = self.field(&record, FILTERED)?;
        if answer_count.is_empty() {
            return Ok(());
        }
        let selected = SELECTED
            .iter()
            .map(|name| self.field(&record, name).map(str::to_owned))
            .collect::<Result<Vec<_>>>()?;
        cx.emit_intermediate(answer_count.to_string(), selected);
        Ok(())
    }

    pub fn reduce(
        &self,
        answer_count: &str,
        posts: Vec<Vec<String>>,
        cx: &mut ReduceContext<Value>,
    ) -> Result<()> {
        if answer_count != self.answer_count {
            return Ok(());
        }
        for post in posts {
            cx.emit(Value::tuple([Value::from(answer_count), Value::strings(post)]));
        }
        Ok(())
    }
}

/// Runs the select over CSV exports sharing the header of the first one.
pub fn run_csv(job: &Job) -> Result<Vec<Value>> {
    let first = job
        .inputs
        .first()
        .context("sql-select needs the posts table as input")?;
    let columns = Columns::read(first)?;
    select(job, Format::CsvSkipFirstLine, Some(columns))
}

pub fn run_xml(job: &Job) -> Result<Vec<Value>> {
    select(job, Format::XmlRow, None)
}

fn select(job: &Job, format: Format, columns: Option<Columns>) -> Result<Vec<Value>> {
    let args: Args = job.parse_args()?;
    let select = Select::new(columns, args.answer_count);

    Ok(engine::run(
        job.mode,
        job.inputs.clone(),
        format,
        |record, cx| select.map(record, cx),
        |answer_count, posts, cx| select.reduce(answer_count, posts, cx),
    )?)
}
