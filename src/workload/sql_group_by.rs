//! Counts questions by the length of their title.
//!
//! ```sql
//! SELECT bucket(LENGTH(Title)), COUNT(*) FROM Posts
//! WHERE PostTypeId = 1 GROUP BY bucket(LENGTH(Title))
//! ```
//!
//! Posts without a title are left out. Tables without a `PostTypeId`
//! column are taken to hold questions only.

use anyhow::{bail, Context, Result};

use crate::format::{Format, Record};
use crate::standalone::engine::{self, MapContext, ReduceContext};
use crate::workload::columns::Columns;
use crate::{Job, Value};

pub const FORMAT: Format = Format::CsvSkipFirstLine;

/// The bucket a title of `len` characters falls in.
pub fn bucket(len: usize) -> &'static str {
    match len {
        0..=10 => "1_10",
        11..=20 => "11_20",
        21..=30 => "21_30",
        _ => "30+",
    }
}

pub struct GroupBy {
    columns: Columns,
}

impl GroupBy {
    pub fn new(columns: Columns) -> Self {
        Self { columns }
    }

    pub fn map(&self, record: Record, cx: &mut MapContext<&'static str, u64, Value>) -> Result<()> {
        let fields = match record {
            Record::Row { fields, .. } => fields,
            other => bail!("group by reads CSV rows, got {other:?}"),
        };

        let title = self.columns.get(&fields, "Title")?;
        if title.is_empty() {
            return Ok(());
        }
        if self.columns.contains("PostTypeId") && self.columns.get(&fields, "PostTypeId")? != "1" {
            return Ok(());
        }
        cx.emit_intermediate(bucket(title.chars().count()), 1);
        Ok(())
    }

    pub fn reduce(&self, bucket: &str, ones: Vec<u64>, cx: &mut ReduceContext<Value>) -> Result<()> {
        cx.emit(Value::from(format!("{bucket}->{}", ones.len())));
        Ok(())
    }
}

pub fn run(job: &Job) -> Result<Vec<Value>> {
    let first = job
        .inputs
        .first()
        .context("sql-group-by needs the posts table as input")?;
    let group_by = GroupBy::new(Columns::read(first)?);

    Ok(engine::run(
        job.mode,
        job.inputs.clone(),
        FORMAT,
        |record, cx| group_by.map(record, cx),
        |bucket, ones, cx| group_by.reduce(bucket, ones, cx),
    )?)
}
