//! Matrix multiplication in one MapReduce stage.
//!
//! Each CSV row is one cell of either matrix: `matrix,i,j,value`, where
//! `matrix` is `A` or `B`. There is one reducer per cell of the product:
//! A[i][j] is sent to every (i, k) and B[j][k] to every (i, k), and the
//! reducer for (i, k) sums A[i][j] * B[j][k] over matching j.

use anyhow::{bail, Context, Result};
use clap::Parser;
use itertools::Itertools;

use crate::format::{Format, Record};
use crate::standalone::engine::{self, MapContext, ReduceContext};
use crate::{Job, Value};

pub const FORMAT: Format = Format::Csv;

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    /// Number of rows of A
    #[clap(long, default_value_t = 9)]
    rows_a: usize,

    /// Number of columns of B
    #[clap(long, default_value_t = 3)]
    cols_b: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Matrix {
    A,
    B,
}

/// One cell of an input matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub matrix: Matrix,
    pub row: usize,
    pub col: usize,
    pub value: i64,
}

impl Cell {
    fn parse(fields: &[String]) -> Result<Self> {
        let (matrix, row, col, value) = match fields {
            [matrix, row, col, value] => (matrix, row, col, value),
            _ => bail!("expected `matrix,i,j,value`, got {} fields", fields.len()),
        };
        let matrix = match matrix.trim() {
            "A" | "a" => Matrix::A,
            "B" | "b" => Matrix::B,
            other => bail!("unknown matrix `{other}`"),
        };
        Ok(Cell {
            matrix,
            row: row.trim().parse().context("bad row index")?,
            col: col.trim().parse().context("bad column index")?,
            value: value.trim().parse().context("bad cell value")?,
        })
    }
}

pub struct MatrixMultiply {
    rows_a: usize,
    cols_b: usize,
}

impl MatrixMultiply {
    pub fn new(rows_a: usize, cols_b: usize) -> Self {
        Self { rows_a, cols_b }
    }

    pub fn map(&self, record: Record, cx: &mut MapContext<(usize, usize), Cell, Value>) -> Result<()> {
        let fields = match record {
            Record::Row { fields, .. } => fields,
            other => bail!("matrix multiply reads CSV rows, got {other:?}"),
        };
        let cell = Cell::parse(&fields)?;
        match cell.matrix {
            Matrix::A => {
                for k in 0..self.cols_b {
                    cx.emit_intermediate((cell.row, k), cell);
                }
            }
            Matrix::B => {
                for i in 0..self.rows_a {
                    cx.emit_intermediate((i, cell.col), cell);
                }
            }
        }
        Ok(())
    }

    pub fn reduce(
        &self,
        &(i, k): &(usize, usize),
        cells: Vec<Cell>,
        cx: &mut ReduceContext<Value>,
    ) -> Result<()> {
        let (a, b): (Vec<Cell>, Vec<Cell>) = cells.into_iter().partition(|c| c.matrix == Matrix::A);
        let total = a
            .iter()
            .cartesian_product(&b)
            .filter(|(a, b)| a.col == b.row)
            .try_fold(0i64, |total, (a, b)| {
                a.value
                    .checked_mul(b.value)
                    .and_then(|product| total.checked_add(product))
            })
            .with_context(|| format!("product cell ({i}, {k}) overflows i64"))?;
        cx.emit(Value::tuple([
            Value::from(i.to_string()),
            Value::from(k.to_string()),
            Value::Int(total),
        ]));
        Ok(())
    }
}

pub fn run(job: &Job) -> Result<Vec<Value>> {
    let args: Args = job.parse_args()?;
    let mm = MatrixMultiply::new(args.rows_a, args.cols_b);

    Ok(engine::run(
        job.mode,
        job.inputs.clone(),
        FORMAT,
        |record, cx| mm.map(record, cx),
        |key, cells, cx| mm.reduce(key, cells, cx),
    )?)
}
