//! Column-name lookups for tables read with a header row.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};

use crate::format::{self, Source};

/// Maps the column names of a header row to their positions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    pub fn from_header<S: AsRef<str>>(header: impl IntoIterator<Item = S>) -> Self {
        let index = header
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.as_ref().trim().to_string(), i))
            .collect();
        Self { index }
    }

    /// Reads the header row of `source`.
    pub fn read(source: &Source) -> Result<Self> {
        let header = format::read_header(source)
            .with_context(|| format!("reading the header of `{}`", source.name()))?;
        Ok(Self::from_header(header))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("table has no column `{name}`"))
    }

    /// The field of `row` under column `name`.
    pub fn get<'r>(&self, row: &'r [String], name: &str) -> Result<&'r str> {
        let position = self.position(name)?;
        row.get(position)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("row has no field for column `{name}`"))
    }
}
