//! Writes a job's results to an output stream.

use std::fmt::Display;
use std::io::Write;

use serde::Serialize;

use crate::error::Result;

/// Top-level encoding of the result stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Each result's `Display` form, one per line.
    Text,
    /// Each result as a JSON document, one per line.
    Json,
}

/// Serializes results one per line.
///
/// The sink decides the encoding only; shaping individual results is up to
/// the reducer that emitted them.
pub struct ResultSink<W: Write> {
    writer: W,
    encoding: Encoding,
    written: usize,
}

impl<W: Write> ResultSink<W> {
    pub fn new(writer: W, encoding: Encoding) -> Self {
        Self {
            writer,
            encoding,
            written: 0,
        }
    }

    pub fn write<R: Display + Serialize>(&mut self, result: &R) -> Result<()> {
        match self.encoding {
            Encoding::Text => writeln!(self.writer, "{result}")?,
            Encoding::Json => {
                serde_json::to_writer(&mut self.writer, result)?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.written += 1;
        Ok(())
    }

    pub fn write_all<'a, R, I>(&mut self, results: I) -> Result<()>
    where
        R: Display + Serialize + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        for result in results {
            self.write(result)?;
        }
        Ok(())
    }

    /// Number of results written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes the output and hands the writer back.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
