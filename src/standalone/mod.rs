use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::format::Source;
use engine::Mode;

pub mod engine;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a job to completion in this process
    Submit {
        /// Glob spec for the input files. Repeat for jobs reading several
        /// inputs; they are read in the order given.
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Name of the workload
        #[arg(short, long)]
        workload: String,

        /// Write results to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Map and reduce on a thread pool
        #[arg(long)]
        parallel: bool,

        /// Auxiliary arguments to pass to the MapReduce application.
        #[clap(value_parser, last = true)]
        args: Vec<String>,
    },
    /// List the workloads that can be submitted
    Workloads,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub inputs: Vec<Source>,
    pub workload: String,
    pub output: Option<PathBuf>,
    pub args: Vec<String>,
    pub mode: Mode,
}

impl Job {
    pub fn new(workload: impl Into<String>, inputs: Vec<Source>) -> Self {
        Self {
            inputs,
            workload: workload.into(),
            output: None,
            args: Vec::new(),
            mode: Mode::default(),
        }
    }

    pub fn with_args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Parses the auxiliary arguments with a workload's own parser.
    pub fn parse_args<A: Parser>(&self) -> anyhow::Result<A> {
        A::try_parse_from(&self.args)
            .with_context(|| format!("invalid arguments for workload `{}`", self.workload))
    }
}
