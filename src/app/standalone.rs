use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;
use mrlab::standalone::{Args, Commands};
use mrlab::*;

fn init_logging() {
    Builder::from_env(Env::default().default_filter_or("warn"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

fn submit(job: Job) -> Result<()> {
    let app = workload::named(&job.workload)?;
    info!(
        "running `{}` over {} input(s) as {} ({:?})",
        job.workload,
        job.inputs.len(),
        app.format,
        job.mode
    );
    let results = app
        .run(&job)
        .with_context(|| format!("job `{}` failed", job.workload))?;

    let encoding = app.format.encoding();
    let written = match &job.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create output file `{}`", path.display()))?;
            write_results(BufWriter::new(file), encoding, &results)?
        }
        None => write_results(BufWriter::new(io::stdout().lock()), encoding, &results)?,
    };
    info!("wrote {} results", written);
    Ok(())
}

fn write_results<W: Write>(writer: W, encoding: Encoding, results: &[Value]) -> Result<usize> {
    let mut sink = ResultSink::new(writer, encoding);
    sink.write_all(results)?;
    let written = sink.written();
    sink.finish()?;
    Ok(written)
}

fn main() -> Result<()> {
    init_logging();

    match Args::parse().command {
        Commands::Submit {
            input,
            workload,
            output,
            parallel,
            args,
        } => {
            let inputs = utils::expand_inputs(&input)?
                .into_iter()
                .map(Source::File)
                .collect();
            let mode = if parallel { Mode::Parallel } else { Mode::Sequential };
            let mut job = Job::new(workload, inputs).with_args(args).with_mode(mode);
            job.output = output;
            submit(job)
        }
        Commands::Workloads => {
            for (name, format) in workload::list() {
                println!("{name}\t{format}");
            }
            Ok(())
        }
    }
}
