mod aggregate;
mod config;
mod error;
mod helpers;
mod manager;
mod myprocess;
mod render;
mod source;
mod supervisor;

use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
    process,
};

use env_logger::Env;
use gumdrop::Options;
use log::info;

use crate::{
    aggregate::SubtreeCache,
    config::Config,
    error::Error,
    helpers::format_size,
    manager::Snapshot,
    render::{render_summary, render_tree},
    source::{Host, ProcessSource, SourceKind},
};

const USAGE: &str = "Usage: memtree [options] [min_memory_mb]

min_memory_mb is a non-negative number of megabytes, default 0.";

#[derive(Options)]
struct Args {
    #[options(free, help = "Hide tree lines below this many megabytes, not negative")]
    free: Vec<String>,

    #[options(short = "s", help = "Hide summary section")]
    no_summary: bool,

    #[options(short = "t", help = "Hide process tree")]
    no_tree: bool,

    #[options(count, help = "More logging on stderr, repeat for more")]
    verbose: u32,

    #[options(no_short, help = "Process source", meta = "<ps|sysinfo>")]
    source: Option<SourceKind>,

    #[options(no_short, help = "Rows in the summary", meta = "N")]
    top: Option<usize>,

    #[options(no_short, help = "Share of total memory above which a supervisor is unwrapped", meta = "F")]
    threshold: Option<f64>,

    #[options(no_short, help = "Config file", meta = "<FILE>")]
    config: Option<PathBuf>,

    #[options(help = "Show this help")]
    help: bool,
}

impl Args {
    /// Last numeric free argument, `0` when there is none.
    fn min_memory(&self) -> Result<f64, Error> {
        let mut min_memory = 0.;
        for arg in &self.free {
            match arg.parse::<f64>() {
                Ok(value) if value.is_finite() => min_memory = value,
                _ => return Err(Error::InvalidArgument(arg.clone())),
            }
        }
        Ok(min_memory)
    }

    fn apply(&self, mut config: Config) -> Config {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(top) = self.top {
            config.top = top;
        }
        if let Some(threshold) = self.threshold {
            config.supervisor.threshold = threshold;
        }
        config
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let ops = match Args::parse_args_default(&args) {
        Ok(ops) => ops,
        Err(e) => {
            eprintln!("Invalid argument: {e}");
            process::exit(1);
        }
    };
    if ops.help_requested() {
        println!("{USAGE}");
        println!();
        println!("{}", Args::usage());
        return;
    }
    let min_memory = match ops.min_memory() {
        Ok(min_memory) => min_memory,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let level = match ops.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = ops.apply(Config::load(ops.config.as_deref()));
    let host = source::open(config.source);
    let mut out = BufWriter::new(io::stdout().lock());
    if let Err(e) = run(&ops, &config, min_memory, &*host, &mut out) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Nothing is written to `out` unless the process listing succeeded.
fn run<W: Write>(
    ops: &Args,
    config: &Config,
    min_memory: f64,
    host: &dyn Host,
    out: &mut W,
) -> Result<(), Error> {
    let rows = host.list_processes();
    if rows.is_empty() {
        return Err(Error::NoProcesses);
    }
    let snapshot = Snapshot::build(rows, host);
    info!(
        "{} processes holding {}",
        snapshot.len(),
        format_size(snapshot.total_memory())
    );

    let layout = config.layout();
    let mut cache = SubtreeCache::new(&snapshot);
    if !ops.no_summary {
        render_summary(out, &snapshot, &mut cache, &config.supervisor, &layout)?;
    }
    if !ops.no_tree {
        render_tree(out, &snapshot, &mut cache, min_memory, &layout)?;
    }
    out.flush()?;
    Ok(())
}
