use std::path::PathBuf;

use clap::Parser;
use log::{info, LevelFilter};

use rnnoise_config::{load_config, InvokerConfig};
use rnnoise_engine::GateDenoiser;
use rnnoise_task::logging::setup_logging;
use rnnoise_task::{run_benchmark, BenchOptions, MemorySnapshot};
use rnnoise_worker::{Invoker, TransformHandle};

/// Time frame denoising on a bounded-stack worker with a per-frame deadline.
#[derive(Parser, Debug)]
#[command(name = "rnnoise_bench", version)]
struct Args {
    /// Timed invocations after the warm-up frame
    #[arg(short = 'n', long, default_value_t = 50)]
    iterations: usize,

    /// Per-frame deadline in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Worker stack size in bytes
    #[arg(long)]
    stack_bytes: Option<usize>,

    /// Extra wait for a timed-out worker to stop, in milliseconds (default 0)
    #[arg(long)]
    grace_ms: Option<u64>,

    /// Seed for the synthetic input frames
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// JSON file with invoker settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Print memory statistics before and after the run
    #[arg(long)]
    memory: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut InvokerConfig) {
        if let Some(v) = self.deadline_ms {
            config.deadline_ms = v;
        }
        if let Some(v) = self.stack_bytes {
            config.stack_bytes = v;
        }
        if let Some(v) = self.grace_ms {
            config.grace_ms = v;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    setup_logging(level, args.log_file.as_deref())?;

    let mut config = load_config(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    config.validate()?;
    info!(
        "Worker stack {} bytes, deadline {} ms, grace {} ms",
        config.stack_bytes, config.deadline_ms, config.grace_ms
    );

    if args.memory {
        println!("\n{}\n", MemorySnapshot::capture());
    }

    let invoker = Invoker::new(&config);
    let mut handle = TransformHandle::new(GateDenoiser::new());
    let options = BenchOptions {
        iterations: args.iterations,
        seed: args.seed,
    };

    let report = run_benchmark(&invoker, &mut handle, &options, GateDenoiser::new);

    let avg = report.average();
    println!("rnnoise_process_frame {} usec", avg.as_micros());
    println!("rnnoise_process_frame {} msec", avg.as_millis());
    if !report.all_completed() {
        println!(
            "{} timeouts, {} failures out of {} frames",
            report.timeouts, report.failures, report.iterations
        );
    }

    if args.memory {
        println!("\n{}\n", MemorySnapshot::capture());
    }

    Ok(())
}
