//! Command-line entry point for the workload harness.
//!
//! Usage: `synbench <script.json> [--ranks N] [--output PATH]`
//!
//! Spawns one thread per rank, links them with a channel-backed
//! communicator, and runs the identical driver loop on each. Configuration
//! errors exit non-zero before any workload runs; execution and
//! aggregation errors are diagnostics on stderr with the process still
//! completing and the artifact still written.

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;

use tracing_subscriber::EnvFilter;

use synbench::{Communicator, Driver, HarnessConfig, RunContext, Script, ThreadComm};

struct Args {
    script: PathBuf,
    ranks: usize,
    output: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut script = None;
    let mut ranks = 1usize;
    let mut output = None;
    let mut argv = env::args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--ranks" => {
                let value = argv.next().ok_or("--ranks needs a value")?;
                ranks = value
                    .parse()
                    .map_err(|_| format!("invalid rank count `{value}`"))?;
                if ranks == 0 {
                    return Err("--ranks must be >= 1".to_string());
                }
            }
            "--output" => {
                let value = argv.next().ok_or("--output needs a value")?;
                output = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                return Err(String::new());
            }
            other if script.is_none() && !other.starts_with('-') => {
                script = Some(PathBuf::from(other));
            }
            other => return Err(format!("unexpected argument `{other}`")),
        }
    }
    let script = script.ok_or("no script given")?;
    Ok(Args { script, ranks, output })
}

fn print_usage() {
    eprintln!("Usage: synbench <script.json> [--ranks N] [--output PATH]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SYNBENCH_OUTPUT   artifact path (overridden by --output)");
    eprintln!("  SYNBENCH_SCRATCH  scratch directory for file kernels");
    eprintln!("  SYNBENCH_NOTIFY   host:port completion-notification target");
    eprintln!("  SYNBENCH_LOG      trace verbosity (tracing env-filter syntax)");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SYNBENCH_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("synbench: {message}");
            }
            print_usage();
            process::exit(2);
        }
    };

    let mut config = HarnessConfig::from_env();
    if let Some(output) = args.output {
        config.output_path = output;
    }

    // Parse and validate the script once, before any rank starts: a
    // configuration error must abort with a diagnostic and nothing run.
    let doc: Arc<serde_json::Value> = match std::fs::read_to_string(&args.script)
        .map_err(|err| format!("failed to read {}: {err}", args.script.display()))
        .and_then(|text| {
            serde_json::from_str(&text).map_err(|err| format!("script is not valid JSON: {err}"))
        }) {
        Ok(doc) => Arc::new(doc),
        Err(message) => {
            eprintln!("synbench: {message}");
            process::exit(2);
        }
    };
    if let Err(err) = Script::from_json(&doc) {
        eprintln!("synbench: {err}");
        process::exit(2);
    }

    let nranks = args.ranks;
    tracing::info!(script = %args.script.display(), ranks = nranks, "starting run");

    let mut handles = Vec::with_capacity(nranks);
    for comm in ThreadComm::group(nranks) {
        let doc = Arc::clone(&doc);
        let config = config.clone();
        handles.push(thread::spawn(move || {
            // Validated above; reconstructed here because kernels hold
            // per-rank mutable state.
            let mut script = Script::from_json(&doc).expect("script validated before spawn");
            let mut ctx = RunContext::new(comm.rank(), nranks, config);
            Driver::run(&mut script, &mut ctx, &comm)
        }));
    }

    let mut exit_code = 0;
    for (rank, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(outcome)) => {
                if let Some(err) = outcome.last_error {
                    eprintln!("synbench: rank {rank}: {err}");
                    exit_code = 1;
                }
                if let Some(path) = outcome.artifact {
                    println!("{}", path.display());
                }
            }
            Ok(Err(err)) => {
                eprintln!("synbench: rank {rank}: {err}");
                exit_code = 1;
            }
            Err(_) => {
                eprintln!("synbench: rank {rank} panicked");
                exit_code = 1;
            }
        }
    }
    process::exit(exit_code);
}
