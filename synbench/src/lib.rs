//! # Synbench
//!
//! Configuration-driven synthetic workload harness for rank-parallel
//! clusters: replays a scripted sequence of resource-consuming kernels
//! (CPU burn, file I/O, memory touch, idle time) across a fixed group of
//! cooperating ranks, measures timing and volume for every operation, and
//! merges all ranks' measurements into one reproducible JSON artifact.
//!
//! ## Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        exec::Driver                         │
//! │     frame loop · fail-soft kernel lists · run context       │
//! ├──────────────┬──────────────────────┬───────────────────────┤
//! │   script     │       kernel         │        stats          │
//! │  • frames    │  • Kernel trait      │  • StatLogger         │
//! │  • all-or-   │  • name-dispatch     │  • TimeSeries         │
//! │    nothing   │    factory           │  • StatsRegistry      │
//! │    build     │  • cpu/memory/file   │  • frame chunks       │
//! ├──────────────┴──────────────────────┴───────────────────────┤
//! │   partition              comm                report         │
//! │  rotating remainder     two-phase gather    bounded encode  │
//! │  window + cursor        (lengths, bytes)    + artifact      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution Model
//!
//! SPMD: every rank runs the identical driver loop single-threaded and
//! synchronously; the two gather phases of the aggregation protocol are
//! the only points where ranks wait for each other. All per-rank mutable
//! state (the statistics registry and the partitioner cursor) lives in an
//! explicit [`RunContext`] rather than globals, so independent runs are
//! isolated by construction.
//!
//! ## Quick Start
//!
//! ```no_run
//! use synbench::{Driver, HarnessConfig, RunContext, Script, SoloComm};
//!
//! let doc = serde_json::json!({
//!     "frames": [
//!         [{"name": "cpu", "flops": 1_000_000}],
//!         [{"name": "file-write", "files": 4, "kb": 64},
//!          {"name": "file-read",  "files": 4, "kb": 64}],
//!     ]
//! });
//! let mut script = Script::from_json(&doc)?;
//! let mut ctx = RunContext::new(0, 1, HarnessConfig::from_env());
//! let outcome = Driver::run(&mut script, &mut ctx, &SoloComm)?;
//! println!("artifact: {:?}", outcome.artifact);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

pub mod comm;
pub mod config;
pub mod error;
pub mod exec;
pub mod kernel;
pub mod notify;
pub mod partition;
pub mod report;
pub mod script;
pub mod stats;

pub use comm::{Communicator, SoloComm, ThreadComm};
pub use config::HarnessConfig;
pub use error::{CommError, KernelError, ReportError, ScriptError};
pub use exec::{Driver, RunContext, RunOutcome};
pub use kernel::Kernel;
pub use partition::{distribute, Partitioner, Share};
pub use report::{Artifact, RankReport};
pub use script::{Frame, Script};
pub use stats::{RegistrySnapshot, StatSummary, StatsRegistry};
