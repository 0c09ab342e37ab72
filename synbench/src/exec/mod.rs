//! Execution driver: the frame loop and the per-rank run context.
//!
//! Every rank runs the identical loop: open the time-series window, execute
//! each frame's kernel list in order, close one time-series chunk at each
//! frame boundary, then run the aggregation protocol and (best effort) the
//! completion notification.
//!
//! Kernel failures are fail-soft by design: one failing operation must not
//! invalidate the rest of a benchmark run, so every kernel in a list still
//! executes and only the last error observed is surfaced.

use std::path::PathBuf;

use crate::comm::Communicator;
use crate::config::HarnessConfig;
use crate::error::{KernelError, ReportError};
use crate::kernel::Kernel;
use crate::notify;
use crate::partition::{Partitioner, Share};
use crate::report;
use crate::script::Script;
use crate::stats::StatsRegistry;

/// Per-rank mutable state, passed explicitly to every component.
///
/// The registry and the partitioner cursor live here instead of in
/// process-global state, so independent runs (and tests) are isolated by
/// construction: a fresh `RunContext` is the only reset mechanism.
#[derive(Debug)]
pub struct RunContext {
    /// This process's rank index.
    pub rank: usize,
    /// Size of the rank group.
    pub nranks: usize,
    /// Measurement store for this rank.
    pub registry: StatsRegistry,
    /// Work-distribution cursor for this rank.
    pub partitioner: Partitioner,
    /// Settings shared by the whole run.
    pub config: HarnessConfig,
}

impl RunContext {
    /// A fresh context for one rank of a group.
    ///
    /// # Panics
    ///
    /// Panics when `rank >= nranks` or the group is empty.
    pub fn new(rank: usize, nranks: usize, config: HarnessConfig) -> Self {
        assert!(nranks >= 1, "rank group must not be empty");
        assert!(rank < nranks, "rank {rank} out of range for {nranks} ranks");
        Self {
            rank,
            nranks,
            registry: StatsRegistry::new(),
            partitioner: Partitioner::new(),
            config,
        }
    }

    /// Split `total` work units across the group, advancing the cursor.
    pub fn split(&mut self, total: u64) -> Share {
        self.partitioner.split(total, self.rank, self.nranks)
    }
}

/// Outcome of a full run on one rank.
#[derive(Debug)]
pub struct RunOutcome {
    /// Last kernel error observed during frame execution, if any.
    pub last_error: Option<KernelError>,
    /// Artifact path, present on the coordinating rank only.
    pub artifact: Option<PathBuf>,
}

/// Execute every kernel in the list, in order, continuing past failures.
///
/// Returns `Err` with the last error observed, or `Ok` when every kernel
/// succeeded.
pub fn execute_kernels(
    kernels: &mut [Box<dyn Kernel>],
    ctx: &mut RunContext,
) -> Result<(), KernelError> {
    let mut last_error = None;
    for kernel in kernels {
        if let Err(err) = kernel.execute(ctx) {
            tracing::error!(rank = ctx.rank, kernel = kernel.name(), %err, "kernel failed");
            last_error = Some(err);
        }
    }
    match last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// The sequential frame-by-frame execution driver.
#[derive(Debug, Default)]
pub struct Driver;

impl Driver {
    /// Run the whole script on this rank, aggregate, and notify.
    ///
    /// Execution errors are fail-soft and end up in
    /// [`RunOutcome::last_error`]; aggregation has already been attempted
    /// by the time they are returned. The only hard error is the
    /// coordinator failing to encode or write the artifact.
    pub fn run(
        script: &mut Script,
        ctx: &mut RunContext,
        comm: &dyn Communicator,
    ) -> Result<RunOutcome, ReportError> {
        debug_assert_eq!(ctx.rank, comm.rank());
        debug_assert_eq!(ctx.nranks, comm.size());

        ctx.registry.start_window();
        let mut last_error = None;
        for frame in &mut script.frames {
            tracing::debug!(
                rank = ctx.rank,
                frame = frame.index,
                kernels = frame.kernels.len(),
                "frame start"
            );
            if let Err(err) = execute_kernels(&mut frame.kernels, ctx) {
                last_error = Some(err);
            }
            let duration = ctx.registry.close_chunk();
            tracing::debug!(rank = ctx.rank, frame = frame.index, duration, "frame closed");
        }

        tracing::debug!(
            rank = ctx.rank,
            frames = ctx.registry.frames_closed(),
            carry = ctx.partitioner.carry(),
            "script complete"
        );

        // Script teardown: every kernel's cleanup runs exactly once, in
        // script order, after the last frame.
        for frame in &mut script.frames {
            for kernel in &mut frame.kernels {
                kernel.cleanup(ctx);
            }
        }

        let artifact = report::aggregate(ctx, comm)?;
        if let (Some(path), Some(target)) = (&artifact, &ctx.config.notify) {
            notify::send_completion(target, path);
        }
        Ok(RunOutcome { last_error, artifact })
    }
}
