//! Memory kernel: allocate and touch a partitioned buffer.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{KernelError, ScriptError};
use crate::exec::RunContext;
use crate::kernel::{factory, Kernel};

/// Stride used when touching the allocation, one write per page.
const PAGE: usize = 4096;

#[derive(Debug, Deserialize)]
struct MemoryConfig {
    kb: u64,
}

/// Allocates this rank's share of a scripted buffer size and touches every
/// page so the pages are actually faulted in.
#[derive(Debug)]
pub struct MemoryKernel {
    kb: u64,
}

impl MemoryKernel {
    /// Construct from a `{"name": "memory", "kb": N}` configuration object.
    pub fn from_config(config: &Value) -> Result<Box<dyn Kernel>, ScriptError> {
        let cfg: MemoryConfig = factory::decode("memory", config)?;
        if cfg.kb == 0 {
            return Err(ScriptError::KernelConfig {
                kernel: "memory",
                reason: "`kb` must be >= 1".to_string(),
            });
        }
        Ok(Box::new(Self { kb: cfg.kb }))
    }
}

impl Kernel for MemoryKernel {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), KernelError> {
        let share = ctx.split(self.kb);
        let bytes = (share.count * 1024) as usize;
        let volume = ctx.registry.volume("memory");
        let series = ctx.registry.series("memory-kb");

        ctx.registry.start(volume);
        let mut buffer = vec![0u8; bytes];
        for offset in (0..buffer.len()).step_by(PAGE) {
            buffer[offset] = offset as u8;
        }
        std::hint::black_box(&buffer);
        ctx.registry.stop_bytes(volume, bytes as u64);
        ctx.registry.add_sample(series, share.count as f64);

        tracing::debug!(rank = ctx.rank, kb = share.count, "memory touch done");
        Ok(())
    }
}
