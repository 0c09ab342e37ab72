//! CPU-burn kernel: floating-point busy work.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{KernelError, ScriptError};
use crate::exec::RunContext;
use crate::kernel::{factory, Kernel};

#[derive(Debug, Deserialize)]
struct CpuConfig {
    flops: u64,
}

/// Burns a scripted number of floating-point operations, partitioned
/// across the rank group.
#[derive(Debug)]
pub struct CpuKernel {
    flops: u64,
}

impl CpuKernel {
    /// Construct from a `{"name": "cpu", "flops": N}` configuration object.
    pub fn from_config(config: &Value) -> Result<Box<dyn Kernel>, ScriptError> {
        let cfg: CpuConfig = factory::decode("cpu", config)?;
        if cfg.flops == 0 {
            return Err(ScriptError::KernelConfig {
                kernel: "cpu",
                reason: "`flops` must be >= 1".to_string(),
            });
        }
        Ok(Box::new(Self { flops: cfg.flops }))
    }
}

impl Kernel for CpuKernel {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), KernelError> {
        let share = ctx.split(self.flops);
        let timer = ctx.registry.timer("cpu");
        let series = ctx.registry.series("cpu-flops");

        ctx.registry.start(timer);
        let mut acc = 1.000_000_1_f64;
        for _ in 0..share.count {
            acc = std::hint::black_box(acc * 1.000_000_1 + 0.000_000_1);
        }
        std::hint::black_box(acc);
        ctx.registry.stop_time(timer, share.count);
        ctx.registry.add_sample(series, share.count as f64);

        tracing::debug!(rank = ctx.rank, flops = share.count, "cpu burn done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use serde_json::json;

    #[test]
    fn records_partitioned_flops() {
        let mut ctx = RunContext::new(0, 2, HarnessConfig::default());
        let mut kernel = CpuKernel::from_config(&json!({"name": "cpu", "flops": 1001})).unwrap();
        kernel.execute(&mut ctx).unwrap();
        let id = ctx.registry.lookup("cpu").unwrap();
        // Rank 0 holds the remainder unit on the first split.
        assert_eq!(ctx.registry.summary(id).count, 501);
    }

    #[test]
    fn zero_flops_is_a_config_error() {
        let err = CpuKernel::from_config(&json!({"name": "cpu", "flops": 0})).unwrap_err();
        assert!(matches!(err, ScriptError::KernelConfig { kernel: "cpu", .. }));
    }
}
