//! Sleep kernel: scripted idle time.
//!
//! Not partitioned: every rank idles for the scripted duration, modelling
//! a phase where the simulated job waits on something external.

use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{KernelError, ScriptError};
use crate::exec::RunContext;
use crate::kernel::{factory, Kernel};

#[derive(Debug, Deserialize)]
struct SleepConfig {
    seconds: f64,
}

/// Sleeps for a scripted number of wall-clock seconds.
#[derive(Debug)]
pub struct SleepKernel {
    duration: Duration,
}

impl SleepKernel {
    /// Construct from a `{"name": "sleep", "seconds": F}` configuration
    /// object.
    pub fn from_config(config: &Value) -> Result<Box<dyn Kernel>, ScriptError> {
        let cfg: SleepConfig = factory::decode("sleep", config)?;
        if !cfg.seconds.is_finite() || cfg.seconds < 0.0 {
            return Err(ScriptError::KernelConfig {
                kernel: "sleep",
                reason: "`seconds` must be a finite non-negative number".to_string(),
            });
        }
        Ok(Box::new(Self {
            duration: Duration::from_secs_f64(cfg.seconds),
        }))
    }
}

impl Kernel for SleepKernel {
    fn name(&self) -> &'static str {
        "sleep"
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), KernelError> {
        let timer = ctx.registry.timer("sleep");
        ctx.registry.start(timer);
        thread::sleep(self.duration);
        ctx.registry.stop_time(timer, 1);
        Ok(())
    }
}
