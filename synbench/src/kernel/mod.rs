//! Kernels: named, configured units of simulated workload.
//!
//! A kernel is constructed by name from a JSON configuration object (see
//! [`factory`]), consumes its share of the scripted work from the run
//! context's partitioner, and records measurements into the statistics
//! registry. Kernels stay deliberately thin: the interesting control flow
//! lives in the partitioner, the registry, and the execution driver.

pub mod cpu;
pub mod factory;
pub mod file_io;
pub mod memory;
pub mod sleep;

use crate::error::KernelError;
use crate::exec::RunContext;

/// One named, configured unit of simulated work.
///
/// The driver invokes [`execute`](Self::execute) once per scripted
/// occurrence and [`cleanup`](Self::cleanup) once at script teardown.
/// Execution errors are recorded and logged but do not halt the list the
/// kernel belongs to.
pub trait Kernel: std::fmt::Debug {
    /// Kind name this kernel was dispatched under.
    fn name(&self) -> &'static str;

    /// Run the simulated workload, recording into the registry.
    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), KernelError>;

    /// Release any resources the kernel created (scratch files and the
    /// like). Defaults to a no-op.
    fn cleanup(&mut self, _ctx: &mut RunContext) {}
}
