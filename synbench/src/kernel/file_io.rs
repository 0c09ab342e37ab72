//! File kernels: write and read back scratch files.
//!
//! The scripted file count is partitioned across ranks; file names are
//! derived from the global file index, so a `file-read` kernel with the
//! same `files` count (and an unmoved partitioner cursor) reads back the
//! files its rank previously wrote.

use std::fs;
use std::io::{Read, Write};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{KernelError, ScriptError};
use crate::exec::RunContext;
use crate::kernel::{factory, Kernel};

#[derive(Debug, Deserialize)]
struct FileConfig {
    files: u64,
    kb: u64,
}

impl FileConfig {
    fn validate(self, kernel: &'static str) -> Result<Self, ScriptError> {
        if self.files == 0 || self.kb == 0 {
            return Err(ScriptError::KernelConfig {
                kernel,
                reason: "`files` and `kb` must both be >= 1".to_string(),
            });
        }
        Ok(self)
    }
}

fn scratch_file(ctx: &RunContext, index: u64) -> std::path::PathBuf {
    ctx.config.scratch_dir.join(format!("synbench-{index:08}.dat"))
}

/// Writes this rank's share of the scripted files into the scratch
/// directory, one sized file per global index.
#[derive(Debug)]
pub struct FileWriteKernel {
    files: u64,
    kb: u64,
    written: Vec<u64>,
}

impl FileWriteKernel {
    /// Construct from a `{"name": "file-write", "files": N, "kb": S}`
    /// configuration object.
    pub fn from_config(config: &Value) -> Result<Box<dyn Kernel>, ScriptError> {
        let cfg = factory::decode::<FileConfig>("file-write", config)?.validate("file-write")?;
        Ok(Box::new(Self {
            files: cfg.files,
            kb: cfg.kb,
            written: Vec::new(),
        }))
    }
}

impl Kernel for FileWriteKernel {
    fn name(&self) -> &'static str {
        "file-write"
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), KernelError> {
        let share = ctx.split(self.files);
        let volume = ctx.registry.volume("file-write");
        let series = ctx.registry.series("files-written");

        fs::create_dir_all(&ctx.config.scratch_dir).map_err(|source| KernelError::Io {
            kernel: "file-write",
            source,
        })?;

        let payload = vec![0x5au8; (self.kb * 1024) as usize];
        let mut last_error = None;
        for index in share.first_index..share.first_index + share.count {
            let path = scratch_file(ctx, index);
            ctx.registry.start(volume);
            let result = fs::File::create(&path).and_then(|mut file| {
                file.write_all(&payload)?;
                file.sync_all()
            });
            match result {
                Ok(()) => {
                    ctx.registry.stop_bytes(volume, payload.len() as u64);
                    ctx.registry.add_sample(series, 1.0);
                    self.written.push(index);
                }
                Err(source) => {
                    // Close the measurement window without attributing work.
                    ctx.registry.stop_bytes(volume, 0);
                    tracing::error!(rank = ctx.rank, path = %path.display(), %source, "file write failed");
                    last_error = Some(KernelError::Io {
                        kernel: "file-write",
                        source,
                    });
                }
            }
        }
        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn cleanup(&mut self, ctx: &mut RunContext) {
        for index in self.written.drain(..) {
            let path = scratch_file(ctx, index);
            if let Err(source) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), %source, "scratch file cleanup failed");
            }
        }
    }
}

/// Reads back this rank's share of the scripted files, verifying each
/// file's size against the scripted size.
#[derive(Debug)]
pub struct FileReadKernel {
    files: u64,
    kb: u64,
}

impl FileReadKernel {
    /// Construct from a `{"name": "file-read", "files": N, "kb": S}`
    /// configuration object.
    pub fn from_config(config: &Value) -> Result<Box<dyn Kernel>, ScriptError> {
        let cfg = factory::decode::<FileConfig>("file-read", config)?.validate("file-read")?;
        Ok(Box::new(Self {
            files: cfg.files,
            kb: cfg.kb,
        }))
    }
}

impl Kernel for FileReadKernel {
    fn name(&self) -> &'static str {
        "file-read"
    }

    fn execute(&mut self, ctx: &mut RunContext) -> Result<(), KernelError> {
        let share = ctx.split(self.files);
        let volume = ctx.registry.volume("file-read");
        let series = ctx.registry.series("files-read");
        let expected = self.kb * 1024;

        let mut buffer = Vec::with_capacity(expected as usize);
        let mut last_error = None;
        for index in share.first_index..share.first_index + share.count {
            let path = scratch_file(ctx, index);
            buffer.clear();
            ctx.registry.start(volume);
            let result = fs::File::open(&path).and_then(|mut file| file.read_to_end(&mut buffer));
            match result {
                Ok(read) => {
                    ctx.registry.stop_bytes(volume, read as u64);
                    ctx.registry.add_sample(series, 1.0);
                    if (read as u64) < expected {
                        tracing::error!(
                            rank = ctx.rank,
                            path = %path.display(),
                            read,
                            expected,
                            "short read"
                        );
                        last_error = Some(KernelError::ShortRead {
                            kernel: "file-read",
                            expected,
                            actual: read as u64,
                        });
                    }
                }
                Err(source) => {
                    ctx.registry.stop_bytes(volume, 0);
                    tracing::error!(rank = ctx.rank, path = %path.display(), %source, "file read failed");
                    last_error = Some(KernelError::Io {
                        kernel: "file-read",
                        source,
                    });
                }
            }
        }
        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn context_in(dir: &TempDir) -> RunContext {
        let mut config = HarnessConfig::default();
        config.scratch_dir = dir.path().to_path_buf();
        RunContext::new(0, 1, config)
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context_in(&dir);
        let mut writer =
            FileWriteKernel::from_config(&json!({"name": "file-write", "files": 3, "kb": 2}))
                .unwrap();
        let mut reader =
            FileReadKernel::from_config(&json!({"name": "file-read", "files": 3, "kb": 2}))
                .unwrap();

        writer.execute(&mut ctx).unwrap();
        reader.execute(&mut ctx).unwrap();

        let read = ctx.registry.lookup("file-read").unwrap();
        let summary = ctx.registry.summary(read);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.sum_bytes, Some(3.0 * 2048.0));

        writer.cleanup(&mut ctx);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_files_fail_soft_per_file() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context_in(&dir);
        let mut reader =
            FileReadKernel::from_config(&json!({"name": "file-read", "files": 2, "kb": 1}))
                .unwrap();
        let err = reader.execute(&mut ctx).unwrap_err();
        assert!(matches!(err, KernelError::Io { kernel: "file-read", .. }));
        // Both files were still attempted.
        let read = ctx.registry.lookup("file-read").unwrap();
        assert_eq!(ctx.registry.summary(read).count, 2);
    }
}
