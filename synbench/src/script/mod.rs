//! Script model: the ordered frames and kernel lists of one run.
//!
//! A script is `{"frames": [[kernel, ...], ...]}`: an ordered array of
//! frames, each an ordered array of kernel configuration objects.
//! Construction is all-or-nothing at every level — a single malformed
//! kernel discards the whole script, and nothing executes.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::ScriptError;
use crate::kernel::{factory, Kernel};

/// One sequential phase of the script.
#[derive(Debug)]
pub struct Frame {
    /// Zero-based position of this frame in the script.
    pub index: usize,
    /// Kernels to execute, in order.
    pub kernels: Vec<Box<dyn Kernel>>,
}

/// The full scripted job: an ordered list of frames.
#[derive(Debug)]
pub struct Script {
    /// Frames in execution order.
    pub frames: Vec<Frame>,
}

impl Script {
    /// Load and construct a script from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ScriptError> {
        let text = fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: Value = serde_json::from_str(&text)?;
        Self::from_json(&doc)
    }

    /// Construct a script from an already-parsed configuration document.
    ///
    /// Builds each kernel list into a temporary sequence; the first failing
    /// element discards everything already constructed and fails the whole
    /// script.
    pub fn from_json(doc: &Value) -> Result<Self, ScriptError> {
        let frames = doc
            .get("frames")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ScriptError::Malformed("script document has no `frames` array".to_string())
            })?;

        let mut built = Vec::with_capacity(frames.len());
        for (index, frame) in frames.iter().enumerate() {
            let configs = frame.as_array().ok_or_else(|| {
                ScriptError::Malformed(format!("frame {index} is not a kernel array"))
            })?;
            let kernels = configs
                .iter()
                .enumerate()
                .map(|(position, config)| {
                    factory::build(config).inspect_err(|err| {
                        tracing::error!(frame = index, position, %err, "kernel construction failed");
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            built.push(Frame { index, kernels });
        }
        Ok(Self { frames: built })
    }

    /// Number of frames in the script.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the script has no frames at all.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_frames_in_order() {
        let doc = json!({
            "frames": [
                [{"name": "cpu", "flops": 100}],
                [{"name": "sleep", "seconds": 0.0}, {"name": "memory", "kb": 1}]
            ]
        });
        let script = Script::from_json(&doc).unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(script.frames[0].kernels.len(), 1);
        assert_eq!(script.frames[1].kernels.len(), 2);
        assert_eq!(script.frames[1].index, 1);
        assert_eq!(script.frames[1].kernels[1].name(), "memory");
    }

    #[test]
    fn one_bad_kernel_discards_the_whole_script() {
        // Two valid specs followed by one invalid: no partial list survives.
        let doc = json!({
            "frames": [[
                {"name": "cpu", "flops": 100},
                {"name": "memory", "kb": 1},
                {"name": "warp-drive"}
            ]]
        });
        let err = Script::from_json(&doc).unwrap_err();
        assert!(matches!(err, ScriptError::UnknownKernel(_)));
    }

    #[test]
    fn missing_frames_array_is_malformed() {
        let err = Script::from_json(&json!({"phases": []})).unwrap_err();
        assert!(matches!(err, ScriptError::Malformed(_)));
    }

    #[test]
    fn non_array_frame_is_malformed() {
        let err = Script::from_json(&json!({"frames": [42]})).unwrap_err();
        assert!(matches!(err, ScriptError::Malformed(_)));
    }

    #[test]
    fn scripts_render_for_diagnostics() {
        // Kernels carry a Debug bound so failed constructions and driver
        // diagnostics can show the offending script.
        let doc = json!({"frames": [[{"name": "cpu", "flops": 1}]]});
        let script = Script::from_json(&doc).unwrap();
        let rendered = format!("{script:?}");
        assert!(rendered.contains("CpuKernel"));
    }

    #[test]
    fn empty_script_is_valid() {
        let script = Script::from_json(&json!({"frames": []})).unwrap();
        assert!(script.is_empty());
    }
}
