//! Name-dispatch kernel construction.
//!
//! Every kernel configuration object carries a `name` field; the factory
//! maps known names to type-specific constructors. The set of kernel kinds
//! is a static table — explicit registration, statically enumerable, no
//! reflection.

use serde_json::Value;

use crate::error::ScriptError;
use crate::kernel::{cpu, file_io, memory, sleep, Kernel};

/// Constructor signature shared by all kernel kinds.
pub type Constructor = fn(&Value) -> Result<Box<dyn Kernel>, ScriptError>;

/// The static dispatch table of known kernel kinds.
pub const BUILTIN_KERNELS: &[(&str, Constructor)] = &[
    ("cpu", cpu::CpuKernel::from_config),
    ("memory", memory::MemoryKernel::from_config),
    ("file-write", file_io::FileWriteKernel::from_config),
    ("file-read", file_io::FileReadKernel::from_config),
    ("sleep", sleep::SleepKernel::from_config),
];

/// Build one kernel from its configuration object.
///
/// Fails with a diagnostic (and no kernel) when the `name` field is
/// missing, names an unknown kind, or the kind rejects the configuration.
pub fn build(config: &Value) -> Result<Box<dyn Kernel>, ScriptError> {
    let name = config
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ScriptError::Malformed("kernel config is missing a `name` string field".to_string())
        })?;
    match BUILTIN_KERNELS.iter().find(|(kind, _)| *kind == name) {
        Some((_, constructor)) => constructor(config),
        None => Err(ScriptError::UnknownKernel(name.to_string())),
    }
}

/// Decode a kernel's typed configuration out of its JSON object.
///
/// Shared by the kernel constructors; maps decode failures onto
/// [`ScriptError::KernelConfig`] with the kind name attached.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    kernel: &'static str,
    config: &Value,
) -> Result<T, ScriptError> {
    serde_json::from_value(config.clone()).map_err(|err| ScriptError::KernelConfig {
        kernel,
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatches_known_names() {
        for (name, config) in [
            ("cpu", json!({"name": "cpu", "flops": 1000})),
            ("memory", json!({"name": "memory", "kb": 64})),
            ("file-write", json!({"name": "file-write", "files": 2, "kb": 4})),
            ("file-read", json!({"name": "file-read", "files": 2, "kb": 4})),
            ("sleep", json!({"name": "sleep", "seconds": 0.0})),
        ] {
            let kernel = build(&config).unwrap();
            assert_eq!(kernel.name(), name);
        }
    }

    #[test]
    fn unknown_name_fails_with_no_kernel() {
        let err = build(&json!({"name": "teleport"})).unwrap_err();
        assert!(matches!(err, ScriptError::UnknownKernel(name) if name == "teleport"));
    }

    #[test]
    fn missing_name_is_malformed() {
        let err = build(&json!({"flops": 10})).unwrap_err();
        assert!(matches!(err, ScriptError::Malformed(_)));
    }

    #[test]
    fn invalid_config_names_the_kind() {
        let err = build(&json!({"name": "cpu", "flops": "lots"})).unwrap_err();
        match err {
            ScriptError::KernelConfig { kernel, .. } => assert_eq!(kernel, "cpu"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
