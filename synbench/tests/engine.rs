//! End-to-end driver behavior on a single rank.

use serde_json::json;
use tempfile::TempDir;

use synbench::{Artifact, Driver, HarnessConfig, RunContext, Script, ScriptError, SoloComm};

fn config_in(dir: &TempDir) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.output_path = dir.path().join("results.json");
    config.scratch_dir = dir.path().join("scratch");
    config.notify = None;
    config
}

#[test]
fn full_solo_run_writes_a_parseable_artifact() {
    let dir = TempDir::new().unwrap();
    let doc = json!({
        "frames": [
            [{"name": "cpu", "flops": 10_000}],
            [{"name": "file-write", "files": 2, "kb": 4},
             {"name": "file-read",  "files": 2, "kb": 4}],
            [{"name": "memory", "kb": 16}]
        ]
    });
    let mut script = Script::from_json(&doc).unwrap();
    let mut ctx = RunContext::new(0, 1, config_in(&dir));

    let outcome = Driver::run(&mut script, &mut ctx, &SoloComm).unwrap();
    assert!(outcome.last_error.is_none());
    let path = outcome.artifact.expect("coordinator writes the artifact");

    let artifact: Artifact = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(artifact.tag, "SYNBENCH-RESULTS");
    assert_eq!(artifact.ranks.len(), 1);

    let rank0 = &artifact.ranks[0];
    assert_eq!(rank0.rank, 0);
    assert!(rank0.measurements.stats.contains_key("cpu"));
    assert!(rank0.measurements.stats.contains_key("file-write"));
    assert!(rank0.measurements.stats.contains_key("file-read"));
    assert!(rank0.measurements.stats.contains_key("memory"));
    // One durations entry per frame.
    assert_eq!(rank0.measurements.time_series["durations"].len(), 3);
    // The file kernels sampled their frame only.
    assert_eq!(rank0.measurements.time_series["files-written"], vec![0.0, 2.0, 0.0]);
}

#[test]
fn scratch_files_are_cleaned_up_at_teardown() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let scratch = config.scratch_dir.clone();
    let doc = json!({
        "frames": [[{"name": "file-write", "files": 3, "kb": 1}]]
    });
    let mut script = Script::from_json(&doc).unwrap();
    let mut ctx = RunContext::new(0, 1, config);
    Driver::run(&mut script, &mut ctx, &SoloComm).unwrap();
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
}

#[test]
fn failing_kernel_still_yields_an_artifact() {
    let dir = TempDir::new().unwrap();
    // file-read with nothing written: every read fails, the cpu kernel in
    // the same list must still run, and aggregation must still happen.
    let doc = json!({
        "frames": [
            [{"name": "file-read", "files": 2, "kb": 1},
             {"name": "cpu", "flops": 1000}]
        ]
    });
    let mut script = Script::from_json(&doc).unwrap();
    let mut ctx = RunContext::new(0, 1, config_in(&dir));

    let outcome = Driver::run(&mut script, &mut ctx, &SoloComm).unwrap();
    assert!(outcome.last_error.is_some());
    let path = outcome.artifact.unwrap();

    let artifact: Artifact = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let rank0 = &artifact.ranks[0];
    // The later kernel executed despite the earlier failure.
    assert!(rank0.measurements.stats["cpu"].count > 0);
    // Both reads were attempted.
    assert_eq!(rank0.measurements.stats["file-read"].count, 2);
}

#[test]
fn invalid_script_builds_nothing() {
    let doc = json!({
        "frames": [
            [{"name": "cpu", "flops": 100}],
            [{"name": "memory", "kb": 1}, {"name": "gravity-assist"}]
        ]
    });
    let err = Script::from_json(&doc).unwrap_err();
    assert!(matches!(err, ScriptError::UnknownKernel(name) if name == "gravity-assist"));
}
