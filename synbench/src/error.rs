//! Error types for the synbench workload harness.
//!
//! Each concern carries its own enum, mirroring the error taxonomy of the
//! harness: script construction fails hard before anything executes, kernel
//! execution fails soft, and aggregation degrades rather than aborts.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while constructing a script from a configuration document.
///
/// Any of these is fatal to the affected script: construction is
/// all-or-nothing and nothing executes when it fails.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Reading the script file from disk failed.
    #[error("failed to read script {path:?}: {source}")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The script file is not well-formed JSON.
    #[error("script is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document structure does not match the expected
    /// `{"frames": [[kernel, ...], ...]}` shape.
    #[error("malformed script: {0}")]
    Malformed(String),

    /// A kernel configuration names no known kernel kind.
    #[error("unknown kernel `{0}`")]
    UnknownKernel(String),

    /// A kernel configuration named a known kind but failed validation.
    #[error("invalid config for kernel `{kernel}`: {reason}")]
    KernelConfig {
        /// Kernel kind that rejected the configuration.
        kernel: &'static str,
        /// Human-readable validation failure.
        reason: String,
    },
}

/// Errors raised by a kernel while executing its simulated workload.
///
/// These are recorded and logged but never halt the surrounding kernel
/// list; the last one observed is the list's result.
#[derive(Debug, Error)]
pub enum KernelError {
    /// An I/O operation inside a simulated workload failed.
    #[error("i/o failure in `{kernel}`: {source}")]
    Io {
        /// Kernel kind that hit the failure.
        kernel: &'static str,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A file read returned fewer bytes than the script promised.
    #[error("short read in `{kernel}`: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Kernel kind that hit the failure.
        kernel: &'static str,
        /// Bytes the script declared for the file.
        expected: u64,
        /// Bytes actually read.
        actual: u64,
    },
}

/// Errors raised by collective operations between ranks.
#[derive(Debug, Error)]
pub enum CommError {
    /// A group member disconnected mid-collective.
    #[error("collective failed: group member disconnected")]
    Disconnected,

    /// The coordinator gave up waiting for a rank's contribution.
    #[error("collective timed out waiting for rank {rank}")]
    Timeout {
        /// Rank that never arrived.
        rank: usize,
    },

    /// A gathered payload did not match the length announced in phase one.
    #[error("rank {rank} sent {actual} bytes, announced {announced}")]
    LengthMismatch {
        /// Rank whose payload disagreed with its announcement.
        rank: usize,
        /// Length gathered in phase one.
        announced: u64,
        /// Length of the payload actually received.
        actual: u64,
    },

    /// A phase-one message did not decode as a length.
    #[error("rank {rank} sent a malformed length announcement")]
    BadLength {
        /// Rank that sent the malformed announcement.
        rank: usize,
    },
}

/// Errors raised while aggregating per-rank reports into the final artifact.
///
/// Only a coordinator-side write failure surfaces to the caller; everything
/// else degrades to a partial artifact.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Encoding the per-rank report to JSON failed.
    #[error("failed to encode rank report: {0}")]
    Encode(#[source] serde_json::Error),

    /// Writing the final artifact to disk failed on the coordinator.
    #[error("failed to write artifact {path:?}: {source}")]
    Write {
        /// Artifact path that could not be written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}
