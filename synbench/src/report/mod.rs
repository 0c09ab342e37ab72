//! Aggregation protocol: merging per-rank measurements into one artifact.
//!
//! After the last frame, every rank serializes its registry snapshot into a
//! bounded JSON buffer and the group runs the two-phase gather described in
//! [`crate::comm`]. The coordinator re-parses each remote slice, skips
//! anything that does not parse, wraps the ordered per-rank list into the
//! canonical artifact, and writes it exactly once.
//!
//! Degradation rules, in order of preference: an oversized or unencodable
//! rank report becomes an empty contribution; an unparseable slice is
//! skipped; a failed collective leaves the coordinator with its own report
//! only. None of these abort the run — the artifact may under-represent a
//! misbehaving rank, but it materializes whenever the coordinator is
//! healthy.

use std::path::PathBuf;
use std::process;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::comm::Communicator;
use crate::config::reported_hostname;
use crate::error::ReportError;
use crate::exec::RunContext;
use crate::stats::RegistrySnapshot;

/// Upper bound on one rank's serialized report.
///
/// A report above this degrades to an empty contribution; the format has
/// no multi-part semantics, so oversized reports are never chunked.
pub const MAX_REPORT_BYTES: usize = 1024 * 1024;

/// Magic string identifying the artifact format.
pub const ARTIFACT_TAG: &str = "SYNBENCH-RESULTS";

/// Version of the artifact format.
pub const ARTIFACT_VERSION: u32 = 1;

/// One rank's contribution to the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankReport {
    /// The `stats` and `time_series` sections from the rank's registry.
    #[serde(flatten)]
    pub measurements: RegistrySnapshot,
    /// Hostname the rank ran on.
    pub host: String,
    /// Operating-system process id of the rank.
    pub pid: u32,
    /// Rank index within the group.
    pub rank: usize,
}

/// The canonical aggregated result document.
#[derive(Debug, Serialize, Deserialize)]
pub struct Artifact {
    /// Random identifier for this run.
    pub uid: String,
    /// Always [`ARTIFACT_TAG`].
    pub tag: String,
    /// Always [`ARTIFACT_VERSION`].
    pub version: u32,
    /// Version of the tool that produced the artifact.
    pub tool_version: String,
    /// Build identifier of the tool, `"dev"` for local builds.
    pub tool_build: String,
    /// Per-rank contributions, the coordinator's own first.
    pub ranks: Vec<RankReport>,
    /// RFC3339 creation timestamp.
    pub created: String,
}

impl Artifact {
    /// Wrap an ordered per-rank list into a canonical artifact.
    pub fn wrap(ranks: Vec<RankReport>) -> Self {
        Self {
            uid: format!("{:016x}", rand::random::<u64>()),
            tag: ARTIFACT_TAG.to_string(),
            version: ARTIFACT_VERSION,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            tool_build: option_env!("SYNBENCH_BUILD_ID").unwrap_or("dev").to_string(),
            ranks,
            created: Utc::now().to_rfc3339(),
        }
    }
}

/// Run the aggregation protocol and, on the coordinator, write the artifact.
///
/// Returns the artifact path on rank 0 and `None` on every other rank.
/// Only a coordinator-side encode or write failure is an error; every
/// transport-level problem degrades with a diagnostic.
pub fn aggregate(
    ctx: &RunContext,
    comm: &dyn Communicator,
) -> Result<Option<PathBuf>, ReportError> {
    let report = RankReport {
        measurements: ctx.registry.snapshot(),
        host: reported_hostname(),
        pid: process::id(),
        rank: comm.rank(),
    };
    let payload = encode_bounded(&report);

    if comm.rank() != 0 {
        if let Err(err) = comm.gather_lengths(payload.len() as u64) {
            tracing::error!(rank = comm.rank(), %err, "length gather failed");
        }
        if let Err(err) = comm.gather_bytes(&payload, &[]) {
            tracing::error!(rank = comm.rank(), %err, "payload gather failed");
        }
        return Ok(None);
    }

    // The coordinator always leads with its own document, whatever happens
    // to the collectives below.
    let mut ranks = vec![report];
    match gather_remote(comm, &payload) {
        Ok(remote) => ranks.extend(remote),
        Err(err) => {
            tracing::error!(%err, "collective gather failed, writing coordinator-only artifact");
        }
    }

    let artifact = Artifact::wrap(ranks);
    let encoded = serde_json::to_vec_pretty(&artifact).map_err(ReportError::Encode)?;
    let path = ctx.config.output_path.clone();
    std::fs::write(&path, encoded).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), ranks = artifact.ranks.len(), "artifact written");
    Ok(Some(path))
}

/// Coordinator side of the two-phase gather: collect, slice, and re-parse
/// the remote contributions.
fn gather_remote(
    comm: &dyn Communicator,
    own_payload: &[u8],
) -> Result<Vec<RankReport>, crate::error::CommError> {
    let lengths = comm
        .gather_lengths(own_payload.len() as u64)?
        .expect("coordinator gather returned no table");
    let buffer = comm
        .gather_bytes(own_payload, &lengths)?
        .expect("coordinator gather returned no buffer");

    let mut reports = Vec::new();
    let mut offset = lengths[0] as usize;
    for (rank, &len) in lengths.iter().enumerate().skip(1) {
        let len = len as usize;
        let Some(slice) = buffer.get(offset..offset + len) else {
            tracing::error!(rank, "contribution truncated, skipping");
            break;
        };
        offset += len;
        if slice.is_empty() {
            tracing::warn!(rank, "empty contribution, skipping");
            continue;
        }
        match serde_json::from_slice::<RankReport>(slice) {
            Ok(report) => reports.push(report),
            Err(err) => {
                tracing::error!(rank, %err, "unparseable contribution, skipping");
            }
        }
    }
    Ok(reports)
}

/// Serialize one rank report within [`MAX_REPORT_BYTES`].
///
/// Anything that cannot be represented inside the bound becomes an empty
/// contribution.
fn encode_bounded(report: &RankReport) -> Vec<u8> {
    match serde_json::to_vec(report) {
        Ok(bytes) if bytes.len() <= MAX_REPORT_BYTES => bytes,
        Ok(bytes) => {
            tracing::error!(
                rank = report.rank,
                size = bytes.len(),
                max = MAX_REPORT_BYTES,
                "rank report exceeds the serialization bound, contributing nothing"
            );
            Vec::new()
        }
        Err(err) => {
            tracing::error!(rank = report.rank, %err, "rank report failed to encode, contributing nothing");
            Vec::new()
        }
    }
}
