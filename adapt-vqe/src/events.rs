use std::io::{self, Write};

use serde::Serialize;

use crate::solver::{AdaptStatus, RoundRecord};

/// Machine-readable run report, one JSON object per line, for callers that
/// consume results without parsing the log output. The CLI emits the whole
/// stream once the run has finished.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum AdaptEvent {
    RunStart(RunStartInfo),
    RoundCompleted(RoundRecord),
    RunEnd(RunEndInfo),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStartInfo {
    pub num_qubits: usize,
    pub pool_size: usize,
    pub tolerance: f64,
    pub max_cycles: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEndInfo {
    pub status: AdaptStatus,
    pub energy: f64,
    pub rounds: usize,
}

pub fn emit_event(event: &AdaptEvent, writer: &mut impl Write) -> io::Result<()> {
    let line = serde_json::to_string(event).map_err(io::Error::other)?;
    writeln!(writer, "{line}")
}
