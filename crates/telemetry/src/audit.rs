//! Analysis samples for offline review.
//!
//! Each successful analysis may be appended to a JSON Lines file: one object
//! per line, a small header identifying the transaction followed by the full
//! result under `analysis`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// One line of the sample file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSample<'a, T: Serialize> {
    pub recorded_at: DateTime<Utc>,
    pub chain_id: u64,
    pub tx_hash: &'a str,
    pub analysis_type: &'a str,
    pub analysis: &'a T,
}

impl<'a, T: Serialize> AnalysisSample<'a, T> {
    pub fn new(chain_id: u64, tx_hash: &'a str, analysis_type: &'a str, analysis: &'a T) -> Self {
        Self {
            recorded_at: Utc::now(),
            chain_id,
            tx_hash,
            analysis_type,
            analysis,
        }
    }
}

/// Append a sample to the file at `path`; nothing is written when `None`.
pub fn append_sample<P: AsRef<Path>, T: Serialize>(
    path: Option<P>,
    sample: &AnalysisSample<'_, T>,
) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let line = serde_json::to_string(sample)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path.as_ref())?;
    writeln!(file, "{}", line)?;
    debug!(
        "Recorded {} sample for {} in {:?}",
        sample.analysis_type,
        sample.tx_hash,
        path.as_ref()
    );
    Ok(())
}
