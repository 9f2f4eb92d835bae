//! Resolution report (§4.11, §6.4): a snapshot aggregate, not a live view.
//!
//! Deliberately decoupled from `le-plugin`'s types — `Report::new` takes
//! plain counts so this crate has no dependency on the dependency-graph
//! crate; callers (the `libetude` facade, or a host embedding both
//! directly) total up `ResolvedStatus` values themselves before building
//! one of these.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregate counts over one resolution pass, per §4.11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub total_plugins: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub circular: usize,
    pub vulnerability_count: usize,
    pub outdated_count: usize,
    pub generated_at_unix_ms: u64,
}

impl Report {
    /// Builds a report stamped with the current wall-clock time. Use
    /// `with_timestamp` directly in tests, where a fixed clock matters.
    pub fn new(
        total_plugins: usize,
        resolved: usize,
        unresolved: usize,
        circular: usize,
        vulnerability_count: usize,
        outdated_count: usize,
    ) -> Self {
        let generated_at_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            total_plugins,
            resolved,
            unresolved,
            circular,
            vulnerability_count,
            outdated_count,
            generated_at_unix_ms,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_timestamp(
        total_plugins: usize,
        resolved: usize,
        unresolved: usize,
        circular: usize,
        vulnerability_count: usize,
        outdated_count: usize,
        generated_at_unix_ms: u64,
    ) -> Self {
        Self {
            total_plugins,
            resolved,
            unresolved,
            circular,
            vulnerability_count,
            outdated_count,
            generated_at_unix_ms,
        }
    }

    /// Structured object form (§6.4): keyed fields, round-tripping through
    /// `from_json`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Report fields are all plain and serializable")
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    /// Human-readable text form (§6.4), round-tripping through `from_text`.
    pub fn to_text(&self) -> String {
        format!(
            "total_plugins={}\nresolved={}\nunresolved={}\ncircular={}\nvulnerability_count={}\noutdated_count={}\ngenerated_at_unix_ms={}\n",
            self.total_plugins,
            self.resolved,
            self.unresolved,
            self.circular,
            self.vulnerability_count,
            self.outdated_count,
            self.generated_at_unix_ms,
        )
    }

    pub fn from_text(data: &str) -> Result<Self, ReportParseError> {
        let mut fields = std::collections::HashMap::new();
        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| ReportParseError(format!("malformed line {line:?}")))?;
            fields.insert(key, value);
        }

        let field = |key: &str| -> Result<u64, ReportParseError> {
            fields
                .get(key)
                .ok_or_else(|| ReportParseError(format!("missing field {key:?}")))?
                .parse::<u64>()
                .map_err(|_| ReportParseError(format!("field {key:?} is not a number")))
        };

        Ok(Report {
            total_plugins: field("total_plugins")? as usize,
            resolved: field("resolved")? as usize,
            unresolved: field("unresolved")? as usize,
            circular: field("circular")? as usize,
            vulnerability_count: field("vulnerability_count")? as usize,
            outdated_count: field("outdated_count")? as usize,
            generated_at_unix_ms: field("generated_at_unix_ms")?,
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("malformed report text: {0}")]
pub struct ReportParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        Report::with_timestamp(10, 7, 2, 1, 3, 4, 1_700_000_000_000)
    }

    #[test]
    fn json_round_trips() {
        let report = sample();
        let json = report.to_json();
        let back = Report::from_json(&json).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn text_round_trips() {
        let report = sample();
        let text = report.to_text();
        let back = Report::from_text(&text).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn text_form_is_human_readable() {
        let text = sample().to_text();
        assert!(text.contains("resolved=7"));
        assert!(text.contains("circular=1"));
    }

    #[test]
    fn from_text_rejects_missing_fields() {
        assert!(Report::from_text("total_plugins=1\n").is_err());
    }
}
