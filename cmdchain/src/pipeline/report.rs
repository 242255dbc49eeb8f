//! Run phases and run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Phase of a pipeline's most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum RunPhase {
    /// No run has started.
    #[default]
    Idle,
    /// Participants are being set up.
    SettingUp,
    /// Cycles are executing.
    Running {
        /// The current cycle, starting at 1.
        cycle: u64,
    },
    /// A participant aborted the run gracefully.
    Aborted,
    /// The source was exhausted.
    Completed,
    /// The run hit a fatal error.
    Failed,
    /// Participants are being cleaned up.
    CleaningUp,
    /// Cleanup finished.
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::SettingUp => write!(f, "setting_up"),
            Self::Running { cycle } => write!(f, "running({cycle})"),
            Self::Aborted => write!(f, "aborted"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::CleaningUp => write!(f, "cleaning_up"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The source was exhausted.
    Completed,
    /// A participant aborted the run gracefully.
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier of the run.
    pub run_id: Uuid,
    /// The pipeline name.
    pub pipeline: String,
    /// How the run ended.
    pub status: RunStatus,
    /// Number of cycles started.
    pub cycles: u64,
    /// Cycles cut short by a command returning `Stop`.
    pub skipped_cycles: u64,
    /// When setup began.
    pub started_at: DateTime<Utc>,
    /// When cleanup finished.
    pub finished_at: DateTime<Utc>,
    /// The sink's result. Always `None` for aborted runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl RunReport {
    /// Returns the run duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        (self.finished_at - self.started_at).num_microseconds().unwrap_or(i64::MAX) as f64 / 1000.0
    }

    /// Returns true if the run was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.status == RunStatus::Aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: RunStatus) -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: Uuid::new_v4(),
            pipeline: "test".to_string(),
            status,
            cycles: 2,
            skipped_cycles: 1,
            started_at: now,
            finished_at: now + chrono::Duration::milliseconds(5),
            result: Some(serde_json::json!(3)),
        }
    }

    #[test]
    fn test_duration() {
        assert!((report(RunStatus::Completed).duration_ms() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_report_serialization() {
        let sent = report(RunStatus::Aborted);
        let json = serde_json::to_value(&sent).unwrap();

        assert_eq!(json["status"], "aborted");
        assert_eq!(json["cycles"], 2);

        let restored: RunReport = serde_json::from_value(json).unwrap();
        assert_eq!(restored, sent);
        assert!(restored.is_aborted());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RunPhase::default().to_string(), "idle");
        assert_eq!(RunPhase::Running { cycle: 3 }.to_string(), "running(3)");
        assert_eq!(RunPhase::Done.to_string(), "done");
    }
}
