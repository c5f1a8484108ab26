use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vx_core::GenerationResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "pending")]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Position in the lifecycle, statuses never move backwards
    fn rank(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Queued => "⏳",
            Self::Processing => "⚡",
            Self::Completed => "✅",
            Self::Failed => "❌",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Queued => "Queued",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

/// Client-side record of a submitted generation job
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub result: Option<GenerationResult>,
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            result: None,
            error: None,
            submitted_at: Utc::now(),
        }
    }

    /// Apply a reported status. Returns `false` if it would move the job
    /// backwards or out of a terminal state.
    pub fn advance(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() || status.rank() < self.status.rank() {
            return false;
        }
        self.status = status;
        true
    }

    pub fn complete(&mut self, result: GenerationResult) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
    }

    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.submitted_at
    }
}
