use uuid::Uuid;
use vx_core::GenerationResult;
use crate::job::JobStatus;

/// Progress reported by a generation session. Every event names the session
/// that produced it so the wizard can drop events from a cancelled run.
#[derive(Debug, Clone)]
pub enum GenEvent {
    JobSubmitted {
        session: Uuid,
        job_id: String,
    },
    JobStatus {
        session: Uuid,
        job_id: String,
        status: JobStatus,
    },
    Phase {
        session: Uuid,
        index: usize,
        label: &'static str,
    },
    JobComplete {
        session: Uuid,
        job_id: String,
        result: GenerationResult,
    },
    JobFailed {
        session: Uuid,
        /// `None` when the submission itself failed
        job_id: Option<String>,
        error: String,
    },
}

impl GenEvent {
    pub fn session(&self) -> Uuid {
        match self {
            Self::JobSubmitted { session, .. }
            | Self::JobStatus { session, .. }
            | Self::Phase { session, .. }
            | Self::JobComplete { session, .. }
            | Self::JobFailed { session, .. } => *session,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::JobComplete { .. } | Self::JobFailed { .. })
    }
}
