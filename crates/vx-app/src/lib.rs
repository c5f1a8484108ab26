pub mod config;
pub mod error;
pub mod events;
pub mod generator;
pub mod job;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use events::GenEvent;
pub use generator::api::{ApiClient, JobApi};
pub use generator::session::{GenerationSession, SessionTiming, PHASE_LABELS};
pub use generator::Generator;
pub use job::{Job, JobStatus};
pub use wizard::{InputMode, Wizard, WizardError, WizardInput, WizardStep};
