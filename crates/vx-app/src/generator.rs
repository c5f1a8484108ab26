use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use crate::events::GenEvent;
use crate::generator::api::JobApi;
use crate::generator::session::{GenerationSession, SessionTiming};

pub mod api;
pub mod schemas;
pub mod session;

/// Starts generation sessions against a job API
#[derive(Clone)]
pub struct Generator {
    api: Arc<dyn JobApi>,
    timing: SessionTiming,
}

impl Generator {
    pub fn new(api: Arc<dyn JobApi>, timing: SessionTiming) -> Self {
        Self { api, timing }
    }

    pub fn timing(&self) -> SessionTiming {
        self.timing
    }

    pub fn start(&self, prompt: String, tx: UnboundedSender<GenEvent>) -> GenerationSession {
        GenerationSession::start(self.api.clone(), prompt, self.timing, tx)
    }
}
