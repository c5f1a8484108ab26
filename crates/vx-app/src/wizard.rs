use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};
use uuid::Uuid;
use vx_core::room::check_area;
use vx_core::store::area_series;
use vx_core::{ActiveCandidate, AreaUnit, CandidateStore, RoomId, RoomRequirement, RoomType, SeriesEntry};
use crate::events::GenEvent;
use crate::generator::session::{GenerationSession, PHASE_LABELS};
use crate::generator::Generator;
use crate::job::Job;

/// Room areas may exceed the requested total by this factor
pub const AREA_TOLERANCE: f64 = 1.1;
pub const MIN_DESCRIPTION_CHARS: usize = 10;
pub const DEFAULT_TOTAL_AREA: f64 = 1200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    Rooms = 1,
    Review,
    Generating,
    Results,
}

impl WizardStep {
    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Rooms => "Rooms",
            Self::Review => "Review",
            Self::Generating => "Generating",
            Self::Results => "Results",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Manual,
    FreeText,
}

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("{0}")]
    Validation(String),

    #[error("Cannot {action} during the {step} step")]
    InvalidTransition { step: WizardStep, action: &'static str },

    #[error(transparent)]
    Core(#[from] vx_core::Error),
}

/// Everything collected in step 1
#[derive(Debug, Clone, PartialEq)]
pub struct WizardInput {
    pub mode: InputMode,
    pub rooms: Vec<RoomRequirement>,
    pub total_area: f64,
    pub unit: AreaUnit,
    pub description: String,
}

impl Default for WizardInput {
    fn default() -> Self {
        Self {
            mode: InputMode::Manual,
            rooms: Vec::new(),
            total_area: DEFAULT_TOTAL_AREA,
            unit: AreaUnit::SqFt,
            description: String::new(),
        }
    }
}

impl WizardInput {
    pub fn add_room(&mut self, room_type: RoomType, area: f64) -> vx_core::Result<RoomId> {
        let room = RoomRequirement::new(room_type, area)?;
        let id = room.id;
        self.rooms.push(room);
        Ok(id)
    }

    pub fn remove_room(&mut self, id: RoomId) -> vx_core::Result<()> {
        let index = self
            .rooms
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| vx_core::Error::UnknownRoom(id.to_string()))?;
        self.rooms.remove(index);
        Ok(())
    }

    pub fn set_room_area(&mut self, id: RoomId, area: f64) -> vx_core::Result<()> {
        let area = check_area(area)?;
        let room = self
            .rooms
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| vx_core::Error::UnknownRoom(id.to_string()))?;
        room.area = area;
        Ok(())
    }

    pub fn set_total_area(&mut self, area: f64) -> vx_core::Result<()> {
        self.total_area = check_area(area)?;
        Ok(())
    }

    pub fn allocated_area(&self) -> f64 {
        self.rooms.iter().map(|r| r.area).sum()
    }

    /// Prompt text sent to the service
    pub fn compile(&self) -> String {
        match self.mode {
            InputMode::FreeText => self.description.clone(),
            InputMode::Manual => {
                let suffix = self.unit.suffix();
                let total = format!(
                    "Design a floor plan with a total area of {} {}",
                    format_area(self.total_area),
                    suffix
                );
                if self.rooms.is_empty() {
                    return format!("{}.", total);
                }

                let rooms: Vec<String> = self
                    .rooms
                    .iter()
                    .map(|r| format!("a {} of {} {}", r.room_type.phrase(), format_area(r.area), suffix))
                    .collect();
                format!("{} containing: {}.", total, rooms.join(", "))
            }
        }
    }

    /// Human-readable reason the input cannot be submitted
    pub fn validate(&self) -> Result<(), String> {
        match self.mode {
            InputMode::FreeText => {
                if self.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
                    return Err(format!(
                        "Please describe your floor plan in at least {} characters.",
                        MIN_DESCRIPTION_CHARS
                    ));
                }
            }
            InputMode::Manual => {
                let allocated = self.allocated_area();
                if allocated > self.total_area * AREA_TOLERANCE {
                    return Err(format!(
                        "Rooms add up to {} {unit}, more than 10% over the total of {} {unit}.",
                        format_area(allocated),
                        format_area(self.total_area),
                        unit = self.unit.suffix()
                    ));
                }
            }
        }
        Ok(())
    }

    /// Step-1 allocation chart
    pub fn allocation_series(&self) -> Vec<SeriesEntry> {
        let rooms = self.rooms.iter().map(|r| SeriesEntry {
            id: Some(r.id.to_string()),
            label: r.room_type.name().to_string(),
            value: r.area,
            color: r.room_type.color().to_string(),
        });
        area_series(rooms, self.total_area)
    }

    /// Requested total in square feet, the unit results are reported in
    pub fn total_area_constraint(&self) -> Option<f64> {
        match self.mode {
            InputMode::Manual => Some(self.total_area * self.unit.to_sqft()),
            InputMode::FreeText => None,
        }
    }
}

fn format_area(area: f64) -> String {
    if area.fract() == 0.0 {
        format!("{:.0}", area)
    } else {
        format!("{}", area)
    }
}

/// Immutable snapshot submitted on entering `Generating`
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub total_area_sqft: Option<f64>,
}

/// `Rooms -> Review -> Generating -> Results`. A failed run returns to
/// `Review`; `Results` is only left through [`Wizard::reset`].
pub struct Wizard {
    step: WizardStep,
    input: WizardInput,
    error: Option<String>,
    generator: Generator,
    session: Option<GenerationSession>,
    events: Option<UnboundedReceiver<GenEvent>>,
    request: Option<GenerationRequest>,
    job: Option<Job>,
    store: CandidateStore,
    phase: usize,
    phase_advances: usize,
}

impl Wizard {
    pub fn new(generator: Generator) -> Self {
        Self {
            step: WizardStep::Rooms,
            input: WizardInput::default(),
            error: None,
            generator,
            session: None,
            events: None,
            request: None,
            job: None,
            store: CandidateStore::new(),
            phase: 0,
            phase_advances: 0,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn input(&self) -> &WizardInput {
        &self.input
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn request(&self) -> Option<&GenerationRequest> {
        self.request.as_ref()
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn store(&self) -> &CandidateStore {
        &self.store
    }

    pub fn phase_label(&self) -> &'static str {
        PHASE_LABELS[self.phase.min(PHASE_LABELS.len() - 1)]
    }

    /// Ticker advances observed during the current run
    pub fn phase_advances(&self) -> usize {
        self.phase_advances
    }

    pub fn is_generating(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(GenerationSession::id)
    }

    /// Mutate step-1 input; only allowed while on the rooms step
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut WizardInput) -> R) -> Result<R, WizardError> {
        self.expect_step(WizardStep::Rooms, "edit rooms")?;
        Ok(f(&mut self.input))
    }

    pub fn add_room(&mut self, room_type: RoomType, area: f64) -> Result<RoomId, WizardError> {
        Ok(self.edit(|input| input.add_room(room_type, area))??)
    }

    pub fn remove_room(&mut self, id: RoomId) -> Result<(), WizardError> {
        Ok(self.edit(|input| input.remove_room(id))??)
    }

    /// Preview of the prompt that would be submitted
    pub fn prompt(&self) -> String {
        self.input.compile()
    }

    /// Rooms -> Review, gated by validation
    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::Rooms => {
                if let Err(message) = self.input.validate() {
                    self.error = Some(message.clone());
                    return Err(WizardError::Validation(message));
                }
                self.error = None;
                self.step = WizardStep::Review;
                Ok(self.step)
            }
            WizardStep::Review => self.generate(),
            step => Err(WizardError::InvalidTransition { step, action: "continue" }),
        }
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.expect_step(WizardStep::Review, "go back")?;
        self.error = None;
        self.step = WizardStep::Rooms;
        Ok(self.step)
    }

    /// Review -> Generating. Clears results of any previous run and starts a
    /// new session.
    pub fn generate(&mut self) -> Result<WizardStep, WizardError> {
        self.expect_step(WizardStep::Review, "generate")?;

        self.clear_run();
        let request = GenerationRequest {
            prompt: self.input.compile(),
            total_area_sqft: self.input.total_area_constraint(),
        };
        info!("Starting generation: {}", request.prompt);

        let (tx, rx) = mpsc::unbounded_channel();
        self.session = Some(self.generator.start(request.prompt.clone(), tx));
        self.events = Some(rx);
        self.request = Some(request);
        self.error = None;
        self.step = WizardStep::Generating;
        Ok(self.step)
    }

    /// Apply one session event. Returns `false` for events from a session
    /// that is no longer current.
    pub fn handle_event(&mut self, event: GenEvent) -> bool {
        if self.session_id() != Some(event.session()) {
            debug!("Ignoring event from stale session {}", event.session());
            return false;
        }

        match event {
            GenEvent::JobSubmitted { job_id, .. } => {
                self.job = Some(Job::new(job_id));
            }
            GenEvent::JobStatus { status, .. } => {
                if let Some(job) = &mut self.job {
                    job.advance(status);
                }
            }
            GenEvent::Phase { index, .. } => {
                self.phase = index;
                self.phase_advances += 1;
            }
            GenEvent::JobComplete { job_id, result, .. } => {
                self.finish_session();
                let job = self.job.get_or_insert_with(|| Job::new(job_id));
                job.complete(result.clone());

                if self.store.populate(result).is_some() {
                    self.step = WizardStep::Results;
                } else {
                    warn!("Job finished without any candidates");
                    self.fail("Generation finished without any candidates.".to_string());
                }
            }
            GenEvent::JobFailed { error, .. } => {
                self.finish_session();
                if let Some(job) = &mut self.job {
                    job.fail(error.clone());
                }
                self.fail(error);
            }
        }
        true
    }

    /// Wait for the next event of the current session and apply it
    pub async fn next_event(&mut self) -> Option<GenEvent> {
        let event = self.events.as_mut()?.recv().await;
        match event {
            Some(event) => {
                self.handle_event(event.clone());
                Some(event)
            }
            None => {
                self.events = None;
                None
            }
        }
    }

    /// Drive the current session until it leaves `Generating`
    pub async fn wait_for_outcome(&mut self) -> WizardStep {
        while self.step == WizardStep::Generating {
            if self.next_event().await.is_none() {
                break;
            }
        }
        self.step
    }

    /// Back to an empty rooms step from anywhere, stopping any running session
    pub async fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel().await;
        }
        self.clear_run();
        self.input = WizardInput::default();
        self.error = None;
        self.step = WizardStep::Rooms;
        info!("Wizard reset");
    }

    /// Switch the displayed candidate; never talks to the server
    pub fn select_candidate(&mut self, id: u32) -> Result<&ActiveCandidate, WizardError> {
        self.expect_step(WizardStep::Results, "select a candidate")?;
        Ok(self.store.select(id)?)
    }

    /// Chart for the current step: requested allocation before generating,
    /// the active candidate's rooms afterwards
    pub fn derived_series(&self) -> Vec<SeriesEntry> {
        match self.step {
            WizardStep::Results => {
                let total = self
                    .request
                    .as_ref()
                    .and_then(|r| r.total_area_sqft)
                    .or_else(|| self.store.active().map(|a| a.spec.total_area()))
                    .unwrap_or(0.0);
                self.store.derived_series(total)
            }
            _ if self.input.mode == InputMode::Manual => self.input.allocation_series(),
            _ => Vec::new(),
        }
    }

    fn expect_step(&self, expected: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WizardError::InvalidTransition { step: self.step, action })
        }
    }

    fn finish_session(&mut self) {
        self.session = None;
        self.events = None;
    }

    fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.step = WizardStep::Review;
    }

    fn clear_run(&mut self) {
        self.session = None;
        self.events = None;
        self.request = None;
        self.job = None;
        self.store.clear();
        self.phase = 0;
        self.phase_advances = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual(rooms: &[(RoomType, f64)], total: f64) -> WizardInput {
        let mut input = WizardInput { total_area: total, ..Default::default() };
        for (room_type, area) in rooms {
            input.add_room(*room_type, *area).unwrap();
        }
        input
    }

    #[test]
    fn test_compile_manual_prompt() {
        let input = manual(&[(RoomType::Living, 300.0), (RoomType::Bedroom, 150.5)], 1200.0);
        assert_eq!(
            input.compile(),
            "Design a floor plan with a total area of 1200 sqft containing: \
             a living room of 300 sqft, a bedroom of 150.5 sqft."
        );
    }

    #[test]
    fn test_every_area_carries_the_unit() {
        for unit in [AreaUnit::SqFt, AreaUnit::SqM] {
            let mut input = manual(
                &[(RoomType::Kitchen, 20.0), (RoomType::Bathroom, 8.0), (RoomType::Study, 12.0)],
                120.0,
            );
            input.unit = unit;
            let prompt = input.compile();
            assert_eq!(prompt.matches(unit.suffix()).count(), input.rooms.len() + 1, "{prompt}");
        }
    }

    #[test]
    fn test_free_text_is_verbatim() {
        let input = WizardInput {
            mode: InputMode::FreeText,
            description: "  Two bedrooms facing south  ".to_string(),
            ..Default::default()
        };
        assert_eq!(input.compile(), "  Two bedrooms facing south  ");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_manual_validation_tolerance() {
        // 1320 is exactly 10% over 1200
        assert!(manual(&[(RoomType::Living, 1320.0)], 1200.0).validate().is_ok());
        assert!(manual(&[(RoomType::Living, 1000.0), (RoomType::Bedroom, 321.0)], 1200.0)
            .validate()
            .is_err());
        assert!(manual(&[], 1200.0).validate().is_ok());
    }

    #[test]
    fn test_free_text_validation_uses_trimmed_length() {
        let mut input = WizardInput { mode: InputMode::FreeText, ..Default::default() };
        input.description = "   short     ".to_string();
        assert!(input.validate().is_err());
        input.description = "3 bedrooms".to_string();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_allocation_series() {
        let input = manual(&[(RoomType::Living, 400.0), (RoomType::Kitchen, 200.0)], 1000.0);
        let series = input.allocation_series();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].color, RoomType::Living.color());
        assert_eq!(series[2].value, 400.0);
        assert_eq!(series[2].id, None);
    }

    #[test]
    fn test_total_in_square_feet() {
        let mut input = manual(&[], 100.0);
        input.unit = AreaUnit::SqM;
        approx::assert_relative_eq!(input.total_area_constraint().unwrap(), 1076.4, epsilon = 1e-9);
        input.mode = InputMode::FreeText;
        assert_eq!(input.total_area_constraint(), None);
    }

    #[test]
    fn test_room_edits() {
        let mut input = WizardInput::default();
        let id = input.add_room(RoomType::Dining, 140.0).unwrap();
        assert!(input.add_room(RoomType::Dining, -1.0).is_err());
        assert!(input.set_room_area(id, 0.0).is_err());
        input.set_room_area(id, 160.0).unwrap();
        assert_eq!(input.allocated_area(), 160.0);
        input.remove_room(id).unwrap();
        assert!(input.remove_room(id).is_err());
        assert!(input.set_total_area(f64::INFINITY).is_err());
    }
}
