//! # Run Registration
//!
//! One referee, one zone, one participant at a time.
//!
//! ## Steps
//!
//! 1. `DossardInput`: dossard typed, participant looked up
//! 2. `ParticipantConfirmation`: confirm or go back
//! 3. `RunRegistration`: chrono, doors, penalty
//! 4. `Success`: point summary, final submit
//!
//! ## IO
//!
//! The machine never calls the backend itself. It hands out a request
//! ([`Flow::request_lookup`], [`Flow::request_submit`]) and waits for the outcome
//! ([`Flow::complete_lookup`], [`Flow::complete_submit`]). Only one request can be
//! outstanding, a second one is refused with [`FlowError::Busy`].
//!
//! ## Failures
//!
//! A failed call keeps the current step and stores the message for the operator.
//! Retrying a submit resends the exact same packaged draft.
//!
//! A permission denial is final for the view: once the backend refuses with 403,
//! every further lookup or submit is refused with [`FlowError::Denied`].
use std::{fmt, sync::Arc};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    doors::Door,
    draft::{RunDraft, RunSession},
    failure::Failure,
    models::{CompetitionId, Dossard, Participant, RunResponse, RunSubmission},
    stopwatch::{Clock, format_chrono},
    zone::Zone,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Not available while in the {0} step")]
    WrongStep(Step),

    #[error("A request is already in flight")]
    Busy,

    #[error("No request is waiting for a result")]
    NothingPending,

    #[error("Please enter a valid dossard number")]
    InvalidDossard,

    #[error("Doors are locked until the chrono has started")]
    DoorsLocked,

    #[error("Stop the chrono before finishing the run")]
    ChronoRunning,

    #[error("You do not have permission to perform this action.")]
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    DossardInput,
    ParticipantConfirmation,
    RunRegistration,
    Success,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::DossardInput => "dossard input",
            Step::ParticipantConfirmation => "participant confirmation",
            Step::RunRegistration => "run registration",
            Step::Success => "summary",
        };

        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum Stage {
    DossardInput,
    ParticipantConfirmation {
        participant: Participant,
    },
    RunRegistration {
        participant: Participant,
        session: RunSession,
    },
    Success {
        participant: Participant,
        draft: RunDraft,
    },
}

impl Stage {
    pub fn step(&self) -> Step {
        match self {
            Stage::DossardInput => Step::DossardInput,
            Stage::ParticipantConfirmation { .. } => Step::ParticipantConfirmation,
            Stage::RunRegistration { .. } => Step::RunRegistration,
            Stage::Success { .. } => Step::Success,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupRequest {
    pub competition_id: CompetitionId,
    pub dossard: Dossard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Lookup,
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorLine {
    pub door: Door,
    pub passed: bool,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub doors: Vec<DoorLine>,
    pub total_points: u32,
    pub penalty: u32,
    pub chrono: String,
}

#[derive(Debug, Clone)]
pub struct Flow {
    competition_id: CompetitionId,
    zone: Zone,
    clock: Arc<dyn Clock>,
    penalty_max: Option<u32>,
    stage: Stage,
    pending: Option<Pending>,
    error: Option<String>,
    denied: bool,
}

impl Flow {
    pub fn new(competition_id: CompetitionId, zone: Zone, clock: Arc<dyn Clock>) -> Self {
        Self {
            competition_id,
            zone,
            clock,
            penalty_max: None,
            stage: Stage::DossardInput,
            pending: None,
            error: None,
            denied: false,
        }
    }

    pub fn with_penalty_max(mut self, penalty_max: Option<u32>) -> Self {
        self.penalty_max = penalty_max;
        self
    }

    pub fn competition_id(&self) -> CompetitionId {
        self.competition_id
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn step(&self) -> Step {
        self.stage.step()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Set once the backend refused access, never cleared.
    pub fn is_denied(&self) -> bool {
        self.denied
    }

    pub fn participant(&self) -> Option<&Participant> {
        match &self.stage {
            Stage::DossardInput => None,
            Stage::ParticipantConfirmation { participant }
            | Stage::RunRegistration { participant, .. }
            | Stage::Success { participant, .. } => Some(participant),
        }
    }

    pub fn run_session(&self) -> Option<&RunSession> {
        match &self.stage {
            Stage::RunRegistration { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn run_session_mut(&mut self) -> Result<&mut RunSession, FlowError> {
        let step = self.step();
        match &mut self.stage {
            Stage::RunRegistration { session, .. } => Ok(session),
            _ => Err(FlowError::WrongStep(step)),
        }
    }

    pub fn draft(&self) -> Option<&RunDraft> {
        match &self.stage {
            Stage::Success { draft, .. } => Some(draft),
            _ => None,
        }
    }

    fn expect_step(&self, step: Step) -> Result<(), FlowError> {
        if self.step() != step {
            return Err(FlowError::WrongStep(self.step()));
        }

        Ok(())
    }

    fn ensure_allowed(&self) -> Result<(), FlowError> {
        if self.denied {
            return Err(FlowError::Denied);
        }

        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), FlowError> {
        if self.is_busy() {
            return Err(FlowError::Busy);
        }

        Ok(())
    }

    pub fn request_lookup(&mut self, dossard: &str) -> Result<LookupRequest, FlowError> {
        self.expect_step(Step::DossardInput)?;
        self.ensure_allowed()?;
        self.ensure_idle()?;

        let Some(dossard) = parse_dossard(dossard) else {
            self.error = Some(FlowError::InvalidDossard.to_string());
            return Err(FlowError::InvalidDossard);
        };

        self.error = None;
        self.pending = Some(Pending::Lookup);

        Ok(LookupRequest {
            competition_id: self.competition_id,
            dossard,
        })
    }

    pub fn complete_lookup(&mut self, outcome: Result<Participant, Failure>) -> Result<(), FlowError> {
        if self.pending != Some(Pending::Lookup) {
            return Err(FlowError::NothingPending);
        }
        self.pending = None;

        match outcome {
            Ok(participant) => {
                info!(
                    "Participant {} found for dossard {}",
                    participant.full_name(),
                    participant.dossard_number
                );
                self.stage = Stage::ParticipantConfirmation { participant };
            }
            Err(failure) => {
                warn!("Participant lookup failed: {failure}");
                self.fail(failure);
            }
        }

        Ok(())
    }

    pub fn confirm_participant(&mut self) -> Result<(), FlowError> {
        let Stage::ParticipantConfirmation { participant } = &self.stage else {
            return Err(FlowError::WrongStep(self.step()));
        };

        self.stage = Stage::RunRegistration {
            participant: participant.clone(),
            session: RunSession::new(self.clock.clone(), self.penalty_max),
        };
        self.error = None;

        Ok(())
    }

    /// Drops the participant and any draft, back to dossard input.
    pub fn back(&mut self) -> Result<(), FlowError> {
        self.ensure_idle()?;

        self.stage = Stage::DossardInput;
        self.error = None;

        Ok(())
    }

    pub fn finish_run(&mut self) -> Result<RunDraft, FlowError> {
        let Stage::RunRegistration {
            participant,
            session,
        } = &self.stage
        else {
            return Err(FlowError::WrongStep(self.step()));
        };

        let draft = session.package()?;
        self.stage = Stage::Success {
            participant: participant.clone(),
            draft: draft.clone(),
        };
        self.error = None;

        Ok(draft)
    }

    pub fn request_submit(&mut self) -> Result<RunSubmission, FlowError> {
        self.ensure_allowed()?;
        self.ensure_idle()?;

        let Stage::Success { participant, draft } = &self.stage else {
            return Err(FlowError::WrongStep(self.step()));
        };

        let submission = RunSubmission::new(
            self.competition_id,
            participant.dossard_number,
            &self.zone.zone,
            draft,
        );
        self.pending = Some(Pending::Submit);
        self.error = None;

        Ok(submission)
    }

    pub fn complete_submit(&mut self, outcome: Result<RunResponse, Failure>) -> Result<(), FlowError> {
        if self.pending != Some(Pending::Submit) {
            return Err(FlowError::NothingPending);
        }
        self.pending = None;

        match outcome {
            Ok(run) => {
                info!("Run {} saved for dossard {}", run.run_number, run.run.dossard);
                self.stage = Stage::DossardInput;
                self.error = None;
            }
            Err(failure) => {
                warn!("Run submission failed: {failure}");
                self.fail(failure);
            }
        }

        Ok(())
    }

    pub fn summary(&self) -> Option<RunSummary> {
        let draft = self.draft()?;

        let doors = draft
            .doors
            .iter()
            .map(|(door, passed)| DoorLine {
                door,
                passed,
                points: self.zone.door_points(door),
            })
            .collect();

        Some(RunSummary {
            doors,
            total_points: self.zone.total_points(draft.doors),
            penalty: draft.penalty,
            chrono: format_chrono(draft.chrono_seconds),
        })
    }
}

impl Flow {
    fn fail(&mut self, failure: Failure) {
        if !failure.is_retryable() {
            warn!("Access to competition {} denied", self.competition_id);
            self.denied = true;
        }

        self.error = Some(failure.message);
    }
}

fn parse_dossard(input: &str) -> Option<Dossard> {
    input
        .trim()
        .parse::<Dossard>()
        .ok()
        .filter(|&dossard| dossard > 0)
}
