//! # Scoring
//!
//! Referee-side logic for bicycle trial competitions. Pure, no IO.
//!
//! ## Pieces
//!
//! - [`stopwatch`]: chrono with start/pause/reset and queued notifications
//! - [`doors`], [`penalty`]: the scoring draft a referee edits during a run
//! - [`zone`]: per-door point tables and total points
//! - [`flow`]: dossard -> participant -> run -> summary -> submit
//! - [`roles`]: who may referee or administer which competition
//! - [`failure`]: backend failures turned into operator messages
//! - [`competition`]: competition records and admin run corrections
//!
//! ## Points
//!
//! Total points of a run is the sum of the configured values of every passed door.
//! Penalty is tracked separately and never subtracted here, ranking is done by the backend.
pub mod competition;
pub mod doors;
pub mod draft;
pub mod failure;
pub mod flow;
pub mod models;
pub mod penalty;
pub mod roles;
pub mod stopwatch;
pub mod zone;

pub use competition::{Competition, CompetitionError, CompetitionInput, RunCorrection};
pub use doors::{Door, DoorGrid, Doors};
pub use draft::{RunDraft, RunSession};
pub use failure::{Failure, FailureKind};
pub use flow::{Flow, FlowError, LookupRequest, RunSummary, Stage, Step};
pub use models::{CompetitionId, Dossard, Participant, RunResponse, RunSubmission};
pub use roles::{Access, Role, RoleSet};
pub use stopwatch::{ChronoEvent, ChronoState, Clock, ManualClock, MonotonicClock, Stopwatch};
pub use zone::Zone;
