//! Payloads exchanged with the competition backend.
use serde::{Deserialize, Serialize};

use crate::{doors::Doors, draft::RunDraft};

pub type CompetitionId = u64;
pub type Dossard = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub category: String,
    pub competition_id: CompetitionId,
    pub dossard_number: Dossard,
    pub first_name: String,
    pub last_name: String,
}

impl Participant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Body of `POST /run`. The backend spells the penalty field `penality`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSubmission {
    pub competition_id: CompetitionId,
    pub dossard: Dossard,
    pub zone: String,
    pub chrono_sec: f64,
    pub penality: u32,
    pub door1: bool,
    pub door2: bool,
    pub door3: bool,
    pub door4: bool,
    pub door5: bool,
    pub door6: bool,
}

impl RunSubmission {
    pub fn new(competition_id: CompetitionId, dossard: Dossard, zone: &str, draft: &RunDraft) -> Self {
        let [door1, door2, door3, door4, door5, door6] = draft.doors.as_array();

        Self {
            competition_id,
            dossard,
            zone: zone.to_string(),
            chrono_sec: draft.chrono_seconds,
            penality: draft.penalty,
            door1,
            door2,
            door3,
            door4,
            door5,
            door6,
        }
    }

    pub fn doors(&self) -> Doors {
        Doors::new([
            self.door1, self.door2, self.door3, self.door4, self.door5, self.door6,
        ])
    }

    pub fn set_doors(&mut self, doors: Doors) {
        [
            self.door1, self.door2, self.door3, self.door4, self.door5, self.door6,
        ] = doors.as_array();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    pub run_number: u32,
    #[serde(flatten)]
    pub run: RunSubmission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub roles: Vec<String>,
}

/// Error body some backend routes return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}
