//! # Competitions
//!
//! Competition records and the per-participant run history admins correct.
//!
//! - Creating a competition needs `create:competition` or global admin
//! - Listing shows every competition to global admins and `view:competitions`,
//!   everyone else only sees the ones they referee or administer
//! - Run history, run edits and run deletion are admin-only for that competition
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    doors::{Door, Doors},
    models::{CompetitionId, Dossard, RunResponse},
    roles::RoleSet,
};

/// Raw role that lets a non-admin see every competition.
pub const VIEW_ALL_COMPETITIONS: &str = "view:competitions";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CompetitionError {
    #[error("Competition {0} is required")]
    MissingField(&'static str),

    #[error("Door list must be numbers between 1 and 6, got `{0}`")]
    InvalidDoors(String),

    #[error("Chrono must be a non-negative number of seconds")]
    InvalidChrono,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub name: String,
    pub date: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    pub organizer: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionListResponse {
    pub competitions: Vec<Competition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionInput {
    pub name: String,
    pub date: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    pub organizer: String,
    pub contact: String,
}

impl CompetitionInput {
    /// Every field but the description must be filled.
    pub fn validate(&self) -> Result<(), CompetitionError> {
        let required = [
            ("name", &self.name),
            ("date", &self.date),
            ("location", &self.location),
            ("organizer", &self.organizer),
            ("contact", &self.contact),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(CompetitionError::MissingField(*field)),
            None => Ok(()),
        }
    }

    pub fn into_competition(self, id: CompetitionId) -> Competition {
        Competition {
            id,
            name: self.name,
            date: self.date,
            location: self.location,
            description: self.description,
            organizer: self.organizer,
            contact: self.contact,
        }
    }
}

/// Competitions a role set may see out of a full listing.
pub fn visible_competitions(roles: &RoleSet, competitions: Vec<Competition>) -> Vec<Competition> {
    if roles.is_admin() || roles.has_any_role(&[VIEW_ALL_COMPETITIONS]) {
        return competitions;
    }

    competitions
        .into_iter()
        .filter(|competition| roles.allows(competition.id, "referee"))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRuns {
    pub competition_id: CompetitionId,
    pub dossard: Dossard,
    pub runs: Vec<RunResponse>,
}

/// Query of `DELETE /run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDeleteQuery {
    #[serde(rename = "competitionID")]
    pub competition_id: CompetitionId,
    pub dossard: Dossard,
    #[serde(rename = "runNumber")]
    pub run_number: u32,
}

/// Corrections an admin applies to a recorded run. `None` keeps the recorded value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunCorrection {
    pub chrono_sec: Option<f64>,
    pub penalty: Option<u32>,
    pub doors: Option<Doors>,
}

impl RunCorrection {
    pub fn apply(&self, run: &RunResponse) -> Result<RunResponse, CompetitionError> {
        let mut corrected = run.clone();

        if let Some(chrono_sec) = self.chrono_sec {
            if !chrono_sec.is_finite() || chrono_sec < 0.0 {
                return Err(CompetitionError::InvalidChrono);
            }
            corrected.run.chrono_sec = chrono_sec;
        }
        if let Some(penalty) = self.penalty {
            corrected.run.penality = penalty;
        }
        if let Some(doors) = self.doors {
            corrected.run.set_doors(doors);
        }

        Ok(corrected)
    }
}

/// Parses `"1,3,6"` into the set of passed doors. An empty string passes none.
pub fn parse_doors(input: &str) -> Result<Doors, CompetitionError> {
    let mut passed = [false; 6];

    for part in input.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let door = part
            .parse::<u8>()
            .ok()
            .and_then(Door::from_number)
            .ok_or_else(|| CompetitionError::InvalidDoors(input.trim().to_string()))?;
        passed[door.index()] = true;
    }

    Ok(Doors::new(passed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{draft::RunDraft, models::RunSubmission};

    fn competition(id: CompetitionId) -> Competition {
        Competition {
            id,
            name: format!("Trial {id}"),
            date: "2025-05-01".to_string(),
            location: "Namur".to_string(),
            description: String::new(),
            organizer: "Club".to_string(),
            contact: "club@trial.test".to_string(),
        }
    }

    fn input() -> CompetitionInput {
        CompetitionInput {
            name: "Spring Trial".to_string(),
            date: "2025-05-01".to_string(),
            location: "Namur".to_string(),
            description: String::new(),
            organizer: "Club".to_string(),
            contact: "club@trial.test".to_string(),
        }
    }

    fn run() -> RunResponse {
        let draft = RunDraft {
            chrono_seconds: 40.0,
            penalty: 2,
            doors: Doors::new([true, false, false, false, false, false]),
        };

        RunResponse {
            run_number: 1,
            run: RunSubmission::new(7, 42, "A", &draft),
        }
    }

    #[test]
    fn test_description_is_optional() {
        assert_eq!(input().validate(), Ok(()));
    }

    #[test]
    fn test_blank_required_field() {
        let mut missing = input();
        missing.organizer = "  ".to_string();

        assert_eq!(
            missing.validate(),
            Err(CompetitionError::MissingField("organizer"))
        );
    }

    #[test]
    fn test_referee_sees_own_competitions() {
        let roles = RoleSet::from_raw(["referee:7", "admin:9"]);
        let all = vec![competition(7), competition(8), competition(9)];

        let ids: Vec<_> = visible_competitions(&roles, all)
            .iter()
            .map(|competition| competition.id)
            .collect();

        assert_eq!(ids, vec![7, 9]);
    }

    #[test]
    fn test_viewers_see_everything() {
        let all = vec![competition(7), competition(8)];

        assert_eq!(
            visible_competitions(&RoleSet::from_raw([VIEW_ALL_COMPETITIONS]), all.clone()).len(),
            2
        );
        assert_eq!(visible_competitions(&RoleSet::from_raw(["admin:*"]), all).len(), 2);
    }

    #[test]
    fn test_delete_query_wire_names() {
        let query = RunDeleteQuery {
            competition_id: 7,
            dossard: 42,
            run_number: 2,
        };

        let json = serde_json::to_value(query).unwrap();
        assert_eq!(json["competitionID"], 7);
        assert_eq!(json["runNumber"], 2);
    }

    #[test]
    fn test_parse_doors() {
        let doors = parse_doors("1, 3,3,6").unwrap();

        assert!(doors.passed(Door::One) && doors.passed(Door::Three) && doors.passed(Door::Six));
        assert!(!doors.passed(Door::Two));
        assert_eq!(parse_doors("").unwrap(), Doors::default());
        assert!(parse_doors("0").is_err());
        assert!(parse_doors("7").is_err());
        assert!(parse_doors("a").is_err());
    }

    #[test]
    fn test_correction_keeps_untouched_fields() {
        let correction = RunCorrection {
            penalty: Some(0),
            ..RunCorrection::default()
        };

        let corrected = correction.apply(&run()).unwrap();

        assert_eq!(corrected.run.penality, 0);
        assert_eq!(corrected.run.chrono_sec, 40.0);
        assert!(corrected.run.door1);
        assert_eq!(corrected.run_number, 1);
    }

    #[test]
    fn test_correction_replaces_doors() {
        let correction = RunCorrection {
            doors: Some(Doors::new([false, true, false, false, false, false])),
            ..RunCorrection::default()
        };

        let corrected = correction.apply(&run()).unwrap();

        assert!(!corrected.run.door1 && corrected.run.door2);
    }

    #[test]
    fn test_negative_chrono_rejected() {
        let correction = RunCorrection {
            chrono_sec: Some(-1.0),
            ..RunCorrection::default()
        };

        assert_eq!(correction.apply(&run()), Err(CompetitionError::InvalidChrono));
    }
}
