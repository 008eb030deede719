//! # Zones
//!
//! A zone is keyed by `(zone, category)` inside its competition, there is no surrogate id.
//! Each of the six doors carries its own point value.
//!
//! ## Editing rules
//!
//! - Name and category must not be blank
//! - All six door values must be present and strictly positive
//! - Checked here before anything is sent to the backend
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    doors::{Door, Doors},
    models::CompetitionId,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ZoneError {
    #[error("Zone name and category are required")]
    MissingIdentity,

    #[error("All door points must be filled with values strictly greater than 0")]
    InvalidPoints,

    #[error("Expected 6 door point values, got {0}")]
    WrongPointCount(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub zone: String,
    pub category: String,
    pub points_door1: u32,
    pub points_door2: u32,
    pub points_door3: u32,
    pub points_door4: u32,
    pub points_door5: u32,
    pub points_door6: u32,
}

impl Zone {
    pub fn new(zone: &str, category: &str, points: [u32; 6]) -> Self {
        let [points_door1, points_door2, points_door3, points_door4, points_door5, points_door6] =
            points;

        Self {
            zone: zone.to_string(),
            category: category.to_string(),
            points_door1,
            points_door2,
            points_door3,
            points_door4,
            points_door5,
            points_door6,
        }
    }

    pub fn points(&self) -> [u32; 6] {
        [
            self.points_door1,
            self.points_door2,
            self.points_door3,
            self.points_door4,
            self.points_door5,
            self.points_door6,
        ]
    }

    pub fn door_points(&self, door: Door) -> u32 {
        self.points()[door.index()]
    }

    pub fn is(&self, zone: &str, category: &str) -> bool {
        self.zone == zone && self.category == category
    }

    /// Sum of the point values of every passed door.
    pub fn total_points(&self, doors: Doors) -> u32 {
        doors
            .iter()
            .filter(|(_, passed)| *passed)
            .map(|(door, _)| self.door_points(door))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneListResponse {
    pub competition_id: CompetitionId,
    pub zones: Vec<Zone>,
}

/// Body of zone create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneInput {
    pub competition_id: CompetitionId,
    #[serde(flatten)]
    pub zone: Zone,
}

impl ZoneInput {
    pub fn new(competition_id: CompetitionId, zone: Zone) -> Result<Self, ZoneError> {
        let input = Self {
            competition_id,
            zone,
        };
        input.validate()?;

        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ZoneError> {
        if self.zone.zone.trim().is_empty() || self.zone.category.trim().is_empty() {
            return Err(ZoneError::MissingIdentity);
        }

        if self.zone.points().iter().any(|&points| points == 0) {
            return Err(ZoneError::InvalidPoints);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDeleteInput {
    pub competition_id: CompetitionId,
    pub zone: String,
    pub category: String,
}

/// Parses `"10,10,20,20,30,30"` into six strictly positive values.
pub fn parse_points(input: &str) -> Result<[u32; 6], ZoneError> {
    let values = input
        .split(',')
        .map(|part| part.trim().parse::<i64>().map_err(|_| ZoneError::InvalidPoints))
        .collect::<Result<Vec<_>, _>>()?;

    let values: [i64; 6] = values
        .try_into()
        .map_err(|values: Vec<i64>| ZoneError::WrongPointCount(values.len()))?;

    let mut points = [0u32; 6];
    for (slot, value) in points.iter_mut().zip(values) {
        *slot = u32::try_from(value)
            .ok()
            .filter(|&value| value > 0)
            .ok_or(ZoneError::InvalidPoints)?;
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn zone() -> Zone {
        Zone::new("Zone A", "Open", [10, 10, 20, 20, 30, 30])
    }

    #[test]
    fn test_alternating_doors() {
        let doors = Doors::new([true, false, true, false, true, false]);

        assert_eq!(zone().total_points(doors), 60);
    }

    #[test]
    fn test_empty_and_full() {
        assert_eq!(zone().total_points(Doors::default()), 0);
        assert_eq!(zone().total_points(Doors::new([true; 6])), 120);
    }

    #[test]
    fn test_validation() {
        assert!(ZoneInput::new(7, zone()).is_ok());

        let blank = Zone::new("  ", "Open", [1; 6]);
        assert_eq!(ZoneInput::new(7, blank), Err(ZoneError::MissingIdentity));

        let zero = Zone::new("Zone B", "Open", [1, 1, 0, 1, 1, 1]);
        assert_eq!(ZoneInput::new(7, zero), Err(ZoneError::InvalidPoints));
    }

    #[test]
    fn test_parse_points() {
        assert_eq!(parse_points("10, 10,20,20,30,30"), Ok([10, 10, 20, 20, 30, 30]));
        assert_eq!(parse_points("1,2,3"), Err(ZoneError::WrongPointCount(3)));
        assert_eq!(parse_points("1,2,3,4,5,0"), Err(ZoneError::InvalidPoints));
        assert_eq!(parse_points("1,2,3,4,5,-6"), Err(ZoneError::InvalidPoints));
        assert_eq!(parse_points("1,2,,4,5,6"), Err(ZoneError::InvalidPoints));
    }

    #[test]
    fn test_input_wire_shape() {
        let input = ZoneInput::new(7, zone()).unwrap();
        let value = serde_json::to_value(&input).unwrap();

        assert_eq!(value["competition_id"], 7);
        assert_eq!(value["zone"], "Zone A");
        assert_eq!(value["points_door6"], 30);
    }

    proptest! {
        #[test]
        fn total_is_sum_of_passed(points in any::<[u16; 6]>(), passed in any::<[bool; 6]>()) {
            let points = points.map(u32::from);
            let zone = Zone::new("z", "c", points);

            let expected: u32 = points
                .iter()
                .zip(passed)
                .filter(|(_, passed)| *passed)
                .map(|(points, _)| *points)
                .sum();

            prop_assert_eq!(zone.total_points(Doors::new(passed)), expected);
        }
    }
}
