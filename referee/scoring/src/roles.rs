//! # Roles
//!
//! Login hands back raw strings, they are parsed once into [`Role`] and every check
//! runs on the parsed set.
//!
//! | Raw                | Role                 |
//! |--------------------|----------------------|
//! | `admin:*`          | `AdminAll`           |
//! | `admin:<id>`       | `AdminOf(id)`        |
//! | `referee:<id>`     | `RefereeOf(id)`      |
//! | `create:competition` | `CreateCompetition` |
//! | anything else      | `Other(raw)`         |
//!
//! `Other` keeps exact-match lookups working but never grants competition access.
use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::CompetitionId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    AdminAll,
    AdminOf(CompetitionId),
    RefereeOf(CompetitionId),
    CreateCompetition,
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some(("admin", "*")) => Role::AdminAll,
            Some(("create", "competition")) => Role::CreateCompetition,
            Some(("admin", id)) => parse_id(id).map_or_else(|| Role::Other(raw.to_string()), Role::AdminOf),
            Some(("referee", id)) => {
                parse_id(id).map_or_else(|| Role::Other(raw.to_string()), Role::RefereeOf)
            }
            _ => Role::Other(raw.to_string()),
        }
    }
}

// only canonical decimal ids, so `admin:07` stays distinct from `admin:7`
fn parse_id(raw: &str) -> Option<CompetitionId> {
    raw.parse::<CompetitionId>()
        .ok()
        .filter(|id| id.to_string() == raw)
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::AdminAll => write!(f, "admin:*"),
            Role::AdminOf(id) => write!(f, "admin:{id}"),
            Role::RefereeOf(id) => write!(f, "referee:{id}"),
            Role::CreateCompetition => write!(f, "create:competition"),
            Role::Other(raw) => write!(f, "{raw}"),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown competition action: {0}")]
pub struct UnknownAccess(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Admin,
    Referee,
}

impl FromStr for Access {
    type Err = UnknownAccess;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Access::Admin),
            "referee" => Ok(Access::Referee),
            other => Err(UnknownAccess(other.to_string())),
        }
    }
}

/// Immutable snapshot of a user's roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RoleSet {
    roles: BTreeSet<Role>,
}

impl RoleSet {
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            roles: raw.into_iter().map(|role| Role::parse(role.as_ref())).collect(),
        }
    }

    pub fn to_raw(&self) -> Vec<String> {
        self.roles.iter().map(ToString::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter()
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn has_role(&self, raw: &str) -> bool {
        self.contains(&Role::parse(raw))
    }

    pub fn has_any_role<S: AsRef<str>>(&self, raws: &[S]) -> bool {
        raws.iter().any(|raw| self.has_role(raw.as_ref()))
    }

    pub fn is_admin(&self) -> bool {
        self.contains(&Role::AdminAll)
    }

    pub fn can_create_competition(&self) -> bool {
        self.is_admin() || self.contains(&Role::CreateCompetition)
    }

    pub fn can_access_competition(&self, competition_id: CompetitionId, access: Access) -> bool {
        if self.is_admin() {
            return true;
        }

        let admin = self.contains(&Role::AdminOf(competition_id));
        match access {
            Access::Admin => admin,
            Access::Referee => admin || self.contains(&Role::RefereeOf(competition_id)),
        }
    }

    /// Same as [`RoleSet::can_access_competition`] with an unparsed action; unknown actions deny.
    pub fn allows(&self, competition_id: CompetitionId, action: &str) -> bool {
        action
            .parse::<Access>()
            .is_ok_and(|access| self.can_access_competition(competition_id, access))
    }
}

impl From<Vec<String>> for RoleSet {
    fn from(raw: Vec<String>) -> Self {
        Self::from_raw(raw)
    }
}

impl From<RoleSet> for Vec<String> {
    fn from(roles: RoleSet) -> Self {
        roles.to_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse() {
        assert_eq!(Role::parse("admin:*"), Role::AdminAll);
        assert_eq!(Role::parse("admin:12"), Role::AdminOf(12));
        assert_eq!(Role::parse("referee:7"), Role::RefereeOf(7));
        assert_eq!(Role::parse("create:competition"), Role::CreateCompetition);
        assert_eq!(Role::parse("admin:07"), Role::Other("admin:07".into()));
        assert_eq!(Role::parse("referee:x"), Role::Other("referee:x".into()));
        assert_eq!(Role::parse("view:competitions"), Role::Other("view:competitions".into()));
    }

    #[test]
    fn test_referee_scenario() {
        let roles = RoleSet::from_raw(["referee:7"]);

        assert!(roles.can_access_competition(7, Access::Referee));
        assert!(!roles.can_access_competition(7, Access::Admin));
        assert!(!roles.can_access_competition(8, Access::Referee));
        assert!(!roles.is_admin());
        assert!(!roles.can_create_competition());
    }

    #[test]
    fn test_global_admin() {
        let roles = RoleSet::from_raw(["admin:*"]);

        assert!(roles.can_access_competition(99, Access::Admin));
        assert!(roles.can_create_competition());
        assert!(roles.allows(99, "referee"));
        assert!(!roles.allows(99, "owner"));
    }

    #[test]
    fn test_create_competition_only() {
        let roles = RoleSet::from_raw(["create:competition"]);

        assert!(roles.can_create_competition());
        assert!(!roles.is_admin());
    }

    #[test]
    fn test_unknown_action_denies() {
        let roles = RoleSet::from_raw(["admin:3", "referee:3"]);

        assert!(!roles.allows(3, "spectator"));
        assert!(!roles.allows(3, ""));
    }

    #[test]
    fn test_exact_match_lookups() {
        let roles = RoleSet::from_raw(["view:competitions", "admin:4"]);

        assert!(roles.has_role("view:competitions"));
        assert!(!roles.has_role("view:competition"));
        assert!(roles.has_any_role(&["manage:users", "admin:4"]));
        assert!(!roles.has_any_role(&["admin:40"]));
    }

    #[test]
    fn test_serde_as_string_array() {
        let roles: RoleSet = serde_json::from_str(r#"["referee:7","admin:*"]"#).unwrap();
        let raw = serde_json::to_string(&roles).unwrap();

        assert!(roles.is_admin());
        assert!(raw.contains("\"referee:7\""));
    }

    fn raw_role() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("admin:*".to_string()),
            Just("create:competition".to_string()),
            (0u64..6).prop_map(|id| format!("admin:{id}")),
            (0u64..6).prop_map(|id| format!("referee:{id}")),
            "[a-z]{1,6}:[a-z0-9*]{1,3}",
        ]
    }

    proptest! {
        #[test]
        fn admin_implies_referee(raw in proptest::collection::vec(raw_role(), 0..6), id in 0u64..6) {
            let roles = RoleSet::from_raw(&raw);

            if roles.can_access_competition(id, Access::Admin) {
                prop_assert!(roles.can_access_competition(id, Access::Referee));
            }
        }
    }
}
