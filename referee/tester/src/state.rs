use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use scoring::{Competition, CompetitionId, CompetitionInput, Dossard, Participant, RoleSet, RunResponse, Zone};
use tracing::debug;

use crate::error::AppError;

pub struct Account {
    pub password: String,
    pub roles: Vec<String>,
}

#[derive(Default)]
pub struct Store {
    pub accounts: HashMap<String, Account>,
    pub sessions: HashMap<String, RoleSet>,
    pub participants: HashMap<(CompetitionId, Dossard), Participant>,
    pub zones: HashMap<CompetitionId, Vec<Zone>>,
    pub runs: Vec<RunResponse>,
    pub competitions: Vec<Competition>,
    next_token: u64,
}

impl Store {
    pub fn open_session(&mut self, roles: RoleSet) -> String {
        self.next_token += 1;
        let token = format!("token-{}", self.next_token);
        self.sessions.insert(token.clone(), roles);

        token
    }

    pub fn add_competition(&mut self, input: CompetitionInput) -> Competition {
        let id = self
            .competitions
            .iter()
            .map(|competition| competition.id)
            .max()
            .unwrap_or_default()
            + 1;

        let competition = input.into_competition(id);
        self.competitions.push(competition.clone());

        competition
    }
}

#[derive(Default)]
pub struct MockState {
    store: Mutex<Store>,
}

impl MockState {
    pub fn new(store: Store) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
        })
    }

    /// One admin, one organizer, one referee of competition 7, zone A and dossard 42.
    pub fn demo() -> Arc<Self> {
        let mut store = Store::default();

        store.accounts.insert(
            "admin@trial.test".to_string(),
            Account {
                password: "admin".to_string(),
                roles: vec!["admin:*".to_string()],
            },
        );
        store.accounts.insert(
            "referee@trial.test".to_string(),
            Account {
                password: "referee".to_string(),
                roles: vec!["referee:7".to_string()],
            },
        );
        store.accounts.insert(
            "organizer@trial.test".to_string(),
            Account {
                password: "organizer".to_string(),
                roles: vec!["create:competition".to_string()],
            },
        );

        for (id, name) in [(7, "Spring Trial"), (8, "Autumn Trial")] {
            store.competitions.push(Competition {
                id,
                name: name.to_string(),
                date: "2025-05-01".to_string(),
                location: "Namur".to_string(),
                description: String::new(),
                organizer: "Trial Club".to_string(),
                contact: "club@trial.test".to_string(),
            });
        }

        store
            .zones
            .insert(7, vec![Zone::new("A", "Open", [10, 10, 20, 20, 30, 30])]);
        store.participants.insert(
            (7, 42),
            Participant {
                category: "Open".to_string(),
                competition_id: 7,
                dossard_number: 42,
                first_name: "Jean".to_string(),
                last_name: "Dupont".to_string(),
            },
        );

        debug!("Seeded demo competitions 7 and 8");
        Self::new(store)
    }

    pub fn store(&self) -> Result<MutexGuard<'_, Store>, AppError> {
        self.store.lock().map_err(|_| AppError::Poisoned)
    }

    pub fn runs(&self) -> Vec<RunResponse> {
        self.store()
            .map(|store| store.runs.clone())
            .unwrap_or_default()
    }

    pub fn zones(&self, competition_id: CompetitionId) -> Vec<Zone> {
        self.store()
            .ok()
            .and_then(|store| store.zones.get(&competition_id).cloned())
            .unwrap_or_default()
    }
}
