use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{
        HeaderMap,
        header::{COOKIE, SET_COOKIE},
    },
    response::IntoResponse,
};
use scoring::{
    Access, Competition, CompetitionId, CompetitionInput, Dossard, Participant, RoleSet,
    RunResponse, RunSubmission,
    competition::{CompetitionListResponse, ParticipantRuns, RunDeleteQuery},
    models::{LoginResponse, LoginUser},
    zone::{ZoneDeleteInput, ZoneInput, ZoneListResponse},
};
use tracing::{debug, info};

use crate::{error::AppError, state::MockState};

const SESSION_COOKIE: &str = "session";

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
}

fn session_roles(state: &MockState, headers: &HeaderMap) -> Result<RoleSet, AppError> {
    let token = session_token(headers).ok_or(AppError::Unauthenticated)?;

    state
        .store()?
        .sessions
        .get(&token)
        .cloned()
        .ok_or(AppError::Unauthenticated)
}

fn authorize(
    state: &MockState,
    headers: &HeaderMap,
    competition_id: CompetitionId,
    access: Access,
) -> Result<(), AppError> {
    let roles = session_roles(state, headers)?;

    if !roles.can_access_competition(competition_id, access) {
        return Err(AppError::Forbidden);
    }

    Ok(())
}

pub async fn login_handler(
    State(state): State<Arc<MockState>>,
    Json(payload): Json<LoginUser>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store()?;

    let roles = match store.accounts.get(&payload.email) {
        Some(account) if account.password == payload.password => account.roles.clone(),
        _ => return Err(AppError::InvalidCredentials),
    };

    let token = store.open_session(RoleSet::from_raw(roles.iter()));
    info!("{} signed in", payload.email);

    Ok((
        [(SET_COOKIE, format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly"))],
        Json(LoginResponse { roles }),
    ))
}

pub async fn logout_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session_token(&headers) {
        state.store()?.sessions.remove(&token);
    }

    Ok([(SET_COOKIE, format!("{SESSION_COOKIE}=; Path=/; Max-Age=0"))])
}

pub async fn participant_handler(
    State(state): State<Arc<MockState>>,
    Path((competition_id, dossard)): Path<(CompetitionId, Dossard)>,
    headers: HeaderMap,
) -> Result<Json<Participant>, AppError> {
    authorize(&state, &headers, competition_id, Access::Referee)?;

    state
        .store()?
        .participants
        .get(&(competition_id, dossard))
        .cloned()
        .map(Json)
        .ok_or(AppError::NotFound("Participant"))
}

pub async fn run_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(payload): Json<RunSubmission>,
) -> Result<Json<RunResponse>, AppError> {
    authorize(&state, &headers, payload.competition_id, Access::Referee)?;
    let mut store = state.store()?;

    if !store
        .participants
        .contains_key(&(payload.competition_id, payload.dossard))
    {
        return Err(AppError::NotFound("Participant"));
    }

    let zone_known = store
        .zones
        .get(&payload.competition_id)
        .is_some_and(|zones| zones.iter().any(|zone| zone.zone == payload.zone));
    if !zone_known {
        return Err(AppError::NotFound("Zone"));
    }

    if !payload.chrono_sec.is_finite() || payload.chrono_sec < 0.0 {
        return Err(AppError::Invalid("Invalid chrono".to_string()));
    }

    let previous = store
        .runs
        .iter()
        .filter(|run| {
            run.run.competition_id == payload.competition_id
                && run.run.dossard == payload.dossard
                && run.run.zone == payload.zone
        })
        .count();

    let response = RunResponse {
        run_number: u32::try_from(previous + 1).unwrap_or(u32::MAX),
        run: payload,
    };
    debug!(
        "Run {} recorded for dossard {}",
        response.run_number, response.run.dossard
    );
    store.runs.push(response.clone());

    Ok(Json(response))
}

pub async fn zones_handler(
    State(state): State<Arc<MockState>>,
    Path(competition_id): Path<CompetitionId>,
    headers: HeaderMap,
) -> Result<Json<ZoneListResponse>, AppError> {
    authorize(&state, &headers, competition_id, Access::Referee)?;

    Ok(Json(ZoneListResponse {
        competition_id,
        zones: state.zones(competition_id),
    }))
}

pub async fn add_zone_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(payload): Json<ZoneInput>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &headers, payload.competition_id, Access::Admin)?;
    payload
        .validate()
        .map_err(|e| AppError::Invalid(e.to_string()))?;

    let mut store = state.store()?;
    let zones = store.zones.entry(payload.competition_id).or_default();

    if zones
        .iter()
        .any(|zone| zone.is(&payload.zone.zone, &payload.zone.category))
    {
        return Err(AppError::Conflict);
    }

    zones.push(payload.zone);
    Ok(Json(serde_json::json!({ "status": "created" })))
}

pub async fn update_zone_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(payload): Json<ZoneInput>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &headers, payload.competition_id, Access::Admin)?;
    payload
        .validate()
        .map_err(|e| AppError::Invalid(e.to_string()))?;

    let mut store = state.store()?;
    let zone = store
        .zones
        .get_mut(&payload.competition_id)
        .and_then(|zones| {
            zones
                .iter_mut()
                .find(|zone| zone.is(&payload.zone.zone, &payload.zone.category))
        })
        .ok_or(AppError::NotFound("Zone"))?;

    *zone = payload.zone;
    Ok(Json(serde_json::json!({ "status": "updated" })))
}

pub async fn delete_zone_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(payload): Json<ZoneDeleteInput>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &headers, payload.competition_id, Access::Admin)?;

    let mut store = state.store()?;
    let zones = store
        .zones
        .get_mut(&payload.competition_id)
        .ok_or(AppError::NotFound("Zone"))?;

    let before = zones.len();
    zones.retain(|zone| !zone.is(&payload.zone, &payload.category));
    if zones.len() == before {
        return Err(AppError::NotFound("Zone"));
    }

    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

pub async fn competitions_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> Result<Json<CompetitionListResponse>, AppError> {
    session_roles(&state, &headers)?;

    Ok(Json(CompetitionListResponse {
        competitions: state.store()?.competitions.clone(),
    }))
}

/// The creator administers the new competition for the rest of the session.
pub async fn create_competition_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(payload): Json<CompetitionInput>,
) -> Result<Json<Competition>, AppError> {
    let roles = session_roles(&state, &headers)?;
    if !roles.can_create_competition() {
        return Err(AppError::Forbidden);
    }
    payload
        .validate()
        .map_err(|e| AppError::Invalid(e.to_string()))?;

    let mut store = state.store()?;
    let competition = store.add_competition(payload);

    if let Some(token) = session_token(&headers) {
        let mut raw = roles.to_raw();
        raw.push(format!("admin:{}", competition.id));
        store.sessions.insert(token, RoleSet::from_raw(raw));
    }

    info!("Competition {} created", competition.id);
    Ok(Json(competition))
}

pub async fn participant_runs_handler(
    State(state): State<Arc<MockState>>,
    Path((competition_id, dossard)): Path<(CompetitionId, Dossard)>,
    headers: HeaderMap,
) -> Result<Json<ParticipantRuns>, AppError> {
    authorize(&state, &headers, competition_id, Access::Admin)?;
    let store = state.store()?;

    if !store.participants.contains_key(&(competition_id, dossard)) {
        return Err(AppError::NotFound("Participant"));
    }

    let runs = store
        .runs
        .iter()
        .filter(|run| run.run.competition_id == competition_id && run.run.dossard == dossard)
        .cloned()
        .collect();

    Ok(Json(ParticipantRuns {
        competition_id,
        dossard,
        runs,
    }))
}

pub async fn update_run_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(payload): Json<RunResponse>,
) -> Result<Json<RunResponse>, AppError> {
    authorize(&state, &headers, payload.run.competition_id, Access::Admin)?;

    if !payload.run.chrono_sec.is_finite() || payload.run.chrono_sec < 0.0 {
        return Err(AppError::Invalid("Invalid chrono".to_string()));
    }

    let mut store = state.store()?;
    let run = store
        .runs
        .iter_mut()
        .find(|run| {
            run.run_number == payload.run_number
                && run.run.competition_id == payload.run.competition_id
                && run.run.dossard == payload.run.dossard
                && run.run.zone == payload.run.zone
        })
        .ok_or(AppError::NotFound("Run"))?;

    *run = payload.clone();
    debug!(
        "Run {} of dossard {} corrected",
        payload.run_number, payload.run.dossard
    );

    Ok(Json(payload))
}

pub async fn delete_run_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<RunDeleteQuery>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &headers, query.competition_id, Access::Admin)?;

    let mut store = state.store()?;
    let before = store.runs.len();
    store.runs.retain(|run| {
        !(run.run_number == query.run_number
            && run.run.competition_id == query.competition_id
            && run.run.dossard == query.dossard)
    });
    if store.runs.len() == before {
        return Err(AppError::NotFound("Run"));
    }

    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
