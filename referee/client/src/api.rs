//! # Backend
//!
//! HTTP client for the competition backend.
//!
//! ## Routes
//!
//! - `POST /login`, `POST /logout`
//! - `GET /competition/{id}/participant/{dossard}`
//! - `POST /run`
//! - `GET /competition/{id}/zones`
//! - `POST | PUT | DELETE /competition/zone`
//! - `GET | POST /competition`
//! - `GET /competition/{id}/participant/{dossard}/runs`
//! - `PUT /run`, `DELETE /run?competitionID=&dossard=&runNumber=`
//!
//! ## Cookies
//!
//! The backend authenticates with an http-only cookie set on login. We keep the
//! `name=value` pairs from `Set-Cookie` and send them back on every request, the
//! session file persists them between runs.
use std::{sync::RwLock, time::Duration};

use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder, Response,
    header::{COOKIE, SET_COOKIE},
};
use scoring::{
    CompetitionId, Dossard, Participant, RoleSet, RunResponse, RunSubmission,
    competition::{
        Competition, CompetitionInput, CompetitionListResponse, ParticipantRuns, RunDeleteQuery,
    },
    models::{LoginResponse, LoginUser, ServerError},
    zone::{Zone, ZoneDeleteInput, ZoneInput, ZoneListResponse},
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Login {
    pub roles: RoleSet,
    pub cookie: Option<String>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn login(&self, credentials: &LoginUser) -> Result<Login, AppError>;

    async fn logout(&self) -> Result<(), AppError>;

    async fn participant(&self, competition_id: CompetitionId, dossard: Dossard) -> Result<Participant, AppError>;

    async fn submit_run(&self, run: &RunSubmission) -> Result<RunResponse, AppError>;

    async fn zones(&self, competition_id: CompetitionId) -> Result<Vec<Zone>, AppError>;

    async fn add_zone(&self, zone: &ZoneInput) -> Result<(), AppError>;

    async fn update_zone(&self, zone: &ZoneInput) -> Result<(), AppError>;

    async fn delete_zone(&self, zone: &ZoneDeleteInput) -> Result<(), AppError>;

    async fn competitions(&self) -> Result<Vec<Competition>, AppError>;

    async fn create_competition(&self, competition: &CompetitionInput) -> Result<Competition, AppError>;

    async fn participant_runs(&self, competition_id: CompetitionId, dossard: Dossard) -> Result<Vec<RunResponse>, AppError>;

    async fn update_run(&self, run: &RunResponse) -> Result<RunResponse, AppError>;

    async fn delete_run(&self, run: &RunDeleteQuery) -> Result<(), AppError>;

    /// Drops any credentials held for the signed-in user.
    fn forget_session(&self);
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    cookie: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie: RwLock::new(None),
        })
    }

    pub fn with_cookie(self, cookie: Option<String>) -> Self {
        self.set_cookie(cookie);
        self
    }

    pub fn set_cookie(&self, cookie: Option<String>) {
        if let Ok(mut slot) = self.cookie.write() {
            *slot = cookie;
        }
    }

    fn cookie(&self) -> Option<String> {
        self.cookie.read().ok().and_then(|slot| slot.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));

        match self.cookie() {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn login(&self, credentials: &LoginUser) -> Result<Login, AppError> {
        let response = check(self.request(Method::POST, "login").json(credentials).send().await?).await?;

        let cookie = session_cookie(&response);
        let body: LoginResponse = response.json().await?;
        info!("Signed in with {} roles", body.roles.len());

        self.set_cookie(cookie.clone());

        Ok(Login {
            roles: RoleSet::from_raw(body.roles),
            cookie,
        })
    }

    async fn logout(&self) -> Result<(), AppError> {
        let result = self.request(Method::POST, "logout").send().await;
        self.set_cookie(None);

        check(result?).await?;
        Ok(())
    }

    async fn participant(&self, competition_id: CompetitionId, dossard: Dossard) -> Result<Participant, AppError> {
        debug!("Looking up dossard {dossard} in competition {competition_id}");

        read(
            self.request(
                Method::GET,
                &format!("competition/{competition_id}/participant/{dossard}"),
            )
            .send()
            .await?,
        )
        .await
    }

    async fn submit_run(&self, run: &RunSubmission) -> Result<RunResponse, AppError> {
        debug!("Submitting run for dossard {}", run.dossard);

        read(self.request(Method::POST, "run").json(run).send().await?).await
    }

    async fn zones(&self, competition_id: CompetitionId) -> Result<Vec<Zone>, AppError> {
        let list: ZoneListResponse = read(
            self.request(Method::GET, &format!("competition/{competition_id}/zones"))
                .send()
                .await?,
        )
        .await?;

        Ok(list.zones)
    }

    async fn add_zone(&self, zone: &ZoneInput) -> Result<(), AppError> {
        zone.validate()?;

        check(self.request(Method::POST, "competition/zone").json(zone).send().await?).await?;
        Ok(())
    }

    async fn update_zone(&self, zone: &ZoneInput) -> Result<(), AppError> {
        zone.validate()?;

        check(self.request(Method::PUT, "competition/zone").json(zone).send().await?).await?;
        Ok(())
    }

    async fn delete_zone(&self, zone: &ZoneDeleteInput) -> Result<(), AppError> {
        check(self.request(Method::DELETE, "competition/zone").json(zone).send().await?).await?;
        Ok(())
    }

    async fn competitions(&self) -> Result<Vec<Competition>, AppError> {
        let list: CompetitionListResponse =
            read(self.request(Method::GET, "competition").send().await?).await?;

        Ok(list.competitions)
    }

    async fn create_competition(&self, competition: &CompetitionInput) -> Result<Competition, AppError> {
        competition.validate()?;

        read(self.request(Method::POST, "competition").json(competition).send().await?).await
    }

    async fn participant_runs(&self, competition_id: CompetitionId, dossard: Dossard) -> Result<Vec<RunResponse>, AppError> {
        let history: ParticipantRuns = read(
            self.request(
                Method::GET,
                &format!("competition/{competition_id}/participant/{dossard}/runs"),
            )
            .send()
            .await?,
        )
        .await?;

        Ok(history.runs)
    }

    async fn update_run(&self, run: &RunResponse) -> Result<RunResponse, AppError> {
        debug!("Correcting run {} of dossard {}", run.run_number, run.run.dossard);

        read(self.request(Method::PUT, "run").json(run).send().await?).await
    }

    async fn delete_run(&self, run: &RunDeleteQuery) -> Result<(), AppError> {
        check(self.request(Method::DELETE, "run").query(run).send().await?).await?;
        Ok(())
    }

    fn forget_session(&self) {
        debug!("Dropping session cookie");
        self.set_cookie(None);
    }
}

async fn read<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    Ok(check(response).await?.json::<T>().await?)
}

async fn check(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ServerError>(&body)
        .ok()
        .and_then(|error| error.message);

    warn!("Backend answered {status}");
    Err(AppError::Rejected(scoring::Failure::from_status(
        status.as_u16(),
        message.as_deref(),
    )))
}

fn session_cookie(response: &Response) -> Option<String> {
    let pairs: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();

    (!pairs.is_empty()).then(|| pairs.join("; "))
}
