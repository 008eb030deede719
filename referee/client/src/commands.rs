use std::{future::Future, io::Write, sync::Arc};

use scoring::{
    Access, Clock, CompetitionId, Dossard, Flow, RoleSet, RunResponse, Zone,
    competition::{
        Competition, CompetitionInput, RunCorrection, RunDeleteQuery, visible_competitions,
    },
    models::LoginUser,
    zone::{ZoneDeleteInput, ZoneInput},
};
use tokio::io::AsyncBufRead;
use tracing::{info, warn};

use crate::{
    api::{Backend, HttpBackend},
    config::Config,
    console::Console,
    error::AppError,
    session::{Session, SessionStore},
};

/// Zone a referee is posted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefereeTarget {
    pub competition_id: CompetitionId,
    pub zone: String,
    pub category: String,
}

pub struct Context<B: Backend> {
    pub config: Config,
    pub session: Session,
    pub backend: B,
}

impl Context<HttpBackend> {
    pub fn open(config: Config) -> Result<Self, AppError> {
        let session = Session::open(
            SessionStore::new(&config.session_file),
            config.auth_failure_limit,
        )?;
        let backend = HttpBackend::new(&config.api_url, config.request_timeout)?
            .with_cookie(session.cookie());

        Ok(Self {
            config,
            session,
            backend,
        })
    }
}

impl<B: Backend> Context<B> {
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Arc<RoleSet>, AppError> {
        let credentials = LoginUser {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        let login = self.backend.login(&credentials).await?;
        self.session.set_roles(login.roles, login.cookie)?;
        info!("Signed in as {}", credentials.email);

        Ok(self.session.roles())
    }

    /// Local state is cleared even when the backend cannot be reached.
    pub async fn logout(&mut self) -> Result<(), AppError> {
        if let Err(e) = self.backend.logout().await {
            warn!("Backend logout failed: {e}");
        }

        self.session.clear()
    }

    pub fn whoami(&self) -> Arc<RoleSet> {
        self.session.roles()
    }

    pub async fn zones(&mut self, competition_id: CompetitionId) -> Result<Vec<Zone>, AppError> {
        self.require(competition_id, Access::Referee)?;

        let result = self.backend.zones(competition_id).await;
        self.track(result)
    }

    pub async fn add_zone(&mut self, competition_id: CompetitionId, zone: Zone) -> Result<(), AppError> {
        self.require(competition_id, Access::Admin)?;
        let input = ZoneInput::new(competition_id, zone)?;

        let result = self.backend.add_zone(&input).await;
        self.track(result)?;
        info!("Added zone {} ({})", input.zone.zone, input.zone.category);

        Ok(())
    }

    pub async fn update_zone(&mut self, competition_id: CompetitionId, zone: Zone) -> Result<(), AppError> {
        self.require(competition_id, Access::Admin)?;
        let input = ZoneInput::new(competition_id, zone)?;

        let result = self.backend.update_zone(&input).await;
        self.track(result)?;
        info!("Updated zone {} ({})", input.zone.zone, input.zone.category);

        Ok(())
    }

    pub async fn delete_zone(
        &mut self,
        competition_id: CompetitionId,
        zone: &str,
        category: &str,
    ) -> Result<(), AppError> {
        self.require(competition_id, Access::Admin)?;

        let input = ZoneDeleteInput {
            competition_id,
            zone: zone.to_string(),
            category: category.to_string(),
        };

        let result = self.backend.delete_zone(&input).await;
        self.track(result)?;
        info!("Deleted zone {zone} ({category})");

        Ok(())
    }

    /// Competitions the signed-in user may see.
    pub async fn competitions(&mut self) -> Result<Vec<Competition>, AppError> {
        self.require_signed_in()?;

        let result = self.backend.competitions().await;
        let competitions = self.track(result)?;

        Ok(visible_competitions(&self.session.roles(), competitions))
    }

    pub async fn create_competition(&mut self, input: CompetitionInput) -> Result<Competition, AppError> {
        self.require_signed_in()?;
        if !self.session.roles().can_create_competition() {
            warn!("Denied competition creation");
            return Err(AppError::denied());
        }
        input.validate()?;

        let result = self.backend.create_competition(&input).await;
        let competition = self.track(result)?;
        info!("Created competition {} ({})", competition.id, competition.name);

        Ok(competition)
    }

    /// Recorded runs of one participant, optionally limited to one zone.
    pub async fn runs(
        &mut self,
        competition_id: CompetitionId,
        dossard: Dossard,
        zone: Option<&str>,
    ) -> Result<Vec<RunResponse>, AppError> {
        self.require(competition_id, Access::Admin)?;

        let result = self.backend.participant_runs(competition_id, dossard).await;
        let mut runs = self.track(result)?;
        if let Some(zone) = zone {
            runs.retain(|run| run.run.zone == zone);
        }

        Ok(runs)
    }

    pub async fn update_run(
        &mut self,
        competition_id: CompetitionId,
        dossard: Dossard,
        run_number: u32,
        correction: RunCorrection,
    ) -> Result<RunResponse, AppError> {
        let runs = self.runs(competition_id, dossard, None).await?;
        let recorded = runs
            .iter()
            .find(|run| run.run_number == run_number)
            .ok_or(AppError::UnknownRun {
                competition_id,
                dossard,
                run_number,
            })?;
        let corrected = correction.apply(recorded)?;

        let result = self.backend.update_run(&corrected).await;
        let updated = self.track(result)?;
        info!("Corrected run {run_number} of dossard {dossard}");

        Ok(updated)
    }

    pub async fn delete_run(
        &mut self,
        competition_id: CompetitionId,
        dossard: Dossard,
        run_number: u32,
    ) -> Result<(), AppError> {
        self.require(competition_id, Access::Admin)?;

        let query = RunDeleteQuery {
            competition_id,
            dossard,
            run_number,
        };

        let result = self.backend.delete_run(&query).await;
        self.track(result)?;
        info!("Deleted run {run_number} of dossard {dossard}");

        Ok(())
    }

    /// Resolves the zone the referee asked for, checking access first.
    pub async fn open_zone(&mut self, target: &RefereeTarget) -> Result<Zone, AppError> {
        let zones = self.zones(target.competition_id).await?;

        zones
            .into_iter()
            .find(|zone| zone.is(&target.zone, &target.category))
            .ok_or_else(|| AppError::UnknownZone {
                competition_id: target.competition_id,
                zone: target.zone.clone(),
                category: target.category.clone(),
            })
    }

    pub async fn referee<R, W, F>(
        &mut self,
        target: &RefereeTarget,
        clock: Arc<dyn Clock>,
        input: R,
        out: W,
        shutdown: F,
    ) -> Result<Flow, AppError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        F: Future<Output = ()>,
    {
        let zone = self.open_zone(target).await?;
        info!(
            "Refereeing zone {} ({}) of competition {}",
            zone.zone, zone.category, target.competition_id
        );

        let flow =
            Flow::new(target.competition_id, zone, clock).with_penalty_max(self.config.penalty_max);

        Console::new(&self.backend, &mut self.session, flow, out)
            .run(input, self.config.tick, shutdown)
            .await
    }

    /// Counts the call towards session expiry. An expired session also loses its cookie.
    fn track<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        let result = self.session.track(result);
        if matches!(result, Err(AppError::SignedOut)) {
            self.backend.forget_session();
        }

        result
    }

    fn require_signed_in(&self) -> Result<(), AppError> {
        if !self.session.is_authenticated() {
            return Err(AppError::SignedOut);
        }

        Ok(())
    }

    fn require(&self, competition_id: CompetitionId, access: Access) -> Result<(), AppError> {
        self.require_signed_in()?;

        if !self.session.roles().can_access_competition(competition_id, access) {
            warn!("Denied {access:?} access to competition {competition_id}");
            return Err(AppError::denied());
        }

        Ok(())
    }
}
