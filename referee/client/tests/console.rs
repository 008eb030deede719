use std::{
    future::pending,
    io::{self, Write},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use client::{
    api::{Backend, Login},
    console::Console,
    error::AppError,
    session::{Session, SessionStore},
};
use scoring::{
    Competition, CompetitionId, CompetitionInput, Dossard, Failure, Flow, ManualClock,
    Participant, RoleSet, RunResponse, RunSubmission, Step, Zone,
    competition::RunDeleteQuery,
    models::LoginUser,
    zone::{ZoneDeleteInput, ZoneInput},
};
use tempfile::{TempDir, tempdir};

/// Answers immediately, optionally rejecting with a fixed status.
#[derive(Default)]
struct FakeBackend {
    lookup_status: Option<u16>,
    lookups: Mutex<u32>,
    submit_failures: Mutex<u32>,
    runs: Mutex<Vec<RunSubmission>>,
    forgotten: Mutex<bool>,
}

impl FakeBackend {
    fn runs(&self) -> Vec<RunSubmission> {
        self.runs.lock().unwrap().clone()
    }

    fn lookups(&self) -> u32 {
        *self.lookups.lock().unwrap()
    }

    fn forgotten(&self) -> bool {
        *self.forgotten.lock().unwrap()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn login(&self, _: &LoginUser) -> Result<Login, AppError> {
        unimplemented!()
    }

    async fn logout(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn participant(&self, competition_id: CompetitionId, dossard: Dossard) -> Result<Participant, AppError> {
        *self.lookups.lock().unwrap() += 1;
        if let Some(status) = self.lookup_status {
            return Err(AppError::Rejected(Failure::from_status(status, None)));
        }

        Ok(Participant {
            category: "Open".to_string(),
            competition_id,
            dossard_number: dossard,
            first_name: "Jean".to_string(),
            last_name: "Dupont".to_string(),
        })
    }

    async fn submit_run(&self, run: &RunSubmission) -> Result<RunResponse, AppError> {
        let mut failures = self.submit_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(AppError::Rejected(Failure::from_status(503, None)));
        }

        let mut runs = self.runs.lock().unwrap();
        runs.push(run.clone());

        Ok(RunResponse {
            run_number: runs.len() as u32,
            run: run.clone(),
        })
    }

    async fn zones(&self, _: CompetitionId) -> Result<Vec<Zone>, AppError> {
        Ok(vec![zone()])
    }

    async fn add_zone(&self, _: &ZoneInput) -> Result<(), AppError> {
        Ok(())
    }

    async fn update_zone(&self, _: &ZoneInput) -> Result<(), AppError> {
        Ok(())
    }

    async fn delete_zone(&self, _: &ZoneDeleteInput) -> Result<(), AppError> {
        Ok(())
    }

    async fn competitions(&self) -> Result<Vec<Competition>, AppError> {
        unimplemented!()
    }

    async fn create_competition(&self, _: &CompetitionInput) -> Result<Competition, AppError> {
        unimplemented!()
    }

    async fn participant_runs(&self, _: CompetitionId, _: Dossard) -> Result<Vec<RunResponse>, AppError> {
        unimplemented!()
    }

    async fn update_run(&self, _: &RunResponse) -> Result<RunResponse, AppError> {
        unimplemented!()
    }

    async fn delete_run(&self, _: &RunDeleteQuery) -> Result<(), AppError> {
        unimplemented!()
    }

    fn forget_session(&self) {
        *self.forgotten.lock().unwrap() = true;
    }
}

fn zone() -> Zone {
    Zone::new("A", "Open", [10, 10, 20, 20, 30, 30])
}

fn session(limit: u32) -> (TempDir, Session) {
    let dir = tempdir().unwrap();
    let mut session = Session::open(SessionStore::new(dir.path().join("session.json")), limit).unwrap();
    session.set_roles(RoleSet::from_raw(["referee:7"]), None).unwrap();

    (dir, session)
}

async fn drive(backend: &FakeBackend, session: &mut Session, lines: &str) -> (Flow, String) {
    let flow = Flow::new(7, zone(), Arc::new(ManualClock::new()));
    let mut out = Vec::new();

    let flow = Console::new(backend, session, flow, &mut out)
        .run(lines.as_bytes(), Duration::from_millis(10), pending::<()>())
        .await
        .unwrap();

    (flow, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_full_run_is_submitted() {
    let backend = FakeBackend::default();
    let (_dir, mut session) = session(3);

    let (flow, out) = drive(
        &backend,
        &mut session,
        "d 42\nconfirm\nstart\np1\np3\n+\npause\nfinish\nsubmit\n",
    )
    .await;

    assert!(out.contains("Jean Dupont #42"));
    assert!(out.contains("total 30 pts"));
    assert!(out.contains("run 1 saved for dossard 42"));
    assert_eq!(flow.step(), Step::DossardInput);

    let runs = backend.runs();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].door1 && runs[0].door3);
    assert!(!runs[0].door2 && !runs[0].door6);
    assert_eq!(runs[0].penality, 1);
    assert_eq!(runs[0].zone, "A");
}

#[tokio::test]
async fn test_doors_locked_before_start() {
    let backend = FakeBackend::default();
    let (_dir, mut session) = session(3);

    let (flow, out) = drive(&backend, &mut session, "d 42\nconfirm\np1\n").await;

    assert!(out.contains("Doors are locked until the chrono has started"));
    assert!(!flow.run_session().unwrap().doors().passed(scoring::Door::One));
}

#[tokio::test]
async fn test_invalid_dossard_stays_on_input() {
    let backend = FakeBackend::default();
    let (_dir, mut session) = session(3);

    let (flow, out) = drive(&backend, &mut session, "d abc\n").await;

    assert!(out.contains("Please enter a valid dossard number"));
    assert_eq!(flow.step(), Step::DossardInput);
}

#[tokio::test]
async fn test_unknown_dossard_reports_not_found() {
    let backend = FakeBackend {
        lookup_status: Some(404),
        ..FakeBackend::default()
    };
    let (_dir, mut session) = session(3);

    let (flow, out) = drive(&backend, &mut session, "d 999\n").await;

    assert!(out.contains("The requested resource was not found."));
    assert_eq!(flow.step(), Step::DossardInput);
    assert_eq!(flow.error(), Some("The requested resource was not found."));
}

#[tokio::test]
async fn test_failed_submit_keeps_draft_for_retry() {
    let backend = FakeBackend {
        submit_failures: Mutex::new(1),
        ..FakeBackend::default()
    };
    let (_dir, mut session) = session(3);

    let (flow, out) = drive(
        &backend,
        &mut session,
        "d 42\nconfirm\nstart\np6\npause\nfinish\nsubmit\n",
    )
    .await;

    assert!(out.contains("temporarily unavailable"));
    assert_eq!(flow.step(), Step::Success);
    assert!(backend.runs().is_empty());

    let draft = flow.draft().unwrap();
    assert!(draft.doors.passed(scoring::Door::Six));
}

#[tokio::test]
async fn test_retry_after_failed_submit() {
    let backend = FakeBackend {
        submit_failures: Mutex::new(1),
        ..FakeBackend::default()
    };
    let (_dir, mut session) = session(3);

    let (flow, _) = drive(
        &backend,
        &mut session,
        "d 42\nconfirm\nstart\np6\npause\nfinish\nsubmit\nsubmit\n",
    )
    .await;

    assert_eq!(flow.step(), Step::DossardInput);
    assert_eq!(backend.runs().len(), 1);
    assert!(backend.runs()[0].door6);
}

#[tokio::test]
async fn test_back_from_confirmation_drops_participant() {
    let backend = FakeBackend::default();
    let (_dir, mut session) = session(3);

    let (flow, _) = drive(&backend, &mut session, "d 42\nback\n").await;

    assert_eq!(flow.step(), Step::DossardInput);
    assert!(flow.participant().is_none());
}

#[tokio::test]
async fn test_finish_refused_while_chrono_runs() {
    let backend = FakeBackend::default();
    let (_dir, mut session) = session(3);

    let (flow, out) = drive(&backend, &mut session, "d 42\nconfirm\nstart\nfinish\nquit\n").await;

    assert!(out.contains("Stop the chrono before finishing the run"));
    assert_eq!(flow.step(), Step::RunRegistration);
}

#[tokio::test]
async fn test_repeated_401_expires_session() {
    let backend = FakeBackend {
        lookup_status: Some(401),
        ..FakeBackend::default()
    };
    let (_dir, mut session) = session(2);

    let (_, out) = drive(&backend, &mut session, "d 42\nd 42\nd 42\n").await;

    assert!(out.contains("Session expired. Please login again."));
    assert!(!session.is_authenticated());
    assert!(backend.forgotten());
}

#[tokio::test]
async fn test_forbidden_lookup_closes_console() {
    let backend = FakeBackend {
        lookup_status: Some(403),
        ..FakeBackend::default()
    };
    let (_dir, mut session) = session(3);

    let (flow, out) = drive(&backend, &mut session, "d 42
d 42
d 42
").await;

    assert!(out.contains("You do not have permission to perform this action."));
    assert!(flow.is_denied());
    assert_eq!(backend.lookups(), 1);
    assert!(session.is_authenticated());
    assert!(!backend.forgotten());
}

#[tokio::test]
async fn test_denied_without_referee_role() {
    let backend = FakeBackend::default();
    let (_dir, mut session) = session(3);
    session.set_roles(RoleSet::from_raw(["referee:8"]), None).unwrap();

    let (flow, out) = drive(&backend, &mut session, "d 42\n").await;

    assert!(out.contains("You do not have permission to perform this action."));
    assert_eq!(flow.step(), Step::DossardInput);
    assert!(!flow.is_busy());
}

#[tokio::test]
async fn test_unknown_command_is_reported() {
    let backend = FakeBackend::default();
    let (_dir, mut session) = session(3);

    let (_, out) = drive(&backend, &mut session, "jump\n").await;

    assert!(out.contains("Unknown command `jump`"));
}

/// Fails every write once the output reaches a given text.
struct BrokenOutput {
    written: Vec<u8>,
    fail_on: &'static str,
}

impl Write for BrokenOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        if String::from_utf8_lossy(&self.written).contains(self.fail_on) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_status_line_write_failure_is_reported() {
    let backend = FakeBackend::default();
    let (_dir, mut session) = session(3);
    let flow = Flow::new(7, zone(), Arc::new(ManualClock::new()));
    let out = BrokenOutput {
        written: Vec::new(),
        fail_on: "looking up",
    };

    let result = Console::new(&backend, &mut session, flow, out)
        .run("d 42\nconfirm\n".as_bytes(), Duration::from_millis(10), pending::<()>())
        .await;

    assert!(matches!(result, Err(AppError::Io(_))));
    assert_eq!(backend.lookups(), 0);
}
