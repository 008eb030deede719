//! # Console
//!
//! Line-driven referee screen around [`Flow`].
//!
//! One task multiplexes:
//! - operator lines from the input
//! - a single sampling interval, only polled while the chrono runs
//! - the outcome of the one request in flight
//! - shutdown
//!
//! Requests run concurrently with input, so the chrono and doors stay usable while a
//! lookup or submit is pending. Chrono notifications are drained after every loop turn.
//!
//! ## Commands
//!
//! | Command | Step |
//! |---|---|
//! | `d <dossard>` | dossard input |
//! | `confirm`, `back` | participant confirmation |
//! | `start`, `pause`, `t`, `reset` | run registration |
//! | `door <n>` or `p<n>`, `+`, `-` | run registration |
//! | `finish` | run registration |
//! | `submit`, `back` | summary |
//! | `show`, `help`, `quit` | any |
use std::{future::Future, io::Write, pin::Pin, str::FromStr, time::Duration};

use scoring::{
    Access, ChronoEvent, ChronoState, Door, Doors, Flow, Participant, RunResponse,
    Stage, stopwatch::format_chrono,
};
use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};

use crate::{api::Backend, error::AppError, session::Session};

const HELP: &str = "\
d <dossard>      look up a participant
confirm | back   accept or reject the participant
start | pause | t | reset
door <n> | p<n>  toggle door n (1-6)
+ | -            penalty up or down
finish           stop scoring and show the summary
submit           send the run
show | help | quit";

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown command `{0}`, type `help`")]
pub struct UnknownCommand(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dossard(String),
    Confirm,
    Back,
    Start,
    Pause,
    Toggle,
    Reset,
    Door(Door),
    PenaltyUp,
    PenaltyDown,
    Finish,
    Submit,
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownCommand(line.trim().to_string());

        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default().to_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(unknown());
        }

        let command = match (head.as_str(), arg) {
            ("d" | "dossard", Some(dossard)) => Command::Dossard(dossard.to_string()),
            ("c" | "confirm", None) => Command::Confirm,
            ("b" | "back" | "cancel", None) => Command::Back,
            ("start", None) => Command::Start,
            ("pause", None) => Command::Pause,
            ("t" | "toggle", None) => Command::Toggle,
            ("reset", None) => Command::Reset,
            ("door", Some(number)) => Command::Door(parse_door(number).ok_or_else(unknown)?),
            ("+", None) => Command::PenaltyUp,
            ("-", None) => Command::PenaltyDown,
            ("f" | "finish", None) => Command::Finish,
            ("s" | "submit", None) => Command::Submit,
            ("" | "show", None) => Command::Show,
            ("h" | "help", None) => Command::Help,
            ("q" | "quit", None) => Command::Quit,
            (word, None) if word.starts_with('p') => {
                Command::Door(word.strip_prefix('p').and_then(parse_door).ok_or_else(unknown)?)
            }
            _ => return Err(unknown()),
        };

        Ok(command)
    }
}

fn parse_door(number: &str) -> Option<Door> {
    number.parse::<u8>().ok().and_then(Door::from_number)
}

enum Outcome {
    Lookup(Result<Participant, AppError>),
    Submit(Result<RunResponse, AppError>),
}

type InFlight<'a> = Pin<Box<dyn Future<Output = Outcome> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Continue,
    Quit,
}

pub struct Console<'a, B: Backend, W: Write> {
    backend: &'a B,
    session: &'a mut Session,
    flow: Flow,
    out: W,
    in_flight: Option<InFlight<'a>>,
}

impl<'a, B: Backend, W: Write> Console<'a, B, W> {
    pub fn new(backend: &'a B, session: &'a mut Session, flow: Flow, out: W) -> Self {
        Self {
            backend,
            session,
            flow,
            out,
            in_flight: None,
        }
    }

    /// Runs until `quit`, end of input with nothing in flight, session expiry or shutdown.
    pub async fn run<R, F>(mut self, input: R, tick: Duration, shutdown: F) -> Result<Flow, AppError>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        let mut lines = input.lines();
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut input_closed = false;
        tokio::pin!(shutdown);

        self.render()?;

        loop {
            if input_closed && self.in_flight.is_none() {
                break;
            }

            let running = self
                .flow
                .run_session()
                .is_some_and(|session| session.stopwatch().is_running());

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested, leaving console");
                    break;
                }
                Some(outcome) = next_outcome(&mut self.in_flight) => {
                    self.in_flight = None;
                    if self.settle(outcome)? == Control::Quit {
                        break;
                    }
                }
                _ = ticker.tick(), if running => {
                    if let Ok(session) = self.flow.run_session_mut() {
                        session.stopwatch_mut().sample();
                    }
                }
                line = lines.next_line(), if !input_closed => match line? {
                    Some(line) => {
                        if self.handle_line(&line)? == Control::Quit {
                            break;
                        }
                    }
                    None => input_closed = true,
                },
            }

            self.flush_chrono()?;
        }

        self.out.flush()?;
        Ok(self.flow)
    }

    fn handle_line(&mut self, line: &str) -> Result<Control, AppError> {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(self.out, "! {e}")?;
                return Ok(Control::Continue);
            }
        };
        debug!("Command {command:?}");

        if !self
            .session
            .roles()
            .can_access_competition(self.flow.competition_id(), Access::Referee)
        {
            writeln!(self.out, "! {}", AppError::denied())?;
            return Ok(Control::Quit);
        }

        match command {
            Command::Quit => return Ok(Control::Quit),
            Command::Help => writeln!(self.out, "{HELP}")?,
            command => match self.apply(command) {
                Ok(()) => {}
                Err(AppError::Flow(e)) => writeln!(self.out, "! {e}")?,
                Err(e) => return Err(e),
            },
        }

        self.flush_chrono()?;
        self.render()?;
        Ok(Control::Continue)
    }

    fn apply(&mut self, command: Command) -> Result<(), AppError> {
        match command {
            Command::Dossard(dossard) => {
                let request = self.flow.request_lookup(&dossard)?;
                let backend = self.backend;

                self.in_flight = Some(Box::pin(async move {
                    Outcome::Lookup(
                        backend
                            .participant(request.competition_id, request.dossard)
                            .await,
                    )
                }));
                writeln!(self.out, "looking up dossard {}...", request.dossard)?;
            }
            Command::Confirm => self.flow.confirm_participant()?,
            Command::Back => self.flow.back()?,
            Command::Start => self.flow.run_session_mut()?.start_chrono(),
            Command::Pause => self.flow.run_session_mut()?.pause_chrono(),
            Command::Toggle => self.flow.run_session_mut()?.toggle_chrono(),
            Command::Reset => self.flow.run_session_mut()?.reset_chrono(),
            Command::Door(door) => {
                self.flow.run_session_mut()?.toggle_door(door)?;
            }
            Command::PenaltyUp => {
                self.flow.run_session_mut()?.increment_penalty();
            }
            Command::PenaltyDown => {
                self.flow.run_session_mut()?.decrement_penalty();
            }
            Command::Finish => {
                self.flow.finish_run()?;
            }
            Command::Submit => {
                let submission = self.flow.request_submit()?;
                let backend = self.backend;

                self.in_flight = Some(Box::pin(async move {
                    Outcome::Submit(backend.submit_run(&submission).await)
                }));
                writeln!(self.out, "submitting...")?;
            }
            Command::Show | Command::Help | Command::Quit => {}
        }

        Ok(())
    }

    fn settle(&mut self, outcome: Outcome) -> Result<Control, AppError> {
        match outcome {
            Outcome::Lookup(result) => match self.session.track(result) {
                Err(AppError::SignedOut) => return self.expired(),
                result => self.flow.complete_lookup(result.map_err(|e| e.failure()))?,
            },
            Outcome::Submit(result) => match self.session.track(result) {
                Err(AppError::SignedOut) => return self.expired(),
                Ok(run) => {
                    writeln!(
                        self.out,
                        "run {} saved for dossard {}",
                        run.run_number, run.run.dossard
                    )?;
                    self.flow.complete_submit(Ok(run))?;
                }
                Err(e) => self.flow.complete_submit(Err(e.failure()))?,
            },
        }

        if let Some(error) = self.flow.error() {
            writeln!(self.out, "! {error}")?;
        }

        if self.flow.is_denied() {
            return Ok(Control::Quit);
        }
        self.render()?;

        Ok(Control::Continue)
    }

    fn expired(&mut self) -> Result<Control, AppError> {
        self.backend.forget_session();
        writeln!(self.out, "! Session expired. Please login again.")?;
        Ok(Control::Quit)
    }

    fn flush_chrono(&mut self) -> Result<(), AppError> {
        let Ok(session) = self.flow.run_session_mut() else {
            return Ok(());
        };

        for event in session.stopwatch_mut().drain_events() {
            match event {
                ChronoEvent::Elapsed(seconds) => {
                    writeln!(self.out, "chrono {}", format_chrono(seconds as f64))?
                }
                ChronoEvent::RunningChanged(true) => writeln!(self.out, "chrono running")?,
                ChronoEvent::RunningChanged(false) => writeln!(self.out, "chrono paused")?,
                ChronoEvent::Reset => writeln!(self.out, "chrono reset")?,
            }
        }

        Ok(())
    }

    fn render(&mut self) -> Result<(), AppError> {
        let zone = self.flow.zone();

        match self.flow.stage() {
            Stage::DossardInput => {
                writeln!(self.out, "[{} / {}] dossard? (d <number>)", zone.zone, zone.category)?
            }
            Stage::ParticipantConfirmation { participant } => writeln!(
                self.out,
                "{} #{} ({}) in {} - confirm | back",
                participant.full_name(),
                participant.dossard_number,
                participant.category,
                zone.zone
            )?,
            Stage::RunRegistration { session, .. } => {
                let state = match session.stopwatch().state() {
                    ChronoState::Idle => "idle",
                    ChronoState::Running => "running",
                    ChronoState::Paused => "paused",
                };
                let doors = if session.doors_locked() {
                    "locked".to_string()
                } else {
                    door_marks(session.doors())
                };

                writeln!(
                    self.out,
                    "chrono {} [{state}] | doors {doors} | penalty {}",
                    session.stopwatch().display(),
                    session.penalty()
                )?;
            }
            Stage::Success { participant, .. } => {
                writeln!(
                    self.out,
                    "summary for {} #{}",
                    participant.full_name(),
                    participant.dossard_number
                )?;

                if let Some(summary) = self.flow.summary() {
                    for line in &summary.doors {
                        let mark = if line.passed { "x" } else { "-" };
                        writeln!(self.out, "  {} [{mark}] {} pts", line.door, line.points)?;
                    }
                    writeln!(self.out, "  total {} pts", summary.total_points)?;
                    writeln!(self.out, "  penalty {}", summary.penalty)?;
                    writeln!(self.out, "  chrono {}", summary.chrono)?;
                }
                writeln!(self.out, "submit | back")?;
            }
        }

        Ok(())
    }
}

async fn next_outcome(in_flight: &mut Option<InFlight<'_>>) -> Option<Outcome> {
    match in_flight {
        Some(request) => Some(request.await),
        None => None,
    }
}

fn door_marks(doors: Doors) -> String {
    doors
        .iter()
        .map(|(door, passed)| format!("{door}:{}", if passed { "x" } else { "-" }))
        .collect::<Vec<_>>()
        .join(" ")
}
