use std::sync::Arc;

use clap::{Parser, Subcommand};
use client::{
    commands::{Context, RefereeTarget},
    config::Config,
    init_tracing, shutdown_signal,
};
use scoring::{
    CompetitionId, CompetitionInput, Dossard, MonotonicClock, RunCorrection, RunResponse, Zone,
    competition::parse_doors, zone::parse_points,
};
use tokio::io::{BufReader, stdin};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Referee client for bicycle-trial competitions")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "REFEREE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    Logout,

    /// Print the roles of the current session
    Whoami,

    /// List the zones of a competition
    Zones {
        #[arg(long)]
        competition: CompetitionId,
    },

    #[command(subcommand)]
    Zone(ZoneCommand),

    /// List the competitions visible to the current session
    Competitions,

    #[command(subcommand)]
    Competition(CompetitionCommand),

    /// List the recorded runs of a participant
    Runs {
        #[arg(long)]
        competition: CompetitionId,

        #[arg(long)]
        dossard: Dossard,

        #[arg(long)]
        zone: Option<String>,
    },

    #[command(subcommand)]
    Run(RunCommand),

    /// Register runs for one zone
    Referee {
        #[arg(long)]
        competition: CompetitionId,

        #[arg(long)]
        zone: String,

        #[arg(long)]
        category: String,
    },
}

#[derive(Subcommand, Debug)]
enum ZoneCommand {
    /// Points are six comma separated values, e.g. `10,10,20,20,30,30`
    Add {
        #[arg(long)]
        competition: CompetitionId,

        #[arg(long)]
        zone: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        points: String,
    },

    Update {
        #[arg(long)]
        competition: CompetitionId,

        #[arg(long)]
        zone: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        points: String,
    },

    Delete {
        #[arg(long)]
        competition: CompetitionId,

        #[arg(long)]
        zone: String,

        #[arg(long)]
        category: String,
    },
}

#[derive(Subcommand, Debug)]
enum CompetitionCommand {
    Create {
        #[arg(long)]
        name: String,

        /// e.g. `2025-05-01`
        #[arg(long)]
        date: String,

        #[arg(long)]
        location: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        organizer: String,

        #[arg(long)]
        contact: String,
    },
}

#[derive(Subcommand, Debug)]
enum RunCommand {
    /// Doors are the passed door numbers, e.g. `1,3,6`, or an empty string for none
    Update {
        #[arg(long)]
        competition: CompetitionId,

        #[arg(long)]
        dossard: Dossard,

        #[arg(long)]
        run_number: u32,

        #[arg(long)]
        chrono: Option<f64>,

        #[arg(long)]
        penalty: Option<u32>,

        #[arg(long)]
        doors: Option<String>,
    },

    Delete {
        #[arg(long)]
        competition: CompetitionId,

        #[arg(long)]
        dossard: Dossard,

        #[arg(long)]
        run_number: u32,
    },
}

fn print_run(run: &RunResponse) {
    let doors: Vec<String> = run
        .run
        .doors()
        .iter()
        .filter(|(_, passed)| *passed)
        .map(|(door, _)| door.to_string())
        .collect();

    println!(
        "#{} zone {}: {:.2}s, penalty {}, doors [{}]",
        run.run_number,
        run.run.zone,
        run.run.chrono_sec,
        run.run.penality,
        doors.join(" ")
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::load()?;
    let mut context = Context::open(config)?;

    match args.command {
        Command::Login { email, password } => {
            let roles = context.login(&email, &password).await?;
            println!("Signed in with roles: {}", roles.to_raw().join(", "));
        }
        Command::Logout => {
            context.logout().await?;
            println!("Signed out");
        }
        Command::Whoami => {
            let roles = context.whoami();
            if roles.is_empty() {
                println!("Not signed in");
            } else {
                println!("{}", roles.to_raw().join(", "));
            }
        }
        Command::Zones { competition } => {
            for zone in context.zones(competition).await? {
                let points: Vec<String> = zone.points().iter().map(u32::to_string).collect();
                println!("{} ({}): {}", zone.zone, zone.category, points.join(","));
            }
        }
        Command::Zone(ZoneCommand::Add {
            competition,
            zone,
            category,
            points,
        }) => {
            let zone = Zone::new(&zone, &category, parse_points(&points)?);
            context.add_zone(competition, zone).await?;
            println!("Zone created");
        }
        Command::Zone(ZoneCommand::Update {
            competition,
            zone,
            category,
            points,
        }) => {
            let zone = Zone::new(&zone, &category, parse_points(&points)?);
            context.update_zone(competition, zone).await?;
            println!("Zone updated");
        }
        Command::Zone(ZoneCommand::Delete {
            competition,
            zone,
            category,
        }) => {
            context.delete_zone(competition, &zone, &category).await?;
            println!("Zone deleted");
        }
        Command::Competitions => {
            for competition in context.competitions().await? {
                println!(
                    "{}: {} ({}, {})",
                    competition.id, competition.name, competition.date, competition.location
                );
            }
        }
        Command::Competition(CompetitionCommand::Create {
            name,
            date,
            location,
            description,
            organizer,
            contact,
        }) => {
            let input = CompetitionInput {
                name,
                date,
                location,
                description,
                organizer,
                contact,
            };
            let competition = context.create_competition(input).await?;
            println!("Competition {} created", competition.id);
        }
        Command::Runs {
            competition,
            dossard,
            zone,
        } => {
            for run in context.runs(competition, dossard, zone.as_deref()).await? {
                print_run(&run);
            }
        }
        Command::Run(RunCommand::Update {
            competition,
            dossard,
            run_number,
            chrono,
            penalty,
            doors,
        }) => {
            let correction = RunCorrection {
                chrono_sec: chrono,
                penalty,
                doors: doors.as_deref().map(parse_doors).transpose()?,
            };
            let run = context
                .update_run(competition, dossard, run_number, correction)
                .await?;
            print_run(&run);
        }
        Command::Run(RunCommand::Delete {
            competition,
            dossard,
            run_number,
        }) => {
            context.delete_run(competition, dossard, run_number).await?;
            println!("Run deleted");
        }
        Command::Referee {
            competition,
            zone,
            category,
        } => {
            let target = RefereeTarget {
                competition_id: competition,
                zone,
                category,
            };

            context
                .referee(
                    &target,
                    Arc::new(MonotonicClock::new()),
                    BufReader::new(stdin()),
                    std::io::stdout(),
                    shutdown_signal(),
                )
                .await?;
            info!("Referee session closed");
        }
    }

    Ok(())
}
