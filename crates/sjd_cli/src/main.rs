//! `sjd` command-line entry point.
//!
//! # Responsibility
//! - Expose account, hearing and directory operations of `sjd_core` for
//!   local administration and scripting.
//! - Build the connection pool once per invocation and pass it down.

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use log::info;
use serde_json::json;
use sjd_core::db::migrations::current_user_version;
use sjd_core::repo::user_repo::SqliteUserRepository;
use sjd_core::search::directory::{search_users, UserSearchQuery};
use sjd_core::service::account_service::{AccountLanding, RegisterRequest};
use sjd_core::service::hearing_service::ScheduleHearingRequest;
use sjd_core::{
    init_logging, AccountService, ConnectionPool, CoreConfig, Hearing, HearingService, Role,
    SqliteHearingRepository, UserId, UserProfile,
};
use std::path::PathBuf;

/// SJD judicial case-management backend
#[derive(Parser, Debug)]
#[command(name = "sjd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "SJD_DB_PATH")]
    db: Option<PathBuf>,

    /// Directory for rolling log files; file logging is off when unset
    #[arg(long, global = true, env = "SJD_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SJD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or migrate the database
    Init,
    /// Register a new account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        cpf: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// citizen, judge, legal_entity or public_servant (aliases accepted)
        #[arg(long, value_parser = parse_role)]
        role: Role,
    },
    /// Check credentials and print the landing route
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show one account
    Profile {
        #[arg(long)]
        user_id: UserId,
    },
    /// Replace an account password
    ChangePassword {
        #[arg(long)]
        user_id: UserId,
        #[arg(long)]
        old_password: String,
        #[arg(long)]
        new_password: String,
    },
    /// Schedule a hearing with its participants
    ScheduleHearing {
        /// Local time, e.g. 2024-03-01T10:00:00
        #[arg(long)]
        at: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        judge_id: UserId,
        /// Participant type tag stored with the hearing
        #[arg(long)]
        kind: String,
        /// Participant user ids, comma-separated or repeated
        #[arg(long = "participant", value_delimiter = ',', required = true)]
        participants: Vec<UserId>,
    },
    /// List hearings of a judge or a participant
    #[command(group(ArgGroup::new("owner").required(true).args(["judge_id", "participant_id"])))]
    Hearings {
        #[arg(long)]
        judge_id: Option<UserId>,
        #[arg(long)]
        participant_id: Option<UserId>,
    },
    /// Find accounts by name, email or CPF
    SearchUsers {
        text: String,
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).context("failed to initialize logging")?;
    }

    let pool = ConnectionPool::open(&config.db_path, config.pool)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    info!(
        "event=cli_command module=cli status=start command={}",
        command_name(&cli.command)
    );

    run(&cli, &pool)
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn run(cli: &Cli, pool: &ConnectionPool) -> Result<()> {
    match &cli.command {
        Command::Init => {
            let conn = pool.acquire()?;
            let version = current_user_version(&conn)?;
            if cli.json {
                print_json(&json!({ "db": pool.path(), "schema_version": version }))?;
            } else {
                println!("database ready: {} (schema v{version})", pool.path().display());
            }
        }
        Command::Register {
            email,
            cpf,
            phone,
            name,
            password,
            role,
        } => {
            let conn = pool.acquire()?;
            let service = AccountService::new(SqliteUserRepository::try_new(&conn)?);
            let landing = service.register(RegisterRequest {
                email: email.clone(),
                cpf: cpf.clone(),
                phone: phone.clone(),
                full_name: name.clone(),
                password: password.clone(),
                role: *role,
            })?;
            print_landing(cli.json, &landing)?;
        }
        Command::Login { email, password } => {
            let conn = pool.acquire()?;
            let service = AccountService::new(SqliteUserRepository::try_new(&conn)?);
            let landing = service.login(email, password)?;
            print_landing(cli.json, &landing)?;
        }
        Command::Profile { user_id } => {
            let conn = pool.acquire()?;
            let service = AccountService::new(SqliteUserRepository::try_new(&conn)?);
            let profile = service.profile(*user_id)?;
            print_profiles(cli.json, std::slice::from_ref(&profile))?;
        }
        Command::ChangePassword {
            user_id,
            old_password,
            new_password,
        } => {
            let conn = pool.acquire()?;
            let service = AccountService::new(SqliteUserRepository::try_new(&conn)?);
            service.change_password(*user_id, old_password, new_password)?;
            println!("password updated for user {user_id}");
        }
        Command::ScheduleHearing {
            at,
            location,
            description,
            judge_id,
            kind,
            participants,
        } => {
            let service = HearingService::new(SqliteHearingRepository::new(pool));
            let hearing = service.schedule(ScheduleHearingRequest {
                scheduled_at: at.clone(),
                location: location.clone(),
                description: description.clone(),
                judge_id: *judge_id,
                participant_kind: kind.clone(),
                participant_ids: participants.clone(),
            })?;
            print_hearings(cli.json, std::slice::from_ref(&hearing))?;
        }
        Command::Hearings {
            judge_id,
            participant_id,
        } => {
            let service = HearingService::new(SqliteHearingRepository::new(pool));
            let hearings = match (judge_id, participant_id) {
                (Some(judge_id), _) => service.list_for_judge(*judge_id)?,
                (None, Some(participant_id)) => service.list_for_participant(*participant_id)?,
                (None, None) => bail!("either --judge-id or --participant-id is required"),
            };
            print_hearings(cli.json, &hearings)?;
        }
        Command::SearchUsers { text, role, limit } => {
            let conn = pool.acquire()?;
            let users = search_users(
                &conn,
                &UserSearchQuery {
                    text: text.clone(),
                    role: *role,
                    limit: *limit,
                },
            )?;
            print_profiles(cli.json, &users)?;
        }
    }
    Ok(())
}

fn parse_role(value: &str) -> std::result::Result<Role, String> {
    Role::parse(value).ok_or_else(|| {
        format!("unknown role `{value}`; expected citizen, judge, legal_entity or public_servant")
    })
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Init => "init",
        Command::Register { .. } => "register",
        Command::Login { .. } => "login",
        Command::Profile { .. } => "profile",
        Command::ChangePassword { .. } => "change-password",
        Command::ScheduleHearing { .. } => "schedule-hearing",
        Command::Hearings { .. } => "hearings",
        Command::SearchUsers { .. } => "search-users",
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_landing(as_json: bool, landing: &AccountLanding) -> Result<()> {
    if as_json {
        return print_json(&json!({
            "profile": landing.profile,
            "home_route": landing.home_route,
        }));
    }
    println!(
        "user {} ({}) -> {}",
        landing.profile.id, landing.profile.role, landing.home_route
    );
    Ok(())
}

fn print_profiles(as_json: bool, profiles: &[UserProfile]) -> Result<()> {
    if as_json {
        return print_json(&serde_json::to_value(profiles)?);
    }
    for profile in profiles {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            profile.id, profile.role, profile.full_name, profile.email, profile.cpf
        );
    }
    Ok(())
}

fn print_hearings(as_json: bool, hearings: &[Hearing]) -> Result<()> {
    if as_json {
        return print_json(&serde_json::to_value(hearings)?);
    }
    for hearing in hearings {
        let participants = hearing
            .participant_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{}\t{}\t{}\tjudge={}\tparticipants={}",
            hearing.id, hearing.scheduled_at, hearing.location, hearing.judge_id, participants
        );
    }
    Ok(())
}
