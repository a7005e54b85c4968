//
// Copyright (c) 2024 Nathan Fiedler
//
use anyhow::{anyhow, Error};
use clap::{Args, Parser, Subcommand};
use log::{debug, error};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use user_directory::data::repositories::UserRepositoryImpl;
use user_directory::data::sources::{build_data_source, DataSourceType};
use user_directory::domain::entities::{Outcome, User};
use user_directory::domain::repositories::UserRepository;
use user_directory::domain::usecases::{fetch_user, UseCase};
use user_directory::domain::validation::UserValidation;
use user_directory::presentation::UserListCoordinator;
use user_directory::settings::Settings;

/// Manage a directory of user records.
#[derive(Parser)]
#[command(name = "user-directory")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQLite database file, in-memory when not given
    #[arg(long, env = "USERS_DB_PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// List every user
    List,

    /// List users whose first name, last name, or email contains the query
    Search { query: String },

    /// Show one user
    Show {
        /// Numeric identifier or email address
        key: String,
    },

    /// Add a new user
    Add(UserFields),

    /// Replace every field of an existing user
    Update {
        id: i64,

        #[command(flatten)]
        fields: UserFields,
    },

    /// Delete a user
    Delete { id: i64 },
}

#[derive(Args, Debug, PartialEq)]
struct UserFields {
    first: String,
    last: String,
    email: String,
    phone: String,
    /// Date of birth as YYYY-MM-DD
    dob: String,
    address: Option<String>,
}

impl UserFields {
    fn into_user(self, id: i64) -> User {
        User {
            id,
            first_name: self.first,
            last_name: self.last,
            email: self.email,
            phone: self.phone,
            dob: self.dob,
            address: self.address.unwrap_or_default(),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn into_result<T>(outcome: Outcome<T>) -> Result<T, Error> {
    match outcome {
        Outcome::Success(value) => Ok(value),
        Outcome::Error(message) => Err(anyhow!(message)),
        Outcome::Loading => Err(user_directory::Error::InternalError(
            "operation did not complete".into(),
        )
        .into()),
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let mut settings = Settings::from_env()?;
    if cli.database.is_some() {
        settings.database_path = cli.database;
    }
    let dstype = match settings.database_path.clone() {
        Some(path) => DataSourceType::SqliteFile(path),
        None => DataSourceType::SqliteMemory,
    };
    debug!("opening store {:?}", dstype);
    let source = build_data_source(dstype, settings.busy_timeout)?;
    let repo: Arc<dyn UserRepository> = Arc::new(UserRepositoryImpl::new(source));
    match cli.command {
        Commands::List => print_json(&repo.all_users().current()),
        Commands::Search { query } => print_json(&repo.search_users(&query).current()),
        Commands::Show { key } => {
            let usecase = fetch_user::FetchUser::new(repo);
            print_json(&usecase.call(fetch_user::Params::parse(&key))?)
        }
        Commands::Add(fields) => {
            let coordinator = start_coordinator(repo, &settings);
            print_json(&into_result(coordinator.add_user(fields.into_user(0)).await)?)
        }
        Commands::Update { id, fields } => {
            let coordinator = start_coordinator(repo, &settings);
            print_json(&into_result(coordinator.update_user(fields.into_user(id)).await)?)
        }
        Commands::Delete { id } => {
            let coordinator = start_coordinator(repo, &settings);
            into_result(coordinator.delete_user(id).await)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn start_coordinator(repo: Arc<dyn UserRepository>, settings: &Settings) -> UserListCoordinator {
    UserListCoordinator::start(repo, Arc::new(UserValidation::new()), settings)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("command failed: {}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
