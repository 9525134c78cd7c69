//! Amal Admin CLI
//!
//! Administration tool for the Amal server database.
//!
//! # Usage
//!
//! ```bash
//! amal-admin user add aziz@example.com --name Aziz --city Samarqand
//! amal-admin user list
//! amal-admin user key aziz@example.com --label phone
//! amal-admin export aziz@example.com
//! amal-admin stats aziz@example.com --end 2024-03-10 --days 7
//! ```
//!
//! Reads the same configuration as the server (`AMAL_CONFIG`, `AMAL_DATABASE_PATH`).

use amal::config::Config;
use amal::db::{init_db, Store};
use amal::engine::{SnapshotReader, StatsAggregator};
use amal_core::Profile;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "amal-admin")]
#[command(version)]
#[command(about = "Amal server administration tool")]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User(UserCommand),
    /// Print a user's full snapshot as JSON
    Export {
        /// User's email address
        email: String,
    },
    /// Print a user's windowed statistics as JSON
    Stats {
        /// User's email address
        email: String,
        /// Last day of the window (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<String>,
        /// Window length in days (1-30, default: 7)
        #[arg(long)]
        days: Option<String>,
    },
}

#[derive(Args)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Subcommand)]
enum UserSubcommand {
    /// Add a new user and issue their first API key
    Add {
        /// User's email address
        email: String,
        /// User's display name
        #[arg(long, short)]
        name: Option<String>,
        /// User's city
        #[arg(long, short)]
        city: Option<String>,
    },
    /// List all users
    List,
    /// Issue another API key for an existing user
    Key {
        /// User's email address
        email: String,
        /// Label to remember the key by
        #[arg(long, short)]
        label: Option<String>,
    },
}

async fn open_store(config_path: Option<PathBuf>) -> Result<Store, Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;
    let pool = init_db(&config.database_path).await?;
    Ok(Store::new(pool))
}

async fn find_user(store: &Store, email: &str) -> Result<Profile, Box<dyn std::error::Error>> {
    store
        .profiles
        .get_by_email(email)
        .await?
        .ok_or_else(|| format!("User '{}' not found", email).into())
}

async fn add_user(store: &Store, email: String, name: Option<String>, city: Option<String>) -> CliResult {
    if store.profiles.get_by_email(&email).await?.is_some() {
        return Err(format!("User '{}' already exists", email).into());
    }

    let mut profile = Profile::new(uuid::Uuid::new_v4().to_string(), email);
    if let Some(name) = name {
        profile = profile.with_name(name);
    }
    if let Some(city) = city {
        profile = profile.with_city(city);
    }

    let profile = store.profiles.create(&profile).await?;
    let key = store.api_keys.issue(&profile.id, Some("initial")).await?;

    println!("Added user: {}", profile.email);
    println!("  ID: {}", profile.id);
    if !profile.name.is_empty() {
        println!("  Name: {}", profile.name);
    }
    println!("  City: {}", profile.city);
    println!("  API key: {}", key);
    println!();
    println!("Store the key now; it cannot be shown again.");

    Ok(())
}

async fn list_users(store: &Store) -> CliResult {
    let profiles = store.profiles.list().await?;

    if profiles.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    println!("{:<40} {:<20} {:>8} {:>8}", "EMAIL", "NAME", "XP", "STREAK");
    println!("{}", "-".repeat(80));
    for profile in &profiles {
        println!(
            "{:<40} {:<20} {:>8} {:>8}",
            profile.email, profile.name, profile.xp, profile.streak
        );
    }

    println!();
    println!("Total: {} user(s)", profiles.len());

    Ok(())
}

async fn issue_key(store: &Store, email: String, label: Option<String>) -> CliResult {
    let profile = find_user(store, &email).await?;
    let key = store.api_keys.issue(&profile.id, label.as_deref()).await?;
    println!("API key for {}: {}", profile.email, key);
    Ok(())
}

async fn export(store: Store, email: String) -> CliResult {
    let profile = find_user(&store, &email).await?;
    let snapshot = SnapshotReader::new(store).read(&profile.id).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn stats(store: Store, email: String, end: Option<String>, days: Option<String>) -> CliResult {
    let profile = find_user(&store, &email).await?;
    let stats = StatsAggregator::new(store)
        .weekly(&profile.id, end.as_deref(), days.as_deref(), Utc::now().date_naive())
        .await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn run(cli: Cli) -> CliResult {
    let store = open_store(cli.config).await?;

    match cli.command {
        Commands::User(user_cmd) => match user_cmd.command {
            UserSubcommand::Add { email, name, city } => add_user(&store, email, name, city).await,
            UserSubcommand::List => list_users(&store).await,
            UserSubcommand::Key { email, label } => issue_key(&store, email, label).await,
        },
        Commands::Export { email } => export(store, email).await,
        Commands::Stats { email, end, days } => stats(store, email, end, days).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
