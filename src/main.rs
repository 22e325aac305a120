#![allow(clippy::print_stdout)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use botfeed::config::AppConfig;
use botfeed::db;
use botfeed::importer;
use botfeed::logging::init_logging;
use botfeed::models::UserCreate;
use botfeed::service::{FollowableSampleQuery, PostSampleQuery, SocialService};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and run migrations
    Init,
    /// Import bots and posts from the seed database
    Import {
        /// Path to the seed SQLite database
        #[arg(short, long)]
        seed_db: Option<String>,

        /// Organisation that owns the imported bots
        #[arg(short, long)]
        organisation: Option<String>,
    },
    /// Register a new user and print their bearer token
    Register {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Username
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },
    /// Issue a bearer token for existing credentials
    Token {
        /// Email or username
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },
    /// Draw random posts as the authenticated user
    RandomPosts {
        /// Bearer token identifying the caller
        #[arg(short, long)]
        token: String,

        /// Number of posts to draw
        #[arg(short, long)]
        count: Option<i64>,

        /// Only posts carrying this tag id
        #[arg(long)]
        by_tag: Option<i64>,

        /// Only posts owned by this bot id
        #[arg(long)]
        by_bot: Option<i64>,

        /// Only posts owned by or mentioning this bot id
        #[arg(long)]
        by_or_mentioned: Option<i64>,

        /// Only the caller's favorites
        #[arg(long)]
        favorites_only: bool,

        /// Free-text filter; every term must appear in the content
        #[arg(short, long)]
        filter: Option<String>,

        /// Post ids to exclude from the draw
        #[arg(short = 'x', long)]
        exclude: Vec<i64>,
    },
    /// Draw random bots as the authenticated user
    RandomBots {
        /// Bearer token identifying the caller
        #[arg(short, long)]
        token: String,

        /// Number of bots to draw
        #[arg(short, long)]
        count: Option<i64>,

        /// Only bots the caller follows
        #[arg(long)]
        following_only: bool,

        /// Bot ids to exclude from the draw
        #[arg(short = 'x', long)]
        exclude: Vec<i64>,
    },
    /// Print row counts across the store
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging; the guard keeps the file writer alive
    let log_file = config.logging.file_path.clone().map(std::path::PathBuf::from);
    let _guard = init_logging(Some(&config.get_log_level()), log_file.as_deref())?;

    info!("Starting botfeed");

    let cli = Cli::parse();

    let database = db::establish_connection(&config.database)?;
    let service = SocialService::new(database.clone(), &config);

    match cli.command {
        Commands::Init => {
            // establish_connection already ran the migrations
            info!("Database initialized");
        },
        Commands::Import { seed_db, organisation } => {
            let mut import_config = config.import.clone();
            if let Some(seed_db) = seed_db {
                import_config.seed_database_path = seed_db;
            }
            if let Some(organisation) = organisation {
                import_config.organisation_name = organisation;
            }

            let summary = importer::run(&database, &import_config)?;
            println!("{summary:#?}");
        },
        Commands::Register {
            email,
            username,
            password,
        } => {
            let token = service
                .register_user(UserCreate {
                    email,
                    username,
                    password,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&token)?);
        },
        Commands::Token { username, password } => {
            let token = service.issue_token(&username, &password).await?;
            println!("{}", serde_json::to_string_pretty(&token)?);
        },
        Commands::RandomPosts {
            token,
            count,
            by_tag,
            by_bot,
            by_or_mentioned,
            favorites_only,
            filter,
            exclude,
        } => {
            let user = service.current_user(&token).await?;
            let posts = service
                .random_posts(
                    &user,
                    PostSampleQuery {
                        count,
                        by_tag,
                        by_bot,
                        by_or_mentioned,
                        favorites_only,
                        content_filter: filter,
                        exclude,
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&posts)?);
        },
        Commands::RandomBots {
            token,
            count,
            following_only,
            exclude,
        } => {
            let user = service.current_user(&token).await?;
            let bots = service
                .random_bots(
                    &user,
                    FollowableSampleQuery {
                        count,
                        following_only,
                        exclude,
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&bots)?);
        },
        Commands::Stats => {
            let stats = database.store_stats().context("Failed to read store stats")?;
            println!("{stats:#?}");
        },
    }

    Ok(())
}
