//! # Vibes CLI (`vibes`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vibes serve` | Start the HTTP API |
//! | `vibes seed` | Load JSON seed files into the record store |
//! | `vibes seed-content` | Load JSON seed files into the content store |
//! | `vibes init` | Create the content database schema |
//!
//! ## Examples
//!
//! ```bash
//! # Serve on port 3000 with the record store persisted to ./data/ideas.sqlite
//! DB_FILE_PATH=./data/ideas.sqlite vibes serve
//!
//! # Seed the record store, failing on duplicate ids
//! vibes seed --dir ./seeds --db ./data/ideas.sqlite --no-skip-duplicates
//!
//! # Preview a content seed without writing
//! vibes seed-content ./seeds --db ./data/app.db --dry-run
//! ```

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use vibes_only_served::config;
use vibes_only_served::migrate;
use vibes_only_served::seed::{self, SeedOptions};
use vibes_only_served::seed_content::{self, ContentSeedOptions};
use vibes_only_served::server;

/// Idea service demo: HTTP API plus JSON seed loaders.
///
/// Settings come from environment variables (`PORT`, `APP_VERSION`,
/// `GIT_COMMIT`, `AI_PROVIDER`, `DB_FILE_PATH`, `DB_PATH`, `SEED_DIR`,
/// `IDEAS_BACKEND`), optionally layered over a TOML file.
#[derive(Parser)]
#[command(name = "vibes", version, about)]
struct Cli {
    /// Optional TOML configuration file. Environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `0.0.0.0:$PORT` and serves until interrupted.
    Serve,

    /// Seed the record store from a directory of JSON files.
    ///
    /// Each file may hold an array of ideas, `{ "ideas": [...] }`, or a single
    /// idea object `{ id, title, summary, objective, tags }`.
    Seed {
        /// Directory containing .json files (or set SEED_DIR).
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Target database file (or set DB_FILE_PATH).
        #[arg(long, short = 'f', visible_short_alias = 'b')]
        db: Option<PathBuf>,

        /// Abort on the first non-duplicate error.
        #[arg(long)]
        strict: bool,

        /// Fail on duplicate ids instead of skipping them.
        #[arg(long = "no-skip-duplicates")]
        no_skip_duplicates: bool,
    },

    /// Seed the content store from a directory of JSON files.
    ///
    /// Items may be strings or `{ content, createdAt? }` objects, given as an
    /// array, `{ "ideas": [...] }`, `{ "idea": ... }`, or a single value.
    /// Malformed files are skipped.
    SeedContent {
        /// Seed directory, as an alternative to --dir.
        #[arg(value_name = "DIR")]
        path: Option<PathBuf>,

        /// Directory containing .json files (or set SEED_DIR; default ./seeds).
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Target database file (or set DB_PATH; default data/app.db).
        #[arg(long, short = 'b', visible_short_alias = 'f')]
        db: Option<PathBuf>,

        /// Delete all existing ideas before inserting.
        #[arg(long)]
        clear: bool,

        /// Report counts without writing.
        #[arg(long, visible_alias = "dry")]
        dry_run: bool,
    },

    /// Create the content database and its schema.
    ///
    /// Idempotent. Uses --db, else DB_PATH, else data/app.db.
    Init {
        #[arg(long, short = 'b')]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Seed {
            dir,
            db,
            strict,
            no_skip_duplicates,
        } => {
            let Some(seed_dir) = dir.or_else(|| cfg.seed.dir.clone()) else {
                usage_error("seed", "a seed directory is required: pass --dir or set SEED_DIR");
            };
            let Some(db_file_path) = db.or_else(|| cfg.db.file_path.clone()) else {
                usage_error("seed", "a database file is required: pass --db or set DB_FILE_PATH");
            };

            let options = SeedOptions {
                seed_dir,
                db_file_path,
                strict,
                skip_duplicates: !no_skip_duplicates,
            };

            match seed::seed_ideas_directory(&options).await {
                Ok(report) => {
                    println!("Seed complete: {}", report);
                    if strict && report.errors > 0 {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("Seeding failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::SeedContent {
            path,
            dir,
            db,
            clear,
            dry_run,
        } => {
            let options = ContentSeedOptions {
                seed_dir: dir
                    .or(path)
                    .or_else(|| cfg.seed.dir.clone())
                    .unwrap_or_else(|| PathBuf::from("seeds")),
                db_path: db.unwrap_or_else(|| cfg.db.content_db_path()),
                clear,
                dry_run,
            };

            match seed_content::seed_content_directory(&options).await {
                Ok(report) => println!("{}", report),
                Err(e) => {
                    eprintln!("Seeding failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Init { db } => {
            let path = db.unwrap_or_else(|| cfg.db.content_db_path());
            migrate::run_init(&path).await?;
            println!("Database initialized successfully: {}", path.display());
        }
    }

    Ok(())
}

/// Log to stderr so stdout carries only command output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vibes_only_served=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print `message` with the subcommand's usage and exit with status 2.
fn usage_error(subcommand: &str, message: &str) -> ! {
    let mut cmd = Cli::command();
    cmd.build();
    let mut sub = cmd.find_subcommand(subcommand).cloned().unwrap_or(cmd);
    sub.error(ErrorKind::MissingRequiredArgument, message).exit()
}
