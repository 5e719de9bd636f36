use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use profile_directory::migrations::{self, Migration, MigrationLog, DEFAULT_LOG_FILE, MIGRATIONS};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "migrate",
    version,
    about = "Show and track the profile directory database migrations"
)]
struct Args {
    /// JSON file recording completed migrations
    #[arg(short, long, default_value = DEFAULT_LOG_FILE)]
    log: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every migration with its status
    List,
    /// Count completed and pending migrations
    Status,
    /// Print the SQL of one migration
    Show { file: String },
    /// Print the SQL of every pending migration (default)
    Pending,
    /// Record a migration as applied
    MarkCompleted { file: String },
}

fn setup_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,migrate=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .init();
}

fn print_migration(migration: &Migration, log: &MigrationLog) {
    let rule = "=".repeat(70);
    println!("\n{rule}");
    println!("Migration: {}", migration.name());
    println!("{rule}\n");
    println!("{}", migration.sql.trim());
    println!("\n{rule}");
    println!("1. Open the database SQL editor");
    println!("2. Run the SQL above");
    println!(
        "3. Then run: migrate --log {} mark-completed {}\n",
        log.path().display(),
        migration.file
    );
}

fn main() -> Result<()> {
    setup_tracing();
    let args = Args::parse();
    let mut log = MigrationLog::load(&args.log);

    match args.command.unwrap_or(Command::Pending) {
        Command::List => {
            println!("\nAll migrations:\n");
            for (i, migration) in MIGRATIONS.iter().enumerate() {
                let status = if log.is_completed(migration) {
                    "completed"
                } else {
                    "pending"
                };
                println!("   {}. {} - {}", i + 1, migration.file, status);
            }
            println!();
        }
        Command::Status => {
            let pending = log.pending();
            println!("\nMigration status:\n");
            println!("   Total migrations: {}", MIGRATIONS.len());
            println!("   Completed: {}", MIGRATIONS.len() - pending.len());
            println!("   Pending: {}", pending.len());
            for migration in pending {
                println!("     - {}", migration.file);
            }
            println!();
        }
        Command::Show { file } => {
            let Some(migration) = migrations::find(&file) else {
                bail!("Migration not found: {file}");
            };
            if log.is_completed(migration) {
                info!("{} is already marked as completed", migration.file);
            }
            print_migration(migration, &log);
        }
        Command::Pending => {
            let pending = log.pending();
            if pending.is_empty() {
                println!("All migrations are completed");
            }
            for migration in pending {
                print_migration(migration, &log);
            }
        }
        Command::MarkCompleted { file } => {
            let newly = log
                .mark_completed(&file)
                .with_context(|| format!("Failed to mark {file} as completed"))?;
            if newly {
                println!("Marked {file} as completed");
            } else {
                println!("{file} is already marked as completed");
            }
        }
    }

    Ok(())
}
