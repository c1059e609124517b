use clap::{Parser, Subcommand};
use fulfillment_api::{config, db, migrator::Migrator};
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[derive(Parser)]
#[command(name = "migration", about = "Apply or inspect the fulfillment schema", version)]
struct Cli {
    #[arg(long, help = "Database URL; defaults to the configured database_url")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations
    Up {
        #[arg(long, help = "Apply at most this many migrations")]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(long, default_value_t = 1, help = "Number of migrations to roll back")]
        steps: u32,
    },
    /// List applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let pool = match cli.database_url {
        Some(url) => db::establish_connection(&url).await?,
        None => db::establish_connection_from_app_config(&cfg).await?,
    };

    match cli.command {
        Command::Up { steps } => {
            Migrator::up(&pool, steps).await?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Command::Status => Migrator::status(&pool).await?,
    }

    Ok(())
}
