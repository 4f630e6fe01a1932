//! sewa-cli: operaciones de incharge sobre el backend Postgres.
//!
//! Requiere `DATABASE_URL`. La salida es JSON en stdout; los errores van a
//! stderr con código 2 (uso), 4 (rechazado) o 5 (backend).
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use sewa_core::WorkflowEngine;
use sewa_domain::{Caller, Role};
use sewa_persistence::{build_pool_from_env, init_dotenv, PgStore, PoolProvider};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod error;

use error::{CliError, CliResult};

type Engine = WorkflowEngine<PgStore<PoolProvider>>;

#[derive(Parser)]
#[command(name = "sewa-cli")]
#[command(about = "Program workflow operations for incharges", long_about = None)]
#[command(version)]
struct Cli {
    /// Cuenta que ejecuta la operación
    #[arg(long, env = "SEWA_ACCOUNT_ID", global = true)]
    account: Option<Uuid>,

    /// Rol de la cuenta (sewadar, incharge, admin)
    #[arg(long, env = "SEWA_ACCOUNT_ROLE", default_value = "incharge", global = true)]
    role: Role,

    /// Token de la ubicación primaria
    #[arg(long, env = "SEWA_PRIMARY_LOCATION", global = true)]
    primary_location: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Etapa actual y políticas efectivas del programa
    Status { program: Uuid },
    /// Avanza manualmente a la etapa siguiente
    Advance { program: Uuid },
    /// Libera el formulario de detalles (etapa 3 → 4)
    ReleaseForm { program: Uuid },
    /// Cierra la recolección de detalles (etapa 4 → 5)
    CollectDetails { program: Uuid },
    /// Re-despacha la notificación de la etapa actual de cada workflow
    Sweep,
    /// Selecciona participantes respetando el cupo
    Select {
        program: Uuid,
        #[arg(required = true, num_args = 1..)]
        sewadars: Vec<Uuid>,
    },
    /// Ranking de solicitantes por asistencia
    Rank { program: Uuid },
    /// Siembra las preferencias globales por defecto
    Seed,
}

fn main() -> ExitCode {
    init_dotenv();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
                             .with_writer(std::io::stderr)
                             .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[sewa-cli] {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if std::env::var("DATABASE_URL").is_err() {
        return Err(CliError::Usage("DATABASE_URL not set".into()));
    }
    let engine = build_engine(cli.primary_location.clone())?;
    match cli.command {
        Commands::Status { program } => print(&engine.status(program)?),
        Commands::Advance { program } => print(&engine.advance(&caller(&cli)?, program)?),
        Commands::ReleaseForm { program } => print(&engine.release_form(&caller(&cli)?, program)?),
        Commands::CollectDetails { program } => print(&engine.mark_details_collected(&caller(&cli)?, program)?),
        Commands::Sweep => print(&engine.run_daily_notification_sweep()?),
        Commands::Select { program, ref sewadars } => print(&engine.select(&caller(&cli)?, program, sewadars)?),
        Commands::Rank { program } => print(&engine.rank_applicants(program)?),
        Commands::Seed => {
            let inserted = engine.resolver().ensure_seeded().map_err(sewa_core::WorkflowError::from)?;
            print(&serde_json::json!({ "inserted": inserted }))
        }
    }
}

fn build_engine(primary_location: Option<String>) -> CliResult<Engine> {
    let pool = build_pool_from_env()?;
    let store = Arc::new(PgStore::new(PoolProvider { pool }));
    let mut builder = WorkflowEngine::builder(store);
    if let Some(token) = primary_location {
        builder = builder.primary_location(token);
    }
    Ok(builder.build())
}

fn caller(cli: &Cli) -> CliResult<Caller> {
    cli.account
       .map(|id| Caller::new(id, cli.role))
       .ok_or_else(|| CliError::Usage("--account (or SEWA_ACCOUNT_ID) is required for this command".into()))
}

fn print<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
