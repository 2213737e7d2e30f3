use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use utoipa::OpenApi;

use finsec_api::{
    api::docs::ApiDoc,
    config::Config,
    database::{self, schema},
};

/// Operational tooling for the FinSec API.
/// Validates configuration, checks the database and applies the schema.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, verbatim_doc_comment)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        config_command: ConfigCommand,
    },
    /// Database commands.
    Db {
        #[command(subcommand)]
        db_command: DbCommand,
    },
    /// Prints the generated OpenAPI document as JSON.
    Openapi {
        /// Write to this file instead of stdout (e.g. static/swagger.json).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validates the environment and prints the effective settings with secrets masked.
    Check,
}

#[derive(Subcommand, Debug)]
enum DbCommand {
    /// Connects and runs `SELECT 1`.
    Ping,
    /// Applies the bundled schema. Existing tables are left untouched.
    Migrate,
}

fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    Config::from_env().map_err(|err| {
        for variable in err.variables() {
            eprintln!("  - {}", variable);
        }
        err.into()
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { config_command } => match config_command {
            ConfigCommand::Check => {
                let config = load_config()?;
                println!("Configuration is valid.");
                println!("{:#?}", config);
                println!("database url: {}", config.mysql.redacted_url());
            }
        },
        Commands::Db { db_command } => {
            let config = load_config()?;
            let db = database::connect_with_settings(&config.database).await?;
            match db_command {
                DbCommand::Ping => {
                    println!("Database {} is reachable.", config.mysql.redacted_url());
                }
                DbCommand::Migrate => {
                    let applied = schema::apply(&db, schema::INIT_SQL).await?;
                    println!("Applied {} schema statement(s).", applied);
                }
            }
            db.close().await?;
        }
        Commands::Openapi { output } => {
            let json = ApiDoc::openapi().to_pretty_json()?;
            match output {
                Some(path) => {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&path, json)?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}
