//! # llm-fireworks
//!
//! Command-line entry point: lists the Fireworks models the registration hook
//! would hand to the host, and manages the stored API key.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;

use llm_fireworks::app;
use llm_fireworks::config;
use llm_fireworks::keys::KeyStore;
use llm_fireworks::models::{self, FireworksModel, RegisterOutcome, Registration};

/// Command-line arguments for the application
#[derive(Parser)]
#[command(author, version, about = "Fireworks AI models for LLM")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the Fireworks models available with the configured key
    Models {
        /// Print the registrations as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the stored Fireworks API key
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },
}

#[derive(Subcommand)]
enum KeysCommand {
    /// Store the Fireworks API key
    Set {
        /// The API key
        key: String,
    },
    /// Print the path of the key file
    Path,
}

/// One line of `models --json` output.
#[derive(Serialize)]
struct ModelRow<'a> {
    model_id: &'a str,
    model_name: &'a str,
    supports_image_input: bool,
    api_base: &'a str,
    #[serde(rename = "async")]
    has_async: bool,
}

impl<'a> From<&'a Registration> for ModelRow<'a> {
    fn from(r: &'a Registration) -> Self {
        Self {
            model_id: r.model.model_id(),
            model_name: r.model.model_name(),
            supports_image_input: r.model.supports_image_input(),
            api_base: r.model.api_base(),
            has_async: r.async_model.is_some(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // warn by default so stale-cache fallbacks are visible; RUST_LOG=debug for more
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init()
        .ok();

    let args = Args::parse();

    let config = config::load().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let keys = KeyStore::in_user_dir(&config.user_dir);

    match args.command {
        Command::Models { json } => {
            let mut registered: Vec<Registration> = Vec::new();
            let outcome = models::register_models(&config, &keys, |r| registered.push(r))
                .await
                .unwrap_or_else(|e| {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                });

            if outcome == RegisterOutcome::MissingKey {
                eprintln!(
                    "No Fireworks key found. Run `{} keys set <KEY>` or set {}.",
                    app::NAME,
                    app::KEY_ENV_VAR
                );
                return Ok(());
            }

            if json {
                let out: Vec<ModelRow> = registered.iter().map(ModelRow::from).collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for r in &registered {
                    if r.model.supports_image_input() {
                        println!("{} (images)", r.model);
                    } else {
                        println!("{}", r.model);
                    }
                }
            }
        }
        Command::Keys { command } => match command {
            KeysCommand::Set { key } => {
                keys.set(app::PROVIDER, &key).unwrap_or_else(|e| {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                });
                println!("Stored {} key in {}", app::PROVIDER, keys.path().display());
            }
            KeysCommand::Path => println!("{}", keys.path().display()),
        },
    }

    Ok(())
}
