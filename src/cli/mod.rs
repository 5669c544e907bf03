//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `start` (default) -- run the auto-reply loop and HTTP API
//! - `config show|path` -- inspect configuration
//! - `templates list` -- list stored templates
//! - `accounts list` -- list stored platform accounts
//! - `status` -- query a running instance
//! - `version` -- print version info

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::accounts::{AccountStore, JsonAccountStore};
use crate::ai::{ChatCompletionsGenerator, DynGenerator};
use crate::autoreply::{AutoReplyScheduler, TemplateResolver};
use crate::campaigns::CampaignManager;
use crate::channels::{BridgeGateway, DynGateway, PacedGateway};
use crate::config::{self, Settings, DEFAULT_PORT};
use crate::server::{self, AppState};
use crate::templates::{JsonTemplateStore, TemplateStore};

/// Direct-message automation with conditional auto-replies.
#[derive(Parser, Debug)]
#[command(
    name = "dmpilot",
    version = env!("CARGO_PKG_VERSION"),
    about = "dmpilot: direct-message automation with conditional and AI-assisted auto-replies"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the auto-reply loop and HTTP API (default when no subcommand is given).
    Start,

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage message templates.
    #[command(subcommand)]
    Templates(TemplatesCommand),

    /// Manage platform accounts.
    #[command(subcommand)]
    Accounts(AccountsCommand),

    /// Query a running instance for health/status information.
    Status {
        /// Port of the running instance (default: from config or 8000).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host of the running instance.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print version information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration (secrets redacted) as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

#[derive(Subcommand, Debug)]
pub enum TemplatesCommand {
    /// List stored templates.
    List,
}

#[derive(Subcommand, Debug)]
pub enum AccountsCommand {
    /// List stored accounts (passwords are never printed).
    List,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Run the `start` subcommand.
pub async fn handle_start(settings: Settings) -> CliResult {
    let templates: Arc<dyn TemplateStore> =
        Arc::new(JsonTemplateStore::new(&settings.storage.templates_path));
    let accounts: Arc<dyn AccountStore> =
        Arc::new(JsonAccountStore::new(&settings.storage.accounts_path));

    let generator: Option<DynGenerator> = if settings.ai.has_api_key() {
        let generator = ChatCompletionsGenerator::new(settings.ai.clone())?;
        tracing::info!(model = %generator.model(), "response generator enabled");
        Some(Arc::new(generator))
    } else {
        tracing::warn!("no AI API key configured; AI templates will send their raw content");
        None
    };

    let bridge = BridgeGateway::new(&settings.gateway.base_url, settings.gateway.timeout_secs)?
        .with_api_key(settings.gateway.api_key.clone());
    // Replies and campaign messages share one pacing lane per account.
    let gateway: DynGateway = Arc::new(PacedGateway::new(bridge, settings.send_delay()));

    let resolver = TemplateResolver::new(templates.clone()).with_generator(generator.clone());
    let scheduler = AutoReplyScheduler::new(settings.scheduler(), gateway.clone(), resolver);
    let campaigns = CampaignManager::new(gateway.clone(), accounts.clone());

    if settings.auto_reply.start_on_boot {
        scheduler.start();
    }

    let state = AppState {
        scheduler: scheduler.clone(),
        templates,
        accounts,
        campaigns,
        gateway,
        suggester: generator,
    };

    let addr: SocketAddr = format!("{}:{}", settings.server.bind, settings.server.port).parse()?;
    let result = server::serve(addr, state, shutdown_signal()).await;

    scheduler.stop();
    result?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
}

/// Run the `config show` subcommand.
pub fn handle_config_show() -> CliResult {
    let settings = config::load_config()?;
    let pretty = serde_json::to_string_pretty(&redact_secrets(settings.redacted()))?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::get_config_path().display());
}

/// Run the `templates list` subcommand.
pub fn handle_templates_list() -> CliResult {
    let settings = config::load_config()?;
    let store = JsonTemplateStore::new(&settings.storage.templates_path);
    let templates = store.list()?;

    if templates.is_empty() {
        println!("No templates in {}", store.path().display());
        return Ok(());
    }

    for template in &templates {
        let kind = if template
            .content
            .starts_with(crate::autoreply::AI_TEMPLATE_PREFIX)
        {
            "ai"
        } else {
            "text"
        };
        println!(
            "{:<16} {:<4} {:<24} {}",
            template.id,
            kind,
            template.name,
            preview_line(&template.content, 48)
        );
    }
    Ok(())
}

/// Run the `accounts list` subcommand.
pub fn handle_accounts_list() -> CliResult {
    let settings = config::load_config()?;
    let store = JsonAccountStore::new(&settings.storage.accounts_path);
    let accounts = store.list()?;

    if accounts.is_empty() {
        println!("No accounts in {}", store.path().display());
        return Ok(());
    }

    for account in accounts.iter().map(|a| a.summary()) {
        let status = serde_json::to_value(account.login_status)?;
        let last_login = account
            .last_login
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<24} {:<10} {:<8} {}",
            account.username,
            status.as_str().unwrap_or("-"),
            if account.is_active { "active" } else { "inactive" },
            last_login
        );
    }
    Ok(())
}

/// Run the `status` subcommand -- query a running instance.
pub async fn handle_status(host: &str, port: Option<u16>) -> CliResult {
    let port = resolve_port(port);
    let base = format!("http://{}:{}", host, port);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let response = match client.get(format!("{base}/health")).send().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Could not connect to dmpilot at {}:{}", host, port);
            eprintln!("  Error: {}", e);
            eprintln!();
            eprintln!("Is the server running? Start it with: dmpilot start");
            std::process::exit(1);
        }
    };

    if !response.status().is_success() {
        eprintln!(
            "Health endpoint returned HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        );
        std::process::exit(1);
    }

    let health: Value = response.json().await?;

    println!("dmpilot status");
    println!("==============");
    println!("  Address:    {}:{}", host, port);
    if let Some(status) = health.get("status").and_then(|v| v.as_str()) {
        println!("  Status:     {}", status);
    }

    if let Ok(resp) = client.get(format!("{base}/")).send().await {
        if let Ok(info) = resp.json::<Value>().await {
            if let Some(version) = info.get("version").and_then(|v| v.as_str()) {
                println!("  Version:    {}", version);
            }
            if let Some(running) = info.get("autoReply").and_then(|v| v.as_bool()) {
                println!("  Auto-reply: {}", if running { "running" } else { "stopped" });
            }
        }
    }

    if let Ok(resp) = client.get(format!("{base}/api/v1/auto-reply")).send().await {
        if let Ok(body) = resp.json::<Value>().await {
            if let Some(configs) = body["data"]["configs"].as_array() {
                println!("  Accounts:   {}", configs.len());
            }
        }
    }

    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("dmpilot {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Secrets that should be redacted when printing config.
const SECRET_KEYS: &[&str] = &["apikey", "api_key", "token", "secret", "password"];

/// Redact known secret keys in a JSON value (recursive).
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    map.insert(key, Value::String("[REDACTED]".to_string()));
                } else if let Some(child) = map.remove(&key) {
                    map.insert(key, redact_secrets(child));
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.take());
            }
        }
        _ => {}
    }
    value
}

/// Resolve the port of a running instance: explicit flag, config, default.
fn resolve_port(explicit: Option<u16>) -> u16 {
    if let Some(p) = explicit {
        return p;
    }
    config::load_config()
        .map(|settings| settings.server.port)
        .unwrap_or(DEFAULT_PORT)
}

/// First line of `content`, cut to `max` characters
fn preview_line(content: &str, max: usize) -> String {
    let line = content.lines().next().unwrap_or("");
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
