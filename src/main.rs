use clap::Parser;

use dmpilot::cli::{self, AccountsCommand, Cli, Command, ConfigCommand, TemplatesCommand};
use dmpilot::{config, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Start) {
        Command::Start => run_start().await,
        Command::Config(ConfigCommand::Show) => cli::handle_config_show(),
        Command::Config(ConfigCommand::Path) => {
            cli::handle_config_path();
            Ok(())
        }
        Command::Templates(TemplatesCommand::List) => cli::handle_templates_list(),
        Command::Accounts(AccountsCommand::List) => cli::handle_accounts_list(),
        Command::Status { port, host } => cli::handle_status(&host, port).await,
        Command::Version => {
            cli::handle_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_start() -> Result<(), Box<dyn std::error::Error>> {
    let settings = config::load_config()?;
    logging::init_logging(&settings.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config::get_config_path().display(),
        "starting dmpilot"
    );

    cli::handle_start(settings).await
}
