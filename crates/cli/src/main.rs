use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Book and review service
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API until interrupted
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Create missing tables and exit
    InitDb,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            tracing::info!(env = ?settings.environment, "bookshelf serve");
            bookshelf_app::run(settings).await
        }
        Command::InitDb => {
            let tables = bookshelf_app::init_db(&settings).await?;
            println!("ensured {tables} tables in {}", settings.database.url);
            Ok(())
        }
        Command::Config => {
            print_config(&settings);
            Ok(())
        }
    }
}

fn print_config(settings: &Settings) {
    println!("environment        {:?}", settings.environment);
    println!("listen             {}", settings.server.bind_address());
    println!("api prefix         {:?}", settings.server.api_prefix);
    println!("request timeout    {}ms", settings.server.request_timeout_ms);
    println!("database           {}", settings.database.url);
    println!("log format         {:?}", settings.telemetry.log_format);
    println!("summarizer         {}", settings.summarizer.endpoint);
    println!(
        "summary length     {}..{}",
        settings.summarizer.min_length, settings.summarizer.max_length
    );
    // Never echo the token itself
    println!(
        "summarizer token   {}",
        if settings.summarizer.api_token.is_some() {
            "set"
        } else {
            "unset"
        }
    );
}
