//! Panelwire CLI.
//!
//! Commands:
//! - `encode`: Build a message and print its JSON and transport body
//! - `send`:   Build a message and deliver it
//! - `config`: Show configuration

use clap::{Parser, Subcommand};

mod commands;

use commands::message::MessageArgs;

#[derive(Parser)]
#[command(
    name = "panelwire",
    about = "Panelwire: build and send analytics events and profile updates",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a message and print it without sending
    Encode(MessageArgs),

    /// Build a message and send it
    Send(MessageArgs),

    /// Show configuration
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,

        /// Print the effective configuration (file + environment) instead of the defaults
        #[arg(long, conflicts_with = "path")]
        effective: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Encode(args) => commands::message::encode(args)?,
        Commands::Send(args) => commands::message::send(args).await?,
        Commands::Config { path, effective } => commands::config_cmd::run(path, effective)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encode_with_all_flags() {
        let cli = Cli::try_parse_from([
            "panelwire",
            "encode",
            "--token",
            "abc",
            "--event",
            "Signup",
            "--distinct-id",
            "u1",
            "--props",
            r#"{"plan":"pro"}"#,
        ])
        .unwrap();
        let Commands::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.token, "abc");
        assert_eq!(args.event.as_deref(), Some("Signup"));
        assert_eq!(args.distinct_id.as_deref(), Some("u1"));
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["panelwire", "config", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn config_flags_conflict() {
        assert!(Cli::try_parse_from(["panelwire", "config", "--path", "--effective"]).is_err());
    }
}
