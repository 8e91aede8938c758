use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use warden::commands::{self, CheckOptions};
use warden::tracing_support::{init_subscriber, TracingConfig, TracingFormat};
use warden_host::{Permission, SecurityPolicy};

#[derive(Debug, Parser)]
#[command(name = "warden", version, about = "Sign, verify and audit sandboxed plugins")]
struct Cli {
    /// Log filter directive (overrides RUST_LOG)
    #[arg(long, global = true, env = "WARDEN_LOG")]
    log: Option<String>,

    /// Log output format: pretty, compact or json
    #[arg(long, global = true, default_value = "compact")]
    log_format: TracingFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a publisher key pair
    Keygen {
        /// Write the secret key here instead of printing it
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Sign a plugin package
    Sign {
        /// File holding the base64 secret key
        #[arg(long)]
        key: PathBuf,
        package: PathBuf,
    },
    /// Verify a plugin package signature
    Verify {
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        signature: String,
        package: PathBuf,
    },
    /// List the permissions granted by a security policy
    Policy { name: SecurityPolicy },
    /// Run an audited permission check
    Check {
        #[arg(long, default_value = "cli-plugin")]
        plugin: String,
        /// Defaults to the config's default policy
        #[arg(long)]
        policy: Option<SecurityPolicy>,
        #[arg(long)]
        permission: Permission,
        /// Host config file (JSON)
        #[arg(long, env = "WARDEN_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_subscriber(&TracingConfig {
        filter: cli.log.clone(),
        format: cli.log_format,
        ..Default::default()
    });

    let result = match cli.command {
        Command::Keygen { out } => commands::keygen(out.as_deref()).map(|s| (true, s)),
        Command::Sign { key, package } => commands::sign(&key, &package).map(|s| (true, s)),
        Command::Verify {
            public_key,
            signature,
            package,
        } => commands::verify(&public_key, &signature, &package).map(|s| (true, s)),
        Command::Policy { name } => Ok((true, commands::policy(name))),
        Command::Check {
            plugin,
            policy,
            permission,
            config,
        } => commands::check(&CheckOptions {
            plugin_id: plugin,
            policy,
            permission,
            config,
        }),
    };

    match result {
        Ok((success, output)) => {
            println!("{}", output);
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
