use std::fs::File;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::api;
use crate::application::Services;
use crate::config::{
    AuthConfig, ServerConfig, DEFAULT_BIND, DEFAULT_TOKEN_TTL_HOURS, MAX_TOKEN_TTL_HOURS,
};
use crate::domain::{format_cents, OperationType};
use crate::io::Exporter;

/// finapi - personal finance bookkeeping API
#[derive(Parser)]
#[command(name = "finapi")]
#[command(about = "Users, sessions and a deposit/withdraw ledger over HTTP")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "FINAPI_DATABASE", default_value = "finapi.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "FINAPI_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,

        /// Secret used to sign session tokens
        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        jwt_secret: Option<String>,

        /// Session token lifetime in hours
        #[arg(
            long,
            env = "FINAPI_TOKEN_TTL_HOURS",
            default_value_t = DEFAULT_TOKEN_TTL_HOURS,
            value_parser = clap::value_parser!(i64).range(1..=MAX_TOKEN_TTL_HOURS)
        )]
        token_ttl_hours: i64,

        /// Keep everything in memory instead of the database file
        #[arg(long)]
        in_memory: bool,
    },

    /// User administration commands
    #[command(subcommand)]
    User(UserCommands),

    /// Show statements and balance for a user
    Balance {
        /// User email
        email: String,
    },

    /// Export a user's statements to CSV or JSON
    Export {
        /// User email
        email: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Create {
        /// Display name
        name: String,

        /// Email address (must be unique)
        email: String,

        /// Password
        #[arg(long, env = "FINAPI_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List all users
    List,

    /// Show a user's profile
    Show {
        /// User email
        email: String,
    },

    /// Delete a user (existing tokens stop working for every operation)
    Delete {
        /// User email
        email: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                Services::init(&self.database, &AuthConfig::default()).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve {
                bind,
                jwt_secret,
                token_ttl_hours,
                in_memory,
            } => {
                let config = ServerConfig {
                    bind,
                    auth: AuthConfig::from_secret(jwt_secret, token_ttl_hours)?,
                };
                let services = if in_memory {
                    tracing::warn!("running with an in-memory store; data is lost on exit");
                    Services::in_memory(&config.auth)
                } else {
                    Services::init(&self.database, &config.auth).await?
                };

                let listener = tokio::net::TcpListener::bind(config.bind)
                    .await
                    .with_context(|| format!("Failed to bind {}", config.bind))?;
                api::serve(listener, Arc::new(services)).await?;
            }

            Commands::User(user_cmd) => {
                let services = Services::connect(&self.database, &AuthConfig::default()).await?;
                run_user_command(&services, user_cmd).await?;
            }

            Commands::Balance { email } => {
                let services = Services::connect(&self.database, &AuthConfig::default()).await?;
                let user = services.profile.show_by_email(&email).await?;
                let view = services.ledger.get_balance(user.id).await?;

                if view.statements.is_empty() {
                    println!("No statements for {}.", user.email);
                } else {
                    println!(
                        "{:<20} {:<10} {:>12}  {}",
                        "DATE", "TYPE", "AMOUNT", "DESCRIPTION"
                    );
                    println!("{}", "-".repeat(60));
                    for statement in &view.statements {
                        let sign = match statement.kind {
                            OperationType::Deposit => "",
                            OperationType::Withdraw => "-",
                        };
                        println!(
                            "{:<20} {:<10} {:>12}  {}",
                            statement.created_at.format("%Y-%m-%d %H:%M:%S"),
                            statement.kind,
                            format!("{}{}", sign, format_cents(statement.amount_cents)),
                            statement.description
                        );
                    }
                    println!();
                }
                println!("Balance: {}", format_cents(view.balance));
            }

            Commands::Export {
                email,
                output,
                format,
            } => {
                let services = Services::connect(&self.database, &AuthConfig::default()).await?;
                run_export_command(&services, &email, output, &format).await?;
            }
        }

        Ok(())
    }
}

async fn run_user_command(services: &Services, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Create {
            name,
            email,
            password,
        } => {
            let user = services.auth.register(&name, &email, &password).await?;
            println!("Created user: {} <{}>", user.name, user.email);
            println!("  ID: {}", user.id);
        }

        UserCommands::List => {
            let users = services.profile.list().await?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<36}  {:<30} {}", "ID", "EMAIL", "NAME");
                println!("{}", "-".repeat(80));
                for user in users {
                    println!("{:<36}  {:<30} {}", user.id, user.email, user.name);
                }
            }
        }

        UserCommands::Show { email } => {
            let user = services.profile.show_by_email(&email).await?;
            println!("User: {}", user.name);
            println!("  ID:       {}", user.id);
            println!("  Email:    {}", user.email);
            println!(
                "  Created:  {}",
                user.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!(
                "  Updated:  {}",
                user.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        UserCommands::Delete { email } => {
            let user = services.profile.delete(&email).await?;
            println!("Deleted user: {} <{}>", user.name, user.email);
        }
    }

    Ok(())
}

async fn run_export_command(
    services: &Services,
    email: &str,
    output: Option<String>,
    format: &str,
) -> Result<()> {
    let user = services.profile.show_by_email(email).await?;

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path))?,
        ),
        None => Box::new(io::stdout()),
    };

    let exporter = Exporter::new(&services.ledger);
    let count = match format {
        "csv" => exporter.export_statements_csv(user.id, writer).await?,
        "json" => exporter.export_statements_json(user.id, writer).await?,
        other => anyhow::bail!("Unknown export format '{}'. Use csv or json", other),
    };

    eprintln!("Exported {} statements", count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "finapi",
            "--database",
            "test.db",
            "serve",
            "--bind",
            "0.0.0.0:8080",
            "--token-ttl-hours",
            "2",
            "--in-memory",
        ])
        .unwrap();

        assert_eq!(cli.database, "test.db");
        match cli.command {
            Commands::Serve {
                bind,
                token_ttl_hours,
                in_memory,
                ..
            } => {
                assert_eq!(bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
                assert_eq!(token_ttl_hours, 2);
                assert!(in_memory);
            }
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn test_token_ttl_must_be_in_range() {
        for hours in ["0", "-5", "8761", "9223372036854775807"] {
            let result = Cli::try_parse_from(["finapi", "serve", "--token-ttl-hours", hours]);
            assert!(result.is_err(), "accepted {}", hours);
        }
    }
}
