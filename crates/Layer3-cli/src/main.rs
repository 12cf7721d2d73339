//! RoleForge CLI - Main entry point

mod commands;

use clap::{Parser, Subcommand};
use roleforge_foundation::{RoleForgeConfig, SeedPolicy};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// RoleForge - role-based access control seeding and inspection
#[derive(Parser, Debug)]
#[command(name = "roleforge")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// SQLite database path (overrides config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Disable the permission cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed permissions, roles, principals and assignments
    Seed {
        /// TOML seed catalog (defaults to config, then the built-in catalog)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Re-seed policy: upsert or fail-fast
        #[arg(short, long)]
        policy: Option<SeedPolicy>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the built-in seed catalog as TOML
    Catalog,
    /// List permissions
    Permissions {
        /// Create permissions before listing
        #[arg(long, value_name = "NAME")]
        add: Vec<String>,
    },
    /// List roles with their permissions
    Roles {
        /// Create an empty role before listing
        #[arg(long, value_name = "NAME")]
        create: Option<String>,

        /// Delete a role (revoked from every principal)
        #[arg(long, value_name = "NAME", conflicts_with = "create")]
        delete: Option<String>,
    },
    /// Show roles with permissions and the full permission list
    Overview {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a principal holds a permission (exit code 2 when denied)
    Check {
        principal: String,
        permission: String,
    },
    /// Assign a role to a principal
    Assign {
        principal: String,
        role: String,

        /// Treat PRINCIPAL as a display name instead of an id
        #[arg(long)]
        by_name: bool,
    },
    /// Revoke a role from a principal
    Revoke {
        principal: String,
        role: String,

        /// Treat PRINCIPAL as a display name instead of an id
        #[arg(long)]
        by_name: bool,
    },
    /// Replace a role's permission set
    Sync {
        role: String,
        permissions: Vec<String>,
    },
    /// Grant every currently known permission to a role
    GrantAll { role: String },
    /// List principals and their roles
    Principals {
        /// Register a principal with this display name
        #[arg(long, value_name = "NAME")]
        register: Option<String>,

        /// Id for the registered principal (generated when omitted)
        #[arg(long, requires = "register")]
        id: Option<String>,

        /// Email for the registered principal
        #[arg(long, requires = "register")]
        email: Option<String>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if matches!(args.command, Command::Catalog) {
        commands::catalog()?;
        return Ok(ExitCode::SUCCESS);
    }

    // Load configuration
    let mut config = RoleForgeConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        RoleForgeConfig::new()
    });
    if let Some(database) = args.database {
        config = config.database_path(database);
    }
    if args.no_cache {
        config = config.with_permission_cache(false);
    }

    let access = commands::open(&config)?;

    match args.command {
        Command::Seed {
            catalog,
            policy,
            json,
        } => commands::seed(&access, &config, catalog, policy, json)?,
        // handled above
        Command::Catalog => {}
        Command::Permissions { add } => commands::permissions(&access, &add)?,
        Command::Roles { create, delete } => {
            commands::roles(&access, create.as_deref(), delete.as_deref())?
        }
        Command::Overview { json } => commands::overview(&access, json)?,
        Command::Check {
            principal,
            permission,
        } => {
            if !commands::check(&access, &principal, &permission) {
                return Ok(ExitCode::from(2));
            }
        }
        Command::Assign {
            principal,
            role,
            by_name,
        } => commands::assign(&access, &principal, &role, by_name)?,
        Command::Revoke {
            principal,
            role,
            by_name,
        } => commands::revoke(&access, &principal, &role, by_name)?,
        Command::Sync { role, permissions } => commands::sync(&access, &role, &permissions)?,
        Command::GrantAll { role } => commands::grant_all(&access, &role)?,
        Command::Principals {
            register,
            id,
            email,
        } => commands::principals(&access, register, id, email)?,
    }

    Ok(ExitCode::SUCCESS)
}
