//! Fabryk RBAC CLI
//!
//! Inspect and administer a Redis-backed RBAC store.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fabryk_rbac::{ItemKind, RbacConfig, RbacStore};
use std::path::PathBuf;

/// Fabryk RBAC - role, permission and assignment administration
#[derive(Parser, Debug)]
#[command(name = "fabryk-rbac")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Redis connection URL; overrides the configuration file
    #[arg(long, env = "FABRYK_RBAC_REDIS_URL")]
    redis_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// List roles or permissions
    Items {
        /// `role` or `permission`
        #[arg(short, long, value_parser = parse_kind)]
        kind: ItemKind,
    },
    /// Show one role or permission
    Item {
        /// Item name
        name: String,
    },
    /// List rules
    Rules,
    /// Show the direct children of an item
    Children {
        /// Parent item name
        #[arg(short, long)]
        item: String,
    },
    /// Show the direct parents of an item
    Parents {
        /// Child item name
        #[arg(short, long)]
        item: String,
    },
    /// Show the roles assigned to a user
    Roles {
        /// User id
        #[arg(short, long)]
        user: String,
    },
    /// Show the users holding a role
    Users {
        /// Role name
        #[arg(short, long)]
        role: String,
    },
    /// Assign a role to a user
    Assign {
        /// Role name
        #[arg(short, long)]
        role: String,
        /// User id
        #[arg(short, long)]
        user: String,
    },
    /// Revoke a role from a user
    Revoke {
        /// Role name
        #[arg(short, long)]
        role: String,
        /// User id
        #[arg(short, long)]
        user: String,
    },
    /// Revoke every role from a user
    RevokeAll {
        /// User id
        #[arg(short, long)]
        user: String,
    },
    /// Remove every item of one kind
    RemoveItems {
        /// `role` or `permission`
        #[arg(short, long, value_parser = parse_kind)]
        kind: ItemKind,
    },
    /// Remove every rule
    RemoveRules,
    /// Delete every assignment index
    PurgeAssignments,
    /// Delete every key in the namespace
    Reset {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

fn parse_kind(value: &str) -> Result<ItemKind, String> {
    value.parse()
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<RbacConfig> {
    let mut config = match &args.config {
        Some(path) => RbacConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => RbacConfig::default(),
    };
    if let Some(url) = &args.redis_url {
        config.redis_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    tracing::debug!(url = %config.redis_url, namespace = %config.namespace, "Connecting");
    let store = RbacStore::connect(&config)
        .await
        .with_context(|| format!("connecting to {}", config.redis_url))?;

    let output = commands::run(&store, args.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
