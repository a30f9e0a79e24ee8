use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use groupstore_core::config::Config;
use groupstore_core::core_members::{Authorizable, AuthorizableManager, Group, MemberFilter};
use groupstore_core::core_store::MemoryNodeStore;
use groupstore_core::logging::{init_logging_with_config, LogConfig};
use groupstore_core::metrics::init_metrics;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "groupstore")]
#[command(author, version, about = "Manage users and nested groups in a groupstore file", long_about = None)]
struct Args {
    /// Store file (default: GROUPSTORE_STORE_DATA_FILE or ./groupstore.json)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// TOML configuration file; environment variables are ignored when set
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Split threshold for new groups (0 = flat member lists)
    #[arg(long)]
    split_threshold: Option<usize>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty store file
    Init,
    /// Create a user
    AddUser {
        id: String,
        #[arg(long)]
        principal_name: Option<String>,
    },
    /// Create a group
    AddGroup {
        id: String,
        #[arg(long)]
        principal_name: Option<String>,
    },
    /// Add a user or group to a group
    AddMember { group: String, member: String },
    /// Remove a user or group from a group
    RemoveMember { group: String, member: String },
    /// List the members of a group
    Members {
        group: String,
        /// Only direct members
        #[arg(long)]
        declared: bool,
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
    },
    /// List the groups a user or group belongs to
    MemberOf {
        id: String,
        /// Only groups listing it directly
        #[arg(long)]
        declared: bool,
    },
    /// Print a group's principal view as JSON
    Principal { group: String },
    /// Delete a user or group; member entries pointing at it are ignored
    Delete { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FilterArg {
    All,
    Groups,
    Users,
}

impl From<FilterArg> for MemberFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => MemberFilter::All,
            FilterArg::Groups => MemberFilter::Groups,
            FilterArg::Users => MemberFilter::Users,
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::from_env().context("reading GROUPSTORE_* environment")?,
    };

    if let Some(store) = &args.store {
        config.store.data_file = store.clone();
    }
    if let Some(threshold) = args.split_threshold {
        config.membership.split_threshold = threshold;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    config.validate()?;
    Ok(config)
}

fn authorizable(manager: &AuthorizableManager, id: &str) -> Result<Authorizable> {
    match manager.get_authorizable(id)? {
        Some(a) => Ok(a),
        None => bail!("no user or group '{}'", id),
    }
}

fn group(manager: &AuthorizableManager, id: &str) -> Result<Group> {
    let a = authorizable(manager, id)?;
    if !a.is_group() {
        bail!("'{}' is a user, not a group", id);
    }
    Ok(manager.group(&a)?)
}

fn print_ids(set: HashSet<Authorizable>) {
    let mut ids: Vec<String> = set.into_iter().map(|a| a.id().to_string()).collect();
    ids.sort();
    for id in ids {
        println!("{}", id);
    }
}

fn run(command: Command, manager: &AuthorizableManager) -> Result<()> {
    match command {
        Command::Init => {
            manager.save()?;
        }
        Command::AddUser { id, principal_name } => {
            manager.create_user(&id, principal_name.as_deref())?;
            info!("Created user {}", id);
        }
        Command::AddGroup { id, principal_name } => {
            manager.create_group(&id, principal_name.as_deref())?;
            info!("Created group {}", id);
        }
        Command::AddMember { group: g, member } => {
            let g = group(manager, &g)?;
            let member = authorizable(manager, &member)?;
            let changed = g.add_member(&member)?;
            println!("{}", if changed { "added" } else { "unchanged" });
        }
        Command::RemoveMember { group: g, member } => {
            let g = group(manager, &g)?;
            let member = authorizable(manager, &member)?;
            let changed = g.remove_member(&member)?;
            println!("{}", if changed { "removed" } else { "unchanged" });
        }
        Command::Members {
            group: g,
            declared,
            filter,
        } => {
            let g = group(manager, &g)?;
            print_ids(g.members_filtered(!declared, filter.into())?);
        }
        Command::MemberOf { id, declared } => {
            let a = authorizable(manager, &id)?;
            print_ids(manager.member_of(&a, !declared)?);
        }
        Command::Principal { group: g } => {
            let principal = group(manager, &g)?.principal();
            println!("{}", serde_json::to_string_pretty(&*principal)?);
        }
        Command::Delete { id } => {
            let a = authorizable(manager, &id)?;
            manager.remove_authorizable(&a)?;
            info!("Deleted {}", a);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(LogConfig::try_from(&config.logging)?)?;
    init_metrics();
    debug!("Using store {}", config.store.data_file.display());

    let store = MemoryNodeStore::open(&config.store.data_file, "default")
        .with_context(|| format!("opening store {}", config.store.data_file.display()))?;
    let manager = AuthorizableManager::new(Arc::new(store), config.membership.clone())?;

    run(args.command, &manager)?;
    if !config.membership.auto_save {
        manager.save()?;
    }
    Ok(())
}
