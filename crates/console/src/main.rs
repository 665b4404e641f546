//! marketadmin - command-line front end for the admin console's auth core.
//!
//! Every invocation restores the persisted session before running its
//! command, the same way the console does on startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use marketadmin_auth::{GuardDecision, MenuEntry, RouteGuard};
use marketadmin_console::{
    marketplace, AuthSessionManager, ConsoleConfig, HttpAdminApi, SessionStore, SqliteKvStore,
};
use marketadmin_observability::LogFormat;

#[derive(Parser)]
#[command(name = "marketadmin")]
#[command(about = "Sign in to the marketplace admin API and inspect what the session may do")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit logs as JSON instead of human-readable lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate and persist the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// End the current session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List held permissions grouped by module, and roles
    Permissions,

    /// Check a single permission
    Check {
        /// Permission in `module.action` form
        permission: String,

        /// Print the full authorization explanation as JSON
        #[arg(long)]
        explain: bool,
    },

    /// Print the navigation menu visible to the current session
    Menu {
        /// JSON menu definition to filter instead of the built-in one
        #[arg(long)]
        definition: Option<PathBuf>,
    },

    /// Show the route guard decision for a path
    Route {
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    marketadmin_observability::init_with(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let config = ConsoleConfig::from_env().context("invalid configuration")?;
    tracing::debug!(api_url = %config.api_url, session_db = ?config.session_db, "configuration loaded");

    let api = HttpAdminApi::new(config.api_url.clone(), config.http_timeout)
        .context("failed to build HTTP client")?;
    let store = SessionStore::with_ttl(
        Arc::new(SqliteKvStore::new(config.session_db.clone())),
        config.session_ttl,
    );
    let manager = AuthSessionManager::new(Arc::new(api), store);
    manager.hydrate().await;

    match cli.command {
        Commands::Login { email, password } => {
            if !manager.login(&email, &password).await {
                bail!("login failed for {email}");
            }
            let snapshot = manager.snapshot();
            if let Some(user) = snapshot.user() {
                println!("Signed in as {} <{}> ({})", user.name, user.email, user.role);
            }
        }

        Commands::Logout => {
            let was_authenticated = manager.is_authenticated();
            manager.logout().await;
            if was_authenticated {
                println!("Signed out");
            } else {
                println!("No active session");
            }
        }

        Commands::Whoami => {
            let snapshot = manager.snapshot();
            let user = snapshot.user().context("not signed in")?;
            println!("{}", serde_json::to_string_pretty(user)?);
        }

        Commands::Permissions => {
            require_session(&manager)?;
            let access = manager.access();

            let slugs = access.roles().slugs();
            if slugs.is_empty() {
                println!("roles: (none)");
            } else {
                println!("roles: {}", slugs.join(", "));
            }
            if access.is_privileged() {
                println!("(privileged role: every permission is granted)");
            }

            for (module, permissions) in access.grouped() {
                println!("{module}");
                for permission in permissions {
                    println!("  {permission}");
                }
            }
        }

        Commands::Check { permission, explain } => {
            require_session(&manager)?;
            let access = manager.access();
            if explain {
                println!("{}", serde_json::to_string_pretty(&access.explain(&permission))?);
            } else if access.can(&permission) {
                println!("granted: {permission}");
            } else {
                println!("denied: {permission}");
                std::process::exit(1);
            }
        }

        Commands::Menu { definition } => {
            require_session(&manager)?;
            let menu = match definition {
                Some(path) => load_menu(&path)?,
                None => marketplace::menu(),
            };
            let visible = manager.visible_menu(&menu, &config.self_exclusion_rules());
            print_menu(&visible, 0);
        }

        Commands::Route { path } => {
            let guard = RouteGuard::default();
            let decision = marketplace::routes().decide(&manager, &guard, &path);
            println!("{}", serde_json::to_string_pretty(&decision)?);
            if !matches!(decision, GuardDecision::Render) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn require_session(manager: &AuthSessionManager) -> anyhow::Result<()> {
    if !manager.is_authenticated() {
        bail!("not signed in; run `marketadmin login` first");
    }
    Ok(())
}

fn load_menu(path: &Path) -> anyhow::Result<Vec<MenuEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read menu definition {:?}", path))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid menu definition in {:?}", path))
}

fn print_menu(entries: &[MenuEntry], depth: usize) {
    for entry in entries {
        println!("{}{}  {}", "  ".repeat(depth), entry.name, entry.link);
        print_menu(&entry.children, depth + 1);
    }
}
