//! mcpsync - keep MCP servers in sync across AI coding assistants
//!
//! Usage:
//!   mcpsync server add memory --client claude,codex
//!   mcpsync add-all                 # every server in mcp.json, every tool
//!   mcpsync refresh

mod interactive;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcpsync_core::client::ServerListing;
use mcpsync_core::commands::{ServerCommand, ServerOptions, method_lines, schema_details};
use mcpsync_core::context::AppContext;
use mcpsync_core::orchestration::{BatchReport, Manager, ManagerFactory};
use mcpsync_core::registry::{LocalRegistry, ServerSchema};
use mcpsync_core::types::Scope;

use crate::interactive::{TerminalPrompter, styled};

#[derive(Parser)]
#[command(name = "mcpsync")]
#[command(about = "Sync MCP server registrations across AI coding assistants", long_about = None)]
struct Cli {
    /// Local registry directory (defaults to <config dir>/mcpsync/registry)
    #[arg(long, global = true)]
    registry_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage servers from the local registry
    Server(ServerArgs),

    /// Add one server from mcp.json to one tool
    Add {
        tool: String,
        server: String,
        /// Configuration scope (user or project)
        #[arg(long, short, default_value = "user")]
        scope: String,
    },

    /// Remove one server from one tool, in every scope
    #[command(alias = "rm")]
    Remove { tool: String, server: String },

    /// List configured servers for one tool, or for every tool
    List { tool: Option<String> },

    /// Add every server in mcp.json to every tool
    AddAll {
        /// Configuration scope (user or project)
        #[arg(long, short, default_value = "user")]
        scope: String,
    },

    /// Remove every server in mcp.json from every tool
    RemoveAll,

    /// Remove and re-add every server in mcp.json on every tool
    Refresh,
}

#[derive(Args)]
struct ServerArgs {
    #[command(subcommand)]
    command: ServerSubcommand,
}

#[derive(Args)]
struct Selection {
    /// Server names (comma-separated)
    ///
    /// Required unless --interactive is used
    servers: Option<String>,
    /// Clients to target (comma-separated, or `all`)
    #[arg(long, short, default_value = "claude")]
    client: String,
    /// Configuration scope (user or project)
    #[arg(long, short, default_value = "user")]
    scope: String,
    /// Pick servers from a numbered list
    #[arg(long, short)]
    interactive: bool,
}

#[derive(Subcommand)]
enum ServerSubcommand {
    /// Install registry servers into clients
    Add {
        #[command(flatten)]
        selection: Selection,
        /// Installation method to use
        #[arg(long, short)]
        method: Option<String>,
        /// Force installation if the server already exists
        #[arg(long, short)]
        force: bool,
    },

    /// Remove servers from clients
    Remove {
        #[command(flatten)]
        selection: Selection,
    },

    /// Remove and reinstall servers on clients
    Update {
        #[command(flatten)]
        selection: Selection,
    },

    /// List registry servers, or what clients have installed
    List {
        /// Show servers installed for these clients (comma-separated, or `all`)
        #[arg(long, short)]
        client: Option<String>,
    },

    /// Search registry servers by name, description, tags or categories
    Search { query: String },

    /// Show details for one registry server
    Show {
        name: String,
        /// Print the raw JSON schema
        #[arg(long)]
        schema: bool,
    },

    /// List installation methods for one registry server
    Methods { name: String },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcpsync_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new()?;

    if !run_cli(&ctx, cli)? {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one command; `Ok(false)` means it ran but did not fully succeed.
fn run_cli(ctx: &AppContext, cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Server(args) => {
            let registry = match &cli.registry_dir {
                Some(dir) => LocalRegistry::open(dir)?,
                None => ctx.local_registry()?,
            };
            let factory_ctx = ctx.clone();
            let factory_registry = registry.clone();
            let factory: ManagerFactory = Box::new(move || {
                Ok(Manager::for_registry(&factory_ctx, factory_registry.clone()))
            });
            tracing::debug!("Registry at {}", registry.root().display());
            log_outcome("server", run_server(&registry, &factory, args.command))
        }
        legacy => {
            let factory_ctx = ctx.clone();
            let factory: ManagerFactory = Box::new(move || Manager::from_context(&factory_ctx));
            log_outcome("legacy", run_legacy(&factory, legacy))
        }
    }
}

fn log_outcome(flow: &str, result: Result<bool>) -> Result<bool> {
    match &result {
        Ok(true) => tracing::debug!("{} command succeeded", flow),
        Ok(false) => tracing::warn!("{} command finished with failures", flow),
        Err(err) => tracing::error!("{} command failed: {:#}", flow, err),
    }
    result
}

fn run_server(
    registry: &LocalRegistry,
    factory: &ManagerFactory,
    command: ServerSubcommand,
) -> Result<bool> {
    let prompter = TerminalPrompter::new();
    let cmd = ServerCommand::new(registry, factory, &prompter);

    match command {
        ServerSubcommand::Add {
            selection,
            method,
            force,
        } => {
            let mut options = server_options(&selection)?;
            options.method = method;
            options.force = force;
            let report = cmd.add(&options)?;
            print_lines(report.lines());
            Ok(report.success())
        }
        ServerSubcommand::Remove { selection } => {
            let report = cmd.remove(&server_options(&selection)?)?;
            print_lines(report.lines());
            Ok(report.success())
        }
        ServerSubcommand::Update { selection } => {
            let report = cmd.update(&server_options(&selection)?)?;
            print_lines(report.lines());
            Ok(report.success())
        }
        ServerSubcommand::List { client: Some(clients) } => {
            let mut ok = true;
            for entry in cmd.list_installed(&clients)? {
                println!(
                    "{}",
                    style(format!("MCP Servers installed for {}:", entry.client)).bold()
                );
                match entry.listing {
                    Ok(listing) => print_listing(&listing),
                    Err(err) => {
                        println!(
                            "{}",
                            style(format!("Error: Failed to list servers for '{}': {}", entry.client, err)).red()
                        );
                        ok = false;
                    }
                }
            }
            Ok(ok)
        }
        ServerSubcommand::List { client: None } => {
            let schemas = cmd.list()?;
            if schemas.is_empty() {
                println!("{}", style("No MCP servers found in the local registry.").yellow());
            } else {
                print_schema_table("MCP Servers", &schemas);
            }
            Ok(true)
        }
        ServerSubcommand::Search { query } => {
            let schemas = cmd.search(&query)?;
            if schemas.is_empty() {
                println!(
                    "{}",
                    style(format!("No MCP servers found matching '{}'.", query)).yellow()
                );
            } else {
                print_schema_table(&format!("MCP Servers matching '{}'", query), &schemas);
            }
            Ok(true)
        }
        ServerSubcommand::Show { name, schema } => {
            let found = cmd.show(&name)?;
            if schema {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                let mut lines = schema_details(&found).into_iter();
                if let Some(title) = lines.next() {
                    println!("{}", style(title).bold());
                }
                for line in lines {
                    println!("{}", line);
                }
            }
            Ok(true)
        }
        ServerSubcommand::Methods { name } => {
            let found = cmd.show(&name)?;
            println!(
                "{}",
                style(format!("Installation methods for '{}':", found.name)).bold()
            );
            for line in method_lines(&found) {
                println!("{}", line);
            }
            Ok(true)
        }
    }
}

fn run_legacy(factory: &ManagerFactory, command: Commands) -> Result<bool> {
    let manager = factory()?;

    match command {
        Commands::Add {
            tool,
            server,
            scope,
        } => {
            let ok = manager.add_server(&tool, &server, parse_scope(&scope)?)?;
            print_single(ok, &format!("add '{}' to {}", server, tool));
            Ok(ok)
        }
        Commands::Remove { tool, server } => {
            let ok = manager.remove_server(&tool, &server)?;
            print_single(ok, &format!("remove '{}' from {}", server, tool));
            Ok(ok)
        }
        Commands::List { tool: Some(tool) } => {
            let listing = manager.list_servers(&tool)?;
            println!("{}", style(format!("{}:", tool.to_uppercase())).bold());
            print_listing(&listing);
            Ok(true)
        }
        Commands::List { tool: None } => {
            let report = manager.list_all_servers();
            for outcome in &report.outcomes {
                println!("{}", style(format!("{}:", outcome.tool.to_uppercase())).bold());
                match &outcome.listing {
                    Some(listing) => print_listing(listing),
                    None => println!("  {}", styled(&outcome.status)),
                }
            }
            Ok(report.success())
        }
        Commands::AddAll { scope } => {
            let scope = parse_scope(&scope)?;
            println!("Installing MCP servers for all tools...");
            Ok(print_batch(manager.add_all_servers(scope)))
        }
        Commands::RemoveAll => {
            println!("Removing MCP servers from all tools...");
            Ok(print_batch(manager.remove_all_servers()))
        }
        Commands::Refresh => {
            println!("Refreshing MCP servers for all tools...");
            Ok(print_batch(manager.refresh_all_servers()))
        }
        Commands::Server(_) => anyhow::bail!("server commands are routed through the registry"),
    }
}

fn server_options(selection: &Selection) -> Result<ServerOptions> {
    let servers = match (&selection.servers, selection.interactive) {
        (Some(servers), _) => servers.clone(),
        (None, true) => String::new(),
        (None, false) => anyhow::bail!("Missing required argument: server names"),
    };
    Ok(ServerOptions::new(servers, &selection.client)
        .with_scope(parse_scope(&selection.scope)?)
        .with_interactive(selection.interactive))
}

fn parse_scope(s: &str) -> Result<Scope> {
    s.parse()
}

fn print_lines<'a>(lines: impl Iterator<Item = &'a str>) {
    for line in lines {
        println!("{}", styled(line));
    }
}

fn print_single(ok: bool, action: &str) {
    if ok {
        println!("{}", style(format!("✓ Succeeded to {}", action)).green());
    } else {
        println!("{}", style(format!("✗ Failed to {}", action)).red());
    }
}

fn print_batch(report: BatchReport) -> bool {
    for line in report.lines() {
        println!("{}", styled(&line));
    }
    let ok = report.success();
    if let Err(err) = report.into_result() {
        println!("{}", style(err.to_string()).red());
    }
    ok
}

fn print_listing(listing: &ServerListing) {
    if listing.is_empty() {
        println!("  {}", style("No MCP servers configured").dim());
        return;
    }
    for server in &listing.servers {
        println!(
            "  {}  {}  {}",
            style(&server.name).cyan(),
            server.launch(),
            style(server.source.display()).dim()
        );
    }
    if let Some(output) = &listing.cli_output {
        for line in output.lines() {
            println!("  {}", line);
        }
    }
}

fn print_schema_table(title: &str, schemas: &[ServerSchema]) {
    let name_width = schemas
        .iter()
        .map(|schema| schema.name.len())
        .max()
        .unwrap_or(0)
        .max(4);
    let title_width = schemas
        .iter()
        .map(|schema| schema.title().len())
        .max()
        .unwrap_or(0)
        .max(12);

    println!("{}", style(title).bold());
    println!(
        "{:<name_width$}  {:<title_width$}  {}  {}",
        "Name", "Display Name", "Description", "Categories"
    );
    for schema in schemas {
        let categories = if schema.categories.is_empty() {
            "None".to_string()
        } else {
            schema.categories.join(", ")
        };
        println!(
            "{}  {}  {}  {}",
            style(format!("{:<name_width$}", schema.name)).cyan(),
            style(format!("{:<title_width$}", schema.title())).magenta(),
            style(&schema.description).green(),
            style(categories).blue()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, ServerSubcommand, log_outcome, server_options};
    use clap::Parser;

    #[test]
    fn server_add_parses_client_list() {
        let args = [
            "mcpsync", "server", "add", "memory,fetch", "--client", "claude,codex", "--method",
            "npm", "--force",
        ];

        let cli = Cli::try_parse_from(args).unwrap();
        let Commands::Server(server) = cli.command else {
            panic!("expected server command");
        };
        let ServerSubcommand::Add {
            selection,
            method,
            force,
        } = server.command
        else {
            panic!("expected server add");
        };
        assert_eq!(selection.servers.as_deref(), Some("memory,fetch"));
        assert_eq!(selection.client, "claude,codex");
        assert_eq!(method.as_deref(), Some("npm"));
        assert!(force);
    }

    #[test]
    fn logged_outcome_is_passed_through() {
        assert!(log_outcome("legacy", Ok(true)).unwrap());
        assert!(!log_outcome("legacy", Ok(false)).unwrap());
        let err = log_outcome("server", Err(anyhow::anyhow!("No valid clients specified")));
        assert_eq!(err.unwrap_err().to_string(), "No valid clients specified");
    }

    #[test]
    fn server_remove_defaults_to_claude_user_scope() {
        let cli = Cli::try_parse_from(["mcpsync", "server", "remove", "memory"]).unwrap();
        let Commands::Server(server) = cli.command else {
            panic!("expected server command");
        };
        let ServerSubcommand::Remove { selection } = server.command else {
            panic!("expected server remove");
        };
        assert_eq!(selection.client, "claude");
        assert_eq!(selection.scope, "user");
    }

    #[test]
    fn interactive_selection_needs_no_names() {
        let cli = Cli::try_parse_from(["mcpsync", "server", "update", "-i"]).unwrap();
        let Commands::Server(server) = cli.command else {
            panic!("expected server command");
        };
        let ServerSubcommand::Update { selection } = server.command else {
            panic!("expected server update");
        };
        assert!(server_options(&selection).unwrap().interactive);
    }

    #[test]
    fn missing_names_without_interactive_is_an_error() {
        let cli = Cli::try_parse_from(["mcpsync", "server", "add"]).unwrap();
        let Commands::Server(server) = cli.command else {
            panic!("expected server command");
        };
        let ServerSubcommand::Add { selection, .. } = server.command else {
            panic!("expected server add");
        };
        assert!(server_options(&selection).is_err());
    }

    #[test]
    fn invalid_scope_is_rejected() {
        let cli =
            Cli::try_parse_from(["mcpsync", "server", "add", "memory", "--scope", "team"]).unwrap();
        let Commands::Server(server) = cli.command else {
            panic!("expected server command");
        };
        let ServerSubcommand::Add { selection, .. } = server.command else {
            panic!("expected server add");
        };
        assert!(server_options(&selection).is_err());
    }

    #[test]
    fn legacy_commands_parse() {
        for args in [
            vec!["mcpsync", "add", "claude", "memory", "--scope", "project"],
            vec!["mcpsync", "remove", "codex", "memory"],
            vec!["mcpsync", "list"],
            vec!["mcpsync", "list", "gemini"],
            vec!["mcpsync", "add-all"],
            vec!["mcpsync", "remove-all"],
            vec!["mcpsync", "refresh"],
        ] {
            assert!(Cli::try_parse_from(&args).is_ok(), "failed to parse {:?}", args);
        }
    }

    #[test]
    fn server_show_and_methods_parse() {
        assert!(Cli::try_parse_from(["mcpsync", "server", "show", "memory", "--schema"]).is_ok());
        assert!(Cli::try_parse_from(["mcpsync", "server", "methods", "memory"]).is_ok());
        assert!(Cli::try_parse_from(["mcpsync", "server", "search", "git"]).is_ok());
        assert!(
            Cli::try_parse_from(["mcpsync", "--registry-dir", "/tmp/r", "server", "list"]).is_ok()
        );
    }
}
