//! # Command Line Interface
//!
//! Drives the provider from the shell: list resource types, render policy
//! documents, encode and decode composite ids, and run CRUD operations from
//! configuration documents and state files.

pub mod files;
pub mod output;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client::{InMemoryLogicalClient, SecretString};
use crate::config::{ObservabilityConfig, ProviderConfig};
use crate::id::{self, CompositeId};
use crate::observability::init_logging;
use crate::policy::{Policy, RuleConfig};
use crate::provider::Provider;
use crate::resources::ResourceData;
use files::{ConfigDocument, StateFile};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "vault-provider")]
#[command(about = "Manage Vault resources from typed configuration documents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Provider configuration file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Vault address override
    #[arg(long, global = true)]
    pub address: Option<String>,

    /// Vault token override
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Vault Enterprise namespace
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Run against an in-memory server instead of Vault
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Output format
    #[arg(long, short, global = true, value_enum, default_value = "json")]
    pub output: OutputFormat,

    /// Print sensitive attribute values instead of masking them
    #[arg(long, global = true)]
    pub show_sensitive: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List resource and data source types, or show one type's schema
    Resources {
        /// Type whose schema to print
        type_name: Option<String>,
    },

    /// Policy document commands
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },

    /// Composite id commands
    Id {
        #[command(subcommand)]
        command: IdCommands,
    },

    /// Create or update a resource from a configuration document
    Apply {
        /// Configuration document
        file: PathBuf,
        /// State file, read if present and written afterwards
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Refresh a resource's state from the server
    Read {
        #[arg(long)]
        state: PathBuf,
    },

    /// Delete the resource recorded in a state file
    Delete {
        #[arg(long)]
        state: PathBuf,
    },

    /// Build state for an existing object
    Import {
        type_name: String,
        id: String,
        /// Where to write the imported state
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Read a data source from a configuration document
    Data {
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Render `rule` blocks to policy HCL
    Render {
        /// Document with a `rule` list (JSON or YAML)
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum IdCommands {
    /// Join a parent and child name
    Encode {
        #[arg(long, value_enum, default_value = "roles")]
        separator: Separator,
        parent: String,
        child: String,
    },
    /// Split an id into parent and child
    Decode {
        #[arg(long, value_enum, default_value = "roles")]
        separator: Separator,
        id: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Separator {
    Roles,
    Role,
    Config,
    Roleset,
    StaticAccount,
    ImpersonatedAccount,
    StaticRole,
    AllowedClientId,
}

impl Separator {
    fn codec(self) -> &'static CompositeId {
        match self {
            Separator::Roles => &*id::ROLES,
            Separator::Role => &*id::ROLE,
            Separator::Config => &*id::CONFIG,
            Separator::Roleset => &*id::ROLESET,
            Separator::StaticAccount => &*id::STATIC_ACCOUNT,
            Separator::ImpersonatedAccount => &*id::IMPERSONATED_ACCOUNT,
            Separator::StaticRole => &*id::STATIC_ROLE,
            Separator::AllowedClientId => &*id::ALLOWED_CLIENT_ID,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default, alias = "rules")]
    rule: Vec<RuleConfig>,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut observability = ObservabilityConfig::from_env();
    if cli.verbose {
        observability.log_level = "debug".to_string();
    }
    // a subscriber may already be installed when embedded
    if let Err(e) = init_logging(&observability) {
        tracing::debug!(error = %e, "logging already initialised");
    }

    match cli.command {
        Commands::Resources { ref type_name } => list_types(&cli, type_name.as_deref()).await,
        Commands::Policy { command: PolicyCommands::Render { ref file } } => render_policy(file),
        Commands::Id { ref command } => handle_id_command(command),
        Commands::Apply { ref file, ref state } => apply(&cli, file, state.as_deref()).await,
        Commands::Read { ref state } => read(&cli, state).await,
        Commands::Delete { ref state } => delete(&cli, state).await,
        Commands::Import { ref type_name, ref id, ref state } => {
            import(&cli, type_name, id, state.as_deref()).await
        }
        Commands::Data { ref file } => data(&cli, file).await,
    }
}

/// Resolve provider settings: file and environment, then command-line flags.
fn provider_config(cli: &Cli) -> anyhow::Result<ProviderConfig> {
    let mut config = ProviderConfig::load(cli.config.as_deref())
        .context("Failed to load provider configuration")?;
    if let Some(ref address) = cli.address {
        config.address = address.clone();
    }
    if let Some(ref token) = cli.token {
        config.token = Some(SecretString::new(token.clone()));
    }
    if let Some(ref namespace) = cli.namespace {
        config.namespace = Some(namespace.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn provider(cli: &Cli) -> anyhow::Result<Provider> {
    if cli.dry_run {
        tracing::info!("dry run: using an in-memory server");
        return Ok(Provider::with_client(ProviderConfig::default(), Arc::new(InMemoryLogicalClient::new())));
    }
    let config = provider_config(cli)?;
    Ok(Provider::configure(config).await?)
}

/// State output, with sensitive values masked unless `--show-sensitive`.
fn print_state(cli: &Cli, provider: &Provider, type_name: &str, data: &ResourceData) -> anyhow::Result<()> {
    let schema = provider
        .resource_schema(type_name)
        .or_else(|_| provider.data_source_schema(type_name))?;
    let attributes = if cli.show_sensitive {
        data.attributes().clone()
    } else {
        output::redact(data.attributes(), &schema)
    };
    output::print_output(
        &json!({"type": type_name, "id": data.id(), "attributes": attributes}),
        cli.output,
    )
}

async fn list_types(cli: &Cli, type_name: Option<&str>) -> anyhow::Result<()> {
    let provider = Provider::with_client(ProviderConfig::default(), Arc::new(InMemoryLogicalClient::new()));
    let registry = provider.registry();

    if let Some(type_name) = type_name {
        let schema = provider
            .resource_schema(type_name)
            .or_else(|_| provider.data_source_schema(type_name))?;
        return output::print_output(&schema, cli.output);
    }

    let resources: Vec<_> = registry
        .resource_types()
        .into_iter()
        .map(|name| registry.resource(name).map(|r| (name, r.schema())))
        .collect::<crate::errors::Result<_>>()?;
    let data_sources: Vec<_> = registry
        .data_source_types()
        .into_iter()
        .map(|name| registry.data_source(name).map(|d| (name, d.schema())))
        .collect::<crate::errors::Result<_>>()?;

    if cli.output == OutputFormat::Table {
        let rows: Vec<(&str, &str, &crate::schema::Schema)> = resources
            .iter()
            .map(|(name, schema)| ("resource", *name, schema))
            .chain(data_sources.iter().map(|(name, schema)| ("data source", *name, schema)))
            .collect();
        output::print_type_table(&rows);
        return Ok(());
    }

    let names = |items: &[(&str, crate::schema::Schema)]| -> Vec<Value> {
        items.iter().map(|(name, _)| Value::from(*name)).collect()
    };
    output::print_output(
        &json!({"resources": names(resources.as_slice()), "data_sources": names(data_sources.as_slice())}),
        cli.output,
    )
}

fn render_policy(file: &Path) -> anyhow::Result<()> {
    let document: PolicyFile = files::load(file)?;
    let policy = Policy::from_config(&document.rule)?;
    print!("{}", policy.render());
    Ok(())
}

fn handle_id_command(command: &IdCommands) -> anyhow::Result<()> {
    match command {
        IdCommands::Encode { separator, parent, child } => {
            println!("{}", separator.codec().encode(parent, child)?);
        }
        IdCommands::Decode { separator, id } => {
            let (parent, child) = separator.codec().decode(id)?;
            println!("{}\t{}", parent, child);
        }
    }
    Ok(())
}

async fn apply(cli: &Cli, file: &Path, state_path: Option<&Path>) -> anyhow::Result<()> {
    let document: ConfigDocument = files::load(file)?;
    let prior = match state_path {
        Some(path) => files::load_state(path)?,
        None => None,
    };
    if let Some(ref prior) = prior {
        if prior.type_name != document.type_name {
            bail!(
                "state file holds a {} but the document describes a {}",
                prior.type_name,
                document.type_name
            );
        }
    }

    let provider = provider(cli).await?;
    let data = provider
        .apply(&document.type_name, prior.map(|s| s.data), document.config)
        .await
        .with_context(|| format!("Failed to apply {}", document.type_name))?;

    if let Some(path) = state_path {
        files::save_state(path, &StateFile { type_name: document.type_name.clone(), data: data.clone() })?;
    }
    print_state(cli, &provider, &document.type_name, &data)
}

async fn read(cli: &Cli, state_path: &Path) -> anyhow::Result<()> {
    let state = files::load_state(state_path)?
        .with_context(|| format!("No state at {}", state_path.display()))?;

    let provider = provider(cli).await?;
    let data = provider.read(&state.type_name, state.data).await?;

    if !data.is_present() {
        eprintln!("{} no longer exists; removing {}", state.type_name, state_path.display());
        return files::remove_state(state_path);
    }
    files::save_state(state_path, &StateFile { type_name: state.type_name.clone(), data: data.clone() })?;
    print_state(cli, &provider, &state.type_name, &data)
}

async fn delete(cli: &Cli, state_path: &Path) -> anyhow::Result<()> {
    let state = files::load_state(state_path)?
        .with_context(|| format!("No state at {}", state_path.display()))?;

    let provider = provider(cli).await?;
    provider.delete(&state.type_name, state.data).await?;
    files::remove_state(state_path)?;
    println!("Deleted {}", state.type_name);
    Ok(())
}

async fn import(cli: &Cli, type_name: &str, id: &str, state_path: Option<&Path>) -> anyhow::Result<()> {
    let provider = provider(cli).await?;
    let data = provider.import(type_name, id).await?;

    if let Some(path) = state_path {
        files::save_state(path, &StateFile { type_name: type_name.to_string(), data: data.clone() })?;
    }
    print_state(cli, &provider, type_name, &data)
}

async fn data(cli: &Cli, file: &Path) -> anyhow::Result<()> {
    let document: ConfigDocument = files::load(file)?;
    // policy documents render locally and need no server
    let provider = if document.type_name == "vault_policy_document" {
        Provider::with_client(ProviderConfig::default(), Arc::new(InMemoryLogicalClient::new()))
    } else {
        provider(cli).await?
    };

    let data = provider.read_data_source(&document.type_name, document.config).await?;
    if document.type_name == "vault_policy_document" && cli.output == OutputFormat::Table {
        print!("{}", data.get_str("hcl").unwrap_or_default());
        return Ok(());
    }
    print_state(cli, &provider, &document.type_name, &data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_apply() {
        let cli = Cli::try_parse_from([
            "vault-provider",
            "--dry-run",
            "apply",
            "policy.yaml",
            "--state",
            "policy.state.json",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert!(matches!(cli.command, Commands::Apply { state: Some(_), .. }));
    }

    #[test]
    fn test_cli_parses_id_decode() {
        let cli = Cli::try_parse_from([
            "vault-provider",
            "id",
            "decode",
            "--separator",
            "static-account",
            "gcp/static-account/deployer",
        ])
        .unwrap();
        match cli.command {
            Commands::Id { command: IdCommands::Decode { separator, id } } => {
                assert_eq!(separator.codec().separator(), "/static-account/");
                assert_eq!(id, "gcp/static-account/deployer");
            }
            _ => panic!("expected id decode"),
        }
    }

    #[test]
    fn test_output_flag() {
        let cli = Cli::try_parse_from(["vault-provider", "-o", "table", "resources"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Table);
    }

    #[test]
    fn test_policy_file_accepts_rules_alias() {
        let file: PolicyFile =
            serde_yaml::from_str("rules:\n  - path: secret/*\n    capabilities: [read]\n").unwrap();
        assert_eq!(file.rule.len(), 1);
    }
}
