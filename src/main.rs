use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schema_model::config::get_config_path;
use schema_model::{ApiClient, ClientConfig, HttpSource, ModelRegistry, ModelSource};

#[derive(Parser)]
#[command(name = "schema-model")]
#[command(about = "Validate and fetch schema-checked models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a JSON document against a declared model
    Validate {
        /// Model declarations file
        #[arg(long)]
        models: PathBuf,

        /// Model to validate against
        #[arg(long)]
        model: String,

        /// JSON document: an object, or an array for a collection
        data: PathBuf,
    },
    /// Fetch records from the configured REST backend
    Fetch {
        /// Model declarations file
        #[arg(long)]
        models: PathBuf,

        /// Model the records are validated as
        #[arg(long)]
        model: String,

        /// Resource path under the base URL, e.g. `users`
        #[arg(long)]
        resource: String,

        /// Fetch a single record instead of the whole collection
        #[arg(long)]
        id: Option<String>,

        /// Override the configured base URL
        #[arg(long)]
        url: Option<String>,
    },
    /// List declared models and their fields
    Models {
        /// Model declarations file
        #[arg(long)]
        models: PathBuf,
    },
    /// Show the client configuration, or update the config file
    Config {
        /// Base URL of the REST backend
        #[arg(long)]
        url: Option<String>,

        /// API key sent as a bearer token
        #[arg(long)]
        api_key: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Config file to edit instead of the per-user one
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

/// Initialize tracing on stderr so stdout carries only JSON output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "schema_model=info,schema_model_core=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Numeric ids are sent as numbers, everything else as strings.
fn parse_id(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(raw.to_string()),
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn validate(models: &Path, model: &str, data: &Path) -> anyhow::Result<()> {
    let registry = ModelRegistry::load_from(models)?;
    let model = registry.require(model)?;

    let content = fs::read_to_string(data)
        .with_context(|| format!("Failed to read {}", data.display()))?;
    let input: Value = serde_json::from_str(&content).context("Failed to parse input document")?;

    let output = match &input {
        Value::Array(_) => {
            let items = model.construct_collection(&input)?;
            tracing::info!(model = %model.name(), count = items.len(), "collection is valid");
            Value::Array(items.iter().map(|item| item.to_value()).collect())
        }
        _ => {
            let instance = model.construct(&input)?;
            tracing::info!(model = %model.name(), "document is valid");
            instance.to_value()
        }
    };
    print_json(&output)
}

async fn fetch(
    models: &Path,
    model: &str,
    resource: String,
    id: Option<String>,
    url: Option<String>,
) -> anyhow::Result<()> {
    let registry = ModelRegistry::load_from(models)?;
    let model = registry.require(model)?;

    let mut config = ClientConfig::load();
    if let Some(url) = url {
        config.base_url = url;
    }
    let client = ApiClient::from_config(&config)?;
    tracing::info!("Fetching {}/{}", client.base_url(), resource);

    let source = std::sync::Arc::new(HttpSource::new(model.clone(), client, resource));
    let output = match id {
        Some(id) => source.fetch(parse_id(&id)).await?.data().get().to_value(),
        None => {
            let fetched = source.fetch_collection().await?;
            let items = fetched.data().get();
            Value::Array(items.iter().map(|item| item.to_value()).collect())
        }
    };
    print_json(&output)
}

fn list_models(models: &Path) -> anyhow::Result<()> {
    let registry = ModelRegistry::load_from(models)?;
    for (name, model) in registry.iter() {
        println!("{}", name);
        match model.schema() {
            Some(schema) => {
                for (attr, spec) in schema.iter() {
                    let suffix = if spec.nullable { "?" } else { "" };
                    println!("  {}: {}{}", attr, spec.directive.describe(), suffix);
                }
            }
            None => println!("  (any attributes)"),
        }
    }
    Ok(())
}

fn configure(
    url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    if url.is_none() && api_key.is_none() && timeout_secs.is_none() {
        let config = match file {
            Some(path) => ClientConfig::load_from(&path)?,
            None => ClientConfig::load(),
        };
        return print_json(&serde_json::to_value(&config)?);
    }

    let path = match file {
        Some(path) => path,
        None => get_config_path()?,
    };
    let config = ClientConfig::edit(&path, |config| {
        if let Some(url) = url {
            config.base_url = url;
        }
        if api_key.is_some() {
            config.api_key = api_key;
        }
        if let Some(secs) = timeout_secs {
            config.timeout_secs = secs;
        }
    })?;
    tracing::info!("Saved config to {}", path.display());
    print_json(&serde_json::to_value(&config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Validate {
            models,
            model,
            data,
        } => validate(&models, &model, &data)?,
        Commands::Fetch {
            models,
            model,
            resource,
            id,
            url,
        } => fetch(&models, &model, resource, id, url).await?,
        Commands::Models { models } => list_models(&models)?,
        Commands::Config {
            url,
            api_key,
            timeout_secs,
            file,
        } => configure(url, api_key, timeout_secs, file)?,
    }

    Ok(())
}
