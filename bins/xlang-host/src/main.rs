use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use xlang_engine::{ComponentHost, ComponentTable, EngineError, HostConfig};

#[derive(Parser)]
#[command(name = "xlang-host", about = "Cross-language transform component host")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List declared components and per-record functions as JSON.
    Components,

    /// Negotiate schemas offline for every [[plan]] in a config file.
    Plan {
        /// Path to TOML configuration file.
        #[arg(long, default_value = "xlang-host.toml", env = "XLANG_HOST_CONFIG")]
        config: String,
    },
}

fn init_tracing(fallback: Option<&str>) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.unwrap_or("info").into()),
        )
        .init();
}

fn declared_table() -> Arc<ComponentTable> {
    Arc::new(xlang_wordcount::declare(ComponentTable::builder()).build())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Components => {
            init_tracing(None);
            list_components(&declared_table())
        }
        Command::Plan { config } => {
            let loaded = HostConfig::load(&config);
            init_tracing(
                loaded
                    .as_ref()
                    .ok()
                    .and_then(|c| c.log_filter.as_deref()),
            );
            match loaded {
                Ok(host_config) => {
                    tracing::info!(config = %config, plans = host_config.plans.len(), "running plans");
                    run_plans(&host_config).await
                }
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "xlang-host failed");
        std::process::exit(1);
    }
}

fn list_components(table: &ComponentTable) -> Result<(), EngineError> {
    let components: Vec<_> = table
        .components()
        .map(|c| {
            let properties: Vec<_> = c
                .properties
                .iter()
                .map(|p| {
                    json!({
                        "field": p.field,
                        "path": p.path,
                        "description": p.description,
                        "type": p.config_type.to_string(),
                    })
                })
                .collect();
            json!({
                "name": c.name,
                "description": c.description,
                "shape": c.shape.to_string(),
                "input_tags": c.input_tags,
                "output_tags": c.output_tags,
                "properties": properties,
            })
        })
        .collect();
    let functions: Vec<_> = table
        .functions()
        .map(|f| json!({"id": f.id.to_string(), "name": f.name}))
        .collect();

    print_json(&json!({"components": components, "functions": functions}))
}

async fn run_plans(config: &HostConfig) -> Result<(), EngineError> {
    let host = ComponentHost::detached(declared_table());
    let mut reports = Vec::with_capacity(config.plans.len());
    for plan in &config.plans {
        let report = xlang_engine::plan(&host, plan)
            .await
            .map_err(|e| e.with_context(&plan.component))?;
        reports.push(report);
    }
    let reports = serde_json::to_value(&reports).map_err(xlang_api::XlangError::from)?;
    print_json(&reports)
}

fn print_json(value: &serde_json::Value) -> Result<(), EngineError> {
    let text = serde_json::to_string_pretty(value).map_err(xlang_api::XlangError::from)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}")?;
    Ok(())
}
