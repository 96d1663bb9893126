use anyhow::Context;

use crate::bootstrap::{collect_report, run_bootstrap, COMPLETION_MESSAGE};
use crate::cli::{Cli, Command};
use crate::config::{describe_target, BootstrapConfig};
use crate::db::catalog::MongoSchemaCatalog;
use crate::verify::verify;

/// Resolve the configuration for a command line: file and environment first,
/// then the CLI overrides.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<BootstrapConfig> {
    let mut config =
        BootstrapConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(uri) = &cli.uri {
        config.mongodb_uri = uri.clone();
    }
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }

    Ok(config)
}

/// Open a handle on the target database.
pub async fn connect(config: &BootstrapConfig) -> anyhow::Result<mongodb::Database> {
    let options = config.client_options().await?;
    let target = describe_target(&options);

    let client = mongodb::Client::with_options(options)
        .with_context(|| format!("Failed to connect to MongoDB at {}", target))?;

    tracing::info!("Connected to MongoDB at {}", target);

    Ok(client.database(&config.database))
}

/// Run one command to completion.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    let plan = config.plan();

    match cli.command() {
        Command::Plan => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Init => {
            let db = connect(&config).await?;
            let catalog = MongoSchemaCatalog::new(&db);

            let summary = run_bootstrap(&catalog, &plan)
                .await
                .with_context(|| format!("Bootstrap of '{}' aborted", plan.database))?;
            tracing::info!("Bootstrap of '{}' finished: {}", plan.database, summary);

            let report = collect_report(&catalog, &plan).await?;
            print!("{}", report.render()?);
            println!("{}", COMPLETION_MESSAGE);
        }
        Command::Verify => {
            let db = connect(&config).await?;
            let catalog = MongoSchemaCatalog::new(&db);

            let report = verify(&catalog, &plan).await?;
            for discrepancy in &report.discrepancies {
                println!("{}", discrepancy);
            }
            report.into_result()?;
            println!("Database '{}' matches the bootstrap schema", plan.database);
        }
    }

    Ok(())
}
