use clap::Parser;
use factory_db_init::cli::Cli;

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the index report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "factory_db_init=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = factory_db_init::app::run(cli).await {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
