// src/main.rs

use axum::serve;
use gemini_key_rotator::{
    cli::{Cli, Commands},
    config::{self, AppConfig},
    run, setup_configuration, AppError, KeyRotationClient, ModelRequest,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = ?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!(signal = "Ctrl+C", "Received signal. Initiating graceful shutdown...") },
        () = terminate => { info!(signal = "Terminate", "Received signal. Initiating graceful shutdown...") },
    }
}

fn init_tracing(cli: &Cli) {
    let env_filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(true))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse_args();
    init_tracing(&cli);

    match cli.command {
        Commands::Serve { port } => serve_http(cli.config, port).await,
        Commands::Generate { model, prompt, raw } => {
            let config = setup_configuration(cli.config)?;
            let client = KeyRotationClient::from_config(&config)?;
            let response = client
                .dispatch(&ModelRequest::from_prompt(model, &prompt))
                .await?;
            match response.text() {
                Some(text) if !raw => println!("{text}"),
                _ => println!("{}", serde_json::to_string_pretty(&response.body)?),
            }
            Ok(())
        }
        Commands::Stats => {
            let config = setup_configuration(cli.config)?;
            let client = KeyRotationClient::from_config(&config)?;
            println!("{}", serde_json::to_string_pretty(&client.stats())?);
            println!("{}", serde_json::to_string_pretty(&client.key_states())?);
            Ok(())
        }
        Commands::CheckConfig => {
            let config = setup_configuration(cli.config)?;
            println!(
                "Configuration OK: {} key(s), {} attempt(s) per request, {}s cooldown",
                config.rotation.api_keys.len(),
                config.rotation.max_attempts,
                config.rotation.cooldown_secs
            );
            Ok(())
        }
        Commands::InitConfig { output, force } => init_config(output, force).await,
    }
}

async fn serve_http(config_path: Option<PathBuf>, port: Option<u16>) -> Result<(), AppError> {
    let (app, config) = run(config_path)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(config.server.port)));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!(server.address = %addr, error = ?e, "Failed to bind to address. Exiting.");
        AppError::from(e)
    })?;
    info!(server.address = %addr, "Server listening");

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = ?e, "Server run loop encountered an error. Exiting.");
            AppError::from(e)
        })?;

    info!("Server shut down gracefully.");
    Ok(())
}

async fn init_config(output: PathBuf, force: bool) -> Result<(), AppError> {
    if output.exists() && !force {
        return Err(AppError::Config(format!(
            "{} already exists; pass --force to overwrite",
            output.display()
        )));
    }
    config::save_config(&AppConfig::default(), &output).await?;
    println!("Wrote default configuration to {}", output.display());
    Ok(())
}
