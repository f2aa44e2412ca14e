mod cli;
mod config;
mod rpc_client;

use crate::config::VerifierConfig;
use crate::rpc_client::ConfiguredChainRegistry;
use anyhow::Context;
use clap::Parser;
use compiler_driver::{CompilerDriver, LocalCompilerDriver, RemoteCompilerDriver};
use match_store::MatchStore;
use session_stager::SessionStager;
use std::sync::Arc;
use std::time::Duration;
use verification_coordinator::VerificationCoordinator;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn build_compiler(settings: &VerifierConfig) -> anyhow::Result<Arc<dyn CompilerDriver>> {
    if settings.lambda_compiler.enabled {
        let url = settings
            .lambda_compiler
            .url
            .clone()
            .context("lambda_compiler.enabled is true but lambda_compiler.url is unset")?;
        let client = reqwest::Client::new();
        Ok(Arc::new(RemoteCompilerDriver::new(move |version, input| {
            let client = client.clone();
            let url = url.clone();
            async move {
                let body = serde_json::json!({ "version": version, "input": input });
                let response = client.post(url).json(&body).send().await.map_err(|err| {
                    compiler_driver::CompilerDriverError::Transport(err.to_string())
                })?;
                response.json().await.map_err(|err| {
                    compiler_driver::CompilerDriverError::Transport(err.to_string())
                })
            }
        })))
    } else {
        Ok(Arc::new(LocalCompilerDriver::new()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = cli::Args::parse();
    let settings = VerifierConfig::load(args.config_path).context("failed to load configuration")?;

    tracing::info!(
        chains = settings.chains.len(),
        repository_path = %settings.repository_v1.path.display(),
        "starting verifier-app"
    );

    let chains = Arc::new(
        ConfiguredChainRegistry::from_settings(&settings.chains)
            .context("failed to build chain registry from configuration")?,
    );
    let compiler = build_compiler(&settings)?;
    let coordinator = VerificationCoordinator::new(chains, compiler);
    let store = MatchStore::new(settings.repository_v1.path.clone());
    let stager = SessionStager::with_idle_ttl(Duration::from_secs(settings.session.idle_ttl_seconds));
    let _idle_sweeper = stager.spawn_idle_sweeper();

    // Collaborators are wired and ready; the HTTP surface that would drive
    // them from inbound requests lives outside this crate's scope.
    let _ = (&coordinator, &store, &stager);

    tracing::info!("verifier-app ready, awaiting shutdown signal");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutting down");
    Ok(())
}
