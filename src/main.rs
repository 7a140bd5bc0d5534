//! Warden Operator - binds Claims to backing Grants

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use warden::controller::{error_policy, reconcile, Context};
use warden::crd::{Claim, Grant};
use warden::retry::{retry_with_backoff, RetryConfig};

/// Warden - Kubernetes operator binding Claims to backing Grants
#[derive(Parser, Debug)]
#[command(name = "warden", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The kube client's rustls stack needs a process-wide crypto provider
    // registered before the first TLS connection.
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!(
            "CRITICAL: Failed to install crypto provider: {:?}. \
             The operator cannot talk TLS to the API server without one.",
            e
        );
        std::process::exit(1);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        // Generate CRD YAML for both resources as a multi-document stream
        let claim_crd = serde_yaml::to_string(&Claim::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize Claim CRD: {}", e))?;
        let grant_crd = serde_yaml::to_string(&Grant::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize Grant CRD: {}", e))?;
        println!("{claim_crd}---\n{grant_crd}");
        return Ok(());
    }

    run_controller().await
}

/// Ensure all Warden CRDs are installed
///
/// The operator installs its own CRDs on startup using server-side apply,
/// so the stored definitions always match the operator version. Startup
/// can race the API server becoming reachable, hence the retry.
async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply("warden-controller").force();
    let retry = RetryConfig {
        max_attempts: 8,
        initial_delay: Duration::from_millis(500),
        max_delay: Duration::from_secs(15),
        backoff_multiplier: 2.0,
    };

    for (name, crd) in [
        ("claims.warden.dev", Claim::crd()),
        ("grants.warden.dev", Grant::crd()),
    ] {
        tracing::info!(crd = name, "Installing CRD...");
        retry_with_backoff(&retry, name, || async {
            crds.patch(name, &params, &Patch::Apply(&crd)).await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to install {} CRD: {}", name, e))?;
    }

    tracing::info!("All Warden CRDs installed/updated");
    Ok(())
}

/// Run in controller mode - binds claims to grants
///
/// Watches Claims across all namespaces. Grants are registered as owned
/// resources, so issuer updates to a grant's status requeue the owning
/// claim and get mirrored without polling.
async fn run_controller() -> anyhow::Result<()> {
    tracing::info!("Warden controller starting...");

    // Create Kubernetes client
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    // Operator installs its own CRDs on startup
    ensure_crds_installed(&client).await?;

    let claims: Api<Claim> = Api::all(client.clone());
    let grants: Api<Grant> = Api::all(client.clone());

    let ctx = Arc::new(Context::new(client));

    tracing::info!("Starting Claim controller");

    Controller::new(claims, WatcherConfig::default())
        .owns(grants, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok(action) => {
                    tracing::debug!(?action, "Reconciliation completed");
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Reconciliation error");
                }
            }
        })
        .await;

    tracing::info!("Warden controller shutting down");
    Ok(())
}
