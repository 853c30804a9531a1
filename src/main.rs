// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use k8s_openapi::api::core::v1::Service;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::watcher;
use kube::{Api, Client};
use tracing::{debug, error, info};

use kube2clouddns::{
    cloud_dns::{auth::TokenSource, CloudDnsClient},
    config::{init_logging, Cli, Settings},
    constants::{TOKIO_THREAD_NAME, TOKIO_WORKER_THREADS},
    dispatcher::Dispatcher,
    events::service_events,
    metrics,
    reconciler::RecordReconciler,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name(TOKIO_THREAD_NAME)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    init_logging();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting kube2clouddns");

    let settings = match cli.into_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e).context("invalid configuration");
        }
    };
    info!(
        project = %settings.project,
        domain = %settings.domain,
        namespace = settings.namespace.as_deref().unwrap_or("<all>"),
        ttl = settings.ttl_seconds,
        resync_interval = ?settings.resync_interval,
        "Configuration loaded"
    );

    debug!("Initializing Kubernetes client");
    let client = kube_client(&settings).await?;
    debug!("Kubernetes client initialized successfully");

    debug!("Initializing Cloud DNS client");
    let http = settings.transport.http_client()?;
    let tokens = TokenSource::new(
        http.clone(),
        &settings.service_account_key,
        settings.token_uri.clone(),
    )?;
    info!(client_email = %tokens.client_email(), "Using service account");
    let backend = Arc::new(CloudDnsClient::new(
        http,
        settings.api_endpoint.clone(),
        settings.project.clone(),
        tokens,
    )?);

    let reconciler = RecordReconciler::new(backend, settings.domain.clone(), settings.poll_policy);
    let dispatcher = Dispatcher::new(reconciler, settings.ttl_seconds);

    let services: Api<Service> = match &settings.namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    };
    let events = service_events(services, watcher::Config::default(), settings.resync_interval);

    let metrics_server = async {
        match settings.metrics_addr {
            Some(addr) => metrics::serve(addr).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        () = dispatcher.run(events) => {
            error!("CRITICAL: Service event stream ended unexpectedly");
            anyhow::bail!("Service event stream ended unexpectedly")
        }
        result = metrics_server => {
            error!("CRITICAL: Metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        result = shutdown_signal() => {
            result?;
            info!("Shutting down");
        }
    }

    Ok(())
}

/// Kubernetes client from `--kubeconfig`, or inferred from the environment, with the
/// shared transport applied.
async fn kube_client(settings: &Settings) -> Result<Client> {
    let mut config = match &settings.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        None => kube::Config::infer().await?,
    };
    settings.transport.configure_kube(&mut config)?;
    Ok(Client::try_from(config)?)
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received SIGINT");
    }
    Ok(())
}
