use crate::{
    index::{self, Configuration, DefaultValidator, IngressClass, Index},
    k8s::{Ingress, VirtualServer, VirtualServerRoute},
    status,
};
use anyhow::{bail, Result};
use clap::Parser;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use tokio::sync::mpsc;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "ingress-controller",
    about = "Configures NGINX from Ingress, VirtualServer and VirtualServerRoute resources"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "ingress_controller=info,warn",
        env = "INGRESS_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// The ingress class served by this controller.
    #[clap(long, default_value = "nginx")]
    ingress_class: String,

    /// Ignores Ingresses that do not name an ingress class.
    #[clap(long)]
    use_ingress_class_only: bool,

    /// Enables the annotations and references only supported by NGINX Plus.
    #[clap(long)]
    nginx_plus: bool,

    #[clap(long)]
    enable_app_protect: bool,

    #[clap(long)]
    enable_internal_routes: bool,

    /// Restricts watches to a single namespace.
    ///
    /// All namespaces are watched by default.
    #[clap(long)]
    watch_namespace: Option<String>,

    /// Disables status updates on VirtualServers and VirtualServerRoutes.
    #[clap(long)]
    disable_status_updates: bool,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            ingress_class,
            use_ingress_class_only,
            nginx_plus,
            enable_app_protect,
            enable_internal_routes,
            watch_namespace,
            disable_status_updates,
        } = self;

        let validator = DefaultValidator {
            is_plus: nginx_plus,
            app_protect_enabled: enable_app_protect,
            internal_routes_enabled: enable_internal_routes,
        };
        let configuration = Configuration::new(
            IngressClass::new(ingress_class, use_ingress_class_only),
            Box::new(validator),
            nginx_plus,
        );

        // Updates are consumed even when status updates are disabled so that
        // changes and problems are still logged.
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let config_index = Index::shared(configuration, updates_tx);

        let mut prom = <Registry>::default();
        index::metrics::register(
            prom.sub_registry_with_prefix("configuration"),
            config_index.clone(),
        );
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        // Spawn resource watches.

        let config = watcher::Config::default();
        match watch_namespace.as_deref() {
            Some(ns) => {
                info!(namespace = %ns, "Watching a single namespace");
                let ingresses = runtime.watch_namespaced::<Ingress>(ns.to_string(), config.clone());
                tokio::spawn(
                    kubert::index::namespaced(config_index.clone(), ingresses)
                        .instrument(info_span!("ingresses")),
                );
                let virtual_servers = runtime.watch_namespaced::<VirtualServer>(ns.to_string(), config.clone());
                tokio::spawn(
                    kubert::index::namespaced(config_index.clone(), virtual_servers)
                        .instrument(info_span!("virtualservers")),
                );
                let virtual_server_routes =
                    runtime.watch_namespaced::<VirtualServerRoute>(ns.to_string(), config);
                tokio::spawn(
                    kubert::index::namespaced(config_index.clone(), virtual_server_routes)
                        .instrument(info_span!("virtualserverroutes")),
                );
            }
            None => {
                let ingresses = runtime.watch_all::<Ingress>(config.clone());
                tokio::spawn(
                    kubert::index::namespaced(config_index.clone(), ingresses)
                        .instrument(info_span!("ingresses")),
                );
                let virtual_servers = runtime.watch_all::<VirtualServer>(config.clone());
                tokio::spawn(
                    kubert::index::namespaced(config_index.clone(), virtual_servers)
                        .instrument(info_span!("virtualservers")),
                );
                let virtual_server_routes = runtime.watch_all::<VirtualServerRoute>(config);
                tokio::spawn(
                    kubert::index::namespaced(config_index.clone(), virtual_server_routes)
                        .instrument(info_span!("virtualserverroutes")),
                );
            }
        }

        if disable_status_updates {
            info!("Status updates are disabled");
            tokio::spawn(drain_updates(updates_rx).instrument(info_span!("updates")));
        } else {
            let status_controller = status::Controller::new(runtime.client(), updates_rx);
            tokio::spawn(
                status_controller
                    .run()
                    .instrument(info_span!("status_controller")),
            );
        }

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

/// Consumes updates without writing statuses.
async fn drain_updates(mut updates: mpsc::UnboundedReceiver<index::Update>) {
    while let Some(update) = updates.recv().await {
        status::log_update(&update);
    }
}
