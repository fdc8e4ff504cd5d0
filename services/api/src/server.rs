use crate::cli::ServeArgs;
use crate::infra::{seeded_portal, AppState};
use crate::routes::with_portal_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use roads_portal::config::AppConfig;
use roads_portal::error::AppError;
use roads_portal::portal::PortalService;
use roads_portal::telemetry;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let today = args
        .seed_date
        .unwrap_or_else(|| Local::now().date_naive());
    let portal = seeded_portal(&config.portal, today)?;
    let app = with_portal_routes(portal.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        language = config.portal.language.code(),
        "roads portal ready"
    );

    serve_until(listener, app, portal, shutdown_signal()).await
}

/// Serves until `shutdown` resolves, then disposes the portal's timers.
async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    portal: Arc<PortalService>,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    portal.dispose();
    info!("roads portal stopped");
    served?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!(%err, "unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use roads_portal::config::PortalConfig;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn shutdown_disposes_the_portal() {
        let config = PortalConfig {
            seed: Some(3),
            ..PortalConfig::default()
        };
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date");
        let portal = seeded_portal(&config, today).expect("seeded");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let app = with_portal_routes(portal.clone());

        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(listener, app, portal.clone(), async move {
            let _ = stopped.await;
        }));
        assert!(!portal.is_disposed());

        stop.send(()).expect("server listening");
        server
            .await
            .expect("server task")
            .expect("clean shutdown");
        assert!(portal.is_disposed());
        assert_eq!(portal.active_timers(), 0);
    }
}
