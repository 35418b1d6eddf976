//! Game-result microservice.
//!
//! ```text
//! load config ─► init tracing ─► broker (PING) + manager ─► subscribe channels ─► serve HTTP
//!                                                                              │
//!      unsubscribe_all ◄── graceful HTTP stop (bounded) ◄── ShutdownRequested ◄─ signal
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time;
use tracing::{error, info, warn};

use subvisor::service::{BrokerKind, ServiceConfig, http, logging, setup_channels};
use subvisor::{
    Event, EventKind, MemoryBroker, RedisTransport, SubscriberManager, TransportRef,
    wait_for_shutdown_signal,
};

/// Opens the configured broker. The in-process broker is also returned so it
/// can be shut down explicitly.
async fn connect_broker(
    cfg: &ServiceConfig,
) -> anyhow::Result<(TransportRef, Option<Arc<MemoryBroker>>)> {
    match cfg.broker {
        BrokerKind::Redis => {
            let redis = RedisTransport::connect(&cfg.redis).await.with_context(|| {
                format!("failed to connect to redis at {}:{}", cfg.redis.host, cfg.redis.port)
            })?;
            let transport: TransportRef = Arc::new(redis);
            Ok((transport, None))
        }
        BrokerKind::Memory => {
            info!("using in-process broker");
            let broker = MemoryBroker::arc();
            let transport: TransportRef = broker.clone();
            Ok((transport, Some(broker)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = ServiceConfig::from_env();
    logging::init_tracing(&cfg.log_level)?;
    info!("starting microservice...");
    cfg.log_fallbacks();

    let (transport, memory) = connect_broker(&cfg).await?;
    let manager = SubscriberManager::with_config(Arc::clone(&transport), cfg.manager_config());

    if let Err(e) = setup_channels(&manager, cfg.subscribe_channels.as_slice()).await {
        error!(error = ?e, "failed to set up subscribers");
        manager.unsubscribe_all().await;
        return Err(e);
    }

    let listener = match TcpListener::bind(cfg.bind_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            manager.unsubscribe_all().await;
            let addr = cfg.bind_addr();
            return Err(e).with_context(|| format!("failed to bind HTTP listener on {addr}"));
        }
    };
    let app = http::router(http::AppState::new(cfg.service_name.as_str(), transport));

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(http::serve(listener, app, async {
        let _ = stop_rx.await;
    }));

    info!("microservice is running; press Ctrl+C to stop");

    let (early_exit, cause) = tokio::select! {
        res = &mut server => (Some(res), "http_server_exited"),
        sig = wait_for_shutdown_signal() => match sig {
            Ok(sig) => {
                info!(signal = %sig, "shutdown signal received");
                (None, sig.as_label())
            }
            Err(e) => {
                error!(error = %e, "signal registration failed; shutting down");
                (None, "signal_registration_failed")
            }
        },
    };

    info!(cause, "shutting down microservice...");
    manager
        .bus()
        .publish(Event::new(EventKind::ShutdownRequested).with_reason(cause));
    let _ = stop_tx.send(());

    let server_result = match early_exit {
        Some(res) => Some(res),
        None => match time::timeout(cfg.shutdown_grace, &mut server).await {
            Ok(res) => Some(res),
            Err(_elapsed) => {
                warn!(grace = ?cfg.shutdown_grace, "HTTP server did not stop in time; aborting");
                server.abort();
                None
            }
        },
    };
    match server_result {
        Some(Ok(Ok(()))) => info!("HTTP server stopped"),
        Some(Ok(Err(e))) => error!(error = %e, "HTTP server error"),
        Some(Err(e)) => error!(error = %e, "HTTP server task failed"),
        None => {}
    }

    manager.unsubscribe_all().await;
    if let Some(broker) = memory {
        broker.shutdown().await;
    }
    info!("microservice shutdown complete");
    Ok(())
}
