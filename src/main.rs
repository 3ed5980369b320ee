use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};

use challan_monitor::config::environment::EnvironmentConfig;
use challan_monitor::models::NotificationKind;
use challan_monitor::monitor::MonitorEvent;
use challan_monitor::services::spawn_reconnect_sync;
use challan_monitor::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env();

    // Configurar logging
    let level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🏍️ AP Bike Challan - Monitor de velocidad");
    info!("================================================");
    info!("   Entorno: {}", config.environment);
    info!("   Vehículo: {} en {}", config.default_vehicle, config.default_location);
    info!(
        "   Límite: {} km/h, tick {:?}, warning {:?}",
        config.monitor.legal_limit, config.monitor.tick, config.monitor.warning_ttl
    );

    let state = AppState::new(config);

    // Sincronizar la cola offline al arrancar y en cada reconexión
    let sync_task = spawn_reconnect_sync(state.citations.clone(), &state.connectivity, true);

    // Mostrar las notificaciones como lo haría la capa de presentación
    let mut notifications = state.notifications.subscribe();
    let notification_task = tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            match notification.kind {
                NotificationKind::Error => error!("🔔 {}: {}", notification.title, notification.message),
                NotificationKind::Warning => warn!("🔔 {}: {}", notification.title, notification.message),
                _ => info!("🔔 {}: {}", notification.title, notification.message),
            }
        }
    });

    let (runner, mut events) = state.monitor_runner();
    let event_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                MonitorEvent::CitationIssued { cause, issued } => info!(
                    "🧾 Challan automático ({:?}) {}: ₹{} ({:?})",
                    cause, issued.citation.id, issued.citation.amount, issued.delivery
                ),
                MonitorEvent::CitationFailed { message, .. } => {
                    error!("❌ Error generando challan: {}", message)
                }
                MonitorEvent::Stopped(_) => break,
                _ => {}
            }
        }
    });

    let handle = runner.spawn();
    match state.config.monitor_duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => info!("⏱️ Duración de la sesión cumplida"),
                _ = shutdown_signal() => {}
            }
        }
        None => shutdown_signal().await,
    }

    let runner = handle.stop().await?;
    let summary = runner.summary();
    info!("📊 Lecturas: {}", summary.readings);
    info!("📊 Velocidad máx/mín/media: {}/{}/{} km/h", summary.max_speed, summary.min_speed, summary.avg_speed);
    info!("📊 Lecturas con exceso: {}", summary.overspeed_readings);
    info!("📊 Challans automáticos: {}", summary.citations_issued);

    let stats = state.citations.dashboard_stats().await;
    info!(
        "📊 Challans: {} total, {} pendientes (₹{}), {} pagados (₹{})",
        stats.total_challans,
        stats.pending_payments,
        stats.pending_amount,
        stats.paid_challans,
        stats.total_amount_collected
    );
    match state.citations.get_queued_citations().await {
        Ok(queued) if !queued.is_empty() => {
            warn!("📴 {} challans offline pendientes de sincronizar", queued.len())
        }
        Ok(_) => {}
        Err(e) => warn!("⚠️ {}", e.user_message()),
    }

    let _ = event_task.await;
    sync_task.abort();
    notification_task.abort();

    info!("👋 Monitor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
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
                error!("❌ No se pudo instalar el handler de señales: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, deteniendo monitor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, deteniendo monitor...");
        },
    }
}
