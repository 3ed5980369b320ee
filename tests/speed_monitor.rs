use std::sync::Arc;
use std::time::Duration;

use challan_monitor::config::environment::EnvironmentConfig;
use challan_monitor::config::MonitorConfig;
use challan_monitor::monitor::{
    CitationCause, MonitorEvent, MonitorRunner, RandomWalkSignal, ScriptedSignal, SpeedSignal,
};
use challan_monitor::services::Delivery;
use challan_monitor::storage::MemoryStore;
use challan_monitor::AppState;
use tokio::sync::mpsc::UnboundedReceiver;

fn create_test_state(start_offline: bool) -> AppState {
    let config = EnvironmentConfig {
        start_offline,
        network_latency: Duration::ZERO,
        sync_latency: Duration::ZERO,
        ..EnvironmentConfig::default()
    };
    AppState::with_store(config, Arc::new(MemoryStore::new()))
}

fn runner(
    state: &AppState,
    config: MonitorConfig,
    signal: impl SpeedSignal + 'static,
) -> (MonitorRunner, UnboundedReceiver<MonitorEvent>) {
    MonitorRunner::new(config, Box::new(signal), state.citations.clone(), "AP23AB1234", "Highway Sector 5")
}

fn drain(rx: &mut UnboundedReceiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn issued_causes(events: &[MonitorEvent]) -> Vec<CitationCause> {
    events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::CitationIssued { cause, .. } => Some(*cause),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_sustained_overspeed_issues_one_citation() {
    let state = create_test_state(false);
    let (runner, mut rx) = runner(&state, MonitorConfig::default(), ScriptedSignal::new([40, 85, 88, 92, 50]));

    let handle = runner.spawn();
    tokio::time::sleep(Duration::from_millis(2_600)).await;
    let runner = handle.stop().await.unwrap();

    let events = drain(&mut rx);
    assert_eq!(issued_causes(&events), vec![CitationCause::Escalation]);

    let levels: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::Warning(w) => Some(w.level),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![1, 2, 3]);

    let citations = state.citations.list_citations().await;
    assert_eq!(citations.len(), 1);
    assert_eq!(citations[0].amount, 1000);
    assert!(citations[0].description.contains("92 km/h"));

    let summary = runner.summary();
    assert_eq!(summary.citations_issued, 1);
    assert_eq!(summary.max_speed, 92);
    assert!(matches!(events.last(), Some(MonitorEvent::Stopped(_))));
}

#[tokio::test(start_paused = true)]
async fn test_severe_reading_issues_immediately() {
    let state = create_test_state(false);
    let (runner, mut rx) = runner(&state, MonitorConfig::default(), ScriptedSignal::new([30, 105, 60]));

    let handle = runner.spawn();
    tokio::time::sleep(Duration::from_millis(1_600)).await;
    handle.stop().await.unwrap();

    let events = drain(&mut rx);
    assert_eq!(issued_causes(&events), vec![CitationCause::Severe]);
    let citations = state.citations.list_citations().await;
    assert_eq!(citations[0].amount, 2000);
}

#[tokio::test(start_paused = true)]
async fn test_expired_warnings_never_escalate() {
    let state = create_test_state(false);
    // Ticks más lentos que la expiración: cada warning caduca antes del siguiente
    let config = MonitorConfig {
        tick: Duration::from_secs(10),
        warning_ttl: Duration::from_secs(5),
        ..MonitorConfig::default()
    };
    let (runner, mut rx) = runner(&state, config, ScriptedSignal::new([85]));

    let handle = runner.spawn();
    tokio::time::sleep(Duration::from_secs(47)).await;
    handle.stop().await.unwrap();

    let events = drain(&mut rx);
    assert!(issued_causes(&events).is_empty());
    let cleared = events.iter().filter(|e| matches!(e, MonitorEvent::WarningCleared)).count();
    let warnings: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::Warning(w) => Some(w.level),
            _ => None,
        })
        .collect();
    assert_eq!(warnings, vec![1, 1, 1, 1]);
    assert_eq!(cleared, 4);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_expiry() {
    let state = create_test_state(false);
    let config = MonitorConfig {
        tick: Duration::from_secs(10),
        warning_ttl: Duration::from_secs(5),
        ..MonitorConfig::default()
    };
    let (runner, mut rx) = runner(&state, config, ScriptedSignal::new([85]));

    let handle = runner.spawn();
    tokio::time::sleep(Duration::from_secs(11)).await;
    let runner = handle.stop().await.unwrap();
    assert!(!runner.monitor().is_monitoring());

    tokio::time::sleep(Duration::from_secs(30)).await;
    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| matches!(e, MonitorEvent::WarningCleared)));
    assert!(matches!(events.last(), Some(MonitorEvent::Stopped(_))));
    assert!(!runner.monitor().is_warning_shown());
}

#[tokio::test(start_paused = true)]
async fn test_offline_auto_citation_is_queued() {
    let state = create_test_state(true);
    let (runner, mut rx) = runner(&state, MonitorConfig::default(), ScriptedSignal::new([115, 20]));

    let handle = runner.spawn();
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    handle.stop().await.unwrap();

    let delivered: Vec<Delivery> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            MonitorEvent::CitationIssued { issued, .. } => Some(issued.delivery),
            _ => None,
        })
        .collect();
    assert_eq!(delivered, vec![Delivery::Queued]);
    assert_eq!(state.citations.get_queued_citations().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_citation_failure_does_not_stop_monitoring() {
    let state = create_test_state(false);
    state.api.set_failing(true);
    let (runner, mut rx) = runner(&state, MonitorConfig::default(), ScriptedSignal::new([110, 30, 30, 30]));

    let handle = runner.spawn();
    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert!(!handle.is_finished());
    let runner = handle.stop().await.unwrap();

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, MonitorEvent::CitationFailed { .. })));
    let readings = events.iter().filter(|e| matches!(e, MonitorEvent::Reading { .. })).count();
    assert_eq!(readings, 4);
    assert_eq!(runner.monitor().citations_failed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_resets_session_statistics() {
    let state = create_test_state(false);
    let (runner, mut rx) = runner(&state, MonitorConfig::default(), ScriptedSignal::new([70, 75]));

    let handle = runner.spawn();
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let runner = handle.stop().await.unwrap();
    assert_eq!(runner.summary().max_speed, 75);

    let handle = runner.spawn();
    tokio::time::sleep(Duration::from_millis(600)).await;
    let runner = handle.stop().await.unwrap();

    // La señal se reinicia y la sesión nueva solo ve sus propias lecturas
    let summary = runner.summary();
    assert_eq!(summary.readings, 1);
    assert_eq!(summary.max_speed, 70);
    assert_eq!(summary.avg_speed, 70);
    drain(&mut rx);
}

#[tokio::test(start_paused = true)]
async fn test_random_session_stays_in_bounds() {
    let state = create_test_state(false);
    let (runner, mut rx) = runner(&state, MonitorConfig::default(), RandomWalkSignal::seeded(2025, 120));

    let handle = runner.spawn();
    tokio::time::sleep(Duration::from_millis(120_200)).await;
    handle.stop().await.unwrap();

    let speeds: Vec<u32> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            MonitorEvent::Reading { reading, .. } => Some(reading.speed),
            _ => None,
        })
        .collect();
    assert_eq!(speeds.len(), 240);
    assert!(speeds.iter().all(|&s| s <= 120));
}
