use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use tokio::sync::watch;

use flourish_core::FlourishConfig;
use flourish_core::app::{GardenObserver, Host, HostBuilder, OverlayModel, fields};
use flourish_core::bus::ObserverExit;
use flourish_core::domain::{Request, Response, total_mass};
use flourish_core::impls::{InMemoryStateStore, JsonFileStore, ManualTabSource};
use flourish_core::ports::{Clock, FixedClock, UlidGenerator};

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 9, 14, 9, 30, 0).unwrap()))
}

fn garden(host: &Host, clock: Arc<FixedClock>, seed: u64) -> Arc<GardenObserver<StdRng>> {
    Arc::new(GardenObserver::new(
        host.repo(),
        host.config().garden_rules(),
        StdRng::seed_from_u64(seed),
        Arc::new(UlidGenerator::new(clock)),
    ))
}

async fn state(host: &Host) -> flourish_core::domain::FlourishState {
    match host.send(Request::GetState).await.unwrap() {
        Response::State(state) => *state,
        other => panic!("expected state, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn browsing_drives_score_garden_and_overlay() {
    let clock = clock();
    let tabs = ManualTabSource::new();
    let host = HostBuilder::new()
        .store(InMemoryStateStore::new())
        .tabs(tabs.clone())
        .clock(clock.clone())
        .build()
        .unwrap();

    let reply = host
        .send_json(&json!({"type": "ADD_PRODUCTIVE_SITE", "payload": {"domain": "www.GitHub.com"}}))
        .await
        .unwrap();
    assert_eq!(reply, Value::Null);
    host.send_json(&json!({"type": "ADD_UNPRODUCTIVE_SITE", "payload": {"domain": "youtube.com"}}))
        .await
        .unwrap();

    let garden = garden(&host, clock.clone(), 11);
    let overlay = Arc::new(OverlayModel::new(host.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let garden_task = tokio::spawn(host.observer("garden", garden).run(shutdown_rx.clone()));
    let overlay_task = tokio::spawn(host.observer("overlay", overlay.clone()).run(shutdown_rx));

    tabs.visit("https://gist.github.com/someone");
    tokio::time::sleep(Duration::from_millis(40_500)).await;
    tabs.visit("https://m.youtube.com/watch?v=xyz");
    tokio::time::sleep(Duration::from_secs(12)).await;
    tabs.visit("chrome://newtab");
    tokio::time::sleep(Duration::from_secs(3)).await;

    let state = state(&host).await;
    assert_eq!(state.score, 28);
    assert_eq!(total_mass(&state.plants), 2);
    assert!(state.plants.iter().all(|p| p.level >= 1 && p.level <= 5));
    assert_eq!(overlay.render().as_deref(), Some("📉 28"));

    host.send(Request::ToggleOverlay { enabled: false }).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(overlay.render(), None);

    shutdown_tx.send(true).unwrap();
    assert_eq!(garden_task.await.unwrap(), ObserverExit::Shutdown);
    assert_eq!(overlay_task.await.unwrap(), ObserverExit::Shutdown);
    host.suspend().await;
}

#[tokio::test]
async fn state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let clock = clock();

    let first = HostBuilder::new()
        .store(JsonFileStore::new(&path))
        .tabs(ManualTabSource::new())
        .clock(clock.clone())
        .build()
        .unwrap();
    first
        .send_json(&json!({"type": "ADD_PRODUCTIVE_SITE", "payload": {"domain": "docs.rs"}}))
        .await
        .unwrap();
    first
        .send(Request::ToggleOverlay { enabled: false })
        .await
        .unwrap();
    first.repo().set::<fields::Score>(&57).await.unwrap();
    garden(&first, clock.clone(), 5).reconcile(57).await.unwrap();
    first.suspend().await;

    let second = HostBuilder::new()
        .store(JsonFileStore::new(&path))
        .tabs(ManualTabSource::new())
        .clock(clock.clone())
        .build()
        .unwrap();
    let state = state(&second).await;
    assert_eq!(state.score, 57);
    assert_eq!(state.productive_sites, vec!["docs.rs"]);
    assert!(!state.overlay_enabled);
    assert_eq!(total_mass(&state.plants), 5);
    assert_eq!(state.last_reset_date, clock.today());
    second.suspend().await;
}

#[tokio::test]
async fn config_file_shapes_the_host() {
    let config = FlourishConfig::from_toml_str("max_score = 5\npoints_per_unit = 1\nmax_plant_count = 2\nmax_plant_level = 2\n")
        .unwrap();
    let clock = clock();
    let host = HostBuilder::new()
        .store(InMemoryStateStore::new())
        .tabs(ManualTabSource::new())
        .clock(clock.clone())
        .config(config)
        .build()
        .unwrap();

    let report = garden(&host, clock, 2).reconcile(5).await.unwrap();

    assert!(report.saturated);
    assert_eq!(total_mass(&host.repo().get::<fields::Plants>().await.unwrap()), 4);
}
