use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tether_config::ControllerConfig;
use tether_core::{
    BusSink, ControllerError, DownloadStatus, LifecycleEvent, OptionScope, OptionSet, TorrentMode,
};
use tether_engine::{
    RawFileInfo, RawMetaInfo, RawTorrentInfo, SessionController, StubEngine, notify_event,
};
use tether_events::EventBus;
use tether_telemetry::{CommandOutcome, Metrics};
use tether_test_support::RecordingSink;
use tether_test_support::fixtures::{HTTP_URI, MAGNET_URI, TorrentDir, UNSUPPORTED_URI};
use tokio::time::timeout;

const EVENT_WAIT: Duration = Duration::from_secs(5);

fn controller(engine: &Arc<StubEngine>) -> Result<SessionController> {
    SessionController::new(engine.clone(), &ControllerConfig::default())
        .context("controller construction")
}

#[tokio::test(start_paused = true)]
async fn magnet_metadata_arrives_after_five_retries() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    engine.set_metadata_latency(6);
    let controller = controller(&engine)?;

    let gid = controller.add_uri(MAGNET_URI)?;
    assert!(!gid.to_string().is_empty());

    let before = controller.download_info(gid)?;
    assert_eq!(before.total_length, 0);
    assert!(!before.has_metadata());

    let info = controller.wait_for_metadata(gid).await?;
    assert!(info.total_length > 0);
    assert_eq!(info.display_name(), Some("demo"));
    assert_eq!(engine.info_reads(gid), 7, "one manual read, five empty polls, one hit");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn metadata_wait_times_out_at_configured_cap() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    engine.set_metadata_latency(u32::MAX);
    let config = ControllerConfig {
        poll_max_attempts: 4,
        ..ControllerConfig::default()
    };
    let controller = SessionController::new(engine.clone(), &config)?;
    let gid = controller.add_uri(MAGNET_URI)?;

    let err = controller
        .wait_for_metadata(gid)
        .await
        .expect_err("metadata never arrives");
    assert_eq!(
        err,
        ControllerError::MetadataTimeout {
            gid: gid.to_string(),
            attempts: 4,
        }
    );
    assert_eq!(
        controller.download_info(gid)?.status,
        DownloadStatus::Active,
        "timing out leaves the transfer running"
    );
    Ok(())
}

#[test]
fn rejected_uri_reports_add_failed() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let controller = controller(&engine)?;
    let err = controller.add_uri(UNSUPPORTED_URI).expect_err("unsupported scheme");
    assert_eq!(
        err,
        ControllerError::AddFailed {
            operation: "add_uri",
            target: UNSUPPORTED_URI.to_string(),
        }
    );
    Ok(())
}

#[test]
fn corrupt_torrent_fails_to_parse() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let controller = controller(&engine)?;
    let dir = TorrentDir::new()?;
    let path = dir.corrupt("broken.torrent")?;

    let err = controller.parse_torrent(&path).expect_err("corrupt torrent");
    assert_eq!(
        err,
        ControllerError::ParseFailed {
            path: path.display().to_string(),
        }
    );
    Ok(())
}

#[test]
fn registered_torrent_parses_and_adds() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let controller = controller(&engine)?;
    let dir = TorrentDir::new()?;
    let path = dir.sample("sample.torrent")?;
    engine.register_torrent(
        &path,
        RawTorrentInfo {
            info_hash: vec![0xde, 0xad, 0xbe, 0xef],
            dir: "/downloads".to_string(),
            meta: Some(RawMetaInfo {
                name: "sample".to_string(),
                comment: String::new(),
                creation_unix: 0,
                announce_list: "udp://tracker.example/announce;http://backup.example/announce"
                    .to_string(),
                mode: 1,
            }),
            files: vec![RawFileInfo {
                index: 1,
                path: "/downloads/sample.bin".to_string(),
                length: 42,
                completed_length: 0,
                selected: true,
            }],
        },
    );

    let meta = controller.parse_torrent(&path)?;
    assert_eq!(meta.info_hash, "deadbeef");
    assert_eq!(meta.display_name(), Some("sample"));
    assert_eq!(meta.mode, Some(TorrentMode::Single));
    assert_eq!(meta.announce_list.len(), 2);
    assert_eq!(meta.files[0].name, "sample.bin");

    let options = OptionSet::new().with("select-file", "1");
    let gid = controller.add_torrent(&path, &options)?;
    assert_eq!(controller.get_options(gid)?, options);
    let info = controller.download_info(gid)?;
    assert_eq!(info.total_length, 42);
    assert_eq!(info.display_name(), Some("sample"));
    Ok(())
}

#[test]
fn pause_on_complete_session_is_refused_not_failed() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let controller = controller(&engine)?;
    let gid = controller.add_uri(HTTP_URI)?;
    assert!(engine.complete(gid));

    assert!(!controller.pause(gid)?);
    assert!(!controller.resume(gid)?);
    assert!(controller.remove(gid)?);
    assert_eq!(controller.download_info(gid)?.status, DownloadStatus::Removed);
    Ok(())
}

#[test]
fn option_changes_on_terminal_session_fail() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let controller = controller(&engine)?;
    let gid = controller.add_uri_with_options(HTTP_URI, &OptionSet::new().with("split", "2"))?;
    controller.change_options(gid, &OptionSet::new().with("split", "4"))?;
    assert_eq!(controller.get_options(gid)?.get("split"), Some("4"));

    assert!(engine.fail(gid));
    let err = controller
        .change_options(gid, &OptionSet::new().with("split", "8"))
        .expect_err("terminal session");
    assert_eq!(
        err,
        ControllerError::OptionChangeFailed {
            scope: OptionScope::Session,
            gid: Some(gid.to_string()),
        }
    );
    Ok(())
}

#[test]
fn global_scope_keys_are_forwarded_for_the_engine_to_reject() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let controller = controller(&engine)?;
    controller.change_global_options(&OptionSet::new().with("max-concurrent-downloads", "3"))?;
    assert_eq!(
        controller.get_global_options()?.get("max-concurrent-downloads"),
        Some("3")
    );

    let err = controller
        .change_global_options(&OptionSet::new().with("out", "file.bin"))
        .expect_err("engine rejects session-only key");
    assert_eq!(
        err,
        ControllerError::OptionChangeFailed {
            scope: OptionScope::Global,
            gid: None,
        }
    );
    Ok(())
}

#[test]
fn unknown_gid_yields_zero_snapshot() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let controller = controller(&engine)?;
    let info = controller.download_info("ffff")?;
    assert_eq!(info.total_length, 0);
    assert_eq!(info.status, DownloadStatus::Waiting);
    assert!(info.files.is_empty());
    Ok(())
}

#[test]
fn malformed_gid_issues_no_engine_command() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let metrics = Metrics::new()?;
    let controller = SessionController::with_metrics(
        engine.clone(),
        &ControllerConfig::default(),
        Some(metrics.clone()),
    )?;

    let err = controller.remove("+12").expect_err("sign is not hex");
    assert!(matches!(err, ControllerError::InvalidFormat { .. }));
    assert_eq!(metrics.command_count("remove", CommandOutcome::Accepted), 0);
    assert_eq!(metrics.command_count("remove", CommandOutcome::Refused), 0);
    Ok(())
}

#[test]
fn start_is_delivered_before_complete_on_engine_thread() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let controller = controller(&engine)?;
    let sink = Arc::new(RecordingSink::new());
    controller.set_notifier(sink.clone());
    let engine_thread = controller.spawn_engine_thread()?;

    let gid = controller.add_uri(MAGNET_URI)?;
    assert!(engine.complete(gid));

    let events = sink.wait_for(2, EVENT_WAIT);
    assert_eq!(
        events,
        vec![(gid, LifecycleEvent::Start), (gid, LifecycleEvent::Complete)]
    );

    controller.shutdown()?;
    engine_thread
        .join()
        .map_err(|_| anyhow::anyhow!("engine thread panicked"))?;
    Ok(())
}

#[test]
fn events_for_released_controller_are_dropped() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let released = controller(&engine)?;
    let stale_sink = Arc::new(RecordingSink::new());
    released.set_notifier(stale_sink.clone());
    let stale = released.handle();
    drop(released);

    let live = controller(&engine)?;
    let live_sink = Arc::new(RecordingSink::new());
    live.set_notifier(live_sink.clone());

    notify_event(stale, 1, 1);
    assert!(stale_sink.events().is_empty());
    assert!(live_sink.events().is_empty());

    notify_event(live.handle(), 1, 4);
    assert_eq!(live_sink.events().len(), 1);
    Ok(())
}

#[tokio::test]
async fn bus_sink_streams_envelopes() -> Result<()> {
    let engine = Arc::new(StubEngine::new());
    let metrics = Metrics::new()?;
    let controller = SessionController::with_metrics(
        engine.clone(),
        &ControllerConfig::default(),
        Some(metrics.clone()),
    )?;
    let bus = EventBus::new();
    let mut stream = bus.subscribe(None);
    controller.set_notifier(Arc::new(BusSink::new(bus.clone())));
    let engine_thread = controller.spawn_engine_thread()?;

    let gid = controller.add_uri(HTTP_URI)?;
    assert!(controller.pause(gid)?);

    let first = timeout(EVENT_WAIT, stream.next())
        .await?
        .context("stream closed")?;
    let second = timeout(EVENT_WAIT, stream.next())
        .await?
        .context("stream closed")?;
    assert_eq!(first.gid, gid.to_string());
    assert_eq!(first.event, LifecycleEvent::Start);
    assert_eq!(second.event, LifecycleEvent::Pause);
    assert!(second.id > first.id);

    controller.shutdown()?;
    engine_thread
        .join()
        .map_err(|_| anyhow::anyhow!("engine thread panicked"))?;
    assert_eq!(metrics.snapshot().events_dispatched_total, 2);
    assert!(metrics.render()?.contains("engine_commands_total"));
    Ok(())
}
