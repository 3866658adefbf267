//! Snapfloat - headless demo
//!
//! Runs one on-screen pass and one timer pass against the software
//! platform and writes the PNGs to a directory. Without an output directory
//! the captures go to the user's Pictures and local data folders.
//!
//! Usage: snapfloat [output-dir] [config.json]

use anyhow::{Context, bail};
use capture::{CaptureGrant, HeadlessConfig};
use shared_protocol::{BridgeEvent, TouchEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use overlay_service::headless::HeadlessPlatform;
use overlay_service::settings::SettingsStore;
use overlay_service::storage::{FsStorage, StorageWriter};
use overlay_service::{AppState, Bridge, ServiceConfig};

const PASS_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("overlay_service=debug,capture=info")),
        )
        .with_target(true)
        .init();

    info!("Starting Snapfloat demo");

    let mut args = std::env::args().skip(1);
    let storage = Arc::new(match args.next() {
        Some(dir) => {
            let output = PathBuf::from(dir);
            FsStorage::new(output.join("gallery"), output.join("private"))
        }
        None => FsStorage::from_system_dirs().context("no home or local data directory")?,
    });
    let config = match args.next() {
        Some(path) => ServiceConfig::load(Path::new(&path))
            .with_context(|| format!("loading config from {}", path))?,
        None => ServiceConfig::default(),
    };

    let headless = HeadlessPlatform::new(HeadlessConfig::default());
    let platform = headless.platform_with_storage(storage.clone() as Arc<dyn StorageWriter>);

    let settings = Arc::new(match SettingsStore::default_path() {
        Some(path) => SettingsStore::open(path),
        None => SettingsStore::in_memory(Default::default()),
    });

    let state = Arc::new(AppState::new(tokio::runtime::Handle::current()));
    let bridge = Bridge::new(state.clone(), platform, config, settings.clone());
    let mut events = bridge.subscribe();

    // On-screen session: tap the control once, then stop
    bridge.start(settings.get().sound_enabled)?;
    bridge.handle_consent_result(CaptureGrant::approved());
    expect_event(&mut events, BridgeEvent::CaptureStarted).await?;

    let service = bridge.service().context("session did not start")?;
    let mut completions = service.subscribe_completions();
    let status = service.status().await.context("session ended early")?;
    info!("Session up: {:?}", status.widgets);

    let control = headless
        .layer()
        .attached(overlay::WidgetKind::PrimaryControl)
        .context("no capture control")?
        .center();
    let (x, y) = (control.x as f32, control.y as f32);
    service.touch(TouchEvent::Down { x, y });
    service.touch(TouchEvent::Up { x, y });

    let report = tokio::time::timeout(PASS_TIMEOUT, completions.recv()).await??;
    match report.result {
        Some(record) => info!("On-screen capture saved to {}", record.location()),
        None => bail!("on-screen capture produced no image"),
    }
    bridge.stop().await;
    expect_event(&mut events, BridgeEvent::CaptureStopped).await?;

    // Timer session: counts down, captures, then stops on its own
    bridge.start_timer(3, false)?;
    bridge.handle_consent_result(CaptureGrant::approved());
    expect_event(&mut events, BridgeEvent::CaptureStarted).await?;
    expect_event(&mut events, BridgeEvent::CaptureStopped).await?;

    let captures = storage.list_captures()?;
    info!("{} capture(s) in {}", captures.len(), storage.gallery_dir().display());
    for path in captures {
        info!("  {}", path.display());
    }

    state.shutdown().await;
    Ok(())
}

async fn expect_event(
    events: &mut broadcast::Receiver<BridgeEvent>,
    expected: BridgeEvent,
) -> anyhow::Result<()> {
    loop {
        let event = tokio::time::timeout(PASS_TIMEOUT, events.recv())
            .await
            .with_context(|| format!("waiting for {}", expected.name()))??;
        if event == expected {
            return Ok(());
        }
        if let BridgeEvent::CaptureError { error } = event {
            bail!("capture error: {}", error);
        }
    }
}
