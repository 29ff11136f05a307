//! Immersive Layers - Headless Driver
//!
//! Runs the full layer lifecycle without a headset: loads every configured
//! environment from the CDN, starts an in-memory session, walks the UI
//! buttons as they become available and ends the session.
//!
//! Usage: `immersive-layers [settings.json]`

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;

use immersive_layers::assets::{AssetFetcher, EnvironmentLoader};
use immersive_layers::gpu::{GpuContext, RecordingUploader, TextureUploader, WgpuUploader};
use immersive_layers::interaction::ProxyEvent;
use immersive_layers::layers::TextureSource;
use immersive_layers::settings::AppSettings;
use immersive_layers::telemetry::init_logging;
use immersive_layers::xr::{HeadlessScene, HeadlessSession, RenderStateHost, XrFrame};
use immersive_layers::LayerEngine;

/// Simulated display refresh
const FRAME_INTERVAL: Duration = Duration::from_millis(11);

/// Frames to keep rendering after the last selection
const SETTLE_FRAMES: u64 = 30;

/// Runs before logging exists, so failures are returned rather than logged
fn load_settings() -> anyhow::Result<AppSettings> {
    match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => AppSettings::load_from_file(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => match AppSettings::default_path() {
            Some(path) => AppSettings::load_or_default(&path)
                .with_context(|| format!("Failed to load settings from {}", path.display())),
            None => Ok(AppSettings::default()),
        },
    }
}

fn create_uploader() -> Box<dyn TextureUploader> {
    match pollster::block_on(GpuContext::new_headless()) {
        Ok(context) => Box::new(WgpuUploader::new(Arc::new(context)).with_auto_allocation()),
        Err(e) => {
            tracing::warn!("No GPU available ({}); uploads will only be validated", e);
            Box::new(RecordingUploader::default())
        }
    }
}

fn load_ui_bitmap(settings: &AppSettings) -> anyhow::Result<TextureSource> {
    match &settings.panel.bitmap {
        Some(path) => TextureSource::open(path),
        None => Ok(TextureSource::blank(
            settings.panel.canvas_width,
            settings.panel.canvas_height,
        )),
    }
}

fn main() -> anyhow::Result<()> {
    let settings = load_settings()?;
    let _log_guard = init_logging(&settings.log.to_config())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let mut engine: LayerEngine<HeadlessSession, _, _> = LayerEngine::new(
        &settings,
        create_uploader(),
        HeadlessScene::new(),
        load_ui_bitmap(&settings)?,
    );
    // The driver keeps going without the capability; the warning is the only report
    let _ = engine.check_capabilities();

    let fetcher = AssetFetcher::new(
        settings.cdn_base.clone(),
        Duration::from_secs(settings.fetch_timeout_secs),
    )?;
    let loader = EnvironmentLoader::new(fetcher, settings.face_paths.clone());
    engine.attach_loader(loader.receiver().clone());
    let loads = loader.spawn_all(&settings.environments, runtime.handle());

    let session = HeadlessSession::new();
    let space = session.reference_space();
    engine.on_session_start(session, space);

    let started = Instant::now();
    let deadline = started + Duration::from_secs(settings.fetch_timeout_secs + 5);
    let mut visited: HashSet<String> = HashSet::new();
    let mut settle = 0;
    let mut index = 0;

    while Instant::now() < deadline {
        index += 1;
        let now = Instant::now();
        let frame = XrFrame {
            index,
            predicted_display_time: now - started,
        };
        engine.on_frame(&frame, now);

        // Point at and click every button whose environment is ready
        let ready: Vec<_> = engine
            .proxies()
            .volumes()
            .iter()
            .filter(|v| !visited.contains(v.environment()))
            .filter(|v| engine.registry().contains(v.environment()))
            .map(|v| (v.environment().to_string(), v.node()))
            .collect();
        for (environment, node) in ready {
            engine.handle_proxy_event(ProxyEvent::Hover(node), now);
            engine.handle_proxy_event(ProxyEvent::Select(node), now);
            visited.insert(environment);
        }

        if loads.iter().all(|l| l.is_finished()) {
            settle += 1;
            if settle > SETTLE_FRAMES {
                break;
            }
        }
        std::thread::sleep(FRAME_INTERVAL);
    }

    let layers = engine
        .session()
        .map(|ctx| ctx.session().render_layers().len())
        .unwrap_or_default();
    tracing::info!(
        frames = engine.updater().frames(),
        uploads = engine.updater().total_uploads(),
        registered = engine.registry().len(),
        visited = visited.len(),
        render_layers = layers,
        "Simulated session finished"
    );

    if let Some(session) = engine.on_session_end() {
        tracing::info!(
            created = session.created_count(),
            destroyed = session.destroyed().len(),
            "Session closed"
        );
    }
    Ok(())
}
