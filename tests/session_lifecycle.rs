//! Full session scenarios against the in-memory host

use std::time::{Duration, Instant};

use bytes::Bytes;

use immersive_layers::assets::{LoadError, LoadEvent};
use immersive_layers::interaction::ProxyEvent;
use immersive_layers::layers::{LayerDescriptor, LayerError, TextureSource, UI_LAYER_ID};
use immersive_layers::settings::{AppSettings, EvictionPolicy};
use immersive_layers::xr::{HeadlessScene, HeadlessSession, LayerHandle, RenderStateHost, XrFrame};
use immersive_layers::{LayerEngine, RecordingUploader};

type Engine = LayerEngine<HeadlessSession, HeadlessScene, RecordingUploader>;

fn engine_with(settings: &AppSettings) -> Engine {
    LayerEngine::new(
        settings,
        RecordingUploader::default(),
        HeadlessScene::new(),
        TextureSource::blank(16, 16),
    )
}

fn engine() -> Engine {
    engine_with(&AppSettings::default())
}

fn stereo_cube(id: &str, fill: u8) -> LayerDescriptor {
    LayerDescriptor::cube(id, vec![Bytes::from(vec![fill; 64]); 12], 16, 16, true).unwrap()
}

fn start(engine: &mut Engine) -> LayerHandle {
    let session = HeadlessSession::new();
    let space = session.reference_space();
    let base = session.base_layer();
    engine.on_session_start(session, space);
    base
}

fn render_layers(engine: &Engine) -> Vec<LayerHandle> {
    engine.session().unwrap().session().render_layers().to_vec()
}

fn frame(index: u64) -> XrFrame {
    XrFrame {
        index,
        predicted_display_time: Duration::from_millis(11 * index),
    }
}

#[test]
fn test_environment_swaps_keep_ui_and_base() {
    let mut engine = engine();
    engine.register(stereo_cube("dream", 1));
    engine.register(stereo_cube("forest", 2));
    let base = start(&mut engine);

    let ui = engine.registry().ui_handle().unwrap();
    assert_eq!(render_layers(&engine), vec![ui, base]);

    let dream = engine.select_environment("dream").unwrap();
    assert!(dream.created);
    assert_eq!(dream.evicted, None);
    assert_eq!(render_layers(&engine), vec![dream.handle, ui, base]);

    let forest = engine.select_environment("forest").unwrap();
    assert_eq!(forest.evicted.as_deref(), Some("dream"));
    assert_eq!(render_layers(&engine), vec![forest.handle, ui, base]);

    // Retained layers come back without a second creation
    let again = engine.select_environment("dream").unwrap();
    assert!(!again.created);
    assert_eq!(again.handle, dream.handle);
    assert_eq!(render_layers(&engine), vec![dream.handle, ui, base]);

    let session = engine.session().unwrap().session();
    assert_eq!(session.created_count(), 3);
    assert!(session.destroyed().is_empty());
}

#[test]
fn test_reselecting_active_environment_is_stable() {
    let mut engine = engine();
    engine.register(stereo_cube("dream", 1));
    start(&mut engine);

    engine.select_environment("dream").unwrap();
    let before = render_layers(&engine);
    let updates = engine.session().unwrap().session().render_state_updates();

    let again = engine.select_environment("dream").unwrap();
    assert!(!again.created);
    assert_eq!(again.evicted, None);
    assert_eq!(render_layers(&engine), before);
    assert_eq!(engine.session().unwrap().session().render_state_updates(), updates);
}

#[test]
fn test_destroy_on_evict_releases_previous_layer() {
    let mut settings = AppSettings::default();
    settings.eviction_policy = EvictionPolicy::DestroyOnEvict;
    let mut engine = engine_with(&settings);
    engine.register(stereo_cube("dream", 1));
    engine.register(stereo_cube("forest", 2));
    start(&mut engine);

    let dream = engine.select_environment("dream").unwrap();
    engine.select_environment("forest").unwrap();

    let session = engine.session().unwrap().session();
    assert_eq!(session.destroyed(), &[dream.handle]);
    assert_eq!(session.live_layers(), 2);
    assert!(!engine.registry().get("dream").unwrap().is_active());
}

#[test]
fn test_session_restart_recreates_layers() {
    let mut engine = engine();
    engine.register(stereo_cube("dream", 1));
    start(&mut engine);
    engine.select_environment("dream").unwrap();

    let ended = engine.on_session_end().unwrap();
    assert_eq!(ended.live_layers(), 0);
    assert_eq!(ended.destroyed().len(), 2);
    assert!(engine.registry().get("dream").unwrap().handle().is_none());
    assert!(!engine.registry().contains(UI_LAYER_ID));

    let base = start(&mut engine);
    let ui = engine.registry().ui_handle().unwrap();
    assert_eq!(render_layers(&engine), vec![ui, base]);

    let dream = engine.select_environment("dream").unwrap();
    assert!(dream.created);
    assert_eq!(render_layers(&engine), vec![dream.handle, ui, base]);
}

#[test]
fn test_frames_upload_only_on_redraw() {
    let mut engine = engine();
    engine.register(stereo_cube("dream", 1));
    start(&mut engine);
    let dream = engine.select_environment("dream").unwrap();
    let now = Instant::now();

    let first = engine.on_frame(&frame(1), now).unwrap();
    assert_eq!(first.layers_drawn, 2);
    assert_eq!(first.uploads, 13);

    let idle = engine.on_frame(&frame(2), now).unwrap();
    assert_eq!(idle.uploads, 0);

    engine
        .session_mut()
        .unwrap()
        .session_mut()
        .invalidate(dream.handle);
    let redraw = engine.on_frame(&frame(3), now).unwrap();
    assert_eq!(redraw.layers_drawn, 1);
    assert_eq!(redraw.uploads, 12);
    assert_eq!(redraw.bytes, 12 * 64);

    assert_eq!(engine.updater().frames(), 3);
    assert_eq!(engine.uploader().uploads().len(), 25);
}

#[test]
fn test_no_session_means_no_frame_work() {
    let mut engine = engine();
    engine.register(stereo_cube("dream", 1));
    assert!(engine.on_frame(&frame(1), Instant::now()).is_none());
    assert!(engine.uploader().uploads().is_empty());
}

#[test]
fn test_late_loads_register_mid_session() {
    let mut engine = engine();
    let (sender, receiver) = crossbeam_channel::unbounded();
    engine.attach_loader(receiver);
    start(&mut engine);

    // Selecting before the load lands leaves the render state alone
    let before = render_layers(&engine);
    assert!(matches!(
        engine.select_environment("forest"),
        Err(LayerError::NotFound(_))
    ));
    assert_eq!(render_layers(&engine), before);

    sender.send(LoadEvent::Loaded(stereo_cube("forest", 3))).unwrap();
    sender
        .send(LoadEvent::Failed {
            id: "dream".to_string(),
            error: LoadError::Layer(LayerError::FaceCount {
                id: "dream".to_string(),
                expected: 12,
                actual: 11,
            }),
        })
        .unwrap();
    engine.on_frame(&frame(1), Instant::now());

    assert!(engine.registry().contains("forest"));
    assert!(!engine.registry().contains("dream"));
    assert!(engine.select_environment("forest").is_ok());
}

#[test]
fn test_duplicate_registration_keeps_first() {
    let mut engine = engine();
    assert!(engine.register(stereo_cube("dream", 1)));
    assert!(!engine.register(stereo_cube("dream", 9)));
    assert_eq!(engine.registry().get("dream").unwrap().faces()[0][0], 1);
}

#[test]
fn test_proxy_select_switches_environment() {
    let mut engine = engine();
    engine.register(stereo_cube("forest", 2));
    let base = start(&mut engine);
    let ui = engine.registry().ui_handle().unwrap();

    let node = engine.proxies().volume("forest").unwrap().node();
    let now = Instant::now();
    engine.handle_proxy_event(ProxyEvent::Hover(node), now);
    assert!(engine.scene().is_visible(node));

    engine.handle_proxy_event(ProxyEvent::Select(node), now);
    assert_eq!(engine.registry().active_environment(), Some("forest"));
    let forest = engine.registry().get("forest").unwrap().handle().unwrap();
    assert_eq!(render_layers(&engine), vec![forest, ui, base]);

    // Outline hides once the hover timeout passes without another hover
    let timeout = engine.proxies().volume("forest").unwrap().hover_timeout();
    engine.on_frame(&frame(1), now + timeout);
    assert!(!engine.scene().is_visible(node));
}

#[test]
fn test_proxy_select_unloaded_environment_is_ignored() {
    let mut engine = engine();
    start(&mut engine);
    let before = render_layers(&engine);

    let node = engine.proxies().volume("battlefield").unwrap().node();
    engine.handle_proxy_event(ProxyEvent::Select(node), Instant::now());

    assert_eq!(render_layers(&engine), before);
    assert_eq!(engine.registry().active_environment(), None);
}

#[test]
fn test_session_end_hides_proxies() {
    let mut engine = engine();
    start(&mut engine);
    let node = engine.proxies().volume("dream").unwrap().node();
    engine.handle_proxy_event(ProxyEvent::Hover(node), Instant::now());
    assert!(engine.scene().is_visible(node));

    engine.on_session_end();
    assert!(!engine.scene().is_visible(node));
    assert!(!engine.proxies().volume("dream").unwrap().is_hovered());
    assert!(engine.scene().is_visible(engine.ui_mesh()));
}
