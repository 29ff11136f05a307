//! Environment fetching against a local HTTP server

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;

use immersive_layers::assets::{
    AssetFetcher, EnvironmentLoader, EnvironmentSource, FacePaths, FetchError, LoadError, LoadEvent, SourceKind,
    ASTC_MAGIC,
};
use immersive_layers::layers::LayerRegistry;
use immersive_layers::xr::{HeadlessSession, RenderStateCompositor, RenderStateHost, SessionContext};

type Files = Arc<HashMap<String, Vec<u8>>>;

/// Face edge in pixels; one 8x8 ASTC face is 2x2 blocks of 16 bytes
const FACE: u32 = 16;
const FACE_BYTES: usize = 64;

async fn serve_file(State(files): State<Files>, Path(path): Path<String>) -> Result<Vec<u8>, StatusCode> {
    files.get(&path).cloned().ok_or(StatusCode::NOT_FOUND)
}

/// Serve `files` on an ephemeral port and return the base URL
async fn serve(files: HashMap<String, Vec<u8>>) -> String {
    let app = Router::new()
        .route("/*path", get(serve_file))
        .with_state(Arc::new(files));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Add one face file per path, each filled with its index
fn add_faces(files: &mut HashMap<String, Vec<u8>>, folder: &str, paths: &[String]) {
    for (i, path) in paths.iter().enumerate() {
        files.insert(format!("{}/{}", folder, path), vec![i as u8; FACE_BYTES]);
    }
}

fn source(id: &str, kind: SourceKind) -> EnvironmentSource {
    EnvironmentSource {
        kind,
        ..EnvironmentSource::stereo_cube(id, id, FACE)
    }
}

fn fetcher(base: String) -> AssetFetcher {
    AssetFetcher::new(base, Duration::from_secs(5)).unwrap()
}

async fn run_loads(loader: &EnvironmentLoader, sources: &[EnvironmentSource]) -> Vec<LoadEvent> {
    let handles = loader.spawn_all(sources, &tokio::runtime::Handle::current());
    for handle in handles {
        handle.await.unwrap();
    }
    loader.drain()
}

#[tokio::test]
async fn test_fetch_preserves_face_order() {
    let faces = FacePaths::default();
    let mut files = HashMap::new();
    add_faces(&mut files, "dream", &faces.stereo);
    let base = serve(files).await;

    let dream = source("dream", SourceKind::StereoCubeMap);
    let buffers = fetcher(base)
        .fetch_environment(&dream, &dream.file_paths(&faces))
        .await
        .unwrap();

    assert_eq!(buffers.len(), 12);
    for (i, buffer) in buffers.iter().enumerate() {
        assert_eq!(buffer.len(), FACE_BYTES);
        assert_eq!(buffer[0], i as u8);
    }
}

#[tokio::test]
async fn test_mono_forest_loads_and_activates() {
    let faces = FacePaths::default();
    let mut files = HashMap::new();
    add_faces(&mut files, "forest", &faces.mono);
    let base = serve(files).await;

    let loader = EnvironmentLoader::new(fetcher(base), faces);
    let events = run_loads(&loader, &[source("forest", SourceKind::CubeMap)]).await;
    assert_eq!(events.len(), 1);

    let descriptor = match events.into_iter().next().unwrap() {
        LoadEvent::Loaded(descriptor) => descriptor,
        LoadEvent::Failed { error, .. } => panic!("forest failed: {}", error),
    };
    assert_eq!(descriptor.id(), "forest");
    assert!(!descriptor.is_stereo());
    assert_eq!(descriptor.faces().len(), 6);

    let mut registry = LayerRegistry::new();
    registry.register(descriptor);
    let session = HeadlessSession::new();
    let space = session.reference_space();
    let mut ctx = SessionContext::new(session, space);
    let base_layer = ctx.session().base_layer();

    let activation = registry
        .activate("forest", &mut ctx, &RenderStateCompositor::new())
        .unwrap();
    assert_eq!(ctx.session().render_layers(), &[activation.handle, base_layer]);
}

#[tokio::test]
async fn test_missing_face_fails_whole_environment() {
    let faces = FacePaths::default();
    let mut files = HashMap::new();
    add_faces(&mut files, "dream", &faces.stereo);
    add_faces(&mut files, "forest", &faces.stereo);
    files.remove("dream/right/ny.astc");
    let base = serve(files).await;

    let loader = EnvironmentLoader::new(fetcher(base), faces);
    let sources = [
        source("dream", SourceKind::StereoCubeMap),
        source("forest", SourceKind::StereoCubeMap),
    ];
    let events = run_loads(&loader, &sources).await;
    assert_eq!(events.len(), 2);

    let mut registry = LayerRegistry::new();
    for event in events {
        match event {
            LoadEvent::Loaded(descriptor) => {
                registry.register(descriptor);
            }
            LoadEvent::Failed { id, error } => {
                assert_eq!(id, "dream");
                match error {
                    LoadError::Fetch(FetchError::Status { url, status }) => {
                        assert_eq!(status, 404);
                        assert!(url.ends_with("/dream/right/ny.astc"));
                    }
                    other => panic!("unexpected error {}", other),
                }
            }
        }
    }

    assert!(!registry.contains("dream"));
    assert_eq!(registry.get("forest").unwrap().faces().len(), 12);
}

#[tokio::test]
async fn test_astc_headers_are_stripped() {
    let faces = FacePaths::default();
    let mut files = HashMap::new();
    for path in &faces.mono {
        let mut face = ASTC_MAGIC.to_le_bytes().to_vec();
        face.extend_from_slice(&[8, 8, 1, FACE as u8, 0, 0, FACE as u8, 0, 0, 1, 0, 0]);
        face.extend_from_slice(&[9u8; FACE_BYTES]);
        files.insert(format!("forest/{}", path), face);
    }
    let base = serve(files).await;

    let loader = EnvironmentLoader::new(fetcher(base), faces);
    let descriptor = loader
        .load(&source("forest", SourceKind::CubeMap))
        .await
        .unwrap();
    assert!(descriptor
        .faces()
        .iter()
        .all(|f| *f == Bytes::from(vec![9u8; FACE_BYTES])));
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    // Bind and drop a listener to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let forest = source("forest", SourceKind::CubeMap);
    let err = fetcher(format!("http://{}", addr))
        .fetch_environment(&forest, &forest.file_paths(&FacePaths::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
    assert!(err.url().is_some());
}
