//! Background environment loading
//!
//! Every environment is fetched by its own task on the tokio runtime. A task
//! builds the layer descriptor only after all of its files resolved, then
//! sends the outcome over a channel. The frame loop drains that channel
//! without ever waiting on the network.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use thiserror::Error;
use tokio::task::JoinHandle;

use super::astc::{strip_header, AstcError};
use super::fetcher::{AssetFetcher, FetchError};
use super::source::{EnvironmentSource, FacePaths, SourceKind};
use crate::layers::{LayerDescriptor, LayerError, TextureSource, CUBE_FACE_FORMAT};

/// Why an environment failed to load
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// Outcome of one environment load
#[derive(Debug)]
pub enum LoadEvent {
    /// All files arrived and the descriptor is ready to register
    Loaded(LayerDescriptor),
    /// The environment will not be available
    Failed { id: String, error: LoadError },
}

impl LoadEvent {
    pub fn id(&self) -> &str {
        match self {
            LoadEvent::Loaded(descriptor) => descriptor.id(),
            LoadEvent::Failed { id, .. } => id,
        }
    }
}

/// Build the layer descriptor for a fully fetched environment
pub fn build_descriptor(
    source: &EnvironmentSource,
    files: Vec<bytes::Bytes>,
) -> Result<LayerDescriptor, LayerError> {
    let id = source.id.clone();
    let expected = source.kind.expected_files();
    if files.len() != expected {
        return Err(LayerError::FaceCount {
            id,
            expected,
            actual: files.len(),
        });
    }

    let astc_error = |err: AstcError| LayerError::Astc {
        id: source.id.clone(),
        source: err,
    };

    if source.kind.is_cube() {
        let faces = files
            .into_iter()
            .map(|face| strip_header(face, CUBE_FACE_FORMAT, source.width, source.height))
            .collect::<Result<Vec<_>, _>>()
            .map_err(astc_error)?;
        return LayerDescriptor::cube(id, faces, source.width, source.height, source.kind.is_stereo());
    }

    let Some(file) = files.into_iter().next() else {
        return Err(LayerError::FaceCount {
            id,
            expected,
            actual: 0,
        });
    };
    let data = strip_header(file, source.format, source.width, source.height).map_err(astc_error)?;
    let texture = TextureSource::new(source.width, source.height, source.format, data);
    if !texture.is_complete() {
        return Err(LayerError::PayloadSize {
            id,
            index: 0,
            expected: source.format.expected_size(source.width, source.height),
            actual: texture.data.len(),
        });
    }

    Ok(match source.kind {
        SourceKind::Quad => LayerDescriptor::quad(id, texture, source.placement),
        kind => LayerDescriptor::equirect(id, texture, kind.is_stereo(), source.radius),
    })
}

/// Spawns environment loads and collects their outcomes
pub struct EnvironmentLoader {
    fetcher: AssetFetcher,
    faces: FacePaths,
    sender: Sender<LoadEvent>,
    receiver: Receiver<LoadEvent>,
}

impl EnvironmentLoader {
    pub fn new(fetcher: AssetFetcher, faces: FacePaths) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            fetcher,
            faces,
            sender,
            receiver,
        }
    }

    /// Fetch one environment and build its descriptor
    pub async fn load(&self, source: &EnvironmentSource) -> Result<LayerDescriptor, LoadError> {
        load_source(&self.fetcher, &self.faces, source).await
    }

    /// Start one independent load per source
    ///
    /// Loads cannot be cancelled; a load that finishes after the session
    /// ended still delivers its event.
    pub fn spawn_all(
        &self,
        sources: &[EnvironmentSource],
        runtime: &tokio::runtime::Handle,
    ) -> Vec<JoinHandle<()>> {
        tracing::info!(environments = sources.len(), base = self.fetcher.base(), "Loading environments");
        sources
            .iter()
            .cloned()
            .map(|source| {
                let fetcher = self.fetcher.clone();
                let faces = self.faces.clone();
                let sender = self.sender.clone();
                runtime.spawn(async move {
                    let event = match load_source(&fetcher, &faces, &source).await {
                        Ok(descriptor) => LoadEvent::Loaded(descriptor),
                        Err(error) => LoadEvent::Failed {
                            id: source.id.clone(),
                            error,
                        },
                    };
                    if sender.send(event).is_err() {
                        tracing::debug!(environment = %source.id, "Loader dropped before load finished");
                    }
                })
            })
            .collect()
    }

    pub fn receiver(&self) -> &Receiver<LoadEvent> {
        &self.receiver
    }

    /// Take every event that has arrived so far without blocking
    pub fn drain(&self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}

async fn load_source(
    fetcher: &AssetFetcher,
    faces: &FacePaths,
    source: &EnvironmentSource,
) -> Result<LayerDescriptor, LoadError> {
    let paths = source.file_paths(faces);
    let files = fetcher.fetch_environment(source, &paths).await?;
    let descriptor = build_descriptor(source, files)?;
    tracing::info!(
        environment = %source.id,
        kind = descriptor.kind().name(),
        stereo = descriptor.is_stereo(),
        faces = descriptor.faces().len(),
        "Environment loaded"
    );
    Ok(descriptor)
}
