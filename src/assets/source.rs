//! Environment sources
//!
//! Where an environment's compressed payloads live and how they are laid out.

use serde::{Deserialize, Serialize};

use crate::layers::{ColorFormat, Placement, FACES_PER_CUBE};

/// Layout of an environment's payload files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    /// Twelve faces, left eye then right eye
    #[default]
    StereoCubeMap,
    /// Six faces shared by both eyes
    CubeMap,
    /// One equirectangular texture
    Equirect,
    /// One equirectangular texture, left eye on top
    StereoEquirect,
    /// One flat texture shown on a quad
    Quad,
}

impl SourceKind {
    pub fn is_stereo(&self) -> bool {
        matches!(self, SourceKind::StereoCubeMap | SourceKind::StereoEquirect)
    }

    pub fn is_cube(&self) -> bool {
        matches!(self, SourceKind::StereoCubeMap | SourceKind::CubeMap)
    }

    /// Number of payload files a complete load yields
    pub fn expected_files(&self) -> usize {
        match self {
            SourceKind::StereoCubeMap => FACES_PER_CUBE * 2,
            SourceKind::CubeMap => FACES_PER_CUBE,
            SourceKind::Equirect | SourceKind::StereoEquirect | SourceKind::Quad => 1,
        }
    }
}

/// Relative face paths shared by all cube-map sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacePaths {
    /// Twelve paths: left eye faces in +X, -X, +Y, -Y, +Z, -Z order, then right
    pub stereo: Vec<String>,
    /// Six paths in +X, -X, +Y, -Y, +Z, -Z order
    pub mono: Vec<String>,
}

const FACE_FILES: [&str; FACES_PER_CUBE] = ["px", "nx", "py", "ny", "pz", "nz"];

impl Default for FacePaths {
    fn default() -> Self {
        let eye = |dir: &'static str| FACE_FILES.iter().map(move |f| format!("{}/{}.astc", dir, f));
        Self {
            stereo: eye("left").chain(eye("right")).collect(),
            mono: FACE_FILES.iter().map(|f| format!("{}.astc", f)).collect(),
        }
    }
}

fn default_radius() -> f32 {
    50.0
}

/// One selectable environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSource {
    /// Registry id, unique across sources
    pub id: String,
    /// Folder under the CDN base
    pub folder: String,
    #[serde(default)]
    pub kind: SourceKind,
    /// Pixel width of one face or of the whole texture
    pub width: u32,
    /// Pixel height of one face or of the whole texture
    pub height: u32,
    /// Payload format; cube maps always use ASTC 8x8
    #[serde(default)]
    pub format: ColorFormat,
    /// Explicit payload paths overriding the shared face lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    /// Sphere radius of equirect layers in meters
    #[serde(default = "default_radius")]
    pub radius: f32,
    /// Placement of quad layers
    #[serde(default)]
    pub placement: Placement,
}

impl EnvironmentSource {
    /// A stereo ASTC cube map with square faces
    pub fn stereo_cube(id: impl Into<String>, folder: impl Into<String>, size: u32) -> Self {
        Self {
            id: id.into(),
            folder: folder.into(),
            kind: SourceKind::StereoCubeMap,
            width: size,
            height: size,
            format: ColorFormat::Srgb8Alpha8Astc8x8,
            files: None,
            radius: default_radius(),
            placement: Placement::default(),
        }
    }

    /// Relative paths to fetch, in payload order
    pub fn file_paths(&self, faces: &FacePaths) -> Vec<String> {
        if let Some(files) = &self.files {
            return files.clone();
        }
        match self.kind {
            SourceKind::StereoCubeMap => faces.stereo.clone(),
            SourceKind::CubeMap => faces.mono.clone(),
            SourceKind::Equirect | SourceKind::StereoEquirect | SourceKind::Quad => {
                vec![format!("{}.astc", self.id)]
            }
        }
    }

    /// Absolute URL of one payload file: `<base>/<folder>/<path>`
    pub fn url(&self, base: &str, path: &str) -> String {
        let base = base.trim_end_matches('/');
        let folder = self.folder.trim_matches('/');
        let path = path.trim_start_matches('/');
        if folder.is_empty() {
            format!("{}/{}", base, path)
        } else {
            format!("{}/{}/{}", base, folder, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_face_paths() {
        let faces = FacePaths::default();
        assert_eq!(faces.stereo.len(), 12);
        assert_eq!(faces.stereo[0], "left/px.astc");
        assert_eq!(faces.stereo[5], "left/nz.astc");
        assert_eq!(faces.stereo[6], "right/px.astc");
        assert_eq!(faces.stereo[11], "right/nz.astc");
        assert_eq!(faces.mono, vec!["px.astc", "nx.astc", "py.astc", "ny.astc", "pz.astc", "nz.astc"]);
    }

    #[test]
    fn test_file_paths_by_kind() {
        let faces = FacePaths::default();
        let mut source = EnvironmentSource::stereo_cube("battlefield", "battle", 2048);
        assert_eq!(source.file_paths(&faces).len(), source.kind.expected_files());

        source.kind = SourceKind::CubeMap;
        assert_eq!(source.file_paths(&faces).len(), 6);

        source.kind = SourceKind::Equirect;
        assert_eq!(source.file_paths(&faces), vec!["battlefield.astc"]);

        source.files = Some(vec!["sky.astc".into()]);
        assert_eq!(source.file_paths(&faces), vec!["sky.astc"]);
    }

    #[test]
    fn test_url_joins_segments() {
        let source = EnvironmentSource::stereo_cube("battlefield", "battle", 2048);
        assert_eq!(
            source.url("https://cdn.example/textures/", "left/px.astc"),
            "https://cdn.example/textures/battle/left/px.astc"
        );
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&SourceKind::StereoCubeMap).unwrap();
        assert_eq!(json, "\"stereoCubeMap\"");
        let kind: SourceKind = serde_json::from_str("\"stereoEquirect\"").unwrap();
        assert!(kind.is_stereo());
        assert!(!kind.is_cube());
    }

    #[test]
    fn test_source_defaults_from_json() {
        let source: EnvironmentSource =
            serde_json::from_str(r#"{"id":"forest","folder":"forest","width":1536,"height":1536}"#).unwrap();
        assert_eq!(source.kind, SourceKind::StereoCubeMap);
        assert_eq!(source.format, ColorFormat::Srgb8Alpha8Astc8x8);
        assert_eq!(source.radius, 50.0);
        assert!(source.files.is_none());
    }
}
