//! Per-frame sub-image uploads
//!
//! Once per frame, every active layer whose compositor layer asks for a
//! redraw gets its pixels pushed into the frame's sub-image textures. Cube
//! layers upload six faces per view; flat layers upload one 2D image.

use super::binding::{CompositorBinding, Eye, XrFrame};
use super::session::SessionContext;
use super::XrSession;
use crate::gpu::{CubeFace, TextureUploader, UploadRegion, UploadTarget};
use crate::layers::{LayerDescriptor, LayerError, LayerKind, LayerRegistry, FACES_PER_CUBE};

/// What one call to `update_frame` did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Layers that needed a redraw and were drawn
    pub layers_drawn: usize,
    /// Individual texture uploads
    pub uploads: usize,
    /// Payload bytes handed to the uploader
    pub bytes: usize,
}

/// Pushes layer pixels into compositor sub-images
#[derive(Debug, Default)]
pub struct FrameUpdater {
    frames: u64,
    total_uploads: u64,
}

impl FrameUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames processed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn total_uploads(&self) -> u64 {
        self.total_uploads
    }

    /// Redraw every active layer the host flagged
    ///
    /// Uploads are synchronous; the first failure aborts the frame and is
    /// returned to the caller.
    pub fn update_frame<S: XrSession>(
        &mut self,
        registry: &LayerRegistry,
        ctx: &mut SessionContext<S>,
        uploader: &mut dyn TextureUploader,
        frame: &XrFrame,
    ) -> Result<FrameReport, LayerError> {
        self.frames += 1;
        let mut report = FrameReport::default();

        for descriptor in registry.active() {
            let Some(handle) = descriptor.handle() else {
                continue;
            };
            if !ctx.session().needs_redraw(handle) {
                continue;
            }

            match descriptor.kind() {
                LayerKind::Cube { .. } => {
                    draw_cube(descriptor, ctx.session_mut(), uploader, frame, &mut report)?
                }
                LayerKind::Equirect { texture, .. }
                | LayerKind::Quad { texture, .. }
                | LayerKind::QuadUi { bitmap: texture, .. } => {
                    let image = ctx.session_mut().sub_image(handle, frame, None)?;
                    let region = UploadRegion {
                        target: UploadTarget::Texture2d,
                        width: texture.width,
                        height: texture.height,
                        format: texture.format,
                        flip_y: true,
                    };
                    uploader.upload(&image, &region, &texture.data)?;
                    report.uploads += 1;
                    report.bytes += texture.data.len();
                }
            }

            report.layers_drawn += 1;
            tracing::trace!(
                layer_id = descriptor.id(),
                %handle,
                frame = frame.index,
                "Redrew layer"
            );
        }

        self.total_uploads += report.uploads as u64;
        if report.layers_drawn > 0 {
            tracing::debug!(
                frame = frame.index,
                layers = report.layers_drawn,
                uploads = report.uploads,
                bytes = report.bytes,
                "Uploaded layer content"
            );
        }
        Ok(report)
    }
}

/// Upload six faces into each view of a cube layer
fn draw_cube(
    descriptor: &LayerDescriptor,
    binding: &mut impl CompositorBinding,
    uploader: &mut dyn TextureUploader,
    frame: &XrFrame,
    report: &mut FrameReport,
) -> Result<(), LayerError> {
    let Some(handle) = descriptor.handle() else {
        return Ok(());
    };
    let views: &[Option<Eye>] = if descriptor.is_stereo() {
        &[Some(Eye::Left), Some(Eye::Right)]
    } else {
        &[None]
    };

    let faces = descriptor.faces();
    // Cube faces are square; the nominal width sizes both axes
    let size = descriptor.width();

    for (view, eye) in views.iter().enumerate() {
        let image = binding.sub_image(handle, frame, *eye)?;
        for face in CubeFace::ALL {
            let index = view * FACES_PER_CUBE + face.index() as usize;
            let data = faces.get(index).ok_or_else(|| LayerError::FaceCount {
                id: descriptor.id().to_string(),
                expected: views.len() * FACES_PER_CUBE,
                actual: faces.len(),
            })?;
            let region = UploadRegion {
                target: UploadTarget::CubeFace(face),
                width: size,
                height: size,
                format: descriptor.format(),
                flip_y: true,
            };
            uploader.upload(&image, &region, data)?;
            report.uploads += 1;
            report.bytes += data.len();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{RecordingUploader, UploadError};
    use crate::layers::{ColorFormat, Placement, TextureSource, UI_LAYER_ID};
    use crate::xr::{HeadlessSession, RenderStateCompositor};
    use bytes::Bytes;
    use std::time::Duration;

    fn frame(index: u64) -> XrFrame {
        XrFrame {
            index,
            predicted_display_time: Duration::from_millis(index * 11),
        }
    }

    fn context() -> SessionContext<HeadlessSession> {
        let session = HeadlessSession::new();
        let space = session.reference_space();
        SessionContext::new(session, space)
    }

    fn stereo_cube(id: &str) -> LayerDescriptor {
        let faces = (0..12u8).map(|i| Bytes::from(vec![i; 16])).collect();
        LayerDescriptor::cube(id, faces, 8, 8, true).unwrap()
    }

    #[test]
    fn test_stereo_cube_uploads_per_eye() {
        let mut registry = LayerRegistry::new();
        let compositor = RenderStateCompositor::new();
        let mut ctx = context();
        registry.register(stereo_cube("dream"));
        registry.activate("dream", &mut ctx, &compositor).unwrap();

        let mut updater = FrameUpdater::new();
        let mut uploader = RecordingUploader::default();
        let report = updater
            .update_frame(&registry, &mut ctx, &mut uploader, &frame(1))
            .unwrap();

        assert_eq!(report.layers_drawn, 1);
        assert_eq!(report.uploads, 12);
        let uploads = uploader.uploads();
        assert!(uploads[..6].iter().all(|u| u.eye == Some(Eye::Left)));
        assert!(uploads[6..].iter().all(|u| u.eye == Some(Eye::Right)));
        let order: Vec<_> = uploads.iter().map(|u| u.first_byte.unwrap()).collect();
        assert_eq!(order, (0..12u8).collect::<Vec<_>>());
        assert_eq!(uploads[6].target, UploadTarget::CubeFace(CubeFace::PositiveX));
        assert_ne!(uploads[0].texture, uploads[6].texture);
    }

    #[test]
    fn test_clean_layers_are_skipped() {
        let mut registry = LayerRegistry::new();
        let compositor = RenderStateCompositor::new();
        let mut ctx = context();
        registry.register(stereo_cube("dream"));
        let handle = registry.activate("dream", &mut ctx, &compositor).unwrap().handle;

        let mut updater = FrameUpdater::new();
        let mut uploader = RecordingUploader::default();
        updater.update_frame(&registry, &mut ctx, &mut uploader, &frame(1)).unwrap();
        let report = updater.update_frame(&registry, &mut ctx, &mut uploader, &frame(2)).unwrap();
        assert_eq!(report, FrameReport::default());

        ctx.session_mut().invalidate(handle);
        let report = updater.update_frame(&registry, &mut ctx, &mut uploader, &frame(3)).unwrap();
        assert_eq!(report.uploads, 12);
        assert_eq!(updater.frames(), 3);
        assert_eq!(updater.total_uploads(), 24);
    }

    #[test]
    fn test_ui_bitmap_upload() {
        let mut registry = LayerRegistry::new();
        let compositor = RenderStateCompositor::new();
        let mut ctx = context();
        registry.register(LayerDescriptor::quad_ui(
            TextureSource::blank(4, 8),
            Placement::default(),
            true,
        ));
        registry.activate(UI_LAYER_ID, &mut ctx, &compositor).unwrap();

        let mut uploader = RecordingUploader::default();
        let report = FrameUpdater::new()
            .update_frame(&registry, &mut ctx, &mut uploader, &frame(1))
            .unwrap();
        assert_eq!(report.uploads, 1);
        assert_eq!(report.bytes, 4 * 8 * 4);
        let upload = &uploader.uploads()[0];
        assert_eq!(upload.target, UploadTarget::Texture2d);
        assert_eq!(upload.format, ColorFormat::Rgba8);
        assert_eq!(upload.eye, None);
    }

    #[test]
    fn test_inactive_layers_are_not_drawn() {
        let mut registry = LayerRegistry::new();
        let compositor = RenderStateCompositor::new();
        let mut ctx = context();
        registry.register(stereo_cube("dream"));
        registry.register(stereo_cube("forest"));
        registry.activate("dream", &mut ctx, &compositor).unwrap();
        registry.activate("forest", &mut ctx, &compositor).unwrap();

        let mut uploader = RecordingUploader::default();
        let report = FrameUpdater::new()
            .update_frame(&registry, &mut ctx, &mut uploader, &frame(1))
            .unwrap();
        // "dream" was evicted and keeps its handle but is not composited
        assert_eq!(report.layers_drawn, 1);
    }

    #[test]
    fn test_upload_failure_surfaces() {
        let mut registry = LayerRegistry::new();
        let compositor = RenderStateCompositor::new();
        let mut ctx = context();
        registry.register(stereo_cube("dream"));
        registry.activate("dream", &mut ctx, &compositor).unwrap();

        let mut uploader = RecordingUploader::with_formats(&[ColorFormat::Rgba8]);
        let err = FrameUpdater::new()
            .update_frame(&registry, &mut ctx, &mut uploader, &frame(1))
            .unwrap_err();
        assert!(matches!(
            err,
            LayerError::Upload(UploadError::UnsupportedFormat(ColorFormat::Srgb8Alpha8Astc8x8))
        ));
    }
}
