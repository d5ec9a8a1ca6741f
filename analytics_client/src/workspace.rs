//! State of the analysis screen: loaded media, the zone editor, preview and result
//! handles, the current analysis run and the notice line.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};
use zone_common::editor::ZoneEditor;
use zone_common::geometry::Size;
use zone_common::notice::{Notice, NoticeBoard, NOTICE_LIFETIME};
use zone_common::summary::{AnalysisMetadata, MediaKind, Stats};
use zone_common::zone::{Zone, ZoneError, ZoneRegistry};

use crate::blob::{BlobStore, BlobUrl};
use crate::client::{AnalysisJob, AnalysisResponse};
use crate::config::ClientConfig;
use crate::error::{AnalysisError, MediaError};
use crate::media::MediaFile;

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPhase {
    Idle,
    Uploading { progress: u8 },
    Succeeded,
    Failed(String),
}

pub struct Workspace {
    media: Option<MediaFile>,
    media_bytes: Option<Arc<Vec<u8>>>,
    editor: ZoneEditor,
    blobs: BlobStore,
    preview: Option<BlobUrl>,
    result: Option<BlobUrl>,
    phase: AnalysisPhase,
    /// Run whose progress and outcome the workspace currently accepts.
    active_run: Option<u64>,
    next_run: u64,
    metadata: Option<AnalysisMetadata>,
    stats: Option<Stats>,
    notices: NoticeBoard,
    notice_lifetime: Duration,
    max_upload_bytes: u64,
}

impl Workspace {
    pub fn new(max_upload_bytes: u64) -> Self {
        Self {
            media: None,
            media_bytes: None,
            editor: ZoneEditor::new(),
            blobs: BlobStore::default(),
            preview: None,
            result: None,
            phase: AnalysisPhase::Idle,
            active_run: None,
            next_run: 1,
            metadata: None,
            stats: None,
            notices: NoticeBoard::default(),
            notice_lifetime: NOTICE_LIFETIME,
            max_upload_bytes,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mut workspace = Self::new(config.max_upload_bytes);
        workspace.notice_lifetime = config.notice_lifetime();
        workspace
    }

    fn notify(&mut self, notice: Notice) {
        self.notices
            .show(notice.with_lifetime(self.notice_lifetime));
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.notify(notice);
    }

    pub fn media(&self) -> Option<&MediaFile> {
        self.media.as_ref()
    }

    pub fn editor(&self) -> &ZoneEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut ZoneEditor {
        &mut self.editor
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn preview(&self) -> Option<&BlobUrl> {
        self.preview.as_ref()
    }

    pub fn result(&self) -> Option<&BlobUrl> {
        self.result.as_ref()
    }

    pub fn phase(&self) -> &AnalysisPhase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, AnalysisPhase::Uploading { .. })
    }

    pub fn progress(&self) -> u8 {
        match self.phase {
            AnalysisPhase::Uploading { progress } => progress,
            AnalysisPhase::Succeeded => 100,
            _ => 0,
        }
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn metadata(&self) -> Option<&AnalysisMetadata> {
        self.metadata.as_ref()
    }

    pub fn notice(&mut self, now: Instant) -> Option<&Notice> {
        self.notices.current(now)
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.dismiss();
    }

    /// Accepts a new file, replacing the previous one along with its zones and results.
    /// Refused while an upload is running.
    pub fn load_media(&mut self, path: &Path, frame_size: Option<Size>) -> Result<(), MediaError> {
        if self.is_busy() {
            let e = MediaError::Busy;
            self.notify(Notice::error(e.to_string()));
            return Err(e);
        }
        let loaded = MediaFile::open(path, self.max_upload_bytes).and_then(|media| {
            let bytes = media.read()?;
            Ok((media, bytes))
        });
        let (media, bytes) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                self.notify(Notice::error(e.to_string()));
                return Err(e);
            }
        };

        self.release_media();
        let native = media.probe_native_size(frame_size);
        if native.is_none() {
            info!("native size of {} unknown, zone drawing disabled", media.file_name);
        }
        self.editor.set_native_size(native);

        let bytes = Arc::new(bytes);
        self.preview = Some(self.blobs.create(Arc::clone(&bytes), media.mime));
        self.media_bytes = Some(bytes);
        self.notify(Notice::success(media.loaded_message()));
        debug!("loaded {} ({} bytes)", media.file_name, media.size);
        self.media = Some(media);
        Ok(())
    }

    /// Seeds the editor with zones from a saved layout.
    pub fn load_zones(&mut self, registry: ZoneRegistry) {
        let native = self.editor.canvas().native();
        let bounds = self.editor.canvas().bounds();
        self.editor = ZoneEditor::with_registry(registry);
        self.editor.set_native_size(native);
        self.editor.set_display_bounds(bounds);
    }

    fn release_media(&mut self) {
        self.blobs.revoke_slot(&mut self.preview);
        self.blobs.revoke_slot(&mut self.result);
        self.media = None;
        self.media_bytes = None;
        self.editor.clear();
        self.editor.set_native_size(None);
        self.phase = AnalysisPhase::Idle;
        self.active_run = None;
        self.metadata = None;
        self.stats = None;
    }

    /// Drops media, zones and results, revoking every handle.
    pub fn clear(&mut self) {
        self.release_media();
        self.notify(Notice::info("Workspace cleared"));
    }

    pub fn save_zone(&mut self) -> Result<Zone, ZoneError> {
        match self.editor.save_zone() {
            Ok(zone) => {
                self.notify(Notice::success(format!(
                    "Zone \"{}\" created successfully",
                    zone.name
                )));
                Ok(zone)
            }
            Err(e) => {
                self.notify(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }

    pub fn delete_zone(&mut self, index: usize) -> Result<Zone, ZoneError> {
        let zone = self.editor.delete_zone(index)?;
        self.notify(Notice::info("Zone deleted"));
        Ok(zone)
    }

    /// Validates the request and moves into the uploading phase. The previous result is
    /// hidden and its handle revoked.
    pub fn prepare_analysis(&mut self) -> Result<AnalysisJob, AnalysisError> {
        let job = self.build_job();
        match job {
            Ok(job) => {
                self.blobs.revoke_slot(&mut self.result);
                self.metadata = None;
                self.stats = None;
                self.phase = AnalysisPhase::Uploading { progress: 0 };
                self.active_run = Some(job.run_id);
                self.next_run += 1;
                Ok(job)
            }
            Err(e) => {
                if e != AnalysisError::Busy {
                    self.notify(Notice::error(e.to_string()));
                }
                Err(e)
            }
        }
    }

    fn build_job(&self) -> Result<AnalysisJob, AnalysisError> {
        if self.is_busy() {
            return Err(AnalysisError::Busy);
        }
        let (Some(media), Some(bytes)) = (&self.media, &self.media_bytes) else {
            return Err(AnalysisError::NoFile);
        };
        let registry = self.editor.registry();
        if media.kind == MediaKind::Video && registry.is_empty() {
            return Err(AnalysisError::NoZones);
        }
        let zones_json = registry
            .to_wire_json()
            .map_err(|e| AnalysisError::Encode(e.to_string()))?;

        Ok(AnalysisJob {
            run_id: self.next_run,
            file_name: media.file_name.clone(),
            mime: media.mime.to_string(),
            kind: media.kind,
            bytes: Arc::clone(bytes),
            zones_json,
        })
    }

    fn is_active(&self, run_id: u64) -> bool {
        self.is_busy() && self.active_run == Some(run_id)
    }

    pub fn set_progress(&mut self, run_id: u64, progress: u8) {
        if !self.is_active(run_id) {
            return;
        }
        if let AnalysisPhase::Uploading { progress: p } = &mut self.phase {
            *p = progress.min(100);
        }
    }

    /// Applies the outcome of run `run_id`. Outcomes of runs the workspace has moved past
    /// (cleared, or superseded by a later run) are dropped.
    pub fn complete_analysis(
        &mut self,
        run_id: u64,
        outcome: Result<AnalysisResponse, AnalysisError>,
    ) {
        if !self.is_active(run_id) {
            debug!("dropping stale outcome of analysis run {run_id}");
            return;
        }
        self.active_run = None;
        let Some(kind) = self.media.as_ref().map(|m| m.kind) else {
            self.phase = AnalysisPhase::Idle;
            return;
        };

        match outcome {
            Ok(response) => {
                let stats = Stats::derive(&response.metadata, kind);
                let message = if response.metadata.zone_summary.is_empty() {
                    "Analysis complete!"
                } else {
                    "Zone summary received from server"
                };
                self.result = Some(self.blobs.create(response.body, response.content_type));
                self.metadata = Some(response.metadata);
                self.stats = Some(stats);
                self.phase = AnalysisPhase::Succeeded;
                self.notify(Notice::success(message));
            }
            Err(e) => {
                let message = e.to_string();
                self.notify(Notice::error(format!("Error: {message}")));
                self.phase = AnalysisPhase::Failed(message);
            }
        }
    }

    /// Writes the annotated result to `path`.
    pub fn save_result(&self, path: &Path) -> Result<()> {
        let blob = self
            .result
            .as_ref()
            .and_then(|url| self.blobs.get(url))
            .context("No analysis result to save")?;
        std::fs::write(path, blob.bytes.as_slice())
            .with_context(|| format!("Failed to write result to {}", path.display()))?;
        info!("saved analysis result to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zone_common::geometry::{Point, ScreenRect};
    use zone_common::summary::DETECTION_SUMMARY_HEADER;

    fn draw_zone(ws: &mut Workspace, name: &str) {
        let editor = ws.editor_mut();
        editor.set_display_bounds(ScreenRect::new(0.0, 0.0, 64.0, 48.0));
        editor.set_drawing_mode(true);
        assert!(editor.pointer_down(Point::new(2.0, 2.0)));
        editor.pointer_move(Point::new(40.0, 30.0));
        editor.pointer_up();
        editor.form_mut().name = name.to_string();
        ws.save_zone().unwrap();
    }

    fn response(summary: &str) -> AnalysisResponse {
        let summary = summary.to_string();
        AnalysisResponse {
            body: vec![9, 9, 9],
            content_type: "image/png".into(),
            metadata: AnalysisMetadata::from_headers(|name| {
                (name == DETECTION_SUMMARY_HEADER).then_some(summary.as_str())
            }),
        }
    }

    #[test]
    fn test_analyze_requires_file() {
        let mut ws = Workspace::new(1024 * 1024);
        assert_eq!(ws.prepare_analysis().unwrap_err(), AnalysisError::NoFile);
        let now = Instant::now();
        assert_eq!(
            ws.notice(now).map(|n| n.message.clone()).as_deref(),
            Some("Please upload a file first")
        );
    }

    #[test]
    fn test_video_requires_zones() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("hall.mp4");
        std::fs::write(&clip, vec![0u8; 128]).unwrap();

        let mut ws = Workspace::new(1024 * 1024);
        ws.load_media(&clip, Some(Size::new(64, 48))).unwrap();
        assert_eq!(ws.prepare_analysis().unwrap_err(), AnalysisError::NoZones);

        draw_zone(&mut ws, "Entrance");
        let job = ws.prepare_analysis().unwrap();
        assert!(job.zones_json.contains("\"Entrance\""));
        assert!(ws.is_busy());
        assert_eq!(ws.prepare_analysis().unwrap_err(), AnalysisError::Busy);
    }

    #[test]
    fn test_full_cycle_and_clear_revokes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        image::RgbImage::new(64, 48).save(&path).unwrap();

        let mut ws = Workspace::new(1024 * 1024);
        ws.load_media(&path, None).unwrap();
        assert_eq!(ws.editor().canvas().native(), Some(Size::new(64, 48)));
        assert_eq!(ws.blobs().live(), 1);

        let job = ws.prepare_analysis().unwrap();
        assert_eq!(job.kind, MediaKind::Image);
        ws.set_progress(job.run_id, 40);
        assert_eq!(ws.progress(), 40);
        ws.complete_analysis(job.run_id, Ok(response(
            r#"[{"object":"person","count":2,"avg_confidence":90},{"object":"dog","count":1,"avg_confidence":60}]"#,
        )));
        assert_eq!(ws.phase(), &AnalysisPhase::Succeeded);
        assert_eq!(ws.progress(), 100);
        assert_eq!(ws.stats().unwrap().total_detected, 3);
        assert_eq!(ws.blobs().live(), 2);

        let out = dir.path().join("result.png");
        ws.save_result(&out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), vec![9, 9, 9]);

        // a new run drops the old result
        let rerun = ws.prepare_analysis().unwrap();
        assert_ne!(rerun.run_id, job.run_id);
        assert!(ws.result().is_none());
        assert_eq!(ws.blobs().live(), 1);
        ws.complete_analysis(rerun.run_id, Err(AnalysisError::Network));
        assert_eq!(
            ws.phase(),
            &AnalysisPhase::Failed("Network error during upload".into())
        );

        ws.clear();
        assert_eq!(ws.blobs().live(), 0);
        assert!(ws.preview().is_none());
        assert!(ws.editor().registry().is_empty());
        assert!(ws.media().is_none());
    }

    #[test]
    fn test_reload_refused_while_uploading() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.mp4");
        let second = dir.path().join("b.mp4");
        std::fs::write(&first, vec![0u8; 128]).unwrap();
        std::fs::write(&second, vec![1u8; 64]).unwrap();

        let mut ws = Workspace::new(1024 * 1024);
        ws.load_media(&first, Some(Size::new(64, 48))).unwrap();
        draw_zone(&mut ws, "Gate");
        let job = ws.prepare_analysis().unwrap();

        assert!(matches!(
            ws.load_media(&second, Some(Size::new(64, 48))),
            Err(MediaError::Busy)
        ));
        assert_eq!(ws.media().map(|m| m.file_name.as_str()), Some("a.mp4"));
        assert_eq!(ws.editor().registry().len(), 1);
        assert!(ws.is_busy());

        ws.complete_analysis(job.run_id, Ok(response("[]")));
        assert_eq!(ws.phase(), &AnalysisPhase::Succeeded);
        ws.load_media(&second, Some(Size::new(64, 48))).unwrap();
        assert!(ws.editor().registry().is_empty());
        assert!(ws.result().is_none());
    }

    #[test]
    fn test_outcome_of_cleared_run_not_applied_to_next_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.mp4");
        let second = dir.path().join("b.mp4");
        std::fs::write(&first, vec![0u8; 128]).unwrap();
        std::fs::write(&second, vec![1u8; 64]).unwrap();

        let mut ws = Workspace::new(1024 * 1024);
        ws.load_media(&first, Some(Size::new(64, 48))).unwrap();
        draw_zone(&mut ws, "Gate");
        let stale = ws.prepare_analysis().unwrap();

        ws.clear();
        ws.load_media(&second, Some(Size::new(64, 48))).unwrap();
        draw_zone(&mut ws, "Exit");
        let current = ws.prepare_analysis().unwrap();
        assert_ne!(stale.run_id, current.run_id);

        ws.set_progress(stale.run_id, 90);
        assert_eq!(ws.progress(), 0);
        ws.complete_analysis(stale.run_id, Ok(response("[]")));
        assert!(ws.is_busy());
        assert!(ws.result().is_none());

        ws.set_progress(current.run_id, 30);
        assert_eq!(ws.progress(), 30);
        ws.complete_analysis(current.run_id, Err(AnalysisError::Network));
        assert_eq!(
            ws.phase(),
            &AnalysisPhase::Failed("Network error during upload".into())
        );
        assert_eq!(ws.media().map(|m| m.file_name.as_str()), Some("b.mp4"));
    }

    #[test]
    fn test_preview_shares_media_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("hall.mp4");
        std::fs::write(&clip, vec![7u8; 256]).unwrap();

        let mut ws = Workspace::new(1024 * 1024);
        ws.load_media(&clip, Some(Size::new(64, 48))).unwrap();
        draw_zone(&mut ws, "Gate");
        let job = ws.prepare_analysis().unwrap();
        let preview = ws.preview().and_then(|url| ws.blobs().get(url)).unwrap();
        assert!(Arc::ptr_eq(&preview.bytes, &job.bytes));
    }

    #[test]
    fn test_rejected_file_keeps_previous_media() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        image::RgbImage::new(8, 8).save(&path).unwrap();
        let doc = dir.path().join("notes.txt");
        std::fs::write(&doc, b"x").unwrap();

        let mut ws = Workspace::new(1024 * 1024);
        ws.load_media(&path, None).unwrap();
        assert!(ws.load_media(&doc, None).is_err());
        assert_eq!(ws.media().map(|m| m.file_name.as_str()), Some("frame.png"));
    }
}
