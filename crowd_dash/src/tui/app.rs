use std::path::{Path, PathBuf};

use analytics_client::{
    AnalysisError, AnalysisJob, AnalysisResponse, SessionContext, SessionStore, Workspace,
};
use crossterm::event::{KeyCode, MouseButton, MouseEventKind};
use ratatui::layout::Rect as CellRect;
use zone_common::editor::DragOutcome;
use zone_common::geometry::{Point, ScreenRect, Size};
use zone_common::zone::ZoneRegistry;

/// Upload events, tagged with the run that produced them.
#[derive(Debug)]
pub enum TuiMessage {
    Progress(u64, u8),
    Finished(u64, Result<AnalysisResponse, AnalysisError>),
}

/// Field of the zone form that receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Color,
    Thickness,
    Description,
    Threshold,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Name,
        FormField::Color,
        FormField::Thickness,
        FormField::Description,
        FormField::Threshold,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::Color => "Color",
            FormField::Thickness => "Thickness",
            FormField::Description => "Description",
            FormField::Threshold => "Alert threshold",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    OpenMedia,
    SaveResult,
}

impl PromptKind {
    pub fn title(self) -> &'static str {
        match self {
            PromptKind::OpenMedia => "Open image or video",
            PromptKind::SaveResult => "Save annotated result to",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Form(FormField),
    Prompt { kind: PromptKind, input: String },
}

pub struct App {
    pub workspace: Workspace,
    pub session: SessionContext,
    pub mode: Mode,
    pub selected_zone: usize,
    sessions: SessionStore,
    zones_file: PathBuf,
    frame_size: Option<Size>,
    should_quit: bool,
}

impl App {
    pub fn new(
        workspace: Workspace,
        session: SessionContext,
        sessions: SessionStore,
        zones_file: PathBuf,
        frame_size: Option<Size>,
    ) -> Self {
        Self {
            workspace,
            session,
            mode: Mode::Normal,
            selected_zone: 0,
            sessions,
            zones_file,
            frame_size,
            should_quit: false,
        }
    }

    pub fn update(&mut self, msg: TuiMessage) {
        match msg {
            TuiMessage::Progress(run, pct) => self.workspace.set_progress(run, pct),
            TuiMessage::Finished(run, outcome) => self.workspace.complete_analysis(run, outcome),
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Tells the editor where the canvas currently sits, in terminal cells.
    pub fn set_canvas_area(&mut self, area: CellRect) {
        self.workspace.editor_mut().set_display_bounds(ScreenRect::new(
            area.x as f64,
            area.y as f64,
            area.width as f64,
            area.height as f64,
        ));
    }

    pub fn open_media(&mut self, path: &str) {
        let path = PathBuf::from(path.trim());
        if self.workspace.load_media(&path, self.frame_size).is_ok() {
            self.selected_zone = 0;
        }
    }

    pub fn handle_mouse(&mut self, kind: MouseEventKind, column: u16, row: u16) {
        // Cell centers, so a click maps to the middle of the cell.
        let pointer = Point::new(column as f64 + 0.5, row as f64 + 0.5);
        let editor = self.workspace.editor_mut();
        match kind {
            MouseEventKind::Down(MouseButton::Left) => {
                editor.pointer_down(pointer);
            }
            MouseEventKind::Drag(MouseButton::Left) => editor.pointer_move(pointer),
            MouseEventKind::Up(MouseButton::Left) => {
                editor.pointer_move(pointer);
                if let DragOutcome::Configure(_) = editor.pointer_up() {
                    self.mode = Mode::Form(FormField::Name);
                }
            }
            _ => {}
        }
    }

    /// Handles a key press. Returns the upload the event loop should start, if any.
    pub fn handle_key(&mut self, code: KeyCode) -> Option<AnalysisJob> {
        match self.mode.clone() {
            Mode::Normal => self.handle_normal_key(code),
            Mode::Form(field) => {
                self.handle_form_key(field, code);
                None
            }
            Mode::Prompt { kind, input } => {
                self.handle_prompt_key(kind, input, code);
                None
            }
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode) -> Option<AnalysisJob> {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.quit(),
            KeyCode::Char('d') => {
                self.workspace.editor_mut().toggle_drawing_mode();
            }
            KeyCode::Char('o') => {
                if !self.workspace.is_busy() {
                    self.mode = Mode::Prompt {
                        kind: PromptKind::OpenMedia,
                        input: String::new(),
                    }
                }
            }
            KeyCode::Char('w') => {
                self.mode = Mode::Prompt {
                    kind: PromptKind::SaveResult,
                    input: String::new(),
                }
            }
            KeyCode::Char('a') => {
                return self.workspace.prepare_analysis().ok();
            }
            KeyCode::Char('c') => {
                if !self.workspace.is_busy() {
                    self.workspace.clear();
                    self.selected_zone = 0;
                }
            }
            KeyCode::Char('s') => self.save_layout(),
            KeyCode::Char('l') => self.load_layout(),
            KeyCode::Char('L') => self.logout(),
            KeyCode::Up => self.selected_zone = self.selected_zone.saturating_sub(1),
            KeyCode::Down => {
                let last = self.workspace.editor().registry().len().saturating_sub(1);
                self.selected_zone = (self.selected_zone + 1).min(last);
            }
            KeyCode::Delete | KeyCode::Char('x') => {
                if self.workspace.delete_zone(self.selected_zone).is_ok() {
                    let last = self.workspace.editor().registry().len().saturating_sub(1);
                    self.selected_zone = self.selected_zone.min(last);
                }
            }
            KeyCode::Char(' ') => self.workspace.dismiss_notice(),
            _ => {}
        }
        None
    }

    fn handle_form_key(&mut self, field: FormField, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.workspace.editor_mut().cancel();
                self.mode = Mode::Normal;
            }
            KeyCode::Enter => {
                if self.workspace.save_zone().is_ok() {
                    self.mode = Mode::Normal;
                    self.selected_zone = self.workspace.editor().registry().len().saturating_sub(1);
                }
            }
            KeyCode::Tab | KeyCode::Down => self.mode = Mode::Form(field.next()),
            KeyCode::BackTab | KeyCode::Up => self.mode = Mode::Form(field.prev()),
            KeyCode::Char(c) if field == FormField::Thickness => {
                let form = self.workspace.editor_mut().form_mut();
                let current = form.thickness as i64;
                match c {
                    '+' | '=' => form.set_thickness(current + 1),
                    '-' => form.set_thickness(current - 1),
                    d if d.is_ascii_digit() => {
                        let v = d.to_digit(10).unwrap_or(0) as i64;
                        form.set_thickness(if v == 0 { 10 } else { v });
                    }
                    _ => {}
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = self.form_text(field) {
                    text.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(text) = self.form_text(field) {
                    text.pop();
                }
            }
            _ => {}
        }
    }

    fn form_text(&mut self, field: FormField) -> Option<&mut String> {
        let form = self.workspace.editor_mut().form_mut();
        match field {
            FormField::Name => Some(&mut form.name),
            FormField::Color => Some(&mut form.color),
            FormField::Description => Some(&mut form.description),
            FormField::Threshold => Some(&mut form.alert_threshold),
            FormField::Thickness => None,
        }
    }

    fn handle_prompt_key(&mut self, kind: PromptKind, mut input: String, code: KeyCode) {
        match code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                if input.trim().is_empty() {
                    return;
                }
                match kind {
                    PromptKind::OpenMedia => self.open_media(&input),
                    PromptKind::SaveResult => self.save_result(&input),
                }
            }
            KeyCode::Backspace => {
                input.pop();
                self.mode = Mode::Prompt { kind, input };
            }
            KeyCode::Char(c) => {
                input.push(c);
                self.mode = Mode::Prompt { kind, input };
            }
            _ => {}
        }
    }

    fn save_result(&mut self, path: &str) {
        use zone_common::notice::Notice;
        let notice = match self.workspace.save_result(Path::new(path.trim())) {
            Ok(()) => Notice::success(format!("Result saved to {}", path.trim())),
            Err(e) => Notice::error(format!("Error: {e:#}")),
        };
        self.workspace.show_notice(notice);
    }

    fn save_layout(&mut self) {
        use zone_common::notice::Notice;
        let registry = self.workspace.editor().registry();
        let notice = match registry.save_to(&self.zones_file) {
            Ok(()) => Notice::success(format!(
                "Saved {} zone(s) to {}",
                registry.len(),
                self.zones_file.display()
            )),
            Err(e) => Notice::error(format!("Error: {e}")),
        };
        self.workspace.show_notice(notice);
    }

    fn load_layout(&mut self) {
        use zone_common::notice::Notice;
        match ZoneRegistry::load_from(&self.zones_file) {
            Ok(registry) => {
                let count = registry.len();
                self.workspace.load_zones(registry);
                self.selected_zone = 0;
                self.workspace.show_notice(Notice::success(format!(
                    "Loaded {count} zone(s) from {}",
                    self.zones_file.display()
                )));
            }
            Err(e) => self.workspace.show_notice(Notice::error(format!("Error: {e}"))),
        }
    }

    /// Ends the session: wipes the persisted file and quits the dashboard.
    pub fn logout(&mut self) {
        if let Err(e) = self.sessions.clear() {
            tracing::warn!("could not clear session: {e:#}");
        }
        self.session = SessionContext::default();
        self.quit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_client::AnalysisPhase;
    use zone_common::editor::DragState;

    fn app_with_video(dir: &tempfile::TempDir) -> App {
        let clip = dir.path().join("hall.mp4");
        std::fs::write(&clip, vec![0u8; 64]).unwrap();
        let mut app = App::new(
            Workspace::new(1024 * 1024),
            SessionContext::logged_in("ada", "ada@example.com"),
            SessionStore::new(dir.path().join("session.json")),
            dir.path().join("zones.json"),
            Some(Size::new(1280, 720)),
        );
        app.open_media(clip.to_str().unwrap());
        // 64x36 cells starting at (1, 1)
        app.set_canvas_area(CellRect::new(1, 1, 64, 36));
        app
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_mouse_drag_opens_form_and_saves_zone() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_video(&dir);

        // drawing is off until toggled
        app.handle_mouse(MouseEventKind::Down(MouseButton::Left), 5, 5);
        assert_eq!(app.workspace.editor().state(), DragState::Idle);

        app.handle_key(KeyCode::Char('d'));
        app.handle_mouse(MouseEventKind::Down(MouseButton::Left), 5, 5);
        app.handle_mouse(MouseEventKind::Drag(MouseButton::Left), 20, 15);
        app.handle_mouse(MouseEventKind::Up(MouseButton::Left), 20, 15);
        assert_eq!(app.mode, Mode::Form(FormField::Name));

        type_str(&mut app, "Gate");
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Char('7'));
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.mode, Mode::Normal);

        let zone = &app.workspace.editor().registry().zones()[0];
        assert_eq!(zone.name, "Gate");
        assert_eq!(zone.thickness, 7);
        // cell (5.5 - 1) * 20 = 90 native px
        assert_eq!(zone.rect.x, 90.0);
        assert_eq!(zone.rect.width, 300.0);
    }

    #[test]
    fn test_empty_name_keeps_form_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_video(&dir);
        app.handle_key(KeyCode::Char('d'));
        app.handle_mouse(MouseEventKind::Down(MouseButton::Left), 5, 5);
        app.handle_mouse(MouseEventKind::Up(MouseButton::Left), 30, 20);

        app.handle_key(KeyCode::Enter);
        assert_eq!(app.mode, Mode::Form(FormField::Name));
        assert!(app.workspace.editor().registry().is_empty());

        app.handle_key(KeyCode::Esc);
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.workspace.editor().state(), DragState::Idle);
    }

    #[test]
    fn test_analyze_key_starts_job_only_with_zones() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_video(&dir);
        assert!(app.handle_key(KeyCode::Char('a')).is_none());

        app.handle_key(KeyCode::Char('d'));
        app.handle_mouse(MouseEventKind::Down(MouseButton::Left), 5, 5);
        app.handle_mouse(MouseEventKind::Up(MouseButton::Left), 30, 20);
        type_str(&mut app, "Hall");
        app.handle_key(KeyCode::Enter);

        let job = app.handle_key(KeyCode::Char('a')).unwrap();
        app.update(TuiMessage::Progress(job.run_id, 55));
        assert_eq!(app.workspace.phase(), &AnalysisPhase::Uploading { progress: 55 });
        app.update(TuiMessage::Finished(job.run_id, Err(AnalysisError::Network)));
        assert!(matches!(app.workspace.phase(), AnalysisPhase::Failed(_)));
    }

    #[test]
    fn test_open_blocked_while_uploading() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_video(&dir);
        let other = dir.path().join("other.mp4");
        std::fs::write(&other, vec![1u8; 32]).unwrap();

        app.handle_key(KeyCode::Char('d'));
        app.handle_mouse(MouseEventKind::Down(MouseButton::Left), 5, 5);
        app.handle_mouse(MouseEventKind::Up(MouseButton::Left), 30, 20);
        type_str(&mut app, "Hall");
        app.handle_key(KeyCode::Enter);
        let job = app.handle_key(KeyCode::Char('a')).unwrap();

        app.handle_key(KeyCode::Char('o'));
        assert_eq!(app.mode, Mode::Normal);
        app.open_media(other.to_str().unwrap());
        assert_eq!(
            app.workspace.media().map(|m| m.file_name.as_str()),
            Some("hall.mp4")
        );
        assert!(app.handle_key(KeyCode::Char('a')).is_none());

        app.update(TuiMessage::Finished(job.run_id, Err(AnalysisError::Network)));
        app.handle_key(KeyCode::Char('o'));
        assert!(matches!(app.mode, Mode::Prompt { kind: PromptKind::OpenMedia, .. }));
    }

    #[test]
    fn test_drag_leaving_canvas_stays_on_media() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_video(&dir);
        app.handle_key(KeyCode::Char('d'));
        app.handle_mouse(MouseEventKind::Down(MouseButton::Left), 40, 20);
        app.handle_mouse(MouseEventKind::Drag(MouseButton::Left), 110, 60);
        app.handle_mouse(MouseEventKind::Up(MouseButton::Left), 110, 60);
        type_str(&mut app, "Edge");
        app.handle_key(KeyCode::Enter);

        let zone = &app.workspace.editor().registry().zones()[0];
        assert!(zone.rect.x + zone.rect.width <= 1280.0);
        assert!(zone.rect.y + zone.rect.height <= 720.0);
        // cell (40.5 - 1) * 20 = 790 native px
        assert_eq!(zone.rect.x, 790.0);
        assert_eq!(zone.rect.width, 490.0);
    }

    #[test]
    fn test_layout_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_video(&dir);
        app.handle_key(KeyCode::Char('d'));
        app.handle_mouse(MouseEventKind::Down(MouseButton::Left), 5, 5);
        app.handle_mouse(MouseEventKind::Up(MouseButton::Left), 30, 20);
        type_str(&mut app, "Desk");
        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Char('s'));

        app.handle_key(KeyCode::Char('x'));
        assert!(app.workspace.editor().registry().is_empty());

        app.handle_key(KeyCode::Char('l'));
        assert_eq!(app.workspace.editor().registry().zones()[0].name, "Desk");
    }
}
