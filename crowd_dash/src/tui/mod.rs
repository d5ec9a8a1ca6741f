pub mod app;
pub mod ui;

use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use analytics_client::{
    AnalysisClient, AnalysisJob, ClientConfig, ProgressFn, SessionContext, SessionStore,
    Workspace,
};
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Handle;
use zone_common::geometry::Size;

use app::{App, TuiMessage};

const UI_FPS: u64 = 30;
const UI_FRAME_TIME: Duration = Duration::from_millis(1000 / UI_FPS);

pub fn run_dashboard(
    config: ClientConfig,
    session: SessionContext,
    sessions: SessionStore,
    input: Option<&Path>,
    frame_size: Option<Size>,
    runtime: Handle,
) -> Result<()> {
    let mut app = App::new(
        Workspace::from_config(&config),
        session,
        sessions,
        config.zones_file.clone(),
        frame_size,
    );
    if let Some(path) = input {
        app.open_media(&path.to_string_lossy());
    }
    let client = Arc::new(AnalysisClient::new(config.upload_url()));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_tui_loop(&mut terminal, &mut app, client, &runtime);

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Runs one upload on the runtime, reporting back over `tx`.
fn spawn_analysis(
    runtime: &Handle,
    client: Arc<AnalysisClient>,
    job: AnalysisJob,
    tx: Sender<TuiMessage>,
) {
    let run = job.run_id;
    let progress_tx = tx.clone();
    let progress: ProgressFn = Arc::new(move |pct| {
        let _ = progress_tx.send(TuiMessage::Progress(run, pct));
    });
    runtime.spawn(async move {
        let outcome = client.analyze(&job, Some(progress)).await;
        let _ = tx.send(TuiMessage::Finished(run, outcome));
    });
}

fn run_tui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    client: Arc<AnalysisClient>,
    runtime: &Handle,
) -> Result<()> {
    let (tx, rx): (Sender<TuiMessage>, Receiver<TuiMessage>) = mpsc::channel();
    let mut last_render: Option<Instant> = None;

    loop {
        // Throttle rendering to UI_FPS
        if last_render.map_or(true, |t| t.elapsed() >= UI_FRAME_TIME) {
            terminal.draw(|f| {
                app.set_canvas_area(ui::canvas_area(f.area()));
                ui::draw(f, app);
            })?;
            last_render = Some(Instant::now());
        }

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(job) = app.handle_key(key.code) {
                        spawn_analysis(runtime, client.clone(), job, tx.clone());
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse.kind, mouse.column, mouse.row),
                _ => {}
            }
        }

        // Process messages from the upload task
        while let Ok(msg) = rx.try_recv() {
            app.update(msg);
        }

        if app.should_quit() {
            break;
        }

        // Small sleep to prevent busy-waiting
        thread::sleep(Duration::from_millis(5));
    }

    Ok(())
}
