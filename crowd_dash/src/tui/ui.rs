use std::time::Instant;

use analytics_client::media::format_bytes;
use analytics_client::AnalysisPhase;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Rectangle},
        Block, Borders, Gauge, List, ListItem, Paragraph, Wrap,
    },
    Frame,
};
use zone_common::notice::NoticeKind;
use zone_common::overlay::{parse_color, DisplayList, DrawOp};

use crate::tui::app::{App, FormField, Mode};

/// Screen regions, shared by drawing and by mouse hit-testing.
pub struct Panes {
    pub header: Rect,
    pub canvas: Rect,
    pub zones: Rect,
    pub detail: Rect,
    pub progress: Rect,
    pub footer: Rect,
}

pub fn panes(area: Rect) -> Panes {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Main content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(9),
            Constraint::Length(3),
        ])
        .split(cols[1]);

    Panes {
        header: rows[0],
        canvas: cols[0],
        zones: side[0],
        detail: side[1],
        progress: side[2],
        footer: rows[2],
    }
}

/// Cells inside the canvas border, where pointer positions are mapped.
pub fn canvas_area(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(panes(area).canvas)
}

fn to_color(hex: &str) -> Color {
    parse_color(hex).map_or(Color::White, |[r, g, b, _]| Color::Rgb(r, g, b))
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let panes = panes(f.area());

    draw_header(f, app, panes.header);
    draw_canvas(f, app, panes.canvas);
    draw_zone_list(f, app, panes.zones);
    match app.mode {
        Mode::Form(field) => draw_form(f, app, field, panes.detail),
        _ => draw_stats(f, app, panes.detail),
    }
    draw_progress(f, app, panes.progress);
    draw_footer(f, app, panes.footer);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let user = app.session.username().unwrap_or("-");
    let drawing = app.workspace.editor().drawing_mode();

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " Crowd Analytics Dashboard ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("| {user} | ")),
        Span::styled(
            if drawing { "DRAWING" } else { "VIEW" },
            Style::default().fg(if drawing { Color::Yellow } else { Color::Gray }),
        ),
        Span::raw(" | "),
        Span::styled("[O]", Style::default().fg(Color::Cyan)),
        Span::raw("pen "),
        Span::styled("[D]", Style::default().fg(Color::Yellow)),
        Span::raw("raw "),
        Span::styled("[A]", Style::default().fg(Color::Green)),
        Span::raw("nalyze "),
        Span::styled("[S/L]", Style::default().fg(Color::Cyan)),
        Span::raw(" save/load zones "),
        Span::styled("[W]", Style::default().fg(Color::Cyan)),
        Span::raw("rite result "),
        Span::styled("[C]", Style::default().fg(Color::Magenta)),
        Span::raw("lear "),
        Span::styled("[Q]", Style::default().fg(Color::Red)),
        Span::raw("uit"),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn draw_canvas(f: &mut Frame, app: &mut App, area: Rect) {
    let title = match app.workspace.media() {
        Some(media) => format!(" {} ({}) ", media.file_name, format_bytes(media.size)),
        None => " No media loaded ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let Some(native) = app.workspace.editor().canvas().native() else {
        let hint = if app.workspace.media().is_some() {
            "Frame size unknown. Restart with --frame-size WxH to draw zones."
        } else {
            "Press O to open an image or video."
        };
        let paragraph = Paragraph::new(hint)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let mut list = DisplayList::default();
    app.workspace.editor_mut().render(&mut list);
    let (w, h) = (native.width as f64, native.height as f64);

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, w])
        .y_bounds([0.0, h])
        .paint(move |ctx| {
            for op in list.ops() {
                match op {
                    DrawOp::StrokeRect { rect, color, .. } => ctx.draw(&Rectangle {
                        x: rect.x,
                        // canvas y grows upwards
                        y: h - rect.y - rect.height,
                        width: rect.width,
                        height: rect.height,
                        color: to_color(color),
                    }),
                    DrawOp::Text { text, x, y, color } => ctx.print(
                        *x,
                        h - *y,
                        Span::styled(text.clone(), Style::default().fg(to_color(color))),
                    ),
                    DrawOp::Clear | DrawOp::FillRect { .. } => {}
                }
            }
        });
    f.render_widget(canvas, area);
}

fn draw_zone_list(f: &mut Frame, app: &App, area: Rect) {
    let zones = app.workspace.editor().registry().zones();
    let items: Vec<ListItem> = zones
        .iter()
        .enumerate()
        .map(|(idx, zone)| {
            let style = if idx == app.selected_zone {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let wire = zone.serialize();
            ListItem::new(Line::from(vec![
                Span::styled("■ ", Style::default().fg(to_color(&zone.color))),
                Span::raw(format!(
                    "{:<14} ({},{})-({},{})",
                    zone.name,
                    wire.top_left.x,
                    wire.top_left.y,
                    wire.bottom_right.x,
                    wire.bottom_right.y
                )),
            ]))
            .style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Zones ({}) [↑↓] select [X] delete ", zones.len())),
    );
    f.render_widget(list, area);
}

fn draw_form(f: &mut Frame, app: &App, active: FormField, area: Rect) {
    let form = app.workspace.editor().form();
    let lines: Vec<Line> = FormField::ALL
        .iter()
        .map(|field| {
            let value = match field {
                FormField::Name => form.name.clone(),
                FormField::Color => form.color.clone(),
                FormField::Thickness => format!("{} [+/-]", form.thickness),
                FormField::Description => form.description.clone(),
                FormField::Threshold => form.alert_threshold.clone(),
            };
            let style = if *field == active {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!(" {:<16}", field.label()), style),
                Span::raw(value),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" New zone [Tab] next [Enter] save [Esc] cancel "),
    );
    f.render_widget(paragraph, area);
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let lines = match app.workspace.stats() {
        Some(stats) => {
            let mut lines = vec![
                Line::from(format!("  Detected:    {}", stats.total_detected)),
                Line::from(format!("  Confidence:  {}%", stats.confidence)),
                Line::from(format!("  Time:        {}", stats.processing_time)),
                Line::from(format!(
                    "  Density:     {} ({})",
                    stats.density,
                    stats.density_label()
                )),
            ];
            if let Some(meta) = app.workspace.metadata() {
                for entry in meta.zone_summary.iter().take(3) {
                    lines.push(Line::from(format!(
                        "  {}: {}",
                        entry.zone_name, entry.total_count
                    )));
                }
            }
            lines
        }
        None => vec![Line::from("  No analysis yet")],
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Statistics "));
    f.render_widget(paragraph, area);
}

fn draw_progress(f: &mut Frame, app: &App, area: Rect) {
    let (label, color) = match app.workspace.phase() {
        AnalysisPhase::Idle => ("Idle".to_string(), Color::Gray),
        AnalysisPhase::Uploading { progress } => (format!("Processing... {progress}%"), Color::Cyan),
        AnalysisPhase::Succeeded => ("Done".to_string(), Color::Green),
        AnalysisPhase::Failed(msg) => (format!("Failed: {msg}"), Color::Red),
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .label(label)
        .percent(app.workspace.progress().min(100) as u16);
    f.render_widget(gauge, area);
}

fn draw_footer(f: &mut Frame, app: &mut App, area: Rect) {
    let zones = app.workspace.editor().registry().len();
    let paragraph = if let Mode::Prompt { kind, input } = &app.mode {
        Paragraph::new(format!("{}: {input}_", kind.title()))
            .style(Style::default().fg(Color::Yellow))
    } else if let Some(notice) = app.workspace.notice(Instant::now()) {
        let color = match notice.kind {
            NoticeKind::Info => Color::Cyan,
            NoticeKind::Success => Color::Green,
            NoticeKind::Error => Color::Red,
        };
        Paragraph::new(notice.message.clone()).style(Style::default().fg(color))
    } else {
        Paragraph::new(format!("{zones} zone(s) | [Space] dismiss notice | [Shift+L] log out"))
            .style(Style::default().fg(Color::Gray))
    };

    f.render_widget(paragraph.block(Block::default().borders(Borders::ALL)), area);
}
