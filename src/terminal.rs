// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based effect viewer
//!
//! Renders the camera preview to the terminal using Unicode half-block
//! characters, next to the effect list and a gauge for the selected effect's
//! parameter.

use crate::backends::camera::{CameraFrame, FrameReceiver, SystemBackend};
use crate::config::Config;
use crate::constants::{TERMINAL_TICK, effect_parameter};
use crate::effects::catalog::EffectSelection;
use crate::errors::SessionError;
use crate::session::{CameraSession, SessionState};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use image::RgbaImage;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Widget},
};
use std::io::{self, stdout};
use tokio::runtime::Runtime;
use tracing::{info, warn};

const HELP: &str = "↑/↓ effect | ←/→ adjust | c clear | r reload | q quit";

/// Run the terminal effect viewer
pub fn run(backend: SystemBackend, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(terminal_backend)?;

    let mut app = App::new(backend, config);
    let result = app.run(&rt, &mut terminal);
    app.shutdown(&rt);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

struct App {
    session: CameraSession<SystemBackend>,
    selection: EffectSelection,
    frames: Option<FrameReceiver>,
    frame_widget: FrameWidget,
    status_message: String,
    config: Config,
}

impl App {
    fn new(backend: SystemBackend, config: Config) -> Self {
        let mut selection = EffectSelection::default();
        if let Some(effect_id) = config.last_effect.as_deref()
            && selection.select_id(effect_id).is_none()
        {
            warn!(effect = effect_id, "Configured effect is not in the catalog");
        }

        Self {
            session: CameraSession::new(backend),
            selection,
            frames: None,
            frame_widget: FrameWidget::new(),
            status_message: HELP.to_string(),
            config,
        }
    }

    fn run(
        &mut self,
        rt: &Runtime,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.reload(rt);

        loop {
            self.poll_failures(rt);

            // Drain all available frames to get latest
            if let Some(frames) = self.frames.as_mut() {
                while let Ok(frame) = frames.try_recv() {
                    self.frame_widget.update_frame(frame);
                }
            }

            terminal.draw(|f| {
                let area = f.area();
                let [main_area, status_area] =
                    Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);
                let [camera_area, side_area] =
                    Layout::horizontal([Constraint::Min(10), Constraint::Length(28)])
                        .areas(main_area);
                let [list_area, gauge_area] =
                    Layout::vertical([Constraint::Min(3), Constraint::Length(3)]).areas(side_area);

                f.render_widget(&self.frame_widget, camera_area);

                let items: Vec<ListItem> = self
                    .selection
                    .catalog()
                    .entries()
                    .iter()
                    .map(|entry| ListItem::new(entry.display_name.clone()))
                    .collect();
                let list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title("Effects"))
                    .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                    .highlight_symbol("> ");
                let mut list_state = ListState::default();
                list_state.select(self.selection.selected_index());
                f.render_stateful_widget(list, list_area, &mut list_state);

                let (title, ratio, label) = match (self.selection.selected(), self.selection.value()) {
                    (Some(entry), Some(value)) => {
                        let span = (entry.max_value - entry.min_value).max(f32::EPSILON);
                        (
                            entry.parameter_name.clone(),
                            ((value - entry.min_value) / span).clamp(0.0, 1.0) as f64,
                            format!("{:.2}", value),
                        )
                    }
                    _ => ("Parameter".to_string(), 0.0, "-".to_string()),
                };
                let gauge = Gauge::default()
                    .block(Block::default().borders(Borders::ALL).title(title))
                    .gauge_style(Style::default().fg(Color::Yellow))
                    .ratio(ratio)
                    .label(label);
                f.render_widget(gauge, gauge_area);

                let status = StatusBar {
                    message: &self.status_message,
                };
                f.render_widget(status, status_area);
            })?;

            // Handle input with timeout for frame updates
            if event::poll(TERMINAL_TICK)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    break;
                }

                match key.code {
                    KeyCode::Char('q') => break,
                    KeyCode::Up => self.step_selection(rt, -1),
                    KeyCode::Down => self.step_selection(rt, 1),
                    KeyCode::Left => self.adjust_parameter(-effect_parameter::STEP),
                    KeyCode::Right => self.adjust_parameter(effect_parameter::STEP),
                    KeyCode::Char('c') => self.clear_effect(rt),
                    KeyCode::Char('r') => self.reload(rt),
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// (Re)open the camera and re-apply the selected effect
    fn reload(&mut self, rt: &Runtime) {
        self.frames = None;
        self.frame_widget = FrameWidget::new();

        match rt.block_on(self.session.initialize()) {
            Ok(()) => {
                self.frames = self.session.take_preview_stream();
                let device = self
                    .session
                    .device()
                    .map(|d| d.name.clone())
                    .unwrap_or_default();
                self.status_message = format!("{} | {}", device, HELP);
                self.apply_selection(rt);
            }
            Err(e) => self.report(&e),
        }
    }

    fn step_selection(&mut self, rt: &Runtime, delta: isize) {
        let count = self.selection.catalog().len() as isize;
        if count == 0 {
            return;
        }
        let next = match self.selection.selected_index() {
            Some(index) => (index as isize + delta).rem_euclid(count),
            None if delta < 0 => count - 1,
            None => 0,
        };
        self.selection.select(next as usize);
        self.apply_selection(rt);
    }

    fn apply_selection(&mut self, rt: &Runtime) {
        let Some(descriptor) = self.selection.descriptor() else {
            return;
        };
        if self.session.state() != SessionState::Previewing {
            self.report(&SessionError::StreamUnavailable);
            return;
        }

        let result = rt.block_on(async {
            self.session.clear().await?;
            self.session.apply(descriptor).await
        });
        if let Err(e) = result {
            self.report(&e);
        }
    }

    fn adjust_parameter(&mut self, delta: f32) {
        let Some(current) = self.selection.value() else {
            return;
        };
        if let Some(value) = self.selection.set_value(current + delta) {
            self.session.update_parameter(value);
        }
    }

    fn clear_effect(&mut self, rt: &Runtime) {
        self.selection.clear();
        if let Err(e) = rt.block_on(self.session.clear()) {
            self.report(&e);
        }
    }

    fn poll_failures(&mut self, rt: &Runtime) {
        while let Some(failure) = self.session.try_next_failure() {
            if let Err(e) = rt.block_on(self.session.handle_failure(failure)) {
                self.frames = None;
                self.status_message = format!("{} Press 'r' to reload.", e.user_message());
            }
        }
    }

    fn report(&mut self, error: &SessionError) {
        warn!(error = %error, "Camera session error");
        self.status_message = error.user_message();
    }

    /// Release the camera and remember the selected effect
    fn shutdown(&mut self, rt: &Runtime) {
        if let Err(e) = rt.block_on(self.session.dispose()) {
            warn!(error = %e, "Error disposing camera session");
        }

        self.config.last_effect = self
            .selection
            .selected()
            .map(|entry| entry.effect_id().to_string());
        match self.config.save() {
            Ok(()) => info!(effect = ?self.config.last_effect, "Saved selected effect"),
            Err(e) => warn!(error = %e, "Failed to save configuration"),
        }
    }
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget {
    frame: Option<CameraFrame>,
}

impl FrameWidget {
    fn new() -> Self {
        Self { frame: None }
    }

    fn update_frame(&mut self, frame: CameraFrame) {
        self.frame = Some(frame);
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(image) = self
            .frame
            .as_ref()
            .map(|f| &f.image)
            .filter(|img| img.width() > 0 && img.height() > 0)
        else {
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.bottom() && x < area.right() {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        let target = fit_half_blocks(area, image.width(), image.height());
        if target.is_empty() {
            return;
        }

        let sampler = HalfBlockSampler::new(image, target);
        for row in 0..target.height {
            for col in 0..target.width {
                let (top, bottom) = sampler.cell(col, row);
                if let Some(cell) = buf.cell_mut((target.x + col, target.y + row)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }
    }
}

/// Largest centred rect inside `area` that keeps the image aspect ratio.
///
/// A cell covers one pixel column and two pixel rows.
fn fit_half_blocks(area: Rect, img_width: u32, img_height: u32) -> Rect {
    let rows_px = u64::from(area.height) * 2;
    let cols = u64::from(area.width);
    let (w, h) = (u64::from(img_width), u64::from(img_height));

    // Compare cols/rows_px against w/h without floating point
    let (width, height_px) = if cols * h > rows_px * w {
        (rows_px * w / h, rows_px)
    } else {
        (cols, cols * h / w)
    };
    let width = width.min(cols) as u16;
    let height = (height_px / 2).min(u64::from(area.height)) as u16;

    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Nearest-neighbour lookup from terminal cells to image pixels
struct HalfBlockSampler<'a> {
    image: &'a RgbaImage,
    target: Rect,
}

impl<'a> HalfBlockSampler<'a> {
    fn new(image: &'a RgbaImage, target: Rect) -> Self {
        Self { image, target }
    }

    /// Colours of the upper and lower half of the cell at (`col`, `row`)
    fn cell(&self, col: u16, row: u16) -> (Color, Color) {
        let x = scale(col, self.target.width, self.image.width());
        let rows_px = self.target.height * 2;
        let top = scale(row * 2, rows_px, self.image.height());
        let bottom = scale(row * 2 + 1, rows_px, self.image.height());
        (self.pixel(x, top), self.pixel(x, bottom))
    }

    fn pixel(&self, x: u32, y: u32) -> Color {
        let [r, g, b, _] = self.image.get_pixel(x, y).0;
        Color::Rgb(r, g, b)
    }
}

/// Map `pos` in `0..span` onto `0..len`
fn scale(pos: u16, span: u16, len: u32) -> u32 {
    let mapped = u64::from(pos) * u64::from(len) / u64::from(span.max(1));
    (mapped as u32).min(len - 1)
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        // Truncate on a char boundary; the help text is not ASCII
        let text: String = self.message.chars().take(area.width as usize).collect();

        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}
