//! Button Canvas TUI - interactive canvas client
//!
//! Run with: cargo run --bin canvas-tui --features tui -- [base-url] [#x,y]
//!
//! Controls:
//!   Mouse drag - Pan the canvas
//!   Click      - Press the button under the cursor
//!   WASD/Arrows - Pan by one tile
//!   G - Go to a `#x,y` fragment
//!   R - Jump to a random tile
//!   C - Pick a new random color
//!   T - Toggle stats
//!   H - Help
//!   Q - Quit
//!
//! Logs go to `<cache dir>/button-canvas/tui.log`; set `RUST_LOG` to tune.

#[cfg(not(feature = "tui"))]
fn main() {
    eprintln!("TUI feature not enabled. Run with:");
    eprintln!("  cargo run --bin canvas-tui --features tui -- [base-url] [#x,y]");
}

#[cfg(feature = "tui")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tui_main::run()
}

#[cfg(feature = "tui")]
mod tui_main {
    use std::io::stdout;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use crossterm::{
        event::{
            self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
            MouseEvent, MouseEventKind,
        },
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::{
        prelude::*,
        widgets::{Block, Borders, Clear, Paragraph},
    };
    use tracing::{info, warn};
    use tracing_subscriber::EnvFilter;

    use button_canvas_client::client::{InputEvent, PointerInput};
    use button_canvas_client::codec::{Color as ButtonColor, GridLayout, GridPoint, StatEntry};
    use button_canvas_client::{CanvasSession, ClientBuilder, ClientConfig, TickReport};

    const HEADER_ROWS: u16 = 3;
    const FOOTER_ROWS: u16 = 1;

    struct App {
        session: CanvasSession,
        layout: GridLayout,
        /// Canvas pixels per terminal cell
        cell_w: f64,
        cell_h: f64,
        canvas: Rect,

        mouse_last: Option<(u16, u16)>,
        mouse_moved: bool,

        last_report: TickReport,
        stats: Vec<StatEntry>,
        show_stats: bool,
        show_help: bool,
        goto_input: Option<String>,
        log: Vec<(String, Color)>,
    }

    impl App {
        fn new(session: CanvasSession) -> Self {
            let config = session.config().clone();
            let layout = config.layout();
            let columns = layout.row_length().max(1) as f64;
            Self {
                session,
                layout,
                cell_w: config.tile_width / columns,
                cell_h: config.tile_height / columns,
                canvas: Rect::default(),
                mouse_last: None,
                mouse_moved: false,
                last_report: TickReport::default(),
                stats: Vec::new(),
                show_stats: false,
                show_help: false,
                goto_input: None,
                log: vec![("Drag to pan, click to press".into(), Color::Yellow)],
            }
        }

        fn log(&mut self, msg: impl Into<String>, color: Color) {
            self.log.push((msg.into(), color));
            if self.log.len() > 50 {
                self.log.remove(0);
            }
        }

        fn layout_canvas(&mut self, width: u16, height: u16) {
            let rows = height.saturating_sub(HEADER_ROWS + FOOTER_ROWS);
            self.canvas = Rect::new(0, HEADER_ROWS, width, rows);
            self.session
                .resize(width as f64 * self.cell_w, rows as f64 * self.cell_h);
        }

        /// Canvas pixel at the center of a terminal cell.
        fn cell_pixel(&self, col: u16, row: u16) -> Option<(f64, f64)> {
            let inside = col >= self.canvas.x
                && col < self.canvas.x + self.canvas.width
                && row >= self.canvas.y
                && row < self.canvas.y + self.canvas.height;
            inside.then(|| {
                (
                    (col - self.canvas.x) as f64 * self.cell_w + self.cell_w / 2.0,
                    (row - self.canvas.y) as f64 * self.cell_h + self.cell_h / 2.0,
                )
            })
        }

        /// Tile and button id under a canvas pixel.
        fn button_at(&self, sx: f64, sy: f64) -> Option<(GridPoint, i64)> {
            let viewport = self.session.viewport();
            let point = viewport.tile_at(sx, sy);
            let config = self.session.config();
            if !point.within(config.grid_max_x, config.grid_max_y) {
                return None;
            }
            let rect = viewport.tile_rect(point);
            let columns = self.layout.row_length();
            let col = ((sx - rect.left) / self.cell_w).floor() as usize;
            let row = ((sy - rect.top) / self.cell_h).floor() as usize;
            if col >= columns || row >= columns {
                return None;
            }
            Some((point, self.layout.button_id(point, row * columns + col)))
        }
    }

    fn init_logging() {
        let dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("button-canvas");
        if std::fs::create_dir_all(&dir).is_err() {
            return;
        }
        let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("tui.log"))
        else {
            return;
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        init_logging();
        let args: Vec<String> = std::env::args().collect();

        let mut config = ClientConfig::from_env()?;
        if let Some(url) = args.get(1) {
            config.base_url = url.clone();
        }
        let fragment = args.get(2).cloned().unwrap_or_default();

        let rt = tokio::runtime::Runtime::new()?;
        let session = ClientBuilder::from_config(config).build()?;
        let mut app = App::new(session);

        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        stdout().execute(EnableMouseCapture)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

        let size = terminal.size()?;
        app.layout_canvas(size.width, size.height);
        let nav = rt.block_on(app.session.navigate(&fragment));
        app.log(format!("Origin {}", nav.point().fragment()), Color::Cyan);

        let tick_rate = app.session.config().tick_interval();
        let frame_rate = Duration::from_millis(33);
        let mut last_tick = Instant::now();

        let result: Result<(), Box<dyn std::error::Error>> = loop {
            if let Err(e) = terminal.draw(|frame| render(frame, &app)) {
                break Err(e.into());
            }

            match event::poll(frame_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        if key.code == KeyCode::Char('q') && app.goto_input.is_none() {
                            break Ok(());
                        }
                        handle_key(&mut app, key.code, &rt);
                    }
                    Ok(Event::Mouse(mouse)) => handle_mouse(&mut app, mouse, &rt),
                    Ok(Event::Resize(w, h)) => app.layout_canvas(w, h),
                    Ok(_) => {}
                    Err(e) => break Err(e.into()),
                },
                Ok(false) => {}
                Err(e) => break Err(e.into()),
            }

            // Dragging reconciles right away; idle pans wait for the interval.
            if app.session.scheduler().is_dirty() && (app.session.is_dragging() || last_tick.elapsed() >= tick_rate) {
                app.last_report = rt.block_on(app.session.tick());
                last_tick = Instant::now();
            } else if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
            }
        };

        disable_raw_mode()?;
        stdout().execute(DisableMouseCapture)?;
        stdout().execute(LeaveAlternateScreen)?;
        result
    }

    fn pan_by(app: &mut App, dx: f64, dy: f64) {
        app.session.handle_input(InputEvent::Pointer(PointerInput::Down));
        app.session.handle_input(InputEvent::Pointer(PointerInput::Move {
            movement_x: dx,
            movement_y: dy,
        }));
        app.session.handle_input(InputEvent::Pointer(PointerInput::Up));
    }

    fn handle_key(app: &mut App, code: KeyCode, rt: &tokio::runtime::Runtime) {
        if let Some(input) = app.goto_input.as_mut() {
            match code {
                KeyCode::Enter => {
                    let fragment = std::mem::take(input);
                    app.goto_input = None;
                    let nav = rt.block_on(app.session.navigate(&fragment));
                    if nav.is_redirect() {
                        app.log(format!("{fragment:?} is not a tile, went to {}", nav.point().fragment()), Color::Yellow);
                    } else {
                        app.log(format!("Origin {}", nav.point().fragment()), Color::Cyan);
                    }
                }
                KeyCode::Esc => app.goto_input = None,
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                _ => {}
            }
            return;
        }

        let (tw, th) = {
            let config = app.session.config();
            (config.tile_width, config.tile_height)
        };
        match code {
            // Content follows the drag, so moving the view right drags left.
            KeyCode::Left | KeyCode::Char('a') => pan_by(app, tw, 0.0),
            KeyCode::Right | KeyCode::Char('d') => pan_by(app, -tw, 0.0),
            KeyCode::Up | KeyCode::Char('w') => pan_by(app, 0.0, th),
            KeyCode::Down | KeyCode::Char('s') => pan_by(app, 0.0, -th),
            KeyCode::Char('t') => {
                app.show_stats = !app.show_stats;
                if app.show_stats {
                    app.stats = rt.block_on(app.session.stats());
                }
            }
            KeyCode::Char('g') => app.goto_input = Some(String::from("#")),
            KeyCode::Char('r') => {
                let nav = rt.block_on(app.session.navigate(""));
                app.log(format!("Jumped to {}", nav.point().fragment()), Color::Cyan);
            }
            KeyCode::Char('c') => {
                let hex = ButtonColor::random().to_hex();
                match app.session.set_color(&hex) {
                    Ok(()) => app.log(format!("Color #{hex}"), hex_color(&hex)),
                    Err(e) => app.log(format!("Could not save color: {e}"), Color::Red),
                }
            }
            KeyCode::Char('h') => app.show_help = !app.show_help,
            KeyCode::Esc => {
                app.show_help = false;
                app.show_stats = false;
            }
            _ => {}
        }
    }

    fn handle_mouse(app: &mut App, mouse: MouseEvent, rt: &tokio::runtime::Runtime) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if app.cell_pixel(mouse.column, mouse.row).is_some() {
                    app.mouse_last = Some((mouse.column, mouse.row));
                    app.mouse_moved = false;
                    app.session.handle_input(InputEvent::Pointer(PointerInput::Down));
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let Some((last_col, last_row)) = app.mouse_last else {
                    return;
                };
                let dx = (mouse.column as f64 - last_col as f64) * app.cell_w;
                let dy = (mouse.row as f64 - last_row as f64) * app.cell_h;
                if dx != 0.0 || dy != 0.0 {
                    app.mouse_moved = true;
                    app.session.handle_input(InputEvent::Pointer(PointerInput::Move {
                        movement_x: dx,
                        movement_y: dy,
                    }));
                }
                app.mouse_last = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if app.mouse_last.take().is_none() {
                    return;
                }
                app.session.handle_input(InputEvent::Pointer(PointerInput::Up));
                if !app.mouse_moved {
                    press_at(app, mouse.column, mouse.row, rt);
                }
            }
            _ => {}
        }
    }

    fn press_at(app: &mut App, col: u16, row: u16, rt: &tokio::runtime::Runtime) {
        let Some((sx, sy)) = app.cell_pixel(col, row) else {
            return;
        };
        let Some((point, id)) = app.button_at(sx, sy) else {
            return;
        };
        if app.session.renderer().button(id).is_none() {
            return;
        }
        match rt.block_on(app.session.press(point, id)) {
            Some(outcome) if outcome.success => {
                info!(%point, id, "pressed");
                let color = hex_color(app.session.color());
                app.log(format!("Pressed b{id}"), color);
            }
            Some(_) => app.log(format!("b{id} was taken first"), Color::Yellow),
            None => {
                warn!(%point, id, "press failed");
                app.log(format!("Press on b{id} failed"), Color::Red);
            }
        }
    }

    fn hex_color(hex: &str) -> Color {
        ButtonColor::from_hex(hex)
            .map(|c| Color::Rgb(c.r, c.g, c.b))
            .unwrap_or(Color::White)
    }

    fn render(frame: &mut Frame, app: &App) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_ROWS),
                Constraint::Min(1),
                Constraint::Length(FOOTER_ROWS),
            ])
            .split(area);

        render_header(frame, app, chunks[0]);
        render_canvas(frame, app, chunks[1]);
        render_footer(frame, app, chunks[2]);

        if app.show_help {
            render_help(frame);
        } else if app.show_stats {
            render_stats(frame, app);
        }
    }

    fn render_header(frame: &mut Frame, app: &App, area: Rect) {
        let origin = app
            .session
            .origin()
            .map(|p| p.fragment())
            .unwrap_or_else(|| "-".into());
        let (px, py) = app.session.pan();
        let color = app.session.color();
        let text = Line::from(vec![
            Span::styled(format!(" {origin} "), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(format!(" pan {px:.0},{py:.0} ")),
            Span::styled(format!(" #{color} "), Style::default().fg(hex_color(color))),
            Span::raw(format!(
                " cached {}  visible {}  fetched {} ",
                app.session.cache().len(),
                app.last_report.visible,
                app.last_report.fetched
            )),
        ]);
        let block = Block::default().borders(Borders::ALL).title(" Button Canvas ");
        frame.render_widget(Paragraph::new(text).block(block), area);
    }

    fn render_canvas(frame: &mut Frame, app: &App, area: Rect) {
        let mut lines = Vec::with_capacity(area.height as usize);
        for row in 0..area.height {
            let mut spans = Vec::with_capacity(area.width as usize);
            for col in 0..area.width {
                let sx = col as f64 * app.cell_w + app.cell_w / 2.0;
                let sy = row as f64 * app.cell_h + app.cell_h / 2.0;
                spans.push(cell_span(app, sx, sy));
            }
            lines.push(Line::from(spans));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn cell_span(app: &App, sx: f64, sy: f64) -> Span<'static> {
        let renderer = app.session.renderer();
        let point = app.session.viewport().tile_at(sx, sy);
        let populated = renderer.is_populated(point);
        let button = app
            .button_at(sx, sy)
            .and_then(|(_, id)| renderer.button(id));
        match button {
            Some(b) if b.pressed => {
                let color = b.color.as_deref().map(hex_color).unwrap_or(Color::Gray);
                Span::styled("█", Style::default().fg(color))
            }
            Some(b) if b.seen => Span::styled("·", Style::default().fg(Color::Gray)),
            Some(_) => Span::styled("·", Style::default().fg(Color::White)),
            None if populated => Span::raw(" "),
            None => Span::styled("░", Style::default().fg(Color::DarkGray)),
        }
    }

    fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
        let line = match &app.goto_input {
            Some(input) => Line::from(vec![
                Span::styled("Go to: ", Style::default().fg(Color::Yellow)),
                Span::raw(input.clone()),
            ]),
            None => match app.log.last() {
                Some((msg, color)) => Line::from(Span::styled(msg.clone(), Style::default().fg(*color))),
                None => Line::default(),
            },
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn popup(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width);
        let height = height.min(area.height);
        Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        )
    }

    fn render_stats(frame: &mut Frame, app: &App) {
        let area = popup(frame.area(), 48, app.stats.len() as u16 + 2);
        let lines: Vec<Line> = if app.stats.is_empty() {
            vec![Line::from("No stats available")]
        } else {
            app.stats
                .iter()
                .map(|s| Line::from(format!("{:<28} {:>16}", s.stat_name, s.value())))
                .collect()
        };
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Stats ")),
            area,
        );
    }

    fn render_help(frame: &mut Frame) {
        let help = [
            "Mouse drag   Pan the canvas",
            "Click        Press a button",
            "WASD/Arrows  Pan by one tile",
            "G            Go to #x,y",
            "R            Random tile",
            "C            New random color",
            "T            Stats",
            "H / Esc      Close",
            "Q            Quit",
        ];
        let area = popup(frame.area(), 36, help.len() as u16 + 2);
        let lines: Vec<Line> = help.iter().map(|l| Line::from(*l)).collect();
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Help ")),
            area,
        );
    }
}
