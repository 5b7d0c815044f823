use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Block, Borders, Paragraph,
    },
    Frame, Terminal,
};
use tracing::{info, warn};

use crate::app::{App, SharedFeed};
use crate::bridge::{self, BridgeHandle};
use crate::constants::TICK_RATE_MS;
use crate::tree::{self, LineKind};
use crate::util::{format_count, format_rate};

pub fn run(
    feed: Arc<Mutex<SharedFeed>>,
    bridge: BridgeHandle,
    shutdown: Arc<AtomicBool>,
) -> io::Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(&bridge.local_addr().to_string());
    let res = run_app_loop(&mut terminal, app, feed, bridge, &shutdown);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err)
    }
    Ok(())
}

fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    feed: Arc<Mutex<SharedFeed>>,
    mut bridge: BridgeHandle,
    shutdown: &AtomicBool,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(TICK_RATE_MS);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(());
        }

        terminal.draw(|f| draw(f, &app, &bridge))?;

        let timeout = tick_rate
            .checked_sub(app.last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    return Ok(());
                }
                if app.input.editing {
                    match key.code {
                        KeyCode::Enter => apply_load(&mut app, &mut bridge, &feed),
                        KeyCode::Esc => {
                            app.input.editing = false;
                            app.input.buffer = bridge.local_addr().to_string();
                        }
                        KeyCode::Backspace => {
                            app.input.buffer.pop();
                        }
                        KeyCode::Char(c) => app.input.buffer.push(c),
                        _ => {}
                    }
                } else {
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('i') => app.input.editing = true,
                        KeyCode::Up => app.tree_scroll = app.tree_scroll.saturating_sub(1),
                        KeyCode::Down => app.tree_scroll = app.tree_scroll.saturating_add(1),
                        _ => {}
                    }
                }
            }
        }
        if app.last_tick.elapsed() >= tick_rate {
            app.on_tick(&feed);
            app.last_tick = Instant::now();
        }
    }
}

// The load action: rebind the bridge to the entered address. A failed bind
// keeps the old listener running.
fn apply_load(app: &mut App, bridge: &mut BridgeHandle, feed: &Arc<Mutex<SharedFeed>>) {
    app.input.editing = false;
    let addr = app.input.buffer.trim().to_string();
    if addr == bridge.local_addr().to_string() {
        app.status = Some(format!("bridge already on {addr}"));
        return;
    }
    match bridge::spawn(&addr, Arc::clone(feed)) {
        Ok(replacement) => {
            let mut old = std::mem::replace(bridge, replacement);
            old.stop();
            info!(addr = %bridge.local_addr(), "bridge rebound");
            app.input.buffer = bridge.local_addr().to_string();
            app.status = Some(format!("bridge listening on {}", bridge.local_addr()));
        }
        Err(err) => {
            warn!(%addr, error = %err, "bridge rebind failed");
            app.status = Some(format!("load failed: {err:#}"));
        }
    }
}

fn draw(f: &mut Frame, app: &App, bridge: &BridgeHandle) {
    // ============= whole screen layout ============
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints(
            [
                Constraint::Length(3),  // Address input bar
                Constraint::Length(10), // Rate box
                Constraint::Min(8),     // Received data tree
                Constraint::Length(1),  // Bottom status bar
            ]
            .as_ref(),
        )
        .split(f.size());

    // ============= Address Input Bar ============
    let input_style = if app.input.editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(app.input.buffer.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Bridge Address ")
            .border_type(ratatui::widgets::BorderType::Rounded)
            .border_style(input_style),
    );
    f.render_widget(input, main_chunks[0]);
    if app.input.editing {
        f.set_cursor(
            main_chunks[0].x + 1 + app.input.buffer.len() as u16,
            main_chunks[0].y + 1,
        );
    }

    // ============= Rate Box ============
    let rate_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Message Rate [{}] ", bridge.local_addr()))
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(rate_block.clone(), main_chunks[1]);

    let inner_area = rate_block.inner(main_chunks[1]);
    let graph_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)].as_ref())
        .split(inner_area);

    let max_rate = app.rate_history.iter().cloned().fold(1.0, f64::max);
    let x_limit = app.rate_history.len() as f64;

    let rate_canvas = Canvas::default()
        .block(
            Block::default()
                .title(" msg/s ")
                .title_style(Style::default().fg(Color::Green)),
        )
        .marker(Marker::Braille)
        .x_bounds([0.0, x_limit])
        .y_bounds([0.0, max_rate])
        .paint(|ctx| {
            for (i, &val) in app.rate_history.iter().enumerate() {
                ctx.draw(&CanvasLine {
                    x1: i as f64,
                    y1: 0.0,
                    x2: i as f64,
                    y2: val,
                    color: Color::Green,
                });
            }
        });
    f.render_widget(rate_canvas, graph_chunks[0]);

    let last_seen = app
        .last_received_at
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let rate_text = vec![
        Line::from(vec![
            Span::raw("▶ "),
            Span::styled(
                format_rate(app.display.current_rate),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Peak: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format_rate(app.peak_rate_record.0)),
        ]),
        Line::from(vec![
            Span::styled("  Tot:  ", Style::default().fg(Color::DarkGray)),
            Span::raw(format_count(app.accepted_total)),
        ]),
        Line::from(vec![
            Span::styled("  Last: ", Style::default().fg(Color::DarkGray)),
            Span::raw(last_seen),
        ]),
        Line::from(vec![
            Span::styled("  Err:  ", Style::default().fg(Color::DarkGray)),
            Span::raw(format_count(app.parse_errors)),
        ]),
    ];
    f.render_widget(
        Paragraph::new(rate_text).block(Block::default().style(Style::default().fg(Color::Green))),
        graph_chunks[1],
    );

    // ============= Received Data Tree ============
    let tree_lines = message_lines(app);
    let data_view = Paragraph::new(tree_lines)
        .scroll((app.tree_scroll, 0))
        .block(
            Block::default()
                .title(" Received Data ")
                .borders(Borders::ALL)
                .border_type(ratatui::widgets::BorderType::Rounded),
        );
    f.render_widget(data_view, main_chunks[2]);

    // ============ Bottom Status Bar ============
    let status_content = match &app.status {
        Some(message) => Line::from(vec![
            Span::styled(
                " STATUS ",
                Style::default()
                    .bg(Color::White)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::raw(message.clone()),
        ]),
        None => {
            let peak_time = app.peak_rate_record.1.format("%H:%M:%S").to_string();
            Line::from(vec![
                Span::styled(
                    " BRIDGE ",
                    Style::default()
                        .bg(Color::White)
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" ws://{}", bridge.local_addr())),
                Span::raw(" | "),
                Span::styled("PEAK: ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                Span::raw(format!("{} ", format_rate(app.peak_rate_record.0))),
                Span::styled(format!("(@{})", peak_time), Style::default().fg(Color::DarkGray)),
                Span::raw(" | "),
                Span::raw(format!(
                    "ok {} / err {}",
                    format_count(app.accepted_total),
                    format_count(app.parse_errors)
                )),
                Span::raw(" | 'i' edit address, Enter load, ↑/↓ scroll, 'q' quit"),
            ])
        }
    };
    let status_bar =
        Paragraph::new(status_content).style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(status_bar, main_chunks[3]);
}

// Latest message as styled lines: bold labels, two columns of indent per
// nesting level.
fn message_lines(app: &App) -> Vec<Line<'static>> {
    match &app.display.last_message {
        None => vec![Line::from(Span::styled(
            "waiting for messages...",
            Style::default().fg(Color::DarkGray),
        ))],
        Some(value) => tree::render(value)
            .into_iter()
            .map(|line| {
                let indent = " ".repeat(line.depth * tree::INDENT_WIDTH);
                match line.kind {
                    LineKind::Label => Line::from(vec![
                        Span::raw(indent),
                        Span::styled(line.text, Style::default().add_modifier(Modifier::BOLD)),
                    ]),
                    LineKind::Literal => Line::from(vec![Span::raw(indent), Span::raw(line.text)]),
                }
            })
            .collect(),
    }
}
