/// Cluster Live terminal
///
/// Heatmap overview of every symbol pushed by the cluster backend, with a
/// per-symbol detail page showing the cluster graph and the recent tape.
use std::{
    error::Error,
    io,
    ops::Range,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use cluster_live::{
    Config, ConnectionStatus, DetailModel, FeedClient, HeatTier, OverviewTile, RenderedBin,
    RenderedCluster, SymbolStore, ViewController, ViewModel, heat_percent, ingest, init_logging,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table},
};
use rustls::crypto::ring::default_provider;
use tokio::sync::Mutex;
use tracing::{info, warn};

const TILES_PER_ROW: usize = 5;
const TILE_HEIGHT: u16 = 5;

const MAGENTA: Color = Color::Rgb(255, 0, 231);
const PINK: Color = Color::Rgb(219, 39, 119);
const BLUE: Color = Color::Rgb(96, 165, 250);
const MINT: Color = Color::Rgb(22, 249, 210);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = default_provider().install_default();

    let config = Config::from_env();
    init_logging(config.log_file.as_deref())?;
    info!(url = %config.ws_url, "starting cluster-live");

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let store = Arc::new(Mutex::new(SymbolStore::new()));
    let connected = Arc::new(AtomicBool::new(false));

    let (mut frame_rx, mut status_rx) = FeedClient::with_config(config.feed_config()).start();

    {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                let mut guard = store.lock().await;
                if let Err(e) = ingest(&mut guard, &frame) {
                    warn!("dropping malformed message: {}", e);
                }
            }
        });
    }

    {
        let connected_flag = Arc::clone(&connected);
        tokio::spawn(async move {
            while let Some(status) = status_rx.recv().await {
                info!(status = status.label(), "feed status changed");
                connected_flag.store(status == ConnectionStatus::Connected, Ordering::Relaxed);
            }
        });
    }

    let result = run_app(&mut terminal, &store, &connected, config.render_interval).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    store: &Mutex<SymbolStore>,
    connected: &AtomicBool,
    tick_rate: Duration,
) -> Result<(), Box<dyn Error>> {
    let mut view = ViewController::new();
    let mut cursor = 0usize;
    let mut model = ViewModel::NoData;
    let mut last_tick: Option<Instant> = None;

    loop {
        if last_tick.is_none_or(|t| t.elapsed() >= tick_rate) {
            model = {
                let guard = store.lock().await;
                view.current_model(&guard)
            };
            if let ViewModel::Overview(tiles) = &model {
                cursor = cursor.min(tiles.len().saturating_sub(1));
            }
            let is_connected = connected.load(Ordering::Relaxed);
            terminal.draw(|f| render_ui(f, &model, cursor, is_connected))?;
            last_tick = Some(Instant::now());
        }

        let timeout = last_tick
            .and_then(|t| tick_rate.checked_sub(t.elapsed()))
            .unwrap_or_else(|| Duration::from_secs(0));
        if !event::poll(timeout)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        match (&model, key.code) {
            (_, KeyCode::Char('q')) => break,
            (ViewModel::Detail(_), KeyCode::Esc | KeyCode::Backspace) => view.back(),
            (ViewModel::Detail(_), _) => continue,
            (_, KeyCode::Esc) => break,
            (ViewModel::Overview(tiles), code) => {
                let last = tiles.len().saturating_sub(1);
                match code {
                    KeyCode::Left | KeyCode::Char('h') => cursor = cursor.saturating_sub(1),
                    KeyCode::Right | KeyCode::Char('l') => cursor = (cursor + 1).min(last),
                    KeyCode::Up | KeyCode::Char('k') => {
                        cursor = cursor.saturating_sub(TILES_PER_ROW)
                    }
                    KeyCode::Down | KeyCode::Char('j') => {
                        cursor = (cursor + TILES_PER_ROW).min(last)
                    }
                    KeyCode::Enter => {
                        if let Some(tile) = tiles.get(cursor) {
                            let guard = store.lock().await;
                            view.select(&tile.symbol, &guard);
                        }
                    }
                    _ => continue,
                }
            }
            (ViewModel::NoData, _) => continue,
        }

        // Redraw immediately after input
        last_tick = None;
    }

    Ok(())
}

fn render_ui(f: &mut Frame, model: &ViewModel, cursor: usize, connected: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, chunks[0], connected);

    match model {
        ViewModel::NoData => render_loading(f, chunks[1]),
        ViewModel::Overview(tiles) => render_overview(f, chunks[1], tiles, cursor),
        ViewModel::Detail(detail) => render_detail(f, chunks[1], detail),
    }

    let hint = footer_hint(model);
    let footer = Paragraph::new(Line::from(vec![
        Span::styled("Live Binance USDT clusters", Style::default().fg(Color::Gray)),
        Span::raw("  •  "),
        Span::styled(hint, Style::default().fg(Color::DarkGray)),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(footer, chunks[2]);
}

fn render_header(f: &mut Frame, area: Rect, connected: bool) {
    let (status, color) = if connected {
        ("● LIVE", Color::Green)
    } else {
        ("○ OFFLINE", Color::Red)
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "CRYPTO CLUSTER LIVE",
            Style::default().fg(MAGENTA).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(status, Style::default().fg(color)),
    ]))
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn render_loading(f: &mut Frame, area: Rect) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);
    let loading = Paragraph::new("Loading live Binance clusters...")
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(loading, vertical[1]);
}

fn tier_color(tier: HeatTier) -> Color {
    match tier {
        HeatTier::Critical => MAGENTA,
        HeatTier::Hot => PINK,
        HeatTier::Normal => BLUE,
    }
}

fn render_overview(f: &mut Frame, area: Rect, tiles: &[OverviewTile], cursor: usize) {
    let block = Block::default()
        .title(" Binance cluster heatmap ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Rgb(225, 186, 255)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let visible_rows = ((inner.height / TILE_HEIGHT) as usize).max(1);
    let cursor_row = cursor / TILES_PER_ROW;
    let first_row = (cursor_row + 1).saturating_sub(visible_rows);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(TILE_HEIGHT); visible_rows])
        .split(inner);

    for (row_index, row_area) in rows.iter().enumerate() {
        let start = (first_row + row_index) * TILES_PER_ROW;
        if start >= tiles.len() {
            break;
        }
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, TILES_PER_ROW as u32); TILES_PER_ROW])
            .split(*row_area);

        for (offset, tile) in tiles[start..].iter().take(TILES_PER_ROW).enumerate() {
            render_tile(f, columns[offset], tile, start + offset == cursor);
        }
    }
}

fn render_tile(f: &mut Frame, area: Rect, tile: &OverviewTile, selected: bool) {
    let color = tier_color(tile.tier);
    let border_type = if selected {
        BorderType::Double
    } else if tile.tier.is_emphasised() {
        BorderType::Thick
    } else {
        BorderType::Rounded
    };
    let mut symbol_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    if selected {
        symbol_style = symbol_style.add_modifier(Modifier::REVERSED);
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(Style::default().fg(color));
    let width = block.inner(area).width.saturating_sub(1) as usize;

    let filled = ((tile.heat * width as f64).round() as usize).min(width);
    let lines = vec![
        Line::from(Span::styled(tile.symbol.clone(), symbol_style)),
        Line::from(vec![
            Span::styled("█".repeat(filled), Style::default().fg(MAGENTA)),
            Span::styled(
                "░".repeat(width - filled),
                Style::default().fg(Color::Rgb(55, 55, 147)),
            ),
        ]),
        Line::from(Span::styled(
            format!("Heat: {}%", heat_percent(tile.heat)),
            Style::default().fg(PINK),
        )),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_detail(f: &mut Frame, area: Rect, detail: &DetailModel) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Percentage(55),
            Constraint::Min(6),
        ])
        .split(area);

    let title = Paragraph::new(vec![
        Line::from(Span::styled("← Back to market (Esc)", Style::default().fg(PINK))),
        Line::from(vec![
            Span::styled(
                detail.symbol.clone(),
                Style::default().fg(MAGENTA).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                format!("Heat {}% ({})", heat_percent(detail.heat), detail.tier),
                Style::default().fg(tier_color(detail.tier)),
            ),
        ]),
    ]);
    f.render_widget(title, chunks[0]);

    render_cluster_graph(f, chunks[1], detail);
    render_tape(f, chunks[2], detail);
}

/// Key hints for the footer. Esc goes back from the detail page and quits
/// everywhere else.
fn footer_hint(model: &ViewModel) -> &'static str {
    match model {
        ViewModel::Detail(_) => "Esc back • q quit",
        ViewModel::Overview(_) => "←↑↓→ move • Enter open • Esc/q quit",
        ViewModel::NoData => "Esc/q quit",
    }
}

fn render_cluster_graph(f: &mut Frame, area: Rect, detail: &DetailModel) {
    let title = match detail.max_total {
        Some(max) => format!(" Cluster graph (1m) • max total {max:.3} "),
        None => " Cluster graph (1m) ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Rgb(233, 213, 255)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if detail.clusters.is_empty() {
        let empty = Paragraph::new("No clusters yet").style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, inner);
        return;
    }

    let lines = cluster_graph_lines(&detail.clusters, inner.height as usize, inner.width as usize);
    f.render_widget(Paragraph::new(lines), inner);
}

/// Column width taken by `bins` bars: at least wide enough for the `HH:MM`
/// label, plus one separator column
fn column_width(bins: usize) -> usize {
    bins.max(5) + 1
}

fn cluster_width(cluster: &RenderedCluster) -> usize {
    column_width(cluster.bins.len())
}

/// Which clusters fit in the graph, and which bins of the newest one
#[derive(Debug, Clone, PartialEq, Eq)]
struct GraphLayout {
    /// Index of the oldest visible cluster
    first: usize,
    /// Bins drawn for the newest cluster
    newest_bins: Range<usize>,
}

/// Lay clusters out newest on the right. The newest cluster is always shown;
/// when it is wider than the area its bins are cut to a window around its
/// peak. Older clusters are added while they fit whole.
fn graph_layout(clusters: &[RenderedCluster], width: usize) -> Option<GraphLayout> {
    let newest = clusters.last()?;
    if width < 2 {
        return None;
    }

    let max_bins = width - 1;
    let len = newest.bins.len();
    let newest_bins = if len <= max_bins {
        0..len
    } else {
        let peak = newest.peak_index().unwrap_or(0);
        let start = peak.saturating_sub(max_bins / 2).min(len - max_bins);
        start..start + max_bins
    };

    let mut used = column_width(newest_bins.len()).min(width);
    let mut first = clusters.len() - 1;
    while first > 0 && used + cluster_width(&clusters[first - 1]) <= width {
        first -= 1;
        used += cluster_width(&clusters[first]);
    }

    Some(GraphLayout { first, newest_bins })
}

/// Draw clusters as vertical bars with a time label row and a caption naming
/// the newest cluster's peak bin
fn cluster_graph_lines(
    clusters: &[RenderedCluster],
    height: usize,
    width: usize,
) -> Vec<Line<'static>> {
    if height < 3 {
        return Vec::new();
    }
    let Some(layout) = graph_layout(clusters, width) else {
        return Vec::new();
    };
    let bar_rows = height - 2;
    let newest_index = clusters.len() - 1;

    let visible: Vec<(&RenderedCluster, &[RenderedBin])> = clusters[layout.first..]
        .iter()
        .enumerate()
        .map(|(offset, cluster)| {
            let bins = if layout.first + offset == newest_index {
                &cluster.bins[layout.newest_bins.clone()]
            } else {
                &cluster.bins[..]
            };
            (cluster, bins)
        })
        .collect();

    let mut lines = Vec::with_capacity(height);
    for row in 0..bar_rows {
        let level = bar_rows - row;
        let mut spans = Vec::new();
        for (_, bins) in &visible {
            for bin in bins.iter() {
                let bar_height = ((bin.relative_height * (bar_rows - 1) as f64).round() as usize) + 1;
                let color = if bin.is_peak { MAGENTA } else { BLUE };
                let glyph = if bar_height >= level { "█" } else { " " };
                spans.push(Span::styled(glyph, Style::default().fg(color)));
            }
            let padding = column_width(bins.len()) - bins.len();
            spans.push(Span::raw(" ".repeat(padding)));
        }
        lines.push(Line::from(spans));
    }

    let labels: Vec<Span> = visible
        .iter()
        .map(|(cluster, bins)| {
            Span::styled(
                format!("{:<w$}", cluster.start_label, w = column_width(bins.len())),
                Style::default().fg(Color::Rgb(233, 213, 255)),
            )
        })
        .collect();
    lines.push(Line::from(labels));

    let caption = match clusters[newest_index].peak_bin() {
        Some(peak) => format!("Peak {} • Volume {:.3}", peak.label, peak.volume),
        None => "Latest cluster has no bins".to_string(),
    };
    lines.push(Line::from(Span::styled(caption, Style::default().fg(MAGENTA))));

    lines
}

fn render_tape(f: &mut Frame, area: Rect, detail: &DetailModel) {
    let header = Row::new(vec!["Time", "Price", "Volume", "Side"])
        .style(Style::default().fg(Color::Rgb(165, 180, 252)).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = detail
        .tape
        .iter()
        .map(|trade| {
            let color = if trade.side.is_buy() { MINT } else { PINK };
            Row::new(vec![
                Cell::from(trade.time.to_string()),
                Cell::from(trade.price.to_string()),
                Cell::from(trade.volume.to_string()),
                Cell::from(Span::styled(
                    trade.side.as_str(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(" Trade tape (latest) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(247, 226, 255))),
    );

    f.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_live::{Cluster, normalize_cluster};
    use chrono::{DateTime, Utc};

    fn rendered(bins: &[(String, f64)]) -> RenderedCluster {
        normalize_cluster(&Cluster {
            start: DateTime::<Utc>::from_timestamp_millis(0).unwrap(),
            total: bins.iter().map(|(_, v)| v).sum(),
            bins: bins.iter().cloned().collect(),
        })
    }

    fn flat(len: usize, peak: Option<usize>) -> RenderedCluster {
        let bins: Vec<_> = (0..len)
            .map(|i| (i.to_string(), if Some(i) == peak { 9.0 } else { 1.0 }))
            .collect();
        rendered(&bins)
    }

    fn bar_count(line: &Line) -> usize {
        line.spans.iter().filter(|span| span.content == "█").count()
    }

    #[test]
    fn test_graph_layout() {
        struct TestCase {
            clusters: Vec<RenderedCluster>,
            width: usize,
            expected: Option<GraphLayout>,
        }

        let tests = vec![
            TestCase {
                // TC0: small clusters all fit
                clusters: vec![flat(3, None), flat(3, None), flat(3, None)],
                width: 80,
                expected: Some(GraphLayout { first: 0, newest_bins: 0..3 }),
            },
            TestCase {
                // TC1: oldest clusters dropped, 4 x 11 columns fit in 50
                clusters: (0..20).map(|_| flat(10, None)).collect(),
                width: 50,
                expected: Some(GraphLayout { first: 16, newest_bins: 0..10 }),
            },
            TestCase {
                // TC2: oversized newest cluster cut to a window around its peak
                clusters: vec![flat(3, None), flat(200, Some(150))],
                width: 78,
                expected: Some(GraphLayout { first: 1, newest_bins: 112..189 }),
            },
            TestCase {
                // TC3: window clamps to the end of the bins
                clusters: vec![flat(200, Some(199))],
                width: 80,
                expected: Some(GraphLayout { first: 0, newest_bins: 121..200 }),
            },
            TestCase {
                // TC4: nothing to draw
                clusters: vec![],
                width: 80,
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(graph_layout(&test.clusters, test.width), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_cluster_graph_lines_oversized_newest_cluster() {
        let clusters = vec![flat(200, Some(150))];
        let lines = cluster_graph_lines(&clusters, 10, 78);

        // 8 bar rows, a label row and the caption
        assert_eq!(lines.len(), 10);
        assert_eq!(bar_count(&lines[7]), 77);
        // Only the peak reaches the top row
        assert_eq!(bar_count(&lines[0]), 1);
        assert_eq!(lines[9].spans[0].content, "Peak 150 • Volume 9.000");
    }

    #[test]
    fn test_cluster_graph_lines_too_small() {
        let clusters = vec![flat(3, Some(1))];
        assert!(cluster_graph_lines(&clusters, 2, 80).is_empty());
        assert!(cluster_graph_lines(&clusters, 10, 1).is_empty());
        assert!(cluster_graph_lines(&[], 10, 80).is_empty());
    }

    #[test]
    fn test_cluster_graph_caption_without_bins() {
        let lines = cluster_graph_lines(&[flat(0, None)], 4, 20);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3].spans[0].content, "Latest cluster has no bins");
    }

    #[test]
    fn test_footer_hint_mentions_esc() {
        assert_eq!(footer_hint(&ViewModel::NoData), "Esc/q quit");
        assert!(footer_hint(&ViewModel::Overview(Vec::new())).contains("Esc/q quit"));
        let detail = DetailModel {
            symbol: "BTCUSDT".to_string(),
            heat: 0.0,
            tier: HeatTier::Normal,
            clusters: Vec::new(),
            max_total: None,
            tape: Vec::new(),
        };
        assert!(footer_hint(&ViewModel::Detail(detail)).starts_with("Esc back"));
    }
}
