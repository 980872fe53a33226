use crate::analytics::{
    summarize, ChartData, StatementSummary, COMPOSITION_CHART_TITLE, EQUITY_CHART_TITLE,
};
use crate::error::Result;
use crate::normalizer::Statement;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType,
        Paragraph, Row, Table, TableState,
    },
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    EquityExposure,
    Composition,
    RawData,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::EquityExposure => Page::Composition,
            Page::Composition => Page::RawData,
            Page::RawData => Page::EquityExposure,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::EquityExposure => Page::RawData,
            Page::Composition => Page::EquityExposure,
            Page::RawData => Page::Composition,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::EquityExposure => "Equity Exposure",
            Page::Composition => "Composition",
            Page::RawData => "Raw Data",
        }
    }
}

pub struct App {
    pub filename: String,
    pub statement: Statement,
    pub summary: StatementSummary,
    pub charts: ChartData,
    pub state: TableState,
    pub current_page: Page,
}

impl App {
    pub fn new(filename: &str, statement: Statement) -> Self {
        let mut state = TableState::default();
        state.select(Some(0));

        Self {
            filename: filename.to_string(),
            summary: summarize(&statement),
            charts: ChartData::from_statement(&statement),
            statement,
            state,
            current_page: Page::EquityExposure,
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.statement.len();
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.statement.len();
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let last = self.statement.len() - 1;
        let i = self.state.selected().map(|i| (i + 10).min(last)).unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map(|i| i.saturating_sub(10)).unwrap_or(0);
        self.state.select(Some(i));
    }

    /// Line chart points: x = days since the earliest date
    pub fn exposure_points(&self) -> Vec<(f64, f64)> {
        let origin = self.summary.first_date;
        self.charts
            .equity_exposure
            .iter()
            .map(|p| ((p.date - origin).num_days() as f64, p.cumulative))
            .collect()
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('1') => app.current_page = Page::EquityExposure,
                KeyCode::Char('2') => app.current_page = Page::Composition,
                KeyCode::Char('3') => app.current_page = Page::RawData,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => app.state.select(Some(app.statement.len() - 1)),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::EquityExposure => render_equity_chart(f, chunks[1], app),
        Page::Composition => render_composition(f, chunks[1], app),
        Page::RawData => render_table(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::EquityExposure, Page::Composition, Page::RawData];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        app.filename.clone(),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("↑ {:.2}", app.summary.total_inflow),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("↓ {:.2}", app.summary.total_outflow),
        Style::default().fg(Color::Red),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_equity_chart(f: &mut Frame, area: Rect, app: &App) {
    let points = app.exposure_points();

    let max_x = points.iter().map(|p| p.0).fold(1.0, f64::max);
    let (min_y, max_y) = points
        .iter()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
    let pad = ((max_y - min_y) * 0.05).max(1.0);

    let datasets = vec![Dataset::default()
        .name("Equity Exposure")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points)];

    let label_style = Style::default().fg(Color::DarkGray);
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} ", EQUITY_CHART_TITLE)),
        )
        .x_axis(
            Axis::default()
                .title("Date")
                .style(label_style)
                .bounds([0.0, max_x])
                .labels(vec![
                    Span::raw(app.summary.first_date.to_string()),
                    Span::raw(app.summary.last_date.to_string()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Exposure Amount")
                .style(label_style)
                .bounds([min_y - pad, max_y + pad])
                .labels(vec![
                    Span::raw(format!("{:.0}", min_y - pad)),
                    Span::raw(format!("{:.0}", max_y + pad)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_composition(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let gross: f64 = app.charts.composition.iter().map(|c| c.total.abs()).sum();

    let bars: Vec<Bar> = app
        .charts
        .composition
        .iter()
        .map(|c| {
            let share = if gross > 0.0 { c.total.abs() / gross * 100.0 } else { 0.0 };
            let color = if c.total >= 0.0 { Color::Green } else { Color::Red };

            Bar::default()
                .label(Line::from(truncate(&c.category, 14)))
                .value(c.total.abs().round() as u64)
                .text_value(format!("{:.2} ({:.0}%)", c.total, share))
                .style(Style::default().fg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} ", COMPOSITION_CHART_TITLE)),
        )
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, chunks[0]);

    let summary = &app.summary;
    let metric = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(
                format!("  {}: ", name),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(value),
        ])
    };

    let content = vec![
        Line::from(""),
        metric("Rows", summary.row_count.to_string()),
        metric("From", summary.first_date.to_string()),
        metric("To", summary.last_date.to_string()),
        Line::from(""),
        metric("Inflow", format!("{:.2}", summary.total_inflow)),
        metric("Outflow", format!("{:.2}", summary.total_outflow)),
        metric("Net equity", format!("{:.2}", summary.net_equity_exposure)),
        Line::from(""),
        metric("Mean risk", format!("{:.4}", summary.mean_risk_score)),
        metric("Max risk", format!("{:.4}", summary.max_risk_score)),
    ];

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Summary "),
    );

    f.render_widget(panel, chunks[1]);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Date", "Amount", "Category", "Equity Exposure", "Risk Score"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.statement.iter().map(|tx| {
        let color = if tx.amount < 0.0 { Color::Red } else { Color::Green };

        let cells = vec![
            Cell::from(tx.date.to_string()),
            Cell::from(format!("{:.2}", tx.amount)).style(Style::default().fg(color)),
            Cell::from(truncate(&tx.category, 20)),
            Cell::from(format!("{:.2}", tx.equity_exposure)),
            Cell::from(format!("{:.6}", tx.risk_score)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Length(22),
            Constraint::Length(16),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Transactions "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, app.statement.len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("1-3", Style::default().fg(Color::Yellow)),
        Span::raw(" Jump | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" Fast | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
