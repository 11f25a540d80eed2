use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tracing::info;
use tracing_subscriber::EnvFilter;

use matchboard::aggregate::{
    BarSplit, HeadToHeadRecord, PairKey, PlayerComparison, PlayerProfile, match_stat_bars,
};
use matchboard::classify::bucket_counts;
use matchboard::config::Config;
use matchboard::demo_feed;
use matchboard::feed::{self, FeedHandle};
use matchboard::standings::{FormResult, Medal, StandingRow, Zone, medal, zone};
use matchboard::state::{
    AppState, Bucket, ChannelStatus, DetailLookup, EventKind, Lookup, MatchState, ProviderCommand,
    Screen, apply_delta, parse_player_pair,
};

struct App {
    state: AppState,
    should_quit: bool,
    feed: FeedHandle,
}

impl App {
    fn new(state: AppState, feed: FeedHandle) -> Self {
        Self {
            state,
            should_quit: false,
            feed,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.player_prompt.is_some() {
            self.on_prompt_key(key);
            return;
        }
        if self.state.help_overlay {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
                self.state.help_overlay = false;
            } else if key.code == KeyCode::Char('q') {
                self.should_quit = true;
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.state.cycle_bucket(),
            KeyCode::Char('1') => self.state.set_bucket(Bucket::Live),
            KeyCode::Char('2') => self.state.set_bucket(Bucket::Upcoming),
            KeyCode::Char('3') => self.state.set_bucket(Bucket::Finished),
            KeyCode::Char('l') | KeyCode::Char('L') => self.state.cycle_league(),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.send(ProviderCommand::Refresh, "Refresh");
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('i') | KeyCode::Enter => self.request_detail(),
            KeyCode::Char('h') | KeyCode::Char('H') => self.open_head_to_head(),
            KeyCode::Char('t') | KeyCode::Char('T') => self.open_standings(),
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.state.player_prompt = Some(String::new());
            }
            KeyCode::Char('b') | KeyCode::Esc => self.state.screen = Screen::Board,
            KeyCode::Char('?') => self.state.help_overlay = true,
            _ => {}
        }
    }

    fn on_prompt_key(&mut self, key: KeyEvent) {
        let Some(input) = self.state.player_prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.state.player_prompt = None,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Enter => {
                let typed = input.clone();
                self.state.player_prompt = None;
                match parse_player_pair(&typed) {
                    Some((player1, player2)) => self.open_player_compare(player1, player2),
                    None => self
                        .state
                        .push_log(format!("[WARN] Expected two player ids, got \"{typed}\"")),
                }
            }
            KeyCode::Char(c) if input.len() < 24 => input.push(c),
            _ => {}
        }
    }

    fn send(&mut self, cmd: ProviderCommand, what: &str) -> bool {
        if self.feed.send(cmd) {
            true
        } else {
            self.state
                .push_log(format!("[WARN] {what} request failed: feed stopped"));
            false
        }
    }

    fn request_detail(&mut self) {
        let Some(m) = self.state.selected_match() else {
            self.state.push_log("[INFO] No match selected for details");
            return;
        };
        let in_flight = self
            .state
            .details
            .get(&m.id)
            .is_some_and(DetailLookup::is_loading);
        if in_flight {
            return;
        }
        if self.send(ProviderCommand::FetchMatchDetail { match_id: m.id }, "Details") {
            self.state.details.insert(m.id, DetailLookup::loading());
            self.state
                .push_log(format!("[INFO] Details requested for match {}", m.id));
        }
    }

    fn open_head_to_head(&mut self) {
        let Some(m) = self.state.selected_match() else {
            self.state.push_log("[INFO] No match selected for head-to-head");
            return;
        };
        let key = PairKey::new(m.home.id, m.away.id);
        self.state.focus_pair = Some(key);
        self.state.screen = Screen::HeadToHead;

        let needs_fetch = self
            .state
            .team_h2h
            .get(&key)
            .is_none_or(|lookup| lookup.is_retryable());
        if needs_fetch
            && self.send(
                ProviderCommand::FetchTeamH2h {
                    team1: m.home.id,
                    team2: m.away.id,
                },
                "Head-to-head",
            )
        {
            self.state.team_h2h.insert(key, Lookup::Loading);
        }
        let needs_compare = self
            .state
            .team_compare
            .get(&key)
            .is_none_or(|lookup| lookup.is_retryable());
        if needs_compare
            && self.send(
                ProviderCommand::FetchTeamCompare {
                    team1: m.home.id,
                    team2: m.away.id,
                },
                "Team comparison",
            )
        {
            self.state.team_compare.insert(key, Lookup::Loading);
        }
    }

    fn open_player_compare(&mut self, player1: u32, player2: u32) {
        let key = PairKey::new(player1, player2);
        self.state.focus_players = Some(key);
        self.state.screen = Screen::PlayerCompare;
        let needs_fetch = self
            .state
            .player_h2h
            .get(&key)
            .is_none_or(|lookup| lookup.is_retryable());
        if needs_fetch
            && self.send(
                ProviderCommand::FetchPlayerH2h { player1, player2 },
                "Player comparison",
            )
        {
            self.state.player_h2h.insert(key, Lookup::Loading);
        }
    }

    fn standings_league(&self) -> Option<u32> {
        self.state.view.league.or_else(|| {
            self.state
                .selected_match()
                .and_then(|m| m.league_id)
                .or_else(|| self.state.leagues.first().map(|l| l.id))
        })
    }

    fn open_standings(&mut self) {
        let Some(league_id) = self.standings_league() else {
            self.state.push_log("[INFO] No league to show standings for");
            return;
        };
        self.state.screen = Screen::Standings;
        let needs_fetch = self
            .state
            .standings
            .get(&league_id)
            .is_none_or(|lookup| lookup.is_retryable());
        if needs_fetch && self.send(ProviderCommand::FetchStandings { league_id }, "Standings") {
            self.state.standings.insert(league_id, Lookup::Loading);
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("matchboard=info"));
    match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
    {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(err) => eprintln!("log file {} unavailable: {err}", config.log_file),
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = Config::from_env();
    init_tracing(&config);
    info!(api = %config.api_base, ws = %config.ws_url, demo = config.demo, "starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let feed = if config.demo {
        demo_feed::spawn_demo_feed(tx)
    } else {
        feed::spawn_feed(&config, tx)
    };

    let state = AppState::new(matchboard::reconcile::PendingConfig {
        capacity: config.pending_capacity,
        max_age: config.pending_max_age,
    });
    let mut app = App::new(state, feed);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.feed.shutdown();
    info!("stopped");

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<matchboard::state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Board => render_board(frame, chunks[1], &app.state),
        Screen::HeadToHead => render_head_to_head(frame, chunks[1], &app.state),
        Screen::PlayerCompare => render_player_compare(frame, chunks[1], &app.state),
        Screen::Standings => render_standings(frame, chunks[1], app),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = match &app.state.player_prompt {
        Some(input) => Paragraph::new(format!(
            "Compare players (ids, e.g. 9 vs 11): {input}_   Enter go | Esc cancel"
        ))
        .style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let counts = bucket_counts(state.store().iter(), state.view.league);
    let tabs = Bucket::ALL
        .iter()
        .map(|b| {
            let label = format!("{} ({})", b.label(), counts.get(*b));
            if *b == state.view.bucket {
                format!("[{label}]")
            } else {
                format!(" {label} ")
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let refreshed = state
        .last_refresh
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let line1 = format!(
        "MATCHBOARD | {} | Live channel: {}",
        state.league_label(),
        channel_label(&state.channel)
    );
    let line2 = format!("{tabs} | Refreshed {refreshed}");
    let line3 = match &state.last_error {
        Some(err) => format!("Showing last good data: {err}"),
        None => String::new(),
    };
    format!("{line1}\n{line2}\n{line3}")
}

fn channel_label(status: &ChannelStatus) -> String {
    match status {
        ChannelStatus::Disabled => "off".to_string(),
        ChannelStatus::Connecting => "connecting".to_string(),
        ChannelStatus::Connected => "connected".to_string(),
        ChannelStatus::Waiting { attempt, delay } => {
            format!("retry #{attempt} in {:.0}s", delay.as_secs_f32().ceil())
        }
    }
}

fn footer_text(state: &AppState) -> &'static str {
    match state.screen {
        Screen::Board => {
            "Tab/1/2/3 Bucket | l League | j/k Move | i Details | h H2H | p Players | t Table | r Refresh | ? Help | q Quit"
        }
        Screen::HeadToHead | Screen::PlayerCompare | Screen::Standings => {
            "b/Esc Back | p Players | ? Help | q Quit"
        }
    }
}

fn render_board(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(36)])
        .split(area);

    let list_block = Block::default()
        .title(format!("{} matches", state.view.bucket.label()))
        .borders(Borders::ALL);
    let list_area = list_block.inner(columns[0]);
    frame.render_widget(list_block, columns[0]);

    let groups = state.visible_groups();
    if groups.is_empty() {
        let empty = Paragraph::new(format!(
            "No {} matches for {}",
            state.view.bucket.label().to_lowercase(),
            state.league_label()
        ))
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
    } else {
        let mut lines: Vec<Line> = Vec::new();
        let mut selected_line = 0;
        let mut row = 0;
        for group in &groups {
            lines.push(Line::from(Span::styled(
                group.label.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for m in &group.matches {
                let selected = row == state.selected;
                if selected {
                    selected_line = lines.len();
                }
                lines.push(match_line(m, selected));
                row += 1;
            }
        }
        let visible = list_area.height as usize;
        let (start, end) = visible_range(selected_line, lines.len(), visible);
        let window: Vec<Line> = lines.into_iter().skip(start).take(end - start).collect();
        frame.render_widget(Paragraph::new(window), list_area);
    }

    render_match_panel(frame, columns[1], state);
}

fn match_line(m: &MatchState, selected: bool) -> Line<'static> {
    let time = match (m.is_live(), m.minute) {
        (true, Some(minute)) => format!("{minute:>3}'"),
        (true, None) => m.status.code().to_string(),
        (false, _) => m.local_kickoff().format("%H:%M").to_string(),
    };
    let style = if selected {
        Style::default().fg(Color::White).bg(Color::DarkGray)
    } else {
        Style::default()
    };
    let status_style = match m.bucket() {
        Bucket::Live => style.fg(Color::Green),
        Bucket::Upcoming => style.fg(Color::Cyan),
        Bucket::Finished => style.fg(Color::Gray),
    };
    Line::from(vec![
        Span::styled(if selected { "> " } else { "  " }, style),
        Span::styled(format!("{time:<6}"), status_style),
        Span::styled(format!("{:>20} ", truncate(&m.home.name, 20)), style),
        Span::styled(format!("{:^5}", m.score_text()), style.add_modifier(Modifier::BOLD)),
        Span::styled(format!(" {:<20}", truncate(&m.away.name, 20)), style),
        Span::styled(format!(" {}", m.status.label()), status_style),
    ])
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn render_match_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Match").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(m) = state.selected_match() else {
        frame.render_widget(Paragraph::new("No match selected"), inner);
        return;
    };

    let mut lines: Vec<Line> = vec![
        Line::from(format!("{} vs {}", m.home.name, m.away.name)),
        Line::from(format!("{}  {}", m.score_text(), m.status.label())),
        Line::from(format!(
            "Kickoff {}",
            m.local_kickoff().format("%a %d %b %H:%M")
        )),
    ];
    if let Some(p) = m.prediction {
        lines.push(Line::from(format!(
            "Pred H{:.0} D{:.0} A{:.0}",
            p.home * 100.0,
            p.draw * 100.0,
            p.away * 100.0
        )));
    }

    let width = inner.width.saturating_sub(2) as usize;
    if let Some(stats) = &m.statistics {
        lines.push(Line::from(""));
        for (name, home, away, bars) in match_stat_bars(stats) {
            lines.push(Line::from(format!("{name}: {home} - {away}")));
            lines.push(split_line(width, &bars));
        }
    }
    if let Some(timeline) = &m.timeline {
        lines.push(Line::from(""));
        if timeline.is_empty() {
            lines.push(Line::from("No events"));
        }
        for event in timeline.iter().rev().take(8) {
            let side = if event.team_id == Some(m.home.id) {
                "H"
            } else if event.team_id == Some(m.away.id) {
                "A"
            } else {
                "-"
            };
            lines.push(Line::from(format!(
                "{:>3}' {} {} {}",
                event.minute,
                event_kind_label(event.kind),
                side,
                event.player.as_deref().unwrap_or_default()
            )));
        }
    }
    let hint = match state.details.get(&m.id) {
        None if m.timeline.is_none() && m.statistics.is_none() => {
            Some("i: load events and stats".to_string())
        }
        None => None,
        Some(detail) if detail.is_loading() => Some("Loading details...".to_string()),
        Some(detail) if detail.is_unavailable() => {
            Some("No events or stats for this match".to_string())
        }
        Some(detail) => [("Events", &detail.timeline), ("Stats", &detail.statistics)]
            .into_iter()
            .find_map(|(what, slot)| match slot {
                Lookup::Failed(err) => Some(format!("{what} failed: {err} (i to retry)")),
                _ => None,
            }),
    };
    if let Some(hint) = hint {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn event_kind_label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Goal => "GOAL",
        EventKind::Card => "CARD",
        EventKind::Sub => "SUB",
        EventKind::Other => "EVT",
    }
}

fn split_line(width: usize, bars: &BarSplit) -> Line<'static> {
    let left = ((bars.left_pct / 100.0) * width as f64).round() as usize;
    let right = ((bars.right_pct / 100.0) * width as f64).round() as usize;
    let left = left.min(width);
    let right = right.min(width - left);
    let gap = width - left - right;
    Line::from(vec![
        Span::styled("█".repeat(left), Style::default().fg(Color::Green)),
        Span::raw(" ".repeat(gap)),
        Span::styled("█".repeat(right), Style::default().fg(Color::Red)),
    ])
}

fn render_head_to_head(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Head to head").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(key) = state.focus_pair else {
        frame.render_widget(Paragraph::new("Select a match and press h"), inner);
        return;
    };
    let text: Vec<Line> = match state.team_h2h.get(&key) {
        None | Some(Lookup::Loading) => vec![Line::from("Loading head-to-head...")],
        Some(Lookup::Unavailable) => vec![Line::from("No head-to-head data for these teams")],
        Some(Lookup::Failed(err)) => vec![Line::from(format!("Could not load: {err}"))],
        Some(Lookup::Ready(record)) => h2h_lines(record, state, key, inner.width as usize),
    };
    frame.render_widget(Paragraph::new(text), inner);
}

fn h2h_lines(
    record: &HeadToHeadRecord,
    state: &AppState,
    key: PairKey,
    width: usize,
) -> Vec<Line<'static>> {
    let bar_width = width.saturating_sub(2);
    let split = record.win_split();
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} vs {}", record.team1.name, record.team2.name),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            "{} meetings: {} wins {} | {} draws | {} wins {}",
            record.total,
            record.team1.name,
            record.team1_wins,
            record.draws,
            record.team2.name,
            record.team2_wins
        )),
        Line::from(format!(
            "{}% / {}% / {}%",
            split.team1_pct, split.draw_pct, split.team2_pct
        )),
        three_way_line(bar_width, split.team1_pct, split.draw_pct, split.team2_pct),
        Line::from(""),
        Line::from(format!(
            "Goals {} - {}",
            record.team1_goals, record.team2_goals
        )),
        split_line(bar_width, &record.goal_bars()),
        Line::from(""),
    ];

    if let Some(Lookup::Ready(cmp)) = state.team_compare.get(&key) {
        lines.push(Line::from(Span::styled(
            "Season comparison",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for field in &cmp.diff.fields {
            lines.push(Line::from(format!(
                "{:<14} {:>6.1} {:>6.1} ({:+.1})",
                field.name,
                field.left,
                field.right,
                field.diff()
            )));
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "Recent meetings",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for m in record.recent(5) {
        let date = m
            .date
            .map(|d| d.with_timezone(&Local).format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        let score = match (m.home_score, m.away_score) {
            (Some(h), Some(a)) => format!("{h}-{a}"),
            _ => "-".to_string(),
        };
        lines.push(Line::from(format!(
            "{date}  {} {score} {}",
            m.home_team.as_deref().unwrap_or("?"),
            m.away_team.as_deref().unwrap_or("?")
        )));
    }
    lines
}

fn render_player_compare(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Player comparison").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(key) = state.focus_players else {
        frame.render_widget(Paragraph::new("Press p and enter two player ids"), inner);
        return;
    };
    let text: Vec<Line> = match state.player_h2h.get(&key) {
        None | Some(Lookup::Loading) => vec![Line::from("Loading player comparison...")],
        Some(Lookup::Unavailable) => vec![Line::from("One of these players was not found")],
        Some(Lookup::Failed(err)) => vec![Line::from(format!("Could not load: {err}"))],
        Some(Lookup::Ready(cmp)) => player_lines(cmp, inner.width as usize),
    };
    frame.render_widget(Paragraph::new(text), inner);
}

fn player_lines(cmp: &PlayerComparison, width: usize) -> Vec<Line<'static>> {
    let bar_width = width.saturating_sub(2);
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} vs {}", cmp.player1.name, cmp.player2.name),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            "{} | {}",
            player_summary(&cmp.player1),
            player_summary(&cmp.player2)
        )),
        Line::from(""),
    ];
    for field in &cmp.bars.fields {
        lines.push(Line::from(format!(
            "{:<8} {:>6.1} {:>6.1} ({:+.1})",
            field.name,
            field.left,
            field.right,
            field.diff()
        )));
        lines.push(split_line(bar_width, &field.bars));
    }
    lines
}

fn player_summary(player: &PlayerProfile) -> String {
    let mut parts = vec![player.name.clone()];
    if let Some(position) = &player.position {
        parts.push(position.clone());
    }
    if let Some(team) = &player.team {
        parts.push(team.name.clone());
    }
    if player.stats.is_none() {
        parts.push("no season stats".to_string());
    }
    parts.join(", ")
}

fn three_way_line(width: usize, left: u8, mid: u8, right: u8) -> Line<'static> {
    let l = (left as usize * width) / 100;
    let r = (right as usize * width) / 100;
    let m = if mid == 0 { 0 } else { width.saturating_sub(l + r) };
    Line::from(vec![
        Span::styled("█".repeat(l), Style::default().fg(Color::Green)),
        Span::styled("█".repeat(m), Style::default().fg(Color::Yellow)),
        Span::styled("█".repeat(r), Style::default().fg(Color::Red)),
    ])
}

fn render_standings(frame: &mut Frame, area: Rect, app: &App) {
    let state = &app.state;
    let league_id = app.standings_league();
    let title = match league_id {
        Some(id) => state
            .leagues
            .iter()
            .find(|l| l.id == id)
            .map(|l| format!("Standings: {}", l.name))
            .unwrap_or_else(|| format!("Standings: league {id}")),
        None => "Standings".to_string(),
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lookup = league_id.and_then(|id| state.standings.get(&id));
    let lines: Vec<Line> = match lookup {
        None | Some(Lookup::Loading) => vec![Line::from("Loading standings...")],
        Some(Lookup::Unavailable) => vec![Line::from("No standings for this league")],
        Some(Lookup::Failed(err)) => vec![Line::from(format!("Could not load: {err}"))],
        Some(Lookup::Ready(rows)) => standings_lines(rows),
    };
    frame.render_widget(Paragraph::new(lines), inner);
}

fn standings_lines(rows: &[StandingRow]) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{:>3}  {:<22} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4}  Form",
            "#", "Team", "P", "W", "D", "L", "GD", "Pts"
        ),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    for row in rows {
        let zone_style = match zone(row.rank, rows.len()) {
            Zone::Continental => Style::default().fg(Color::Blue),
            Zone::Relegation => Style::default().fg(Color::Red),
            Zone::Mid => Style::default(),
        };
        let marker = match medal(row.rank) {
            Some(Medal::Gold) => "🥇",
            Some(Medal::Silver) => "🥈",
            Some(Medal::Bronze) => "🥉",
            None => "  ",
        };
        let mut spans = vec![
            Span::styled(format!("{:>3}", row.rank), zone_style),
            Span::raw(marker),
            Span::raw(format!(
                "{:<22} {:>3} {:>3} {:>3} {:>3} {:>+4} {:>4}  ",
                truncate(&row.team_name, 22),
                row.played,
                row.won,
                row.drawn,
                row.lost,
                row.goal_difference,
                row.points
            )),
        ];
        for result in row.form_results() {
            let color = match result {
                FormResult::Win => Color::Green,
                FormResult::Draw => Color::Yellow,
                FormResult::Loss => Color::Red,
            };
            spans.push(Span::styled(
                result.letter().to_string(),
                Style::default().fg(color),
            ));
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No feed activity yet".to_string();
    }
    let start = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Matchboard - Help",
        "",
        "Board:",
        "  Tab          Next bucket",
        "  1 / 2 / 3    Live / Upcoming / Finished",
        "  l            Cycle league filter",
        "  j/k or ↑/↓   Move",
        "  i / Enter    Load events and stats",
        "  h            Head to head for selected match",
        "  t            League standings",
        "  p            Compare two players by id",
        "  r            Refresh now",
        "",
        "Global:",
        "  b / Esc      Back",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
