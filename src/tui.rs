use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::dashboard::{Dashboard, StatusFilter};
use crate::db::Database;
use crate::form::{self, Draft};
use crate::models::{ApplicationStatus, Company, JobApplication, WorkType};
use crate::notify::{LastNotification, Notification, Notifier, Severity};
use crate::session::Session;

enum Mode {
    Browse,
    Form(FormState),
}

struct AppState {
    user_id: i64,
    email: String,
    dashboard: Dashboard,
    search: String,
    status_filter: StatusFilter,
    selected: usize,
    scroll_offset: u16,
    mode: Mode,
    note: LastNotification,
}

impl AppState {
    fn new(user_id: i64, email: String, dashboard: Dashboard) -> Self {
        Self {
            user_id,
            email,
            dashboard,
            search: String::new(),
            status_filter: StatusFilter::All,
            selected: 0,
            scroll_offset: 0,
            mode: Mode::Browse,
            note: LastNotification::default(),
        }
    }

    fn filtered(&self) -> Vec<&JobApplication> {
        self.dashboard
            .filter(&self.search, self.status_filter)
            .collect()
    }

    fn selected_application(&self) -> Option<&JobApplication> {
        self.filtered().get(self.selected).copied()
    }

    fn next(&mut self) {
        let len = self.filtered().len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn reload(&mut self, db: &Database) {
        if let Err(e) = self.dashboard.load(db, self.user_id) {
            self.note
                .notify(Notification::error("Error", format!("{:#}", e)));
        }
        self.selected = 0;
    }
}

// Form field order, top to bottom.
const FIELD_POSITION: usize = 0;
const FIELD_COMPANY: usize = 1;
const FIELD_NEW_COMPANY: usize = 2;
const FIELD_DATE: usize = 3;
const FIELD_STATUS: usize = 4;
const FIELD_WORK_TYPE: usize = 5;
const FIELD_LOCATION: usize = 6;
const FIELD_SALARY: usize = 7;
const FIELD_DESCRIPTION: usize = 8;
const FIELD_NOTES: usize = 9;
const FIELD_COUNT: usize = 10;

struct FormState {
    draft: Draft,
    date_input: String,
    field: usize,
    companies: Vec<Company>,
}

impl FormState {
    fn new(companies: Vec<Company>) -> Self {
        let draft = Draft::new();
        let date_input = draft.application_date.format("%Y-%m-%d").to_string();
        Self {
            draft,
            date_input,
            field: FIELD_POSITION,
            companies,
        }
    }

    fn next_field(&mut self) {
        self.field = (self.field + 1) % FIELD_COUNT;
    }

    fn prev_field(&mut self) {
        self.field = (self.field + FIELD_COUNT - 1) % FIELD_COUNT;
    }

    /// Left/Right on the company row walks none -> each saved company.
    fn cycle_company(&mut self, forward: bool) {
        if self.companies.is_empty() {
            return;
        }
        let current = self
            .draft
            .company_id
            .and_then(|id| self.companies.iter().position(|c| c.id == id));
        // Positions: None is slot 0, company i is slot i+1.
        let slots = self.companies.len() + 1;
        let slot = current.map(|i| i + 1).unwrap_or(0);
        let next = if forward {
            (slot + 1) % slots
        } else {
            (slot + slots - 1) % slots
        };
        let id = if next == 0 {
            None
        } else {
            Some(self.companies[next - 1].id)
        };
        self.draft.select_company(id);
    }

    fn cycle_status(&mut self, forward: bool) {
        let all = ApplicationStatus::ALL;
        let idx = all.iter().position(|s| *s == self.draft.status).unwrap_or(0);
        let next = if forward {
            (idx + 1) % all.len()
        } else {
            (idx + all.len() - 1) % all.len()
        };
        self.draft.status = all[next];
    }

    fn cycle_work_type(&mut self, forward: bool) {
        let options = [
            None,
            Some(WorkType::Remote),
            Some(WorkType::Hybrid),
            Some(WorkType::Onsite),
        ];
        let idx = options
            .iter()
            .position(|w| *w == self.draft.work_type)
            .unwrap_or(0);
        let next = if forward {
            (idx + 1) % options.len()
        } else {
            (idx + options.len() - 1) % options.len()
        };
        self.draft.work_type = options[next];
    }

    fn text_field(&mut self) -> Option<&mut String> {
        match self.field {
            FIELD_POSITION => Some(&mut self.draft.position_title),
            FIELD_NEW_COMPANY => Some(&mut self.draft.new_company_name),
            FIELD_DATE => Some(&mut self.date_input),
            FIELD_LOCATION => Some(&mut self.draft.location),
            FIELD_SALARY => Some(&mut self.draft.salary_range),
            FIELD_DESCRIPTION => Some(&mut self.draft.job_description),
            FIELD_NOTES => Some(&mut self.draft.notes),
            _ => None,
        }
    }

    fn type_char(&mut self, c: char) {
        let field = self.field;
        if let Some(text) = self.text_field() {
            text.push(c);
        }
        // Typing a new company name deselects any chosen one.
        if field == FIELD_NEW_COMPANY && !self.draft.new_company_name.is_empty() {
            self.draft.company_id = None;
        }
    }

    fn backspace(&mut self) {
        if let Some(text) = self.text_field() {
            text.pop();
        }
    }

    fn company_label(&self) -> String {
        match self.draft.company_id {
            Some(id) => self
                .companies
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("#{}", id)),
            None => "(none)".to_string(),
        }
    }
}

pub fn run_dashboard(db: &Database, session: &Session) -> Result<()> {
    let mut dashboard = Dashboard::new();
    dashboard.load(db, session.user_id)?;

    let mut state = AppState::new(session.user_id, session.email.clone(), dashboard);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        let len = state.filtered().len();
        if len == 0 {
            state.selected = 0;
            list_state.select(None);
        } else {
            if state.selected >= len {
                state.selected = len - 1;
            }
            list_state.select(Some(state.selected));
        }

        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let in_form = matches!(state.mode, Mode::Form(_));
            if in_form {
                handle_form_key(state, db, key);
            } else if handle_browse_key(state, db, key) {
                break;
            }
        }
    }
    Ok(())
}

/// Returns true when the dashboard should exit.
fn handle_browse_key(state: &mut AppState, db: &Database, key: event::KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Down => state.next(),
        KeyCode::Up => state.prev(),
        KeyCode::PageDown => state.scroll_offset = state.scroll_offset.saturating_add(3),
        KeyCode::PageUp => state.scroll_offset = state.scroll_offset.saturating_sub(3),
        KeyCode::Tab => {
            state.status_filter = state.status_filter.next();
            state.selected = 0;
        }
        KeyCode::Backspace => {
            state.search.pop();
            state.selected = 0;
        }
        KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            open_form(state, db);
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.search.push(c);
            state.selected = 0;
        }
        _ => {}
    }
    false
}

fn handle_form_key(state: &mut AppState, db: &Database, key: event::KeyEvent) {
    match key.code {
        KeyCode::Esc => state.mode = Mode::Browse,
        KeyCode::Enter => submit_form(state, db),
        _ => {
            let Mode::Form(form) = &mut state.mode else {
                return;
            };
            match key.code {
                KeyCode::Tab | KeyCode::Down => form.next_field(),
                KeyCode::BackTab | KeyCode::Up => form.prev_field(),
                KeyCode::Left | KeyCode::Right => {
                    let forward = key.code == KeyCode::Right;
                    match form.field {
                        FIELD_COMPANY => form.cycle_company(forward),
                        FIELD_STATUS => form.cycle_status(forward),
                        FIELD_WORK_TYPE => form.cycle_work_type(forward),
                        _ => {}
                    }
                }
                KeyCode::Backspace => form.backspace(),
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    form.type_char(c)
                }
                _ => {}
            }
        }
    }
}

fn open_form(state: &mut AppState, db: &Database) {
    match db.list_companies(state.user_id) {
        Ok(companies) => state.mode = Mode::Form(FormState::new(companies)),
        Err(e) => state
            .note
            .notify(Notification::error("Error", format!("{:#}", e))),
    }
}

fn submit_form(state: &mut AppState, db: &Database) {
    let Mode::Form(form) = &mut state.mode else {
        return;
    };

    match NaiveDate::parse_from_str(form.date_input.trim(), "%Y-%m-%d") {
        Ok(date) => form.draft.application_date = date,
        Err(_) => {
            state.note.notify(Notification::error(
                "Error",
                format!("Invalid date '{}' (expected YYYY-MM-DD)", form.date_input),
            ));
            return;
        }
    }

    if form::submit(db, state.user_id, &mut form.draft, &mut state.note) {
        state.mode = Mode::Browse;
        state.reload(db);
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // stats cards
            Constraint::Length(3), // search + status filter
            Constraint::Min(0),    // list + detail
            Constraint::Length(1), // footer
        ])
        .split(frame.area());

    draw_stats(frame, state, chunks[0]);
    draw_controls(frame, state, chunks[1]);

    match &state.mode {
        Mode::Browse => draw_browse(frame, state, chunks[2], list_state),
        Mode::Form(form) => draw_form(frame, form, chunks[2]),
    }

    draw_footer(frame, state, chunks[3]);
}

fn draw_stats(frame: &mut Frame, state: &AppState, area: Rect) {
    let stats = state.dashboard.stats();
    let cards = [
        ("Total", stats.total, Color::White),
        ("Applied", stats.applied, Color::Blue),
        ("Interviews", stats.interviews, Color::Magenta),
        ("Offers", stats.offers, Color::Green),
        ("Rejected", stats.rejected, Color::Red),
    ];

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);

    for (i, (label, count, color)) in cards.iter().enumerate() {
        let card = Paragraph::new(Line::from(vec![
            Span::styled(
                count.to_string(),
                Style::default().fg(*color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" {}", label)),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(card, chunks[i]);
    }
}

fn draw_controls(frame: &mut Frame, state: &AppState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(18)])
        .split(area);

    let search = Paragraph::new(state.search.as_str())
        .block(Block::default().borders(Borders::ALL).title(" Search "));
    frame.render_widget(search, chunks[0]);

    let filter = Paragraph::new(state.status_filter.label())
        .block(Block::default().borders(Borders::ALL).title(" Status "));
    frame.render_widget(filter, chunks[1]);
}

fn draw_browse(frame: &mut Frame, state: &AppState, area: Rect, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let filtered = state.filtered();
    let items: Vec<ListItem> = filtered
        .iter()
        .map(|app| {
            let company = app.company_name.as_deref().unwrap_or("?");
            let title = truncate(&app.position_title, 30);
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", app.status.as_str()),
                    Style::default().fg(status_color(app.status)),
                ),
                Span::raw(format!("{} | {}", title, company)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Applications ({}/{}) ",
            filtered.len(),
            state.dashboard.applications().len()
        )))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);
}

fn draw_form(frame: &mut Frame, form: &FormState, area: Rect) {
    let rows: [(&str, String); FIELD_COUNT] = [
        ("Position title *", form.draft.position_title.clone()),
        ("Company", form.company_label()),
        ("New company", form.draft.new_company_name.clone()),
        ("Date", form.date_input.clone()),
        ("Status", form.draft.status.as_str().to_string()),
        (
            "Work type",
            form.draft
                .work_type
                .map(|w| w.as_str().to_string())
                .unwrap_or_else(|| "(none)".to_string()),
        ),
        ("Location", form.draft.location.clone()),
        ("Salary range", form.draft.salary_range.clone()),
        ("Description", form.draft.job_description.clone()),
        ("Notes", form.draft.notes.clone()),
    ];

    let mut lines: Vec<Line> = Vec::new();
    for (i, (label, value)) in rows.iter().enumerate() {
        let marker = if i == form.field { "> " } else { "  " };
        let label_style = if i == form.field {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if i == form.field { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("{}{:<17}", marker, label), label_style),
            Span::raw(format!("{}{}", value, cursor)),
        ]));
        lines.push(Line::from(""));
    }

    let widget = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" Add Application "))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn draw_footer(frame: &mut Frame, state: &AppState, area: Rect) {
    let footer = if let Some(note) = &state.note.0 {
        let color = match note.severity {
            Severity::Error => Color::Red,
            Severity::Success => Color::Green,
            Severity::Info => Color::DarkGray,
        };
        Paragraph::new(format!(" {}: {}", note.title, note.description))
            .style(Style::default().fg(color))
    } else {
        let help = match state.mode {
            Mode::Browse => format!(
                " {} | type:search  Tab:status  Up/Down:select  Ctrl-a:add  Esc:quit",
                state.email
            ),
            Mode::Form(_) => {
                " Tab/Up/Down:field  Left/Right:cycle  Enter:save  Esc:cancel".to_string()
            }
        };
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(footer, area);
}

fn build_detail<'a>(state: &'a AppState) -> Text<'a> {
    let Some(app) = state.selected_application() else {
        let hint = if state.dashboard.applications().is_empty() {
            "No applications yet. Press Ctrl-a to add your first one."
        } else {
            "No applications match the current search or status filter."
        };
        return Text::raw(hint);
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        app.position_title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));

    if let Some(company) = &app.company_name {
        lines.push(Line::from(format!("at {}", company)));
    }

    lines.push(Line::from(Span::styled(
        format!("Status: {}", app.status),
        Style::default().fg(status_color(app.status)),
    )));
    lines.push(Line::from(format!(
        "Applied: {}",
        app.application_date.format("%Y-%m-%d")
    )));

    if let Some(location) = &app.location {
        lines.push(Line::from(format!("Location: {}", location)));
    }
    if let Some(work_type) = app.work_type {
        lines.push(Line::from(format!("Work type: {}", work_type)));
    }
    if let Some(salary) = &app.salary_range {
        lines.push(Line::from(format!("Salary: {}", salary)));
    }

    if let Some(description) = &app.job_description {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Description",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(description, 70).lines() {
            lines.push(Line::from(line.to_string()));
        }
    }

    if let Some(notes) = &app.notes {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(notes, 70).lines() {
            lines.push(Line::from(line.to_string()));
        }
    }

    Text::from(lines)
}

fn status_color(status: ApplicationStatus) -> Color {
    match status {
        ApplicationStatus::Applied => Color::Blue,
        ApplicationStatus::Screening => Color::Yellow,
        ApplicationStatus::Interview => Color::Magenta,
        ApplicationStatus::Offer => Color::Green,
        ApplicationStatus::Rejected => Color::Red,
        ApplicationStatus::Withdrawn => Color::DarkGray,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
