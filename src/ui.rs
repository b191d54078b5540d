use std::collections::BTreeSet;
use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};

use crate::client::RecordBackend;
use crate::controller::{NotificationLevel, RecordListController};
use crate::record::Record;
use crate::view::{SortDirection, SortSpec};

#[derive(Clone, Debug, PartialEq)]
pub enum BrowserMode {
    Browsing,
    Searching,
    ConfirmDelete { id: String },
    Deleting { id: String },
}

/// One row of the current page as shown on screen.
#[derive(Clone, Debug)]
pub struct RowItem {
    pub id: Option<String>,
    pub cells: Vec<String>,
    pub enabled: bool,
}

/// Everything the renderer needs, detached from the controller borrow.
#[derive(Clone, Debug)]
pub struct PageSnapshot {
    pub title: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<RowItem>,
    pub current_page: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    pub total_count: usize,
    pub items_per_page: usize,
    pub search_text: String,
    pub filters: Vec<(String, String)>,
    pub sort: Option<String>,
    pub loading: bool,
    pub load_error: Option<String>,
    pub notification: Option<(NotificationLevel, String)>,
}

impl PageSnapshot {
    pub fn capture<R: Record, B: RecordBackend<R>>(controller: &mut RecordListController<R, B>) -> Self {
        let today = controller.today();
        let items_per_page = controller.view_state().items_per_page();
        let search_text = controller.view_state().search_text.clone();
        let filters = controller
            .view_state()
            .filters
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let sort = controller.view_state().sort.as_ref().map(|s| {
            let arrow = match s.direction {
                SortDirection::Ascending => "asc",
                SortDirection::Descending => "desc",
            };
            format!("{} {}", s.field, arrow)
        });
        let loading = controller.is_loading();
        let load_error = controller.load_error().map(str::to_string);
        let notification = controller
            .notification()
            .map(|n| (n.level, n.message.clone()));

        let view = controller.view();
        let (current_page, total_pages, filtered_count, total_count) = (
            view.current_page,
            view.total_pages,
            view.filtered_count,
            view.total_count,
        );
        let page: Vec<(Option<String>, Vec<String>)> = view
            .page
            .iter()
            .map(|r| (r.id().map(str::to_string), r.row(today)))
            .collect();

        let rows = page
            .into_iter()
            .map(|(id, cells)| {
                let enabled = id
                    .as_deref()
                    .map(|id| controller.is_action_enabled(id))
                    .unwrap_or(false);
                RowItem { id, cells, enabled }
            })
            .collect();

        Self {
            title: R::COLLECTION,
            columns: R::COLUMNS,
            rows,
            current_page,
            total_pages,
            filtered_count,
            total_count,
            items_per_page,
            search_text,
            filters,
            sort,
            loading,
            load_error,
            notification,
        }
    }
}

/// Keyboard state of the record browser.
pub struct RecordBrowser {
    pub table_state: TableState,
    pub mode: BrowserMode,
    pub filter_field: usize,
}

impl RecordBrowser {
    pub fn new() -> Self {
        Self {
            table_state: TableState::default(),
            mode: BrowserMode::Browsing,
            filter_field: 0,
        }
    }

    /// Keeps the highlighted row inside the current page.
    pub fn clamp_selection(&mut self, rows: usize) {
        match (self.table_state.selected(), rows) {
            (_, 0) => self.table_state.select(None),
            (None, _) => self.table_state.select(Some(0)),
            (Some(i), n) if i >= n => self.table_state.select(Some(n - 1)),
            _ => {}
        }
    }

    pub fn next(&mut self, rows: usize) {
        if rows == 0 {
            self.table_state.select(None);
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i + 1 < rows => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self, rows: usize) {
        if rows == 0 {
            self.table_state.select(None);
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => rows - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_id(&self, snapshot: &PageSnapshot) -> Option<String> {
        self.table_state
            .selected()
            .and_then(|i| snapshot.rows.get(i))
            .and_then(|row| row.id.clone())
    }
}

impl Default for RecordBrowser {
    fn default() -> Self {
        Self::new()
    }
}

/// Next value for the filter on `field`: unset, then each distinct value in
/// the loaded records in order, then unset again.
pub fn next_filter_value<R: Record, B: RecordBackend<R>>(
    controller: &RecordListController<R, B>,
    field: &str,
) -> Option<String> {
    let today = controller.today();
    let values: BTreeSet<String> = controller
        .records()
        .iter()
        .filter_map(|r| r.field(field, today))
        .filter(|v| !v.is_empty())
        .collect();
    match controller.view_state().filters.get(field) {
        None => values.into_iter().next(),
        Some(current) => values
            .range::<String, _>((
                std::ops::Bound::Excluded(current.clone()),
                std::ops::Bound::Unbounded,
            ))
            .next()
            .cloned(),
    }
}

/// Render the UI
pub fn render_ui(f: &mut Frame, snapshot: &PageSnapshot, browser: &mut RecordBrowser) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search and filters
            Constraint::Min(10),   // Records
            Constraint::Length(3), // Status/instructions
        ])
        .split(f.area());

    let mut header_spans = vec![Span::styled(
        format!("Search: {}", snapshot.search_text),
        if browser.mode == BrowserMode::Searching {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::LightBlue)
        },
    )];
    for (field, value) in &snapshot.filters {
        header_spans.push(Span::raw(format!("  {field}={value}")));
    }
    if let Some(sort) = &snapshot.sort {
        header_spans.push(Span::raw(format!("  sort: {sort}")));
    }
    let header = Paragraph::new(Line::from(header_spans))
        .block(Block::default().borders(Borders::ALL).title(snapshot.title));
    f.render_widget(header, chunks[0]);

    if let Some(error) = &snapshot.load_error {
        let message = Paragraph::new(error.as_str())
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(message, chunks[1]);
    } else {
        let header_row = Row::new(
            snapshot
                .columns
                .iter()
                .map(|c| Cell::from(*c).style(Style::default().add_modifier(Modifier::BOLD))),
        );
        let rows = snapshot.rows.iter().map(|row| {
            let style = if row.enabled {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Row::new(row.cells.iter().map(|c| Cell::from(c.as_str()))).style(style)
        });
        let widths = vec![Constraint::Fill(1); snapshot.columns.len().max(1)];
        let title = if snapshot.loading {
            "Loading...".to_string()
        } else {
            format!(
                "Page {}/{} ({} of {} records, {} per page)",
                snapshot.current_page,
                snapshot.total_pages,
                snapshot.filtered_count,
                snapshot.total_count,
                snapshot.items_per_page
            )
        };
        let table = Table::new(rows, widths)
            .header(header_row)
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
        f.render_stateful_widget(table, chunks[1], &mut browser.table_state);
    }

    let footer_text = match (&browser.mode, &snapshot.notification) {
        (BrowserMode::Deleting { id }, _) => format!("Deleting {id}..."),
        (BrowserMode::Searching, _) => "Type to search | Enter/Esc: done".to_string(),
        (_, Some((_, message))) => message.clone(),
        _ => "↑↓: Move | ←→: Page | /: Search | f/F: Filter | s: Sort | +/-: Page size | d: Delete | c: Clear | r: Reload | q: Quit".to_string(),
    };
    let footer_style = match snapshot.notification {
        Some((NotificationLevel::Error, _)) => Style::default().fg(Color::Red),
        Some((NotificationLevel::Success, _)) => Style::default().fg(Color::Green),
        None => Style::default().fg(Color::White),
    };
    let footer = Paragraph::new(footer_text)
        .style(footer_style)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);
    f.render_widget(footer, chunks[2]);

    if let BrowserMode::ConfirmDelete { id } = &browser.mode {
        let area = centered(f.area(), 50, 5);
        let dialog = Paragraph::new(format!("Delete record {id}?  y: confirm  n: cancel"))
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title("Confirm"))
            .alignment(Alignment::Center);
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Run the record browser until the user quits. The controller is unmounted
/// on exit.
pub async fn run_record_browser<R: Record, B: RecordBackend<R>>(
    controller: &mut RecordListController<R, B>,
) -> anyhow::Result<()> {
    // Setup terminal
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = browse(&mut terminal, controller).await;
    controller.unmount();

    let restored = restore_terminal(
        crossterm::terminal::disable_raw_mode,
        || crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen),
    );
    result?;
    restored?;
    Ok(())
}

/// Both steps always run; the first failure is returned.
fn restore_terminal(
    disable_raw_mode: impl FnOnce() -> io::Result<()>,
    leave_alternate_screen: impl FnOnce() -> io::Result<()>,
) -> io::Result<()> {
    let raw = disable_raw_mode();
    let screen = leave_alternate_screen();
    raw.and(screen)
}

async fn browse<R: Record, B: RecordBackend<R>>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut RecordListController<R, B>,
) -> anyhow::Result<()> {
    let mut browser = RecordBrowser::new();

    if controller.records().is_empty() && controller.load_error().is_none() {
        let mut snapshot = PageSnapshot::capture(controller);
        snapshot.loading = true;
        terminal.draw(|f| render_ui(f, &snapshot, &mut browser))?;
        // Failure is kept on the controller and rendered as the page body.
        let _ = controller.load().await;
    }

    loop {
        let snapshot = PageSnapshot::capture(controller);
        browser.clamp_selection(snapshot.rows.len());
        terminal.draw(|f| render_ui(f, &snapshot, &mut browser))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let rows = snapshot.rows.len();

        match browser.mode.clone() {
            BrowserMode::Searching => match key.code {
                KeyCode::Enter | KeyCode::Esc => browser.mode = BrowserMode::Browsing,
                KeyCode::Backspace => {
                    let mut text = snapshot.search_text.clone();
                    text.pop();
                    controller.set_search_text(text);
                }
                KeyCode::Char(c) => {
                    let mut text = snapshot.search_text.clone();
                    text.push(c);
                    controller.set_search_text(text);
                }
                _ => {}
            },
            BrowserMode::ConfirmDelete { id } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    browser.mode = BrowserMode::Deleting { id: id.clone() };
                    let snapshot = PageSnapshot::capture(controller);
                    terminal.draw(|f| render_ui(f, &snapshot, &mut browser))?;
                    // Outcome lands in the controller's notification.
                    let _ = controller.confirm_delete(&id).await;
                    browser.mode = BrowserMode::Browsing;
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    controller.cancel_action(&id);
                    browser.mode = BrowserMode::Browsing;
                }
                _ => {}
            },
            BrowserMode::Deleting { .. } => {}
            BrowserMode::Browsing => {
                controller.take_notification();
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Up => browser.previous(rows),
                    KeyCode::Down => browser.next(rows),
                    KeyCode::Left | KeyCode::Char('p') => controller.previous_page(),
                    KeyCode::Right | KeyCode::Char('n') => controller.next_page(),
                    KeyCode::Char('/') => browser.mode = BrowserMode::Searching,
                    KeyCode::Char('+') => {
                        let size = controller.view_state().items_per_page();
                        controller.set_items_per_page(size + 5);
                    }
                    KeyCode::Char('-') => {
                        let size = controller.view_state().items_per_page();
                        controller.set_items_per_page(size.saturating_sub(5));
                    }
                    KeyCode::Char('f') => {
                        if let Some(field) = R::FILTER_FIELDS.get(browser.filter_field) {
                            let value = next_filter_value(controller, field);
                            controller.set_filter(*field, value);
                        }
                    }
                    KeyCode::Char('F') => {
                        if !R::FILTER_FIELDS.is_empty() {
                            browser.filter_field = (browser.filter_field + 1) % R::FILTER_FIELDS.len();
                        }
                    }
                    KeyCode::Char('s') => {
                        let next = match controller.view_state().sort.as_ref().map(|s| s.direction) {
                            None => Some(SortDirection::Ascending),
                            Some(SortDirection::Ascending) => Some(SortDirection::Descending),
                            Some(SortDirection::Descending) => None,
                        };
                        controller.set_sort(next.map(|direction| SortSpec {
                            field: R::SEARCH_FIELD.to_string(),
                            direction,
                        }));
                    }
                    KeyCode::Char('c') => controller.clear_filters(),
                    KeyCode::Char('r') => {
                        let _ = controller.load().await;
                    }
                    KeyCode::Char('d') | KeyCode::Delete => {
                        if let Some(id) = browser.selected_id(&snapshot) {
                            if controller.request_delete(&id).is_ok() {
                                browser.mode = BrowserMode::ConfirmDelete { id };
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_wraps_and_clamps() {
        let mut browser = RecordBrowser::new();
        browser.clamp_selection(3);
        assert_eq!(browser.table_state.selected(), Some(0));
        browser.previous(3);
        assert_eq!(browser.table_state.selected(), Some(2));
        browser.next(3);
        assert_eq!(browser.table_state.selected(), Some(0));

        browser.table_state.select(Some(7));
        browser.clamp_selection(2);
        assert_eq!(browser.table_state.selected(), Some(1));
        browser.clamp_selection(0);
        assert_eq!(browser.table_state.selected(), None);
    }

    #[test]
    fn terminal_restore_runs_every_step() {
        let mut raw_disabled = false;
        let result = restore_terminal(
            || {
                raw_disabled = true;
                Ok(())
            },
            || Err(io::Error::other("screen gone")),
        );
        assert!(raw_disabled);
        assert_eq!(result.unwrap_err().to_string(), "screen gone");

        let mut screen_left = false;
        let result = restore_terminal(
            || Err(io::Error::other("not a tty")),
            || {
                screen_left = true;
                Ok(())
            },
        );
        assert!(screen_left);
        assert_eq!(result.unwrap_err().to_string(), "not a tty");
    }

    #[test]
    fn centered_fits_small_areas() {
        let area = Rect::new(0, 0, 20, 4);
        let rect = centered(area, 50, 5);
        assert_eq!((rect.width, rect.height), (20, 4));
    }
}
