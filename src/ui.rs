use crate::app::{App, LayoutAreas, ModalState, PaneFocus, ViewTab, ViewerMode};
use crate::domain::{BlameLine, DiffLine, DiffLineKind};
use crate::highlight::TokenClass;
use crate::render::{self, TokenRow};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Alignment, Color, Line, Modifier, Span, Style};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use std::time::{SystemTime, UNIX_EPOCH};

/// Width of the blame annotation column when enabled.
pub(crate) const BLAME_COLS: u16 = 26;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(32), Constraint::Min(1)])
        .split(outer[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(main[1]);

    let viewer_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(2)])
        .split(right[0]);

    // remembered for mouse routing
    app.layout = LayoutAreas {
        tree: main[0],
        viewer: viewer_row[0],
        minimap: viewer_row[1],
        log: right[1],
    };

    draw_tree(frame, app, main[0]);
    draw_viewer(frame, app, viewer_row[0]);
    draw_minimap(frame, app, viewer_row[1]);
    draw_logs(frame, app, right[1]);
    draw_status_bar(frame, app, outer[1]);
    draw_modal(frame, app);
}

fn accent(app: &App) -> Color {
    match app.config.theme.as_str() {
        "green" => Color::Green,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        _ => Color::Cyan,
    }
}

fn pane_border(app: &App, pane: PaneFocus) -> Style {
    if app.focus == pane {
        Style::default().fg(accent(app))
    } else {
        Style::default()
    }
}

fn view_title(view: ViewTab) -> &'static str {
    match view {
        ViewTab::Files => " Files ",
        ViewTab::Commits => " Commits ",
        ViewTab::Changes => " Changes ",
    }
}

fn draw_tree(frame: &mut Frame, app: &mut App, area: Rect) {
    let rows = usize::from(area.height.saturating_sub(2)).max(1);
    app.sync_tree_scroll(rows);

    let items: Vec<String> = match app.view {
        ViewTab::Files => app.current_items(),
        ViewTab::Commits => {
            let now = unix_now();
            app.commits
                .iter()
                .map(|commit| {
                    format!(
                        "{} {} {}",
                        commit.short_hash(),
                        render::time_ago(commit_timestamp(&commit.date).unwrap_or(now), now),
                        commit.message
                    )
                })
                .collect()
        }
        ViewTab::Changes => app
            .changed_files()
            .into_iter()
            .map(|(path, status)| format!("{} {path}", status.badge()))
            .collect(),
    };

    let selected = match app.view {
        ViewTab::Files | ViewTab::Changes => app.selected_index,
        ViewTab::Commits => app.commit_selected,
    };

    let lines: Vec<Line> = items
        .iter()
        .enumerate()
        .skip(app.tree_scroll())
        .take(rows)
        .map(|(index, item)| {
            let style = if index == selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::LightGreen)
                    .add_modifier(Modifier::BOLD)
            } else if app.view == ViewTab::Files
                && app
                    .visible_entries()
                    .get(index)
                    .is_some_and(|entry| entry.ignored)
            {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::from(Span::styled(item.clone(), style))
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(view_title(app.view))
            .borders(Borders::ALL)
            .border_style(pane_border(app, PaneFocus::Tree)),
    );
    frame.render_widget(paragraph, area);
}

/// Line-number gutter width: digits of the largest number plus one space.
pub(crate) fn gutter_cols(line_count: usize) -> u16 {
    let mut digits = 0u16;
    let mut remaining = line_count.max(1);
    while remaining > 0 {
        digits += 1;
        remaining /= 10;
    }
    digits.max(3) + 1
}

/// Columns occupied left of the source text: gutter plus blame annotations.
pub(crate) fn viewer_text_offset(app: &App) -> u16 {
    let blame = if app.viewer.show_blame { BLAME_COLS } else { 0 };
    gutter_cols(app.viewer.line_count()) + blame
}

fn draw_viewer(frame: &mut Frame, app: &App, area: Rect) {
    let rows = usize::from(area.height.saturating_sub(2)).max(1);
    let title = app
        .viewer
        .path
        .as_ref()
        .map(|path| {
            format!(
                " {}{} ",
                render::file_name(&path.to_string_lossy()),
                match app.viewer.mode {
                    Some(ViewerMode::Diff) => " (diff)",
                    _ => "",
                }
            )
        })
        .unwrap_or_else(|| " Viewer ".to_string());

    let lines = match app.viewer.mode {
        None => vec![
            Line::from("Nothing loaded yet."),
            Line::from("Enter: open file, d: diff, g: blame, b: branches"),
        ],
        Some(ViewerMode::Source) => source_lines(app, rows),
        Some(ViewerMode::Diff) => diff_lines(app, rows),
    };

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(pane_border(app, PaneFocus::Viewer)),
    );
    frame.render_widget(paragraph, area);
}

fn source_lines(app: &App, rows: usize) -> Vec<Line<'static>> {
    let gutter = usize::from(gutter_cols(app.viewer.line_count())) - 1;
    let caret = app
        .viewer
        .cursor
        .as_ref()
        .map(|cursor| cursor.position())
        .filter(|_| app.focus == PaneFocus::Viewer);
    let now = unix_now();

    let start = app.viewer.scroll_top;
    (start..app.viewer.line_count().min(start + rows))
        .map(|index| {
            let mut spans = Vec::new();

            if app.viewer.show_blame {
                spans.push(Span::styled(
                    blame_annotation(&app.viewer.blame, index, now),
                    Style::default().fg(Color::DarkGray),
                ));
            }

            spans.push(Span::styled(
                format!("{:>gutter$} ", index + 1),
                Style::default().fg(Color::DarkGray),
            ));

            let row = app.viewer.rows.get(index);
            let caret_column = caret
                .filter(|position| position.line == index)
                .map(|position| position.column);
            spans.extend(row_spans(row, caret_column));

            Line::from(spans)
        })
        .collect()
}

fn diff_lines(app: &App, rows: usize) -> Vec<Line<'static>> {
    let start = app.viewer.scroll_top;
    app.viewer
        .diff_rows
        .iter()
        .skip(start)
        .take(rows)
        .map(|(line, row)| diff_line_spans(line, row))
        .collect()
}

fn diff_line_spans(line: &DiffLine, row: &TokenRow) -> Line<'static> {
    let number = |value: Option<u32>| {
        value.map_or_else(|| "    ".to_string(), |number| format!("{number:>4}"))
    };
    let (marker, style) = match line.kind {
        DiffLineKind::Added => ('+', Style::default().fg(Color::Green)),
        DiffLineKind::Removed => ('-', Style::default().fg(Color::Red)),
        DiffLineKind::Context => (' ', Style::default()),
    };

    let mut spans = vec![
        Span::styled(
            format!(
                "{} {} {marker} ",
                number(line.old_line_number),
                number(line.new_line_number)
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if line.kind == DiffLineKind::Context {
        spans.extend(row_spans(Some(row), None));
    } else {
        // additions and removals read better as a single color
        spans.push(Span::styled(line.content.clone(), style));
    }

    Line::from(spans)
}

/// Renders one token row, optionally inverting the caret cell. A caret at
/// end of line shows as an inverted trailing space.
fn row_spans(row: Option<&TokenRow>, caret_column: Option<usize>) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut column = 0usize;

    if let Some(row) = row {
        for token in row {
            let style = token_style(token.class);
            match caret_column {
                Some(caret) => {
                    let len = token.text.chars().count();
                    if caret >= column && caret < column + len {
                        let split = caret - column;
                        let before: String = token.text.chars().take(split).collect();
                        let at: String = token.text.chars().skip(split).take(1).collect();
                        let after: String = token.text.chars().skip(split + 1).collect();
                        if !before.is_empty() {
                            spans.push(Span::styled(before, style));
                        }
                        spans.push(Span::styled(at, style.add_modifier(Modifier::REVERSED)));
                        if !after.is_empty() {
                            spans.push(Span::styled(after, style));
                        }
                    } else {
                        spans.push(Span::styled(token.text.clone(), style));
                    }
                    column += len;
                }
                None => spans.push(Span::styled(token.text.clone(), style)),
            }
        }
    }

    if let Some(caret) = caret_column
        && caret >= column
    {
        spans.push(Span::styled(
            " ".to_string(),
            Style::default().add_modifier(Modifier::REVERSED),
        ));
    }

    spans
}

fn token_style(class: Option<TokenClass>) -> Style {
    match class {
        Some(TokenClass::Keyword) => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Some(TokenClass::Type) => Style::default().fg(Color::LightCyan),
        Some(TokenClass::Comment) => Style::default().fg(Color::DarkGray),
        Some(TokenClass::Str) => Style::default().fg(Color::Yellow),
        Some(TokenClass::Number) => Style::default().fg(Color::Magenta),
        Some(TokenClass::Operator) => Style::default().fg(Color::Gray),
        Some(TokenClass::Method) => Style::default().fg(Color::LightGreen),
        None => Style::default(),
    }
}

fn blame_annotation(blame: &[BlameLine], index: usize, now: i64) -> String {
    let width = usize::from(BLAME_COLS) - 1;
    let text = blame
        .get(index)
        .filter(|line| line.line_number == index + 1)
        .or_else(|| blame.iter().find(|line| line.line_number == index + 1))
        .map(|line| format!("{} {}", line.author, render::time_ago(line.timestamp, now)))
        .unwrap_or_default();

    let mut clipped: String = text.chars().take(width).collect();
    let pad = width - clipped.chars().count();
    clipped.extend(std::iter::repeat_n(' ', pad));
    clipped.push('│');
    clipped
}

fn draw_minimap(frame: &mut Frame, app: &App, area: Rect) {
    if app.viewer.mode.is_none() || area.height == 0 {
        return;
    }

    let viewer_rows = usize::from(app.layout.viewer.height.saturating_sub(2)).max(1);
    let mapper = app.minimap_mapper();
    let viewport = app.minimap_viewport(viewer_rows);
    let geometry = mapper.geometry(viewport);
    let strip_rows = f64::from(area.height.max(1));

    let lines: Vec<Line> = (0..area.height)
        .map(|row| {
            let y = (f64::from(row) + 0.5) / strip_rows * geometry.content_height;
            let in_indicator = y >= geometry.indicator_top
                && y < geometry.indicator_top + geometry.indicator_height;
            let (glyph, style) = if in_indicator {
                ("██", Style::default().fg(accent(app)))
            } else {
                ("░░", Style::default().fg(Color::DarkGray))
            };
            Line::from(Span::styled(glyph, style))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let rows = usize::from(area.height.saturating_sub(2)).max(1);
    let shown = app.logs.len().saturating_sub(app.log_tail_offset);

    let lines: Vec<Line> = app.logs[..shown]
        .iter()
        .rev()
        .take(rows)
        .rev()
        .map(|line| Line::from(line.as_str()))
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Log ")
                .borders(Borders::ALL)
                .border_style(pane_border(app, PaneFocus::Log)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let busy = if app.busy { "BUSY" } else { "IDLE" };
    let branch = if app.current_branch.is_empty() {
        "(no branch)"
    } else {
        app.current_branch.as_str()
    };

    let text = Line::from(vec![
        Span::styled(
            format!(" {busy} "),
            if app.busy {
                Style::default().bg(Color::Yellow).fg(Color::Black)
            } else {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            },
        ),
        Span::raw(" "),
        Span::styled(format!(" {branch} "), Style::default().fg(accent(app))),
        Span::raw(" "),
        Span::styled(
            "1:files 2:commits 3:changes | tab focus | ? help",
            Style::default().fg(Color::Gray),
        ),
    ]);

    frame.render_widget(Paragraph::new(text).alignment(Alignment::Left), area);
}

fn draw_modal(frame: &mut Frame, app: &App) {
    match &app.modal {
        ModalState::None => {}
        ModalState::Help => {
            let area = centered_rect(60, 70, frame.area());
            frame.render_widget(Clear, area);

            let lines = vec![
                Line::from("q          quit"),
                Line::from("tab        cycle pane focus"),
                Line::from("1 / 2 / 3  files / commits / changes"),
                Line::from("j/k arrows move selection or cursor"),
                Line::from("enter / l  expand directory or open file"),
                Line::from("h          collapse directory"),
                Line::from("d          diff for the selected file"),
                Line::from("g          toggle blame annotations"),
                Line::from("b          branch picker"),
                Line::from("s          folder size for the selected directory"),
                Line::from("i          toggle ignored files"),
                Line::from("r          refresh status and history"),
                Line::from(""),
                Line::from("mouse: click to select, wheel to scroll,"),
                Line::from("click or drag the minimap strip to jump"),
            ];

            let paragraph = Paragraph::new(lines).block(
                Block::default()
                    .title(" Help ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(accent(app))),
            );
            frame.render_widget(paragraph, area);
        }
        ModalState::BranchPicker { selected } => {
            let area = centered_rect(50, 60, frame.area());
            frame.render_widget(Clear, area);

            let items: Vec<ListItem> = app
                .branches
                .iter()
                .map(|branch| {
                    let marker = if branch == &app.current_branch {
                        "* "
                    } else {
                        "  "
                    };
                    ListItem::new(format!("{marker}{branch}"))
                })
                .collect();

            let list = List::new(items)
                .block(
                    Block::default()
                        .title(" Branches ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(accent(app))),
                )
                .highlight_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::LightYellow)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("▶ ");

            let mut state = ListState::default();
            if !app.branches.is_empty() {
                state.select(Some((*selected).min(app.branches.len() - 1)));
            }
            frame.render_stateful_widget(list, area, &mut state);
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

/// Best-effort unix timestamp from `git log --date=iso` output. The commits
/// pane falls back to "just now" when the format surprises us.
fn commit_timestamp(date: &str) -> Option<i64> {
    // "2024-05-01 12:30:45 +0900" - enough to order by day without a full
    // datetime dependency
    let mut parts = date.split(['-', ' ', ':']);
    let year: i64 = parts.next()?.parse().ok()?;
    let month: i64 = parts.next()?.parse().ok()?;
    let day: i64 = parts.next()?.parse().ok()?;

    let days_since_epoch = (year - 1970) * 365 + (year - 1969) / 4 + (month - 1) * 30 + (day - 1);
    Some(days_since_epoch * 86_400)
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

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
