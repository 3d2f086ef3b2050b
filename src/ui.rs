use crate::{
    app::{App, Page, ResultsPage, ScanningPage},
    colors::*,
    file_node::FileTree,
    navigator::Row,
    progress::{FRAMES, ProgressTick},
    utils::{format_size, percent_of, render_bar},
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Length(1), // Directory info
            Constraint::Min(0),    // List
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    let [title_area, dir_info_area, list_area, footer_area] = *chunks else {
        return;
    };

    render_title_bar(f, title_area);

    let status = app.status_message.as_deref();
    match &mut app.page {
        Page::Scanning(page) => {
            let area = f.area();
            render_scanning(f, page, area);
        }
        Page::Results(results) | Page::Help(results) => {
            render_directory_info(f, results, dir_info_area);
            render_file_list(f, results, list_area);
            render_footer(f, results, status, footer_area);
        }
        Page::Closed => {}
    }

    if matches!(app.page, Page::Help(_)) {
        render_help_overlay(f);
    }
}

fn render_title_bar(f: &mut Frame, area: Rect) {
    let version = env!("CARGO_PKG_VERSION");
    let terminal_width = f.area().width as usize;

    let title = format!(" dudrill v{}    (press ? for help)", version);
    let padding = terminal_width.saturating_sub(title.chars().count());

    let title_bar = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled("dudrill", Style::default().fg(COLOR_HEADER_FG).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" v{}    (press ", version)),
        Span::styled("?", Style::default().fg(COLOR_HEADER_FG).add_modifier(Modifier::BOLD)),
        Span::raw(" for help)"),
        Span::raw(" ".repeat(padding)),
    ]))
    .style(Style::default().fg(COLOR_HEADER_FG).bg(COLOR_HEADER_BG));
    f.render_widget(title_bar, area);
}

/// Text of the scanning box: dots animation, elapsed time, entries seen
pub fn scanning_text(tick: Option<&ProgressTick>) -> Vec<String> {
    let (frame, secs, seen) = tick
        .map(|t| (t.frame, t.elapsed.as_secs(), t.entries_seen))
        .unwrap_or((0, 0, 0));
    let dots = frame.min(FRAMES - 1);
    vec![
        format!("Scanning {}{}", ".".repeat(dots), " ".repeat(FRAMES - 1 - dots)),
        String::new(),
        format!("Time {}s", secs),
        format!("{} entries", seen),
    ]
}

fn render_scanning(f: &mut Frame, page: &ScanningPage, area: Rect) {
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            page.root.display().to_string(),
            Style::default().fg(COLOR_DIR_INFO),
        )),
        Line::from(""),
    ];
    lines.extend(
        scanning_text(page.last_tick.as_ref())
            .into_iter()
            .map(|l| Line::from(Span::styled(l, Style::default().fg(COLOR_SCANNING)))),
    );
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("[q] cancel  [ctrl+c] close", Style::default().fg(COLOR_HELP_HINT))));

    let width = lines
        .iter()
        .map(|l| l.width() as u16)
        .max()
        .unwrap_or(0)
        .saturating_add(4)
        .max(30);
    let height = lines.len() as u16 + 2;
    let modal = Rect {
        x: area.width.saturating_sub(width) / 2,
        y: area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    };

    f.render_widget(Clear, modal);
    let block = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Scanning "))
        .style(Style::default().fg(Color::White));
    f.render_widget(block, modal);
}

fn render_directory_info(f: &mut Frame, results: &ResultsPage, area: Rect) {
    let dir_line = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {}", results.current_title()), Style::default().fg(COLOR_DIR_INFO)),
    ]))
    .block(Block::default().borders(Borders::TOP | Borders::LEFT | Borders::RIGHT));
    f.render_widget(dir_line, area);
}

/// One list row: size | percent | bar | items | name
fn entry_line(tree: &FileTree, row: Row, parent_size: u64) -> Line<'static> {
    let id = match row {
        Row::Up => {
            return Line::from(vec![
                Span::raw(format!("{:>10} | {:>6} | {:10} | {:>7} | ", "", "", "", "")),
                Span::styled("/..", Style::default().fg(COLOR_DIRECTORY)),
            ]);
        }
        Row::Entry(id) => id,
    };
    let size = tree.size(id);
    let percent = percent_of(size, parent_size);
    let bar = render_bar(percent, 10);
    let (name, is_dir, error) = tree
        .node(id)
        .map(|n| (n.name.clone(), n.is_dir, n.error))
        .unwrap_or_default();

    // Prefix: / for directories, space for files
    let prefix = if is_dir { "/" } else { " " };
    let name_color = match (error, is_dir) {
        (Some(_), _) => COLOR_ERROR,
        (None, true) => COLOR_DIRECTORY,
        (None, false) => COLOR_FILE,
    };
    let mut spans = vec![
        Span::styled(format!("{:>10}", format_size(size)), Style::default().fg(COLOR_SIZE)),
        Span::raw(" | "),
        Span::styled(format!("{:>5.1}%", percent), Style::default().fg(COLOR_PERCENT)),
        Span::raw(" | "),
        Span::styled(format!("{:10}", bar), Style::default().fg(COLOR_PERCENT)),
        Span::raw(" | "),
        Span::styled(format!("{:>7}", tree.count(id)), Style::default().fg(COLOR_COUNT)),
        Span::raw(" | "),
        Span::styled(format!("{}{}", prefix, name), Style::default().fg(name_color)),
    ];
    if let Some(kind) = error {
        spans.push(Span::styled(format!("  ! {}", kind.label()), Style::default().fg(COLOR_ERROR)));
    }
    Line::from(spans)
}

fn render_file_list(f: &mut Frame, results: &mut ResultsPage, area: Rect) {
    let parent_size = results.current_total_size();
    let items: Vec<ListItem> = results
        .current_rows()
        .into_iter()
        .map(|row| ListItem::new(entry_line(results.navigator.tree(), row, parent_size)))
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM))
        .highlight_style(Style::default().bg(COLOR_HIGHLIGHT_BG).fg(COLOR_HIGHLIGHT_FG));

    f.render_stateful_widget(list, area, &mut results.state);
}

fn render_footer(f: &mut Frame, results: &ResultsPage, status: Option<&str>, area: Rect) {
    let terminal_width = f.area().width as usize;
    let status_msg = status.unwrap_or("");
    let mut footer_left = format!(" Total disk usage: {}", format_size(results.total_size()));
    if results.error_count > 0 {
        footer_left.push_str(&format!("  Unreadable: {}", results.error_count));
    }
    let footer_right = if !status_msg.is_empty() {
        format!("  {} ", status_msg)
    } else {
        String::new()
    };
    let footer_padding = terminal_width.saturating_sub(footer_left.chars().count() + footer_right.chars().count());
    let footer_text = format!("{}{:padding$}{}", footer_left, "", footer_right, padding = footer_padding);

    let footer = Paragraph::new(footer_text)
        .style(Style::default().fg(COLOR_HEADER_FG).bg(COLOR_HEADER_BG));
    f.render_widget(footer, area);
}

fn render_help_overlay(f: &mut Frame) {
    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("  dudrill - Disk Usage Explorer", Style::default().fg(COLOR_HELP_TITLE).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled("  Navigation:", Style::default().fg(COLOR_HELP_HEADER).add_modifier(Modifier::BOLD))),
        Line::from("    j / ↓           Move down 1 item"),
        Line::from("    k / ↑           Move up 1 item"),
        Line::from("    Ctrl+d / PgDn   Move down 10 items"),
        Line::from("    Ctrl+u / PgUp   Move up 10 items"),
        Line::from("    H / Home        Go to first item"),
        Line::from("    G / End         Go to last item"),
        Line::from(""),
        Line::from(Span::styled("  Actions:", Style::default().fg(COLOR_HELP_HEADER).add_modifier(Modifier::BOLD))),
        Line::from("    o / l / Enter   Enter directory"),
        Line::from("                    (on /.. open parent)"),
        Line::from("    u / h / Bksp    Back to previous view"),
        Line::from(""),
        Line::from(Span::styled("  Other:", Style::default().fg(COLOR_HELP_HEADER).add_modifier(Modifier::BOLD))),
        Line::from("    ?               Show this help"),
        Line::from("    q / Esc         Quit"),
        Line::from(""),
        Line::from(Span::styled("  Press any key to close", Style::default().fg(COLOR_HELP_HINT))),
        Line::from(""),
    ];

    let help_height = help_text.len() as u16 + 2;
    let help_width = 42;
    let area = f.area();
    let help_area = Rect {
        x: area.width.saturating_sub(help_width) / 2,
        y: area.height.saturating_sub(help_height) / 2,
        width: help_width.min(area.width),
        height: help_height.min(area.height),
    };

    f.render_widget(Clear, help_area);
    let help_block = Paragraph::new(help_text)
        .block(Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::default().bg(Color::Black)))
        .style(Style::default().fg(Color::White).bg(Color::Black));
    f.render_widget(help_block, help_area);
}
