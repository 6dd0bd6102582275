use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use crate::shelf::handlers::ListRow;
use crate::tui::app::{App, Mode};
use crate::tui::theme::Theme;

const SHOWN_TAGS: usize = 3;

pub fn render_list(f: &mut Frame, app: &App) {
    let theme = Theme::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // search / status
            Constraint::Min(1),    // list
            Constraint::Length(1), // footer/toast
        ])
        .split(f.area());

    let title = Paragraph::new("keyshelf").style(theme.title_style());
    f.render_widget(title, chunks[0]);

    let visible = app.visible();
    let status = match app.mode {
        Mode::Normal => format!(
            "/ search  |  sort: {}  |  tag: {}  |  {} selected  |  {} items",
            app.sort(),
            app.tag_filter().unwrap_or("all"),
            app.selection_count(),
            visible.len()
        ),
        Mode::Search => format!("Search: {}", app.search_term()),
    };
    f.render_widget(Paragraph::new(status).style(theme.muted_style()), chunks[1]);

    // Masked values only
    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let row = ListRow::new(record, &app.mask);
            let mark = if app.is_selected(&record.id) { "[x]" } else { "[ ]" };
            let style = if i == app.selected {
                theme.selection_style()
            } else {
                theme.normal_style()
            };
            let mut spans = vec![Span::styled(
                format!(
                    "{mark} {}  {}  {}  {}: {}",
                    row.vendor, row.account, row.created, row.label, row.masked
                ),
                style,
            )];
            for tag in row.tags.iter().filter(|t| !t.is_empty()).take(SHOWN_TAGS) {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(format!("#{tag}"), theme.tag_style(tag)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Credentials"));
    f.render_widget(list, chunks[2]);

    let footer_text = app.toast_message().unwrap_or(
        "q=quit  Enter=copy  l=details  space=select  A=all  d=delete  s=sort  t=tag",
    );
    let footer = Paragraph::new(footer_text).style(theme.toast_style());
    f.render_widget(footer, chunks[3]);
}
