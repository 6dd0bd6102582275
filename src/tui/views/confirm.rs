use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::app::App;
use crate::tui::theme::Theme;

pub fn render_confirm(f: &mut Frame, app: &App) {
    let theme = Theme::default();
    let text = format!(
        "Delete {} selected record(s)? (y/N)",
        app.selection_count()
    );
    let para = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Confirm"))
        .style(theme.toast_style());
    f.render_widget(para, f.area());
}
