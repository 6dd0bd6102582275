use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use secrecy::ExposeSecret;

use crate::shelf::fields::ImportForm;
use crate::shelf::resolver::resolve_display_field;
use crate::tui::app::App;
use crate::tui::theme::Theme;

pub fn render_details(f: &mut Frame, app: &App) {
    let theme = Theme::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Min(1),    // details
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    f.render_widget(
        Paragraph::new("keyshelf: details").style(theme.title_style()),
        chunks[0],
    );

    let secret = |value: &str| {
        if app.reveal {
            value.to_string()
        } else {
            app.mask.mask(value)
        }
    };

    let body = match app.current() {
        None => "(none)".to_string(),
        Some(record) => {
            let mut lines = vec![
                format!("Vendor:  {}", record.vendor),
                format!("Account: {}", record.account),
                format!("Tags:    {}", record.tag),
                format!("Created: {}", record.created_at),
                format!("API key: {}", secret(record.api_key.expose_secret())),
            ];
            if let Some(fields) = &record.custom_fields {
                for (name, value) in fields {
                    let marked = record.marked_field.as_deref() == Some(name.as_str());
                    let star = if marked { " *" } else { "" };
                    lines.push(format!("  {name}: {}{star}", secret(value)));
                }
            }
            for field in ImportForm::from_record(record).fields() {
                let pin = if field.pinned { " (pinned)" } else { "" };
                lines.push(format!("  {}: {}{pin}", field.path, secret(&field.value)));
            }
            let shown = resolve_display_field(record);
            lines.push(format!(
                "Shown:   {} = {}",
                shown.label,
                secret(shown.value.expose_secret())
            ));
            lines.join("\n")
        }
    };
    let para = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title("Credential"))
        .wrap(Wrap { trim: false })
        .style(theme.normal_style());
    f.render_widget(para, chunks[1]);

    let footer = app
        .toast_message()
        .unwrap_or("q=back  Enter=copy  v=toggle reveal  space=select  d=delete");
    f.render_widget(Paragraph::new(footer).style(theme.toast_style()), chunks[2]);
}
