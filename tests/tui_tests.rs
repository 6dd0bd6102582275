use crossterm::event::KeyCode;
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use std::sync::Arc;

use keyshelf::shelf::codec::JsonDocumentCodec;
use keyshelf::shelf::ports::{FixedClock, MemoryByteStore};
use keyshelf::shelf::resolver::MaskPolicy;
use keyshelf::shelf::state::ShelfState;
use keyshelf::shelf::store::RecordStore;
use keyshelf::tui::app::{App, Mode, View};
use keyshelf::tui::handle_key;
use keyshelf::tui::views::details::render_details;
use keyshelf::tui::views::list::render_list;

const DOC: &str = r#"{"apiKeys": [
    {"id": "1", "vendor": "OpenAI", "account": "main", "apiKey": "sk-12345678",
     "tag": "prod, ai", "createdAt": "2024-06-01T12:00:00.000Z"},
    {"id": "2", "vendor": "Stripe", "account": "live", "apiKey": "sk-live-secret",
     "tag": "prod", "customFields": {"publishable": "pk-live-123456"},
     "markedField": "publishable"},
    {"id": "3", "vendor": "Google", "account": "Default", "apiKey": "placeholder-key",
     "tag": "dev", "web": {"client_secret": "gcs-abcdef"}, "pinnedFields": ["web.client_secret"]}
]}"#;

fn app() -> (App, Arc<MemoryByteStore>) {
    let bytes = Arc::new(MemoryByteStore::with_contents(DOC));
    let store = Arc::new(RecordStore::new(bytes.clone(), Arc::new(JsonDocumentCodec)));
    let clock = Arc::new(FixedClock("2024-06-02T00:00:00Z".parse().unwrap()));
    let state = ShelfState::load(store, clock).unwrap();
    (App::new(state, MaskPolicy::default()), bytes)
}

fn screen<F: FnOnce(&mut ratatui::Frame)>(draw: F) -> String {
    let backend = TestBackend::new(100, 14);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(draw).unwrap();
    let buf = terminal.backend().buffer().clone();
    let mut all = String::new();
    for y in 0..buf.area.height {
        for x in 0..buf.area.width {
            all.push_str(buf.cell((x, y)).unwrap().symbol());
        }
        all.push('\n');
    }
    all
}

#[test]
fn list_renders_vendors_and_never_secrets() {
    let (app, _) = app();
    let all = screen(|f| render_list(f, &app));

    assert!(all.contains("OpenAI"));
    assert!(all.contains("Stripe"));
    assert!(all.contains("Google"));
    assert!(all.contains("sk••••••••78"));
    assert!(all.contains("publishable: pk••••••••56"));
    assert!(all.contains("web.client_secret: gc••••••••ef"));
    assert!(all.contains("#prod"));
    for secret in ["sk-12345678", "pk-live-123456", "gcs-abcdef", "sk-live-secret"] {
        assert!(!all.contains(secret), "leaked {secret}");
    }
}

#[test]
fn details_reveal_toggles_with_v() {
    let (mut app, _) = app();
    assert!(handle_key(&mut app, KeyCode::Char('l'), 20));
    assert_eq!(app.view, View::Details);

    let masked = screen(|f| render_details(f, &app));
    assert!(masked.contains("Vendor:  Google"));
    assert!(!masked.contains("gcs-abcdef"));

    handle_key(&mut app, KeyCode::Char('v'), 20);
    let revealed = screen(|f| render_details(f, &app));
    assert!(revealed.contains("gcs-abcdef"));
    assert!(revealed.contains("(pinned)"));

    handle_key(&mut app, KeyCode::Esc, 20);
    assert_eq!(app.view, View::List);
    assert!(!app.reveal);
}

#[test]
fn navigation_search_and_quit_keys() {
    let (mut app, _) = app();
    handle_key(&mut app, KeyCode::Char('j'), 20);
    handle_key(&mut app, KeyCode::Char('j'), 20);
    handle_key(&mut app, KeyCode::Char('j'), 20);
    assert_eq!(app.selected, 2);
    handle_key(&mut app, KeyCode::Char('k'), 20);
    assert_eq!(app.selected, 1);

    handle_key(&mut app, KeyCode::Char('/'), 20);
    assert_eq!(app.mode, Mode::Search);
    for c in "strip".chars() {
        handle_key(&mut app, KeyCode::Char(c), 20);
    }
    assert!(handle_key(&mut app, KeyCode::Enter, 20));
    assert_eq!(app.mode, Mode::Normal);
    let vendors: Vec<&str> = app.visible().iter().map(|r| r.vendor.as_str()).collect();
    assert_eq!(vendors, vec!["Stripe"]);
    assert_eq!(app.selected, 0);

    assert!(!handle_key(&mut app, KeyCode::Char('q'), 20));
}

#[test]
fn sort_and_tag_keys_update_status_line() {
    let (mut app, _) = app();
    handle_key(&mut app, KeyCode::Char('s'), 20);
    handle_key(&mut app, KeyCode::Char('t'), 20);
    let all = screen(|f| render_list(f, &app));
    assert!(all.contains("sort: vendor-desc"));
    assert!(all.contains("tag: ai"));
    assert!(all.contains("1 items"));
}

#[tokio::test(flavor = "multi_thread")]
async fn confirm_delete_removes_selection_and_saves() {
    let (mut app, bytes) = app();
    handle_key(&mut app, KeyCode::Char(' '), 20);
    handle_key(&mut app, KeyCode::Char('d'), 20);
    assert_eq!(app.view, View::ConfirmDelete);

    handle_key(&mut app, KeyCode::Char('n'), 20);
    assert_eq!(app.view, View::List);
    assert_eq!(app.visible().len(), 3);

    handle_key(&mut app, KeyCode::Char('d'), 20);
    handle_key(&mut app, KeyCode::Char('y'), 20);
    assert_eq!(app.visible().len(), 2);
    let saved = String::from_utf8(bytes.contents()).unwrap();
    assert!(!saved.contains("Google"));
    assert!(saved.contains("OpenAI"));
}
