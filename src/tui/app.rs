use crate::shelf::error::ShelfError;
use crate::shelf::models::CredentialRecord;
use crate::shelf::query::SortKey;
use crate::shelf::resolver::{copy_value, resolve_display_field, MaskPolicy};
use crate::shelf::state::ShelfState;
use secrecy::SecretString;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum View {
    List,
    Details,
    ConfirmDelete,
}

// ~2s at the 200ms tick
const TOAST_TICKS: u16 = 10;

pub struct App {
    state: ShelfState,
    pub mask: MaskPolicy,
    /// Cursor position within the visible records.
    pub selected: usize,
    pub mode: Mode,
    pub view: View,
    pub reveal: bool,
    toast: Option<String>,
    toast_ticks: u16,
}

impl App {
    pub fn new(state: ShelfState, mask: MaskPolicy) -> Self {
        Self {
            state,
            mask,
            selected: 0,
            mode: Mode::Normal,
            view: View::List,
            reveal: false,
            toast: None,
            toast_ticks: 0,
        }
    }

    pub fn state(&self) -> &ShelfState {
        &self.state
    }

    pub fn visible(&self) -> Vec<&CredentialRecord> {
        self.state.visible()
    }

    pub fn current(&self) -> Option<&CredentialRecord> {
        self.state.visible().get(self.selected).copied()
    }

    pub fn next(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected + 1).min(len - 1);
    }

    pub fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn search_term(&self) -> &str {
        &self.state.query().search
    }

    pub fn enter_search(&mut self) {
        self.mode = Mode::Search;
    }

    pub fn exit_search(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn push_filter(&mut self, c: char) {
        let mut term = self.search_term().to_string();
        term.push(c);
        self.state.set_search(term);
        self.clamp_cursor();
    }

    pub fn pop_filter(&mut self) {
        let mut term = self.search_term().to_string();
        term.pop();
        self.state.set_search(term);
        self.clamp_cursor();
    }

    pub fn sort(&self) -> SortKey {
        self.state.query().sort
    }

    pub fn cycle_sort(&mut self) {
        let key = self.state.cycle_sort();
        self.toast(format!("Sort: {key}"));
    }

    pub fn tag_filter(&self) -> Option<&str> {
        self.state.query().tag.as_deref()
    }

    pub fn cycle_tag(&mut self) {
        let msg = match self.state.cycle_tag_filter() {
            Some(tag) => format!("Tag: {tag}"),
            None => "Tag filter cleared".to_string(),
        };
        self.clamp_cursor();
        self.toast(msg);
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.state.is_selected(id)
    }

    pub fn selection_count(&self) -> usize {
        self.state.selection().len()
    }

    pub fn toggle_current(&mut self) {
        if let Some(id) = self.current().map(|r| r.id.clone()) {
            self.state.toggle(&id);
        }
    }

    pub fn toggle_all_visible(&mut self) {
        self.state.toggle_all_visible();
    }

    /// Label and unmasked value of the displayed credential under the cursor.
    pub fn copy_target(&self) -> Option<(String, SecretString)> {
        self.current()
            .map(|r| (resolve_display_field(r).label, copy_value(r)))
    }

    pub fn toast(&mut self, msg: String) {
        self.toast = Some(msg);
        self.toast_ticks = TOAST_TICKS;
    }

    pub fn toast_message(&self) -> Option<&str> {
        self.toast.as_deref()
    }

    pub fn tick(&mut self) {
        if self.toast_ticks > 0 {
            self.toast_ticks -= 1;
            if self.toast_ticks == 0 {
                self.toast = None;
            }
        }
    }

    pub fn enter_details(&mut self) {
        if self.current().is_some() {
            self.reveal = false;
            self.view = View::Details;
        }
    }

    pub fn back_to_list(&mut self) {
        self.reveal = false;
        self.view = View::List;
    }

    pub fn enter_confirm_delete(&mut self) {
        if self.selection_count() == 0 {
            self.toast("Nothing selected (space selects)".to_string());
        } else {
            self.view = View::ConfirmDelete;
        }
    }

    pub fn cancel_confirm_delete(&mut self) {
        self.view = View::List;
    }

    /// Delete the selection. On failure the records stay as they were and
    /// the error is shown as a toast.
    pub fn confirm_delete(&mut self) -> Result<usize, ShelfError> {
        self.view = View::List;
        let result = self.state.delete_selected();
        match &result {
            Ok(n) => self.toast(format!("Deleted {n} record(s)")),
            Err(e) => self.toast(format!("Delete failed: {e}")),
        }
        self.clamp_cursor();
        result
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shelf::codec::JsonDocumentCodec;
    use crate::shelf::ports::{FixedClock, MemoryByteStore};
    use crate::shelf::store::RecordStore;
    use std::sync::Arc;

    fn app_with(doc: &str) -> (App, Arc<MemoryByteStore>) {
        let bytes = Arc::new(MemoryByteStore::with_contents(doc));
        let store = Arc::new(RecordStore::new(bytes.clone(), Arc::new(JsonDocumentCodec)));
        let clock = Arc::new(FixedClock("2024-06-01T12:00:00Z".parse().unwrap()));
        let state = ShelfState::load(store, clock).unwrap();
        (App::new(state, MaskPolicy::default()), bytes)
    }

    const DOC: &str = r#"{"apiKeys": [
        {"id": "1", "vendor": "beta", "account": "a", "apiKey": "k1", "tag": "dev"},
        {"id": "2", "vendor": "alpha", "account": "a", "apiKey": "k2", "tag": "prod"},
        {"id": "3", "vendor": "gamma", "account": "a", "apiKey": "k3", "tag": "prod"}
    ]}"#;

    fn vendors(app: &App) -> Vec<String> {
        app.visible().iter().map(|r| r.vendor.clone()).collect()
    }

    #[test]
    fn search_narrows_and_cursor_clamps() {
        let (mut app, _) = app_with(DOC);
        app.next();
        app.next();
        assert_eq!(app.selected, 2);
        app.enter_search();
        app.push_filter('l');
        assert_eq!(vendors(&app), vec!["alpha"]);
        assert_eq!(app.selected, 0);
        app.pop_filter();
        assert_eq!(vendors(&app).len(), 3);
    }

    #[test]
    fn tag_cycle_filters_visible_records() {
        let (mut app, _) = app_with(DOC);
        app.cycle_tag();
        assert_eq!(app.tag_filter(), Some("dev"));
        assert_eq!(vendors(&app), vec!["beta"]);
        app.cycle_tag();
        assert_eq!(vendors(&app), vec!["alpha", "gamma"]);
        app.cycle_tag();
        assert_eq!(app.tag_filter(), None);
        assert_eq!(app.toast_message(), Some("Tag filter cleared"));
    }

    #[test]
    fn delete_requires_selection_and_persists() {
        let (mut app, bytes) = app_with(DOC);
        app.enter_confirm_delete();
        assert_eq!(app.view, View::List);

        app.toggle_current();
        app.enter_confirm_delete();
        assert_eq!(app.view, View::ConfirmDelete);
        assert_eq!(app.confirm_delete().unwrap(), 1);
        assert_eq!(vendors(&app), vec!["beta", "gamma"]);
        let saved = String::from_utf8(bytes.contents()).unwrap();
        assert!(!saved.contains("alpha"));
    }

    #[test]
    fn failed_delete_keeps_records() {
        let (mut app, bytes) = app_with(DOC);
        app.toggle_all_visible();
        bytes.reject_writes(true);
        assert!(app.confirm_delete().is_err());
        assert_eq!(vendors(&app).len(), 3);
        assert_eq!(app.selection_count(), 3);
        assert!(app.toast_message().unwrap_or("").starts_with("Delete failed"));
    }

    #[test]
    fn toast_expires_after_ticks() {
        let (mut app, _) = app_with(DOC);
        app.cycle_sort();
        assert_eq!(app.toast_message(), Some("Sort: vendor-desc"));
        for _ in 0..TOAST_TICKS {
            app.tick();
        }
        assert_eq!(app.toast_message(), None);
    }
}
