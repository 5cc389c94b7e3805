use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};

use crate::{
    config::{Settings, Theme},
    document::Document,
    error::{Result, StudyTypeError},
    session::{Mode, PracticeSource, Session, SessionEvent},
    storage::Store,
    typing::KeyPress,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AppScreen {
    Library,
    Typing,
    Results,
}

#[derive(Debug)]
pub struct App {
    pub store: Store,
    pub settings: Settings,
    pub theme: Theme,
    pub screen: AppScreen,
    pub documents: Vec<Document>,
    pub selected: usize,
    pub mode: Mode,
    pub prefer_optimized: bool,
    pub session: Option<Session>,
    pub message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(store: Store, settings: Settings) -> Result<Self> {
        let documents = store.documents()?;
        Ok(Self {
            theme: settings.theme(),
            mode: settings.default_mode,
            prefer_optimized: settings.use_ai_optimization,
            selected: documents.len().saturating_sub(1),
            documents,
            store,
            settings,
            screen: AppScreen::Library,
            session: None,
            message: None,
            should_quit: false,
        })
    }

    pub fn refresh_documents(&mut self) -> Result<()> {
        self.documents = self.store.documents()?;
        if self.selected >= self.documents.len() {
            self.selected = self.documents.len().saturating_sub(1);
        }
        Ok(())
    }

    pub fn selected_document(&self) -> Option<&Document> {
        self.documents.get(self.selected)
    }

    /// Opens a typing session on `doc_id`, or on the selected document.
    pub fn start_session(&mut self, doc_id: Option<&str>) -> Result<()> {
        let doc = match doc_id {
            Some(id) => self
                .documents
                .iter()
                .find(|d| d.id == id)
                .ok_or_else(|| StudyTypeError::DocumentNotFound(id.to_string()))?,
            None => self
                .selected_document()
                .ok_or_else(|| StudyTypeError::DocumentNotFound("(none selected)".to_string()))?,
        };

        let source = PracticeSource::from_document(doc, self.prefer_optimized);
        info!(document = %doc.id, mode = %self.mode, "opening typing test");
        self.session = Some(Session::new(
            source,
            self.mode,
            self.settings.sample_words,
            StdRng::from_entropy(),
        ));
        self.message = None;
        self.screen = AppScreen::Typing;
        Ok(())
    }

    fn back_to_library(&mut self) {
        self.session = None;
        self.screen = AppScreen::Library;
        if let Err(e) = self.refresh_documents() {
            warn!("failed to reload documents: {}", e);
            self.message = Some(e.to_string());
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        if self.screen != AppScreen::Typing {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if session.on_tick(now, &mut self.store) == SessionEvent::Finished {
                self.screen = AppScreen::Results;
            }
        }
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.screen {
            AppScreen::Library => self.on_library_key(key),
            AppScreen::Typing => self.on_typing_key(key, now),
            AppScreen::Results => self.on_results_key(key),
        }
    }

    fn on_library_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.documents.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('m') => self.mode = self.mode.next(),
            KeyCode::Char('o') => self.prefer_optimized = !self.prefer_optimized,
            KeyCode::Char('d') => self.delete_selected(),
            KeyCode::Enter => {
                if let Err(e) = self.start_session(None) {
                    self.message = Some(e.to_string());
                }
            }
            _ => {}
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_document().map(|d| d.id.clone()) else {
            return;
        };
        let outcome = self
            .store
            .delete_document(&id)
            .and_then(|_| self.refresh_documents());
        if let Err(e) = outcome {
            warn!("failed to delete document {}: {}", id, e);
            self.message = Some(e.to_string());
        }
    }

    fn on_typing_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Esc => self.back_to_library(),
            KeyCode::Tab => {
                if let Some(session) = self.session.as_mut() {
                    session.restart();
                }
            }
            _ => {
                if let Some(session) = self.session.as_mut() {
                    let event = session.handle_key(KeyPress::from(key), now, &mut self.store);
                    if event == SessionEvent::Finished {
                        self.screen = AppScreen::Results;
                    }
                }
            }
        }
    }

    fn on_results_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') | KeyCode::Tab => {
                if let Some(session) = self.session.as_mut() {
                    session.restart();
                    self.screen = AppScreen::Typing;
                }
            }
            KeyCode::Char('b') => self.back_to_library(),
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TEXT: &str = "the quick brown fox jumps over the lazy dog while the cat sleeps";

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with_doc(text: &str) -> (App, String) {
        let store = Store::open_in_memory().unwrap();
        let doc = Document::new("Notes", text);
        store.save_document(&doc).unwrap();
        let app = App::new(store, Settings::default()).unwrap();
        (app, doc.id)
    }

    fn type_text(app: &mut App, text: &str, now: Instant) {
        for c in text.chars() {
            app.on_key(key(KeyCode::Char(c)), now);
        }
    }

    #[test]
    fn starts_on_library_with_settings_applied() {
        let mut settings = Settings::default();
        settings.default_mode = Mode::Thirty;
        let app = App::new(Store::open_in_memory().unwrap(), settings).unwrap();
        assert_eq!(app.screen, AppScreen::Library);
        assert_eq!(app.mode, Mode::Thirty);
        assert!(app.documents.is_empty());
    }

    #[test]
    fn enter_without_documents_shows_message() {
        let mut app = App::new(Store::open_in_memory().unwrap(), Settings::default()).unwrap();
        app.on_key(key(KeyCode::Enter), Instant::now());
        assert_eq!(app.screen, AppScreen::Library);
        assert!(app.message.is_some());
    }

    #[test]
    fn unknown_document_id_is_an_error() {
        let (mut app, _) = app_with_doc(TEXT);
        let err = app.start_session(Some("missing")).unwrap_err();
        assert!(matches!(err, StudyTypeError::DocumentNotFound(_)));
    }

    #[test]
    fn full_run_saves_result_and_shows_results() {
        let (mut app, id) = app_with_doc("alpha beta");
        app.start_session(Some(&id)).unwrap();
        assert_eq!(app.screen, AppScreen::Typing);

        type_text(&mut app, "alpha beta ", Instant::now());
        assert_eq!(app.screen, AppScreen::Results);

        let history = app.store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].document_id, id);
        assert_eq!(history[0].accuracy, 100);
    }

    #[test]
    fn timer_expiry_moves_to_results() {
        let (mut app, id) = app_with_doc(TEXT);
        app.mode = Mode::Thirty;
        app.start_session(Some(&id)).unwrap();

        let t0 = Instant::now();
        app.on_key(key(KeyCode::Char('x')), t0);
        app.on_tick(t0 + Duration::from_secs(10));
        assert_eq!(app.screen, AppScreen::Typing);

        app.on_tick(t0 + Duration::from_secs(30));
        assert_eq!(app.screen, AppScreen::Results);
        assert_eq!(app.store.history().unwrap().len(), 1);
    }

    #[test]
    fn tab_restarts_without_saving() {
        let (mut app, id) = app_with_doc(TEXT);
        app.start_session(Some(&id)).unwrap();
        let now = Instant::now();
        type_text(&mut app, "the qu", now);

        app.on_key(key(KeyCode::Tab), now);
        let session = app.session.as_ref().unwrap();
        assert!(!session.typing().is_active());
        assert_eq!(session.typing().current_input(), "");
        assert!(app.store.history().unwrap().is_empty());
    }

    #[test]
    fn escape_from_typing_discards_session() {
        let (mut app, id) = app_with_doc(TEXT);
        app.start_session(Some(&id)).unwrap();
        type_text(&mut app, "the", Instant::now());

        app.on_key(key(KeyCode::Esc), Instant::now());
        assert_eq!(app.screen, AppScreen::Library);
        assert!(app.session.is_none());
        assert!(!app.should_quit);
    }

    #[test]
    fn retry_from_results() {
        let (mut app, id) = app_with_doc("hi");
        app.start_session(Some(&id)).unwrap();
        type_text(&mut app, "hi ", Instant::now());
        assert_eq!(app.screen, AppScreen::Results);

        app.on_key(key(KeyCode::Char('r')), Instant::now());
        assert_eq!(app.screen, AppScreen::Typing);
        assert!(!app.session.as_ref().unwrap().is_finished());
    }

    #[test]
    fn library_navigation_and_mode_cycle() {
        let store = Store::open_in_memory().unwrap();
        for name in ["a", "b", "c"] {
            store.save_document(&Document::new(name, TEXT)).unwrap();
        }
        let mut app = App::new(store, Settings::default()).unwrap();
        assert_eq!(app.selected, 2);

        app.on_key(key(KeyCode::Down), Instant::now());
        assert_eq!(app.selected, 2);
        app.on_key(key(KeyCode::Up), Instant::now());
        app.on_key(key(KeyCode::Char('k')), Instant::now());
        app.on_key(key(KeyCode::Char('k')), Instant::now());
        assert_eq!(app.selected, 0);

        assert_eq!(app.mode, Mode::Sixty);
        app.on_key(key(KeyCode::Char('m')), Instant::now());
        assert_eq!(app.mode, Mode::OneTwenty);
    }

    #[test]
    fn delete_from_library() {
        let (mut app, _) = app_with_doc(TEXT);
        app.on_key(key(KeyCode::Char('d')), Instant::now());
        assert!(app.documents.is_empty());
        assert!(app.store.documents().unwrap().is_empty());
    }

    #[test]
    fn optimized_text_used_when_preferred() {
        let store = Store::open_in_memory().unwrap();
        let mut doc = Document::new("n", TEXT);
        doc.optimized_text = Some("dense words".into());
        store.save_document(&doc).unwrap();

        let mut app = App::new(store, Settings::default()).unwrap();
        app.start_session(None).unwrap();
        assert_eq!(app.session.as_ref().unwrap().typing().words().len(), 13);

        app.on_key(key(KeyCode::Esc), Instant::now());
        app.on_key(key(KeyCode::Char('o')), Instant::now());
        app.start_session(None).unwrap();
        assert_eq!(
            app.session.as_ref().unwrap().typing().words().as_slice(),
            ["dense", "words"]
        );
    }

    #[test]
    fn ctrl_c_quits_anywhere() {
        let (mut app, id) = app_with_doc(TEXT);
        app.start_session(Some(&id)).unwrap();
        app.on_key(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Instant::now(),
        );
        assert!(app.should_quit);
    }
}
