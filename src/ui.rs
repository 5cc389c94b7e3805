use std::time::Instant;

use chrono::Utc;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, AppScreen},
    config::Theme,
    session::Session,
    typing::TypingSession,
    util::age,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const VISIBLE_WORD_LINES: u16 = 3;

struct Styles {
    correct: Style,
    incorrect: Style,
    missing: Style,
    extra: Style,
    cursor: Style,
    pending: Style,
    accent: Style,
    dim: Style,
    italic: Style,
}

impl Styles {
    fn new(theme: &Theme) -> Self {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let incorrect = bold.fg(Color::Red);
        let pending = Style::default().fg(Color::DarkGray);

        Self {
            correct: bold.fg(Color::White),
            incorrect,
            missing: incorrect.add_modifier(Modifier::UNDERLINED),
            extra: incorrect.add_modifier(Modifier::CROSSED_OUT | Modifier::DIM),
            cursor: pending.add_modifier(Modifier::UNDERLINED | Modifier::BOLD),
            pending,
            accent: bold.fg(theme.accent),
            dim: Style::default().add_modifier(Modifier::DIM),
            italic: Style::default().add_modifier(Modifier::ITALIC),
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Block::default()
            .style(Style::default().bg(self.theme.bg))
            .render(area, buf);

        let styles = Styles::new(&self.theme);
        match (self.screen, self.session.as_ref()) {
            (AppScreen::Typing, Some(session)) => {
                render_typing(session, &styles, Instant::now(), area, buf)
            }
            (AppScreen::Results, Some(session)) => render_results(session, &styles, area, buf),
            _ => render_library(self, &styles, area, buf),
        }
    }
}

fn render_library(app: &App, styles: &Styles, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(Line::from(vec![
        Span::styled("studytype", styles.accent),
        Span::styled(
            format!(
                "   mode {}   {}",
                app.mode,
                if app.prefer_optimized { "ai text" } else { "raw text" }
            ),
            styles.dim,
        ),
    ]))
    .render(chunks[0], buf);

    let now = Utc::now();
    let lines: Vec<Line> = if app.documents.is_empty() {
        vec![Line::from(Span::styled(
            "no documents yet, add one with `studytype add <FILE>`",
            styles.italic,
        ))]
    } else {
        app.documents
            .iter()
            .enumerate()
            .map(|(idx, doc)| {
                let selected = idx == app.selected;
                let marker = if selected { "> " } else { "  " };
                let name_style = if selected { styles.accent } else { Style::default() };
                Line::from(vec![
                    Span::styled(format!("{marker}{}", doc.name), name_style),
                    Span::styled(
                        format!(
                            "  {} words{}  {}",
                            doc.word_count(),
                            if doc.is_optimized() { ", ai" } else { "" },
                            age(doc.created_at, now)
                        ),
                        styles.dim,
                    ),
                ])
            })
            .collect()
    };

    // keep the selection on screen
    let height = chunks[1].height as usize;
    let offset = (app.selected + 1).saturating_sub(height) as u16;
    Paragraph::new(lines)
        .scroll((offset, 0))
        .render(chunks[1], buf);

    if let Some(message) = &app.message {
        Paragraph::new(Span::styled(message.as_str(), styles.incorrect)).render(chunks[2], buf);
    }

    Paragraph::new(Span::styled(
        "(enter) start / (m)ode / (o)ptimized / (d)elete / (esc)ape",
        styles.italic,
    ))
    .render(chunks[3], buf);
}

fn render_typing(session: &Session, styles: &Styles, now: Instant, area: Rect, buf: &mut Buffer) {
    let typing = session.typing();
    let width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let spans = word_spans(typing, styles);
    let fits_one_line = line_width(typing) <= width as usize;
    let words_height = if fits_one_line { 1 } else { VISIBLE_WORD_LINES };
    let padding = area.height.saturating_sub(words_height + 2) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(2),
            Constraint::Length(words_height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let mut header = vec![Span::styled(session.remaining_secs().to_string(), styles.accent)];
    if typing.is_active() {
        header.push(Span::styled(
            format!("   {} wpm   {}% acc", typing.wpm(now), typing.accuracy()),
            styles.dim,
        ));
    }
    Paragraph::new(Line::from(header)).render(chunks[1], buf);

    let scroll = current_line(typing, width).saturating_sub(1);
    Paragraph::new(Line::from(spans))
        .alignment(if fits_one_line {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .scroll((scroll, 0))
        .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        format!("{}  (tab) restart / (esc) library", session.source().document_name),
        styles.italic,
    ))
    .render(chunks[4], buf);
}

fn render_results(session: &Session, styles: &Styles, area: Rect, buf: &mut Buffer) {
    let Some(result) = session.result() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(Span::styled(
        format!("{} wpm   {}% acc", result.wpm, result.accuracy),
        styles.accent,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Line::from(vec![
        Span::styled(format!("{} correct", result.correct_chars), styles.correct),
        Span::raw("   "),
        Span::styled(format!("{} errors", result.incorrect_chars), styles.incorrect),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        format!("{} / {}", result.document_name, result.mode),
        styles.dim,
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    if let Some(err) = session.persist_error() {
        Paragraph::new(Span::styled(
            format!("result not saved: {err}"),
            styles.incorrect,
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    Paragraph::new(Span::styled(
        "(r)etry / (b)ack to library / (esc)ape",
        styles.italic,
    ))
    .render(chunks[6], buf);
}

fn word_spans<'a>(typing: &'a TypingSession, styles: &Styles) -> Vec<Span<'a>> {
    let mut spans = Vec::new();
    let committed = typing.typed_words().len();

    for (idx, target) in typing.words().iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw(" "));
        }
        if idx < committed {
            committed_word(&typing.typed_words()[idx], target, styles, &mut spans);
        } else if idx == typing.current_word_index() {
            current_word(typing.current_input(), target, styles, &mut spans);
        } else {
            spans.push(Span::styled(target.as_str(), styles.pending));
        }
    }
    spans
}

fn committed_word(typed: &str, target: &str, styles: &Styles, spans: &mut Vec<Span<'_>>) {
    let mut typed_chars = typed.chars();
    for expected in target.chars() {
        let style = match typed_chars.next() {
            Some(c) if c == expected => styles.correct,
            Some(_) => styles.incorrect,
            None => styles.missing,
        };
        spans.push(Span::styled(expected.to_string(), style));
    }
    let extra: String = typed_chars.collect();
    if !extra.is_empty() {
        spans.push(Span::styled(extra, styles.extra));
    }
}

fn current_word(input: &str, target: &str, styles: &Styles, spans: &mut Vec<Span<'_>>) {
    let mut input_chars = input.chars();
    let mut at_cursor = true;
    for expected in target.chars() {
        let style = match input_chars.next() {
            Some(c) if c == expected => styles.correct,
            Some(_) => styles.incorrect,
            None if at_cursor => {
                at_cursor = false;
                styles.cursor
            }
            None => styles.pending,
        };
        spans.push(Span::styled(expected.to_string(), style));
    }
    let extra: String = input_chars.collect();
    if !extra.is_empty() {
        spans.push(Span::styled(extra, styles.incorrect));
    }
}

/// Width of a word as displayed, counting overtyped characters.
fn display_width(typed: &str, target: &str) -> usize {
    typed.width().max(target.width())
}

fn shown_words(typing: &TypingSession) -> impl Iterator<Item = usize> + '_ {
    let committed = typing.typed_words().len();
    typing.words().iter().enumerate().map(move |(idx, target)| {
        if idx < committed {
            display_width(&typing.typed_words()[idx], target)
        } else if idx == typing.current_word_index() {
            display_width(typing.current_input(), target)
        } else {
            target.width()
        }
    })
}

fn line_width(typing: &TypingSession) -> usize {
    let (sum, count) = shown_words(typing).fold((0usize, 0usize), |(s, n), w| (s + w, n + 1));
    sum + count.saturating_sub(1)
}

/// Row of the current word after greedy wrapping at `width` columns.
fn current_line(typing: &TypingSession, width: u16) -> u16 {
    let width = width as usize;
    let mut line = 0u16;
    let mut used = 0usize;

    for (idx, w) in shown_words(typing).enumerate() {
        if used > 0 && used + 1 + w > width {
            line += 1;
            used = 0;
        }
        used += if used == 0 { w } else { w + 1 };
        if idx == typing.current_word_index() {
            return line;
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Settings, document::Document, storage::Store, text::WordSequence,
        typing::KeyPress,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn rendered(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    fn app_with(text: &str) -> App {
        let store = Store::open_in_memory().unwrap();
        store.save_document(&Document::new("chapter1.pdf", text)).unwrap();
        App::new(store, Settings::default()).unwrap()
    }

    fn typed(words: &[&str], keys: &str) -> TypingSession {
        let mut typing = TypingSession::new(WordSequence::from(words));
        let now = Instant::now();
        for c in keys.chars() {
            typing.handle_key(KeyPress::char(c), now);
        }
        typing
    }

    fn styles() -> Styles {
        Styles::new(&Theme::default())
    }

    #[test]
    fn library_lists_documents() {
        let app = app_with("some words to practise with");
        let out = rendered(&app, Rect::new(0, 0, 80, 24));
        assert!(out.contains("chapter1.pdf"));
        assert!(out.contains("5 words"));
        assert!(out.contains("mode 60s"));
    }

    #[test]
    fn empty_library_hints_at_add() {
        let app = App::new(Store::open_in_memory().unwrap(), Settings::default()).unwrap();
        let out = rendered(&app, Rect::new(0, 0, 80, 24));
        assert!(out.contains("no documents yet"));
    }

    #[test]
    fn typing_screen_shows_timer_and_words() {
        let mut app = app_with("hello world");
        app.start_session(None).unwrap();
        let out = rendered(&app, Rect::new(0, 0, 80, 24));
        assert!(out.contains("60"));
        assert!(out.contains("hello world"));
        assert!(!out.contains("wpm"));
    }

    #[test]
    fn typing_screen_shows_live_stats_once_active() {
        let mut app = app_with("hello world");
        app.start_session(None).unwrap();
        app.on_key(
            KeyEvent::new(KeyCode::Char('h'), KeyModifiers::NONE),
            Instant::now(),
        );
        let out = rendered(&app, Rect::new(0, 0, 80, 24));
        assert!(out.contains("wpm"));
        assert!(out.contains("100% acc"));
    }

    #[test]
    fn results_screen_shows_scores() {
        let mut app = app_with("hi");
        app.start_session(None).unwrap();
        for c in "hi ".chars() {
            app.on_key(
                KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE),
                Instant::now(),
            );
        }
        assert_eq!(app.screen, AppScreen::Results);

        let out = rendered(&app, Rect::new(0, 0, 80, 24));
        assert!(out.contains("100% acc"));
        assert!(out.contains("3 correct"));
        assert!(out.contains("chapter1.pdf / 60s"));
    }

    #[test]
    fn small_area_does_not_panic() {
        let mut app = app_with("hello world again and again");
        app.start_session(None).unwrap();
        let area = Rect::new(0, 0, 12, 3);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);
        assert_eq!(*buffer.area(), area);
    }

    #[test]
    fn committed_word_marks_missing_and_extra() {
        let styles = styles();
        let typing = typed(&["cat", "dog"], "ca dogs ");
        let spans = word_spans(&typing, &styles);

        // c a t ␠ d o g s
        assert_eq!(spans[0].style, styles.correct);
        assert_eq!(spans[2].content, "t");
        assert_eq!(spans[2].style, styles.missing);
        assert_eq!(spans.last().unwrap().content, "s");
        assert_eq!(spans.last().unwrap().style, styles.extra);
    }

    #[test]
    fn current_word_shows_cursor_and_pending() {
        let styles = styles();
        let typing = typed(&["word", "next"], "wx");
        let spans = word_spans(&typing, &styles);

        assert_eq!(spans[0].style, styles.correct);
        assert_eq!(spans[1].style, styles.incorrect);
        assert_eq!(spans[2].style, styles.cursor);
        assert_eq!(spans[3].style, styles.pending);
        assert_eq!(spans.last().unwrap().content, "next");
        assert_eq!(spans.last().unwrap().style, styles.pending);
    }

    #[test]
    fn current_word_overtyping_is_an_error() {
        let styles = styles();
        let typing = typed(&["go", "on"], "goo");
        let spans = word_spans(&typing, &styles);
        assert_eq!(spans[2].content, "o");
        assert_eq!(spans[2].style, styles.incorrect);
    }

    #[test]
    fn current_line_follows_wrapping() {
        let typing = typed(&["aaaa", "bbbb", "cccc", "dddd"], "aaaa bbbb cccc ");
        assert_eq!(current_line(&typing, 80), 0);
        // "aaaa bbbb" fits in 9 columns, "cccc dddd" goes to the next row
        assert_eq!(current_line(&typing, 9), 1);
        assert_eq!(current_line(&typing, 4), 3);
    }

    #[test]
    fn line_width_counts_separators() {
        let typing = typed(&["ab", "cd"], "");
        assert_eq!(line_width(&typing), 5);
    }
}
