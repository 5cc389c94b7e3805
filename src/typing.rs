//! Word-by-word typing state machine.
//!
//! Keystrokes build up the input for the current word; space or enter
//! commits it against the target word and folds its score into the running
//! counters. Backspace on an empty input undoes the previous commit
//! exactly, so the user can go back and fix the last word.

use std::time::Instant;

use crate::text::WordSequence;

const CHARS_PER_WORD: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    Enter,
    Backspace,
    /// Navigation keys, function keys and anything else with a multi-character name.
    Other,
}

/// One key-down event as delivered by the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
        }
    }

    pub fn char(c: char) -> Self {
        if c == ' ' {
            Self::new(Key::Space)
        } else {
            Self::new(Key::Char(c))
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    fn printable(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if !c.is_control() && !self.ctrl && !self.meta => Some(c),
            _ => None,
        }
    }
}

/// What a key press did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// No state change at all.
    Ignored,
    /// A character was appended to the current input.
    Inserted,
    /// The last character of the current input was removed.
    Deleted,
    /// The current word was committed and the next one is up.
    Committed,
    /// The previous commit was undone and its input restored.
    Uncommitted,
    /// The final word was committed; the session is frozen.
    Finished,
}

/// Score contribution of one committed word, including the implicit unit
/// for the space that ended it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordScore {
    pub correct: usize,
    pub incorrect: usize,
    pub exact: bool,
}

impl WordScore {
    /// Compares only the positions both strings have; typed characters past
    /// the end of the target count as incorrect.
    pub fn of(typed: &str, target: &str) -> Self {
        let correct = typed
            .chars()
            .zip(target.chars())
            .filter(|(t, e)| t == e)
            .count();
        let incorrect = typed.chars().count() - correct;
        let exact = typed == target;

        Self {
            correct: correct + usize::from(exact),
            incorrect: incorrect + usize::from(!exact),
            exact,
        }
    }
}

enum Action {
    Insert(char),
    DeleteChar,
    Commit,
    Uncommit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypingSession {
    words: WordSequence,
    typed_words: Vec<String>,
    current_word_index: usize,
    current_input: String,
    correct_chars: usize,
    incorrect_chars: usize,
    is_active: bool,
    is_finished: bool,
    started_at: Option<Instant>,
}

impl TypingSession {
    pub fn new(words: WordSequence) -> Self {
        Self {
            words,
            typed_words: Vec::new(),
            current_word_index: 0,
            current_input: String::new(),
            correct_chars: 0,
            incorrect_chars: 0,
            is_active: false,
            is_finished: false,
            started_at: None,
        }
    }

    /// Replaces the whole state with a fresh session over `words`.
    pub fn reset(&mut self, words: WordSequence) {
        *self = Self::new(words);
    }

    pub fn words(&self) -> &WordSequence {
        &self.words
    }

    pub fn typed_words(&self) -> &[String] {
        &self.typed_words
    }

    pub fn current_word_index(&self) -> usize {
        self.current_word_index
    }

    pub fn current_word(&self) -> Option<&str> {
        self.words.get(self.current_word_index).map(String::as_str)
    }

    pub fn current_input(&self) -> &str {
        &self.current_input
    }

    pub fn correct_chars(&self) -> usize {
        self.correct_chars
    }

    pub fn incorrect_chars(&self) -> usize {
        self.incorrect_chars
    }

    pub fn total_chars(&self) -> usize {
        self.correct_chars + self.incorrect_chars
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn handle_key(&mut self, press: KeyPress, now: Instant) -> KeyOutcome {
        if self.is_finished {
            return KeyOutcome::Ignored;
        }

        let Some(action) = self.action_for(press) else {
            return KeyOutcome::Ignored;
        };

        if !self.is_active {
            self.is_active = true;
            self.started_at = Some(now);
        }

        match action {
            Action::Insert(c) => {
                self.current_input.push(c);
                KeyOutcome::Inserted
            }
            Action::DeleteChar => {
                self.current_input.pop();
                KeyOutcome::Deleted
            }
            Action::Commit => self.commit(),
            Action::Uncommit => self.uncommit(),
        }
    }

    /// Decides what a key would do without touching any state.
    fn action_for(&self, press: KeyPress) -> Option<Action> {
        self.current_word()?;

        match press.key {
            Key::Space | Key::Enter if self.current_input.is_empty() => None,
            Key::Space | Key::Enter => Some(Action::Commit),
            Key::Backspace if !self.current_input.is_empty() => Some(Action::DeleteChar),
            Key::Backspace if self.current_word_index > 0 => Some(Action::Uncommit),
            Key::Backspace => None,
            Key::Char(_) => press.printable().map(Action::Insert),
            Key::Other => None,
        }
    }

    fn commit(&mut self) -> KeyOutcome {
        let target = &self.words[self.current_word_index];
        let score = WordScore::of(&self.current_input, target);

        self.correct_chars += score.correct;
        self.incorrect_chars += score.incorrect;
        self.typed_words.push(std::mem::take(&mut self.current_input));

        if self.current_word_index + 1 >= self.words.len() {
            self.is_finished = true;
            KeyOutcome::Finished
        } else {
            self.current_word_index += 1;
            KeyOutcome::Committed
        }
    }

    fn uncommit(&mut self) -> KeyOutcome {
        let prev_index = self.current_word_index - 1;
        let Some(typed) = self.typed_words.pop() else {
            return KeyOutcome::Ignored;
        };
        let score = WordScore::of(&typed, &self.words[prev_index]);

        self.correct_chars -= score.correct;
        self.incorrect_chars -= score.incorrect;
        self.current_word_index = prev_index;
        self.current_input = typed;
        KeyOutcome::Uncommitted
    }

    pub fn elapsed_minutes(&self, now: Instant) -> f64 {
        self.started_at
            .map(|start| now.saturating_duration_since(start).as_secs_f64() / 60.0)
            .unwrap_or(0.0)
    }

    /// Net words per minute over committed correct characters.
    pub fn wpm(&self, now: Instant) -> u32 {
        let minutes = self.elapsed_minutes(now);
        if minutes > 0.0 {
            ((self.correct_chars as f64 / CHARS_PER_WORD) / minutes).round() as u32
        } else {
            0
        }
    }

    pub fn accuracy(&self) -> u32 {
        let total = self.total_chars();
        if total > 0 {
            (self.correct_chars as f64 / total as f64 * 100.0).round() as u32
        } else {
            100
        }
    }
}
