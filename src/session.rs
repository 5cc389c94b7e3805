use std::{convert::TryFrom, fmt, str::FromStr, time::Instant};

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    document::Document,
    error::{Result, StudyTypeError},
    text,
    timer::Countdown,
    typing::{KeyOutcome, KeyPress, TypingSession},
    util::generate_id,
};

/// Fixed session lengths offered by the app.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum Mode {
    Thirty,
    #[default]
    Sixty,
    OneTwenty,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Thirty, Mode::Sixty, Mode::OneTwenty];

    pub fn secs(self) -> u64 {
        match self {
            Mode::Thirty => 30,
            Mode::Sixty => 60,
            Mode::OneTwenty => 120,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Mode::Thirty => Mode::Sixty,
            Mode::Sixty => Mode::OneTwenty,
            Mode::OneTwenty => Mode::Thirty,
        }
    }
}

impl TryFrom<u64> for Mode {
    type Error = StudyTypeError;

    fn try_from(secs: u64) -> Result<Self> {
        Mode::ALL
            .into_iter()
            .find(|m| m.secs() == secs)
            .ok_or(StudyTypeError::InvalidMode(secs))
    }
}

impl From<Mode> for u64 {
    fn from(mode: Mode) -> Self {
        mode.secs()
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let digits = s.trim().trim_end_matches('s');
        let secs = digits
            .parse::<u64>()
            .map_err(|_| format!("invalid mode '{}'", s))?;
        Mode::try_from(secs).map_err(|e| e.to_string())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.secs())
    }
}

/// Outcome of one finished session. Created once and never changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub document_id: String,
    pub document_name: String,
    pub mode: Mode,
    pub wpm: u32,
    pub accuracy: u32,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    pub total_chars: usize,
    pub completed_at: DateTime<Utc>,
}

/// Where finished results go. Failures are advisory only.
pub trait ResultSink {
    fn persist(&mut self, result: &TestResult) -> Result<()>;
}

impl ResultSink for Vec<TestResult> {
    fn persist(&mut self, result: &TestResult) -> Result<()> {
        self.push(result.clone());
        Ok(())
    }
}

/// The text a session draws its words from.
#[derive(Clone, Debug, PartialEq)]
pub struct PracticeSource {
    pub document_id: String,
    pub document_name: String,
    pub text: String,
}

impl PracticeSource {
    pub fn from_document(doc: &Document, prefer_optimized: bool) -> Self {
        Self {
            document_id: doc.id.clone(),
            document_name: doc.name.clone(),
            text: doc.practice_text(prefer_optimized).to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Ignored,
    Started,
    Progressed,
    Finished,
}

/// One timed attempt: ties the countdown and the typing state machine
/// together and produces the [`TestResult`] when either of them ends.
#[derive(Debug)]
pub struct Session<R: Rng = StdRng> {
    source: PracticeSource,
    mode: Mode,
    sample_words: usize,
    typing: TypingSession,
    timer: Countdown,
    result: Option<TestResult>,
    persist_error: Option<String>,
    rng: R,
}

impl<R: Rng> Session<R> {
    pub fn new(source: PracticeSource, mode: Mode, sample_words: usize, mut rng: R) -> Self {
        let sample_words = sample_words.max(1);
        let words = text::sample(&source.text, sample_words, &mut rng);
        debug!(
            document = %source.document_id,
            words = words.len(),
            %mode,
            "new session"
        );

        Self {
            typing: TypingSession::new(words),
            timer: Countdown::new(mode.secs()),
            source,
            mode,
            sample_words,
            result: None,
            persist_error: None,
            rng,
        }
    }

    pub fn source(&self) -> &PracticeSource {
        &self.source
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn typing(&self) -> &TypingSession {
        &self.typing
    }

    pub fn timer(&self) -> &Countdown {
        &self.timer
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    pub fn persist_error(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.timer.remaining_secs()
    }

    pub fn handle_key(
        &mut self,
        press: KeyPress,
        now: Instant,
        sink: &mut dyn ResultSink,
    ) -> SessionEvent {
        if self.is_finished() {
            return SessionEvent::Ignored;
        }

        let was_active = self.typing.is_active();
        let outcome = self.typing.handle_key(press, now);
        let started = !was_active && self.typing.is_active();
        if started {
            self.timer.start(now);
            info!(document = %self.source.document_id, mode = %self.mode, "session started");
        }

        match outcome {
            KeyOutcome::Finished => {
                self.finalize(now, sink);
                SessionEvent::Finished
            }
            KeyOutcome::Ignored => SessionEvent::Ignored,
            _ if started => SessionEvent::Started,
            _ => SessionEvent::Progressed,
        }
    }

    pub fn on_tick(&mut self, now: Instant, sink: &mut dyn ResultSink) -> SessionEvent {
        if self.is_finished() {
            return SessionEvent::Ignored;
        }

        match self.timer.poll(now) {
            Some(_) => {
                self.finalize(now, sink);
                SessionEvent::Finished
            }
            None => SessionEvent::Ignored,
        }
    }

    /// Throws away the current attempt, reporting nothing, and starts over
    /// on a fresh sample of the same text.
    pub fn restart(&mut self) {
        let words = text::sample(&self.source.text, self.sample_words, &mut self.rng);
        self.typing = TypingSession::new(words);
        self.timer = Countdown::new(self.mode.secs());
        self.result = None;
        self.persist_error = None;
        debug!(document = %self.source.document_id, "session restarted");
    }

    fn finalize(&mut self, now: Instant, sink: &mut dyn ResultSink) {
        if self.result.is_some() {
            return;
        }
        self.timer.stop();

        let completed_at = Utc::now();
        let result = TestResult {
            id: generate_id(completed_at, &mut self.rng),
            document_id: self.source.document_id.clone(),
            document_name: self.source.document_name.clone(),
            mode: self.mode,
            wpm: self.typing.wpm(now),
            accuracy: self.typing.accuracy(),
            correct_chars: self.typing.correct_chars(),
            incorrect_chars: self.typing.incorrect_chars(),
            total_chars: self.typing.total_chars(),
            completed_at,
        };
        info!(wpm = result.wpm, accuracy = result.accuracy, "session finished");

        if let Err(e) = sink.persist(&result) {
            warn!("failed to save result: {}", e);
            self.persist_error = Some(e.to_string());
        }
        self.result = Some(result);
    }
}
