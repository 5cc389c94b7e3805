use std::{
    error::Error,
    fs::File,
    io::{self, stdin, Write},
    path::{Path, PathBuf},
    process,
    time::{Duration, Instant},
};

use chrono::Utc;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand, ValueEnum};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

use studytype::{
    app::{App, AppScreen},
    app_dirs::AppDirs,
    config::{FileSettingsStore, Settings, SettingsStore, SettingsUpdate},
    document,
    history::{self, Summary},
    logging::init_logging,
    optimize::{OpenAiOptimizer, TextOptimizer},
    runtime::{AppEvent, AppEventSource, CrosstermEventSource, Runner, TICK_RATE_MS},
    session::Mode,
    storage::Store,
    util::age,
};

/// practise typing on your own study material
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Import PDFs or notes, then practise typing on random excerpts of them in timed 30/60/120 second tests."
)]
pub struct Cli {
    /// log more (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// keep database, settings and log in this directory
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// import a .pdf, .txt or .md file into the library
    Add {
        file: PathBuf,

        /// skip AI optimization for this import
        #[clap(long)]
        no_ai: bool,
    },
    /// list documents in the library
    List,
    /// remove a document from the library
    Remove { id: String },
    /// start a typing test (most recent document by default)
    Practice {
        id: Option<String>,

        /// test length in seconds: 30, 60 or 120
        #[clap(short, long)]
        mode: Option<Mode>,

        /// use the extracted text even if an optimized version exists
        #[clap(long)]
        raw: bool,
    },
    /// show past results
    History {
        /// also export every result to this CSV file
        #[clap(long)]
        csv: Option<PathBuf>,
    },
    /// show or change settings
    Config {
        #[clap(long)]
        mode: Option<Mode>,

        /// rewrite imported text with the OpenAI API
        #[clap(long, value_enum)]
        ai: Option<Toggle>,

        #[clap(long)]
        api_key: Option<String>,

        /// background colour, e.g. "#323437"
        #[clap(long)]
        bg: Option<String>,

        /// accent colour, e.g. "#5d8a66"
        #[clap(long)]
        accent: Option<String>,

        /// words drawn per test
        #[clap(long)]
        words: Option<usize>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
enum Toggle {
    On,
    Off,
}

impl Command {
    fn settings_update(&self) -> Option<SettingsUpdate> {
        match self {
            Command::Config {
                mode,
                ai,
                api_key,
                bg,
                accent,
                words,
            } => Some(SettingsUpdate {
                default_mode: *mode,
                use_ai_optimization: ai.map(|t| t == Toggle::On),
                openai_api_key: api_key.clone(),
                bg_primary: bg.clone(),
                accent: accent.clone(),
                sample_words: *words,
            }),
            _ => None,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let dirs = match &cli.data_dir {
        Some(dir) => AppDirs::in_dir(dir),
        None => AppDirs::resolve(),
    };
    init_logging(cli.verbose, &dirs.log_path());

    let settings_store = FileSettingsStore::with_path(dirs.settings_path());
    let settings = settings_store.load();
    let store = Store::open(&dirs.db_path())?;
    let mut out = io::stdout().lock();

    match cli.command {
        Some(Command::Add { file, no_ai }) => add(&store, &settings, &file, no_ai, &mut out)?,
        Some(Command::List) => list(&store, &mut out)?,
        Some(Command::Remove { id }) => remove(&store, &id, &mut out)?,
        Some(Command::History { csv }) => show_history(&store, csv, &mut out)?,
        Some(cmd @ Command::Config { .. }) => {
            configure(&settings_store, settings, &cmd, &mut out)?
        }
        Some(Command::Practice { id, mode, raw }) => {
            drop(out);
            let mut app = App::new(store, settings)?;
            if let Some(mode) = mode {
                app.mode = mode;
            }
            if raw {
                app.prefer_optimized = false;
            }
            let id = id.or_else(|| app.documents.last().map(|d| d.id.clone()));
            match id {
                Some(id) => app.start_session(Some(&id))?,
                None => {
                    let mut cmd = Cli::command();
                    cmd.error(
                        ErrorKind::InvalidValue,
                        "the library is empty, add a document first",
                    )
                    .exit();
                }
            }
            run_tui(app)?;
        }
        None => {
            drop(out);
            run_tui(App::new(store, settings)?)?;
        }
    }

    Ok(())
}

fn optimizer_for(
    settings: &Settings,
    no_ai: bool,
    out: &mut impl Write,
) -> Option<OpenAiOptimizer> {
    if no_ai || !settings.use_ai_optimization {
        return None;
    }
    let Some(key) = settings.api_key() else {
        warn!("AI optimization is enabled but no API key is configured");
        let _ = writeln!(out, "note: no OpenAI API key configured, importing raw text");
        return None;
    };
    match OpenAiOptimizer::new(key, settings.openai_model.clone()) {
        Ok(optimizer) => Some(optimizer),
        Err(e) => {
            warn!("failed to build optimizer: {}", e);
            None
        }
    }
}

fn add(
    store: &Store,
    settings: &Settings,
    file: &Path,
    no_ai: bool,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let extractor = document::extractor_for(file)?;
    let optimizer = optimizer_for(settings, no_ai, out);
    let import = document::import(
        file,
        extractor.as_ref(),
        optimizer.as_ref().map(|o| o as &dyn TextOptimizer),
    )?;

    if let Some(advisory) = &import.advisory {
        writeln!(out, "note: {advisory}")?;
    }
    store.save_document(&import.document)?;

    let doc = &import.document;
    writeln!(
        out,
        "added {} ({}, {} words{})",
        doc.name,
        doc.id,
        doc.word_count(),
        if doc.is_optimized() { ", optimized" } else { "" }
    )?;
    Ok(())
}

fn list(store: &Store, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let documents = store.documents()?;
    if documents.is_empty() {
        writeln!(out, "no documents")?;
        return Ok(());
    }

    let now = Utc::now();
    for doc in &documents {
        writeln!(
            out,
            "{}  {}  {} words{}  {}",
            doc.id,
            doc.name,
            doc.word_count(),
            if doc.is_optimized() { "  ai" } else { "" },
            age(doc.created_at, now)
        )?;
    }
    Ok(())
}

fn remove(store: &Store, id: &str, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    if store.delete_document(id)? {
        writeln!(out, "removed {id}")?;
    } else {
        writeln!(out, "no document with id {id}")?;
    }
    Ok(())
}

fn show_history(
    store: &Store,
    csv: Option<PathBuf>,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let results = store.history()?;

    if let Some(path) = csv {
        history::write_csv(&results, File::create(&path)?)?;
        info!(path = %path.display(), rows = results.len(), "exported history");
        writeln!(out, "wrote {} results to {}", results.len(), path.display())?;
    }

    let Some(summary) = Summary::of(&results) else {
        writeln!(out, "no results yet")?;
        return Ok(());
    };

    let now = Utc::now();
    for r in &results {
        writeln!(
            out,
            "{:>4} wpm  {:>3}%  {:>4}  {}  {}",
            r.wpm,
            r.accuracy,
            r.mode,
            r.document_name,
            age(r.completed_at, now)
        )?;
    }

    writeln!(out)?;
    for best in history::best_per_document(&results) {
        writeln!(
            out,
            "best on {}: {} wpm ({} runs)",
            best.document_name, best.best.wpm, best.runs
        )?;
    }
    writeln!(
        out,
        "{} tests  {:.0} wpm avg  {:.0}% acc avg  {:.2} sd",
        summary.count, summary.mean_wpm, summary.mean_accuracy, summary.wpm_std_dev
    )?;
    Ok(())
}

fn configure(
    settings_store: &impl SettingsStore,
    mut settings: Settings,
    cmd: &Command,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    if let Some(update) = cmd.settings_update().filter(|u| !u.is_empty()) {
        settings.apply(update);
        settings_store.save(&settings)?;
        info!("settings updated");
    }

    writeln!(out, "mode: {}", settings.default_mode)?;
    writeln!(
        out,
        "ai: {}",
        if settings.use_ai_optimization {
            Toggle::On
        } else {
            Toggle::Off
        }
    )?;
    writeln!(
        out,
        "api key: {}",
        if settings.api_key().is_some() { "set" } else { "not set" }
    )?;
    writeln!(out, "model: {}", settings.openai_model)?;
    writeln!(out, "bg: {}", settings.bg_primary)?;
    writeln!(out, "accent: {}", settings.accent)?;
    writeln!(out, "words: {}", settings.sample_words)?;
    Ok(())
}

fn run_tui(mut app: App) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );
    let outcome = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend, E: AppEventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    while !app.should_quit {
        match runner.step() {
            AppEvent::Tick => {
                app.on_tick(Instant::now());
                // the countdown may have just moved us to results
                if app.screen != AppScreen::Library {
                    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            AppEvent::Key(key) => {
                app.on_key(key, Instant::now());
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
        }
    }

    info!(screen = %app.screen, "quitting");
    Ok(())
}
