//! jq-tui - interactively edit jq filters over a fixed document.
//!
//! Responsibilities:
//! - Orchestrate startup: CLI parsing, config and history loading,
//!   document reading, logging, terminal setup.
//! - Run the main event loop, wiring key events through the app state
//!   machine into the session controller and the suggestion source.
//! - Tear down and run the accepted filter once more with the real
//!   output options, writing to stdout.
//!
//! Does NOT handle:
//! - Subprocess plumbing (see `jq_filter`) or key dispatch (see `app`).
//!
//! Invariants:
//! - The interface draws on stderr; stdout carries only the final
//!   filter output. The accepted expression is echoed to stderr so
//!   redirected pipelines can recover it.
//! - Exit code is the final run's subprocess code, or 130 on abandon.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEventKind};
use futures_util::StreamExt;
use tokio::sync::mpsc::{Sender, channel};
use tracing_appender::non_blocking;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use jq_config::{Config, History};
use jq_filter::{
    Autocomplete, CancellationToken, Document, FilterExecutor, WriterDestination,
};
use jq_tui::action::Action;
use jq_tui::app::{App, Command};
use jq_tui::cli::Cli;
use jq_tui::pane::PaneHandle;
use jq_tui::session::{FilterSnapshot, SessionController};
use jq_tui::terminal::TerminalGuard;
use jq_tui::ui;

const ACTION_CHANNEL_CAPACITY: usize = 64;
const ABANDONED_EXIT_CODE: u8 = 130;

/// How the interactive session ended.
enum Outcome {
    Submitted(String),
    Abandoned,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // The non-blocking writer guard must outlive the session so logs
    // are flushed on exit.
    let _log_guard = match &cli.log_dir {
        Some(dir) => Some(init_logging(dir)?),
        None => None,
    };

    let config = Config::load(cli.config.as_deref())?;

    let jq_bin = cli
        .jq_bin
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.jq_bin));
    let history_path = cli.history_file.clone().or_else(|| config.history_path());
    let show_input_pane = !config.hide_input_pane;

    let mut options = cli.options();
    options
        .library_paths
        .extend(config.library_paths.iter().cloned());

    let stdin_piped = !io::stdin().is_terminal();
    let (filter_arg, files) = cli.split_positionals(stdin_piped)?;

    let initial_filter = match &cli.filter_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading filter file {}", path.display()))?
            .trim_end()
            .to_string(),
        None => filter_arg.unwrap_or_else(|| ".".to_string()),
    };

    let document = Document::read(&files, &mut io::stdin().lock(), options)
        .context("reading input document")?;
    let mut history = History::load(history_path)?;

    let (mut terminal, guard) = TerminalGuard::enter()?;

    let (tx, mut rx) = channel::<Action>(ACTION_CHANNEL_CAPACITY);
    spawn_input_task(tx.clone());

    let input_pane = PaneHandle::new();
    let output_pane = PaneHandle::new();
    let executor = Arc::new(FilterExecutor::new(jq_bin));
    let autocomplete = Autocomplete::new(Arc::clone(&executor));

    // The input pane shows the document itself, pretty-printed once.
    if show_input_pane {
        let executor = Arc::clone(&executor);
        let document = document.clone();
        let mut destination = input_pane.destination(tx.clone());
        tokio::spawn(async move {
            let token = CancellationToken::new();
            if let Err(err) = executor.run(&document, ".", &mut destination, &token).await {
                tracing::warn!(%err, "input pane fill failed");
            }
        });
    }

    let session = SessionController::new();
    session.queue(FilterSnapshot {
        document: document.clone(),
        filter: initial_filter.clone(),
    });
    let session_loop = session.spawn_loop(
        Arc::clone(&executor),
        output_pane.destination(tx.clone()),
        tx.clone(),
    );

    let mut app = App::new(
        config.keymaps,
        &initial_filter,
        show_input_pane,
        input_pane,
        output_pane,
    );
    refresh_suggestions(&mut app, &autocomplete, &history, &document, &tx);

    let outcome = loop {
        terminal.draw(|frame| ui::render(frame, &mut app))?;

        let Some(action) = rx.recv().await else {
            break Outcome::Abandoned;
        };
        match app.handle_action(action) {
            Some(Command::Refilter(filter)) => {
                session.queue(FilterSnapshot {
                    document: document.clone(),
                    filter,
                });
                refresh_suggestions(&mut app, &autocomplete, &history, &document, &tx);
            }
            Some(Command::ApplySuggestion(filter)) => {
                session.queue(FilterSnapshot {
                    document: document.clone(),
                    filter,
                });
            }
            Some(Command::RefreshSuggestions) => {
                refresh_suggestions(&mut app, &autocomplete, &history, &document, &tx);
            }
            Some(Command::Submit(filter)) => break Outcome::Submitted(filter),
            Some(Command::Quit) => break Outcome::Abandoned,
            None => {}
        }
    };

    session.shutdown();
    let _ = session_loop.await;

    if let Err(err) = TerminalGuard::restore() {
        tracing::warn!(%err, "terminal restore failed");
    }
    drop(guard);
    drop(terminal);

    match outcome {
        Outcome::Abandoned => Ok(ExitCode::from(ABANDONED_EXIT_CODE)),
        Outcome::Submitted(filter) => {
            if let Err(err) = history.add(&filter) {
                tracing::warn!(%err, "could not append to history");
            }
            // Echo the expression so `jq-tui ... 2>expr.jq` style
            // capture works even when stdout is piped onward.
            eprintln!("{filter}");
            run_final(&executor, &document, &filter).await
        }
    }
}

/// Run the accepted filter one last time with the real output options,
/// streaming straight to stdout.
async fn run_final(
    executor: &FilterExecutor,
    document: &Document,
    filter: &str,
) -> Result<ExitCode> {
    let is_terminal = io::stdout().is_terminal();
    let final_document = document.with_options(document.options().for_final_output(is_terminal));

    // The unlocked handle: StdoutLock is not Send and cannot cross the
    // executor's task boundary.
    let mut destination = WriterDestination::new(io::stdout());
    let token = CancellationToken::new();
    match executor
        .run(&final_document, filter, &mut destination, &token)
        .await
    {
        Ok(_) => {
            destination.into_inner()?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            match err.stderr_text() {
                Some(text) if !text.trim().is_empty() => eprint!("{text}"),
                _ => eprintln!("{err}"),
            }
            Ok(ExitCode::from(err.exit_code().clamp(1, 255) as u8))
        }
    }
}

fn init_logging(dir: &std::path::Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(dir, "jq-tui.log");
    let (writer, guard) = non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Ok(guard)
}

/// Forward terminal events into the action channel. Key events use a
/// blocking send so user intent is never dropped.
fn spawn_input_task(tx: Sender<Action>) {
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(event) = reader.next().await {
            let action = match event {
                Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    Action::Input(key)
                }
                Ok(CrosstermEvent::Resize(width, height)) => Action::Resize(width, height),
                Ok(_) => continue,
                Err(err) => {
                    tracing::error!(%err, "terminal event stream failed");
                    break;
                }
            };
            if tx.send(action).await.is_err() {
                break;
            }
        }
    });
}

fn refresh_suggestions(
    app: &mut App,
    autocomplete: &Autocomplete,
    history: &History,
    document: &Document,
    tx: &Sender<Action>,
) {
    let wake = tx.clone();
    let suggestions = autocomplete.suggest(app.filter_text(), history.entries(), document, move || {
        let _ = wake.try_send(Action::SuggestionsReady);
    });
    app.set_suggestions(suggestions);
}
