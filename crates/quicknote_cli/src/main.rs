//! QuickNote terminal front end.
//!
//! # Responsibility
//! - Collect input from arguments and stdin, then drive `NoteSynchronizer`.
//! - Render notes and notifications; the core decides what to say.

use clap::{Parser, Subcommand};
use log::error;
use quicknote_core::{
    default_log_level, init_logging, DocumentStore, Note, NoteId, NoteSynchronizer,
    Notification, Presenter, RemoveOutcome, SqliteDocumentStore, SyncConfig, SyncError,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_DB_FILE_NAME: &str = "quicknote.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "quicknote", version, about = "Create, list and delete short notes")]
struct Cli {
    /// SQLite database file holding the note documents.
    #[arg(long, default_value = DEFAULT_DB_FILE_NAME)]
    db: PathBuf,

    /// Collection the notes live in.
    #[arg(long, default_value = quicknote_core::config::DEFAULT_COLLECTION)]
    collection: String,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long)]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show all notes, newest first.
    List,
    /// Add a note.
    Add { title: String, content: String },
    /// Delete a note by id.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

struct TerminalPresenter {
    assume_yes: bool,
}

impl Presenter for TerminalPresenter {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(_) => false,
        }
    }

    fn notify(&self, notification: &Notification) {
        eprintln!("error: {notification}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("error: {message}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Runs one command. Returns an empty message when the failure was already
/// shown through the presenter.
async fn run(cli: Cli) -> Result<(), String> {
    let config = SyncConfig::for_collection(cli.collection).map_err(|err| err.to_string())?;
    let store = SqliteDocumentStore::open(&cli.db).map_err(|err| {
        error!("event=cli_open module=cli status=error error={err}");
        format!("cannot open `{}`: {err}", cli.db.display())
    })?;
    let assume_yes = matches!(cli.command, Command::Delete { yes: true, .. });
    let sync = NoteSynchronizer::with_config(store, TerminalPresenter { assume_yes }, config)
        .map_err(|err| err.to_string())?;

    execute(&sync, cli.command, &mut io::stdout()).await
}

/// Loads the collection, applies `command` and renders the resulting list.
///
/// The list is not rendered when it could not be refreshed; the load failure
/// has already been shown and the command fails.
async fn execute<S, P, W>(
    sync: &NoteSynchronizer<S, P>,
    command: Command,
    out: &mut W,
) -> Result<(), String>
where
    S: DocumentStore,
    P: Presenter,
    W: Write,
{
    let initial_load = sync.load().await;

    match command {
        Command::List => initial_load.map_err(reported)?,
        Command::Add { title, content } => {
            let id = sync.create(title, content).await.map_err(reported)?;
            writeln!(out, "added {id}").map_err(output_failed)?;
        }
        Command::Delete { id, .. } => match sync.remove(&NoteId::new(id)).await {
            Ok(RemoveOutcome::Removed) => writeln!(out, "deleted").map_err(output_failed)?,
            Ok(RemoveOutcome::Declined) => {
                return writeln!(out, "kept").map_err(output_failed);
            }
            Err(err) => return Err(reported(err)),
        },
    }

    if sync.notes_stale() {
        return Err(String::new());
    }
    render_notes(&sync.notes(), out).map_err(output_failed)
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Message for `err`, empty when the presenter has already shown it.
fn reported(err: SyncError) -> String {
    match err {
        SyncError::Busy => err.to_string(),
        _ => String::new(),
    }
}

fn output_failed(err: io::Error) -> String {
    format!("cannot write output: {err}")
}

fn render_notes(notes: &[Note], out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Your Notes ({})", notes.len())?;
    if notes.is_empty() {
        return writeln!(out, "No notes yet. Create your first note with `quicknote add`.");
    }
    for note in notes {
        writeln!(out)?;
        writeln!(out, "[{}] {}", note.id, note.title)?;
        writeln!(out, "{}", note.content)?;
        writeln!(out, "created: {}", note.created_at)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{execute, is_affirmative, render_notes, reported, Command};
    use quicknote_core::service::note_sync::LOAD_FAILED_MESSAGE;
    use quicknote_core::{
        MemoryDocumentStore, Note, NoteId, NoteSynchronizer, Notification, Presenter,
        StoreError, SyncError, Timestamp,
    };
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingPresenter {
        messages: RefCell<Vec<String>>,
    }

    impl Presenter for RecordingPresenter {
        fn confirm(&self, _prompt: &str) -> bool {
            true
        }

        fn notify(&self, notification: &Notification) {
            self.messages.borrow_mut().push(notification.message.clone());
        }
    }

    fn rendered(notes: &[Note]) -> String {
        let mut out = Vec::new();
        render_notes(notes, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn confirmation_accepts_only_yes_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("  YES \r\n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n\n"));
        assert!(!is_affirmative("yess"));
    }

    #[test]
    fn only_busy_errors_carry_a_message() {
        assert!(!reported(SyncError::Busy).is_empty());
        assert_eq!(reported(SyncError::LoadFailed(StoreError::Read("down".into()))), "");
        assert_eq!(reported(SyncError::CreateFailed(StoreError::Write("down".into()))), "");
    }

    #[test]
    fn empty_list_shows_hint() {
        assert_eq!(
            rendered(&[]),
            "Your Notes (0)\nNo notes yet. Create your first note with `quicknote add`.\n"
        );
    }

    #[test]
    fn notes_render_with_id_title_content_and_time() {
        let note = Note {
            id: NoteId::new("n1"),
            title: "Groceries".to_string(),
            content: "Milk, eggs".to_string(),
            created_at: Timestamp::Pending,
        };
        assert_eq!(
            rendered(&[note]),
            "Your Notes (1)\n\n[n1] Groceries\nMilk, eggs\ncreated: Just now\n"
        );
    }

    #[tokio::test]
    async fn list_shows_existing_notes() {
        let store = MemoryDocumentStore::new();
        let writer = NoteSynchronizer::new(store.clone(), RecordingPresenter::default());
        writer.create("Groceries", "Milk, eggs").await.unwrap();

        let sync = NoteSynchronizer::new(store, RecordingPresenter::default());
        let mut out = Vec::new();
        execute(&sync, Command::List, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Your Notes (1)\n"));
        assert!(text.contains("Groceries"));
    }

    #[tokio::test]
    async fn add_with_failed_refresh_fails_without_rendering_a_list() {
        let store = MemoryDocumentStore::new();
        let writer = NoteSynchronizer::new(store.clone(), RecordingPresenter::default());
        writer.create("Groceries", "Milk, eggs").await.unwrap();

        let presenter = RecordingPresenter::default();
        let sync = NoteSynchronizer::new(store.clone(), &presenter);
        store.fail_reads(true);
        let mut out = Vec::new();
        let command = Command::Add {
            title: "Second".to_string(),
            content: "note".to_string(),
        };
        let result = execute(&sync, command, &mut out).await;

        assert_eq!(result, Err(String::new()));
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("added "));
        assert!(!text.contains("Your Notes"));
        assert_eq!(store.document_count("notes"), 2);
        assert_eq!(
            *presenter.messages.borrow(),
            vec![LOAD_FAILED_MESSAGE, LOAD_FAILED_MESSAGE]
        );
    }

    #[tokio::test]
    async fn delete_renders_remaining_notes() {
        let store = MemoryDocumentStore::new();
        let sync = NoteSynchronizer::new(store, RecordingPresenter::default());
        let kept = sync.create("keep", "me").await.unwrap();
        let gone = sync.create("drop", "me").await.unwrap();

        let mut out = Vec::new();
        let command = Command::Delete {
            id: gone.to_string(),
            yes: false,
        };
        execute(&sync, command, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("deleted\nYour Notes (1)\n"));
        assert!(text.contains(&format!("[{kept}] keep")));
    }
}
