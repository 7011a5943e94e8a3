//! Terminal front end: renders progress and answers prompts from stdin.

use std::io::{IsTerminal, Write};

use chrono::{DateTime, Local};
use twinpane_core::FileSystemEntry;
use twinpane_ops::{
    Conflict, ConflictDecision, ConflictResponse, DeleteErrorAction, OperationComplete,
    OperationError, OperationEvent, OperationHandle, OperationProgress, TransferErrorAction,
};

/// Drain a running operation's events until it finishes.
///
/// The first Ctrl-C cancels the operation; the worker stops at the next item
/// or copy chunk.
pub async fn drive(mut handle: OperationHandle) -> OperationComplete {
    let cancel = handle.cancellation_token();
    let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());
    let mut interrupted = false;
    let show_progress = std::io::stderr().is_terminal();

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => handle_event(event, show_progress).await,
                None => break,
            },
            result = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = result {
                    tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                    continue;
                }
                if show_progress {
                    clear_line();
                }
                eprintln!("Cancelling...");
                cancel.cancel();
            }
        }
    }

    if show_progress {
        clear_line();
    }
    handle.wait().await
}

async fn handle_event(event: OperationEvent, show_progress: bool) {
    match event {
        OperationEvent::Progress(progress) => {
            if show_progress {
                render_progress(&progress);
            }
        }
        OperationEvent::Conflict(prompt) => {
            if show_progress {
                clear_line();
            }
            let response = ask_conflict(prompt.subject()).await;
            prompt.respond(response);
        }
        OperationEvent::TransferError(prompt) => {
            if show_progress {
                clear_line();
            }
            let action = ask_transfer_error(prompt.subject()).await;
            prompt.respond(action);
        }
        OperationEvent::DeleteError(prompt) => {
            if show_progress {
                clear_line();
            }
            let action = ask_delete_error(prompt.subject()).await;
            prompt.respond(action);
        }
        OperationEvent::Complete(_) => {}
    }
}

fn render_progress(progress: &OperationProgress) {
    let name = truncate(progress.current_name.as_deref().unwrap_or(""), 40);
    let counts = format!("{}/{}", progress.items_completed, progress.items_total);
    let line = match progress.bytes() {
        Some((done, total)) => format!(
            "{} {:>5.1}%  {}  {} / {}  {}",
            progress.operation_type,
            progress.percentage(),
            counts,
            format_size(done),
            format_size(total),
            name
        ),
        None => format!(
            "{} {:>5.1}%  {}  {}",
            progress.operation_type,
            progress.percentage(),
            counts,
            name
        ),
    };

    eprint!("\r\x1b[2K{line}");
    let _ = std::io::stderr().flush();
}

fn clear_line() {
    eprint!("\r\x1b[2K");
    let _ = std::io::stderr().flush();
}

async fn ask_conflict(conflict: &Conflict) -> ConflictResponse {
    eprintln!("{}: {}", conflict.kind, conflict.destination.path.display());
    eprintln!("  incoming: {}", describe(&conflict.source));
    eprintln!("  existing: {}", describe(&conflict.destination));

    let newer = if conflict.allow_overwrite_if_newer {
        " [n]ewer,"
    } else {
        ""
    };
    let question =
        format!("[o]verwrite,{newer} [s]kip, [r]ename, [a]bort (upper case applies to all)? ");

    loop {
        let Some(answer) = read_answer(&question).await else {
            return ConflictResponse::abort();
        };
        let Some(key) = answer.chars().next() else {
            continue;
        };

        let decision = match key.to_ascii_lowercase() {
            'o' => ConflictDecision::Overwrite,
            'n' if conflict.allow_overwrite_if_newer => ConflictDecision::OverwriteIfNewer,
            's' => ConflictDecision::Skip,
            'r' => {
                let question = format!("New name [{}]: ", conflict.suggested_name);
                let Some(name) = read_answer(&question).await else {
                    return ConflictResponse::abort();
                };
                if name.is_empty() {
                    ConflictDecision::Rename(conflict.suggested_name.clone())
                } else {
                    ConflictDecision::Rename(name)
                }
            }
            'a' => ConflictDecision::Abort,
            _ => continue,
        };

        return ConflictResponse {
            decision,
            apply_to_all: key.is_ascii_uppercase(),
        };
    }
}

async fn ask_transfer_error(error: &OperationError) -> TransferErrorAction {
    eprintln!("{error}");
    loop {
        match read_answer("[r]etry, [c]ancel? ").await.as_deref() {
            Some("r" | "R") => return TransferErrorAction::Retry,
            Some("c" | "C") | None => return TransferErrorAction::Cancel,
            Some(_) => continue,
        }
    }
}

async fn ask_delete_error(error: &OperationError) -> DeleteErrorAction {
    eprintln!("{error}");
    loop {
        match read_answer("[c]ontinue, [a]bort? ").await.as_deref() {
            Some("c" | "C") => return DeleteErrorAction::Continue,
            Some("a" | "A") | None => return DeleteErrorAction::Abort,
            Some(_) => continue,
        }
    }
}

/// Ask on stderr and read one trimmed line; `None` once stdin is closed.
async fn read_answer(question: &str) -> Option<String> {
    eprint!("{question}");
    let _ = std::io::stderr().flush();

    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    })
    .await
    .ok()
    .flatten()?;

    Some(line.trim().to_string())
}

fn describe(entry: &FileSystemEntry) -> String {
    let modified: DateTime<Local> = entry.timestamps.modified.into();
    let modified = modified.format("%Y-%m-%d %H:%M:%S");
    if entry.is_dir() {
        format!("directory, modified {modified}")
    } else {
        format!("{}, modified {modified}", format_size(entry.size))
    }
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max length, keeping the end.
fn truncate(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - max_len + 1).collect();
        format!("…{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_tail() {
        assert_eq!(truncate("short.txt", 40), "short.txt");
        assert_eq!(truncate("abcdefghij", 5), "…ghij");
    }

    #[test]
    fn test_describe_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let entry = FileSystemEntry::stat(&path).unwrap();
        assert!(describe(&entry).starts_with("2 KiB, modified "));
    }
}
