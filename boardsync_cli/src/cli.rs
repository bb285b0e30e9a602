use std::io::{self, Write};

use anyhow::{anyhow, Result};
use boardsync_core::{PostId, SyncError, ThreadRow, ViewController, ViewState};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Runs the interactive prompt until `quit` or end of input.
pub async fn run_cli(controller: ViewController) -> Result<()> {
    let mut session = CliSession {
        controller,
        rows: Vec::new(),
    };

    println!("Board client ready. Type 'help' for a list of commands.");
    if let Err(err) = session.refresh().await {
        report(&err);
    }

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        print!("{}> ", session.prompt());
        io::stdout().flush()?;

        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            println!("Exiting");
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let tokens = match shell_words::split(trimmed) {
            Ok(tokens) if !tokens.is_empty() => tokens,
            Ok(_) => continue,
            Err(err) => {
                println!("Unable to parse command: {err}");
                continue;
            }
        };

        match session.handle_command(&tokens).await {
            Ok(LoopAction::Continue) => {}
            Ok(LoopAction::Exit) => break,
            Err(err) => report(&err),
        }
    }

    Ok(())
}

/// Server-side failures already reach the screen as notices.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<SyncError>() {
        Some(SyncError::Network(_) | SyncError::Api { .. } | SyncError::MalformedResponse(_)) => {}
        _ => println!("Error: {err:#}"),
    }
}

struct CliSession {
    controller: ViewController,
    rows: Vec<ThreadRow>,
}

enum LoopAction {
    Continue,
    Exit,
}

impl CliSession {
    fn prompt(&self) -> String {
        match self.controller.state() {
            ViewState::ThreadList => "board".to_string(),
            ViewState::Chat { title, .. } => format!("board/{title}"),
        }
    }

    async fn handle_command(&mut self, tokens: &[String]) -> Result<LoopAction> {
        let command = tokens[0].as_str();
        match command {
            "help" => {
                print_help();
            }
            "threads" | "list" => {
                self.refresh().await?;
            }
            "open" => {
                let Some(target) = tokens.get(1) else {
                    println!("Usage: open <thread-id|index>");
                    return Ok(LoopAction::Continue);
                };
                let (id, title) = self.resolve_thread(target);
                self.controller.open_thread(&id, &title).await?;
            }
            "new" => {
                if tokens.len() < 3 {
                    println!("Usage: new \"<title>\" \"<message>\"");
                    return Ok(LoopAction::Continue);
                }
                self.controller.create_thread(&tokens[1], &tokens[2]).await?;
            }
            "post" | "say" => {
                if tokens.len() < 2 {
                    println!("Usage: post \"<message>\"");
                    return Ok(LoopAction::Continue);
                }
                let message = tokens[1..].join(" ");
                self.controller.submit_post(&message).await?;
            }
            "delete" => {
                let target = match (tokens.get(1), self.controller.open_thread_id()) {
                    (Some(target), _) => self.resolve_thread(target).0,
                    (None, Some(open)) => open.to_string(),
                    (None, None) => {
                        println!("Usage: delete <thread-id|index>");
                        return Ok(LoopAction::Continue);
                    }
                };
                self.controller.delete_thread(&target).await?;
            }
            "goto" | "anchor" => {
                let post_id: PostId = tokens
                    .get(1)
                    .map(|raw| raw.trim_start_matches('>'))
                    .ok_or_else(|| anyhow!("Usage: goto <post-id>"))?
                    .parse()
                    .map_err(|_| anyhow!("post id must be a number"))?;
                if self.controller.click_anchor(post_id).await.is_none() {
                    println!("Post {post_id} is not loaded");
                }
            }
            "back" => {
                self.rows = self.controller.go_back().await?;
            }
            "quit" | "exit" => {
                println!("Goodbye");
                return Ok(LoopAction::Exit);
            }
            other => {
                println!("Unknown command '{other}'. Type 'help' for options.");
            }
        }
        Ok(LoopAction::Continue)
    }

    async fn refresh(&mut self) -> Result<()> {
        self.rows = self.controller.show_thread_list().await?;
        Ok(())
    }

    /// Accepts either a 1-based index into the last listing or a raw id.
    fn resolve_thread(&self, target: &str) -> (String, String) {
        let by_index = target
            .parse::<usize>()
            .ok()
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| self.rows.get(index));
        let row = by_index.or_else(|| self.rows.iter().find(|row| row.id == target));
        match row {
            Some(row) => (row.id.clone(), row.title.clone()),
            None => (target.to_string(), target.to_string()),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  threads                   List threads, newest activity first");
    println!("  open <id|index>           Open a thread and follow replies");
    println!("  new \"title\" \"message\"     Start a thread and open it");
    println!("  post \"message\"            Reply in the open thread (>N quotes post N)");
    println!("  goto <post-id>            Highlight a post in the open thread");
    println!("  delete [id|index]         Delete a thread (defaults to the open one)");
    println!("  back                      Return to the thread list");
    println!("  quit                      Exit");
}
