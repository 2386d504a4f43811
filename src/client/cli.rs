//! Terminal entry points: interactive chat, one-shot search, rendering

use super::session::ChatSession;
use super::transport::HttpChatTransport;
use crate::chat::{Conversation, SessionUpdate, UiPart};
use crate::cmr::CmrClient;
use crate::config::Config;
use crate::render::{self, text::layout_colored};
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::sync::mpsc;

/// What the prompt produced
#[derive(Debug, PartialEq)]
enum Input {
    Line(String),
    Interrupted,
    Eof,
}

/// Forward every Ctrl-C for the life of the process
///
/// The prompt and in-flight turns share this one listener.
fn spawn_interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Wait for the next input line or Ctrl-C, whichever comes first
async fn read_input<R>(
    lines: &mut Lines<R>,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> Result<Input>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => Ok(match line? {
            Some(line) => Input::Line(line),
            None => Input::Eof,
        }),
        _ = interrupts.recv() => Ok(Input::Interrupted),
    }
}

/// Run interactive chat mode against a chat endpoint
pub async fn run_chat(
    config: &Config,
    endpoint: &str,
    initial_message: Option<String>,
) -> Result<()> {
    let transport = Arc::new(HttpChatTransport::new(endpoint));
    let new_session = || {
        ChatSession::new(
            transport.clone(),
            Conversation::with_greeting(config.chat.greeting.clone()),
        )
    };
    let mut session = new_session();
    let mut interrupts = spawn_interrupts();

    println!("{}", "cmr-chat".bold().cyan());
    println!("Endpoint: {}", endpoint);
    println!("Type 'exit' or 'quit' to exit, 'clear' to clear history\n");
    println!("{}\n", config.chat.greeting);

    if let Some(message) = initial_message {
        println!("> {}", message);
        run_turn(&mut session, &message, &mut interrupts).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match read_input(&mut lines, &mut interrupts).await? {
            Input::Line(line) => line,
            Input::Interrupted => {
                println!("\nGoodbye!");
                break;
            }
            Input::Eof => {
                println!();
                break;
            }
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" => {
                println!("Goodbye!");
                break;
            }
            "clear" => {
                session = new_session();
                println!("Conversation cleared.\n");
                continue;
            }
            _ => {}
        }

        run_turn(&mut session, input, &mut interrupts).await?;
    }

    Ok(())
}

/// Send one message and print updates until the turn ends or Ctrl-C
async fn run_turn(
    session: &mut ChatSession,
    input: &str,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> Result<()> {
    if let Err(e) = session.send(input) {
        eprintln!("{} {}\n", "Error:".red(), e);
        return Ok(());
    }

    loop {
        tokio::select! {
            update = session.recv() => match update {
                Some(update) => {
                    print_update(&update)?;
                    if matches!(
                        update,
                        SessionUpdate::Finished { .. } | SessionUpdate::Failed { .. }
                    ) {
                        break;
                    }
                }
                None => break,
            },
            _ = interrupts.recv() => {
                if let Some(update) = session.cancel() {
                    print_update(&update)?;
                }
                break;
            }
        }
    }
    Ok(())
}

fn print_update(update: &SessionUpdate) -> Result<()> {
    let mut stdout = std::io::stdout();
    match update {
        SessionUpdate::Started { .. } => println!(),
        SessionUpdate::TextDelta { delta, .. } => {
            print!("{}", delta);
            stdout.flush()?;
        }
        SessionUpdate::PartAdded { part, .. } => print_part(part),
        SessionUpdate::Finished { .. } => println!("\n"),
        SessionUpdate::Failed { error, .. } => {
            println!();
            eprintln!("{} {}\n", "Error:".red(), error);
        }
    }
    Ok(())
}

fn print_part(part: &UiPart) {
    match part {
        UiPart::Text { text } => println!("{}", text),
        UiPart::ToolCall {
            tool_name, args, ..
        } => {
            println!(
                "{} {} {}",
                "→".dimmed(),
                tool_name.yellow(),
                args.to_string().dimmed()
            );
        }
        UiPart::ToolResult {
            tool_name,
            output,
            is_error,
            ..
        } => {
            if *is_error {
                println!("{} {} failed", "✗".red(), tool_name);
            } else {
                println!("{} {}", "✓".green(), tool_name);
            }
            println!("{}\n", layout_colored(&render::render(output)));
        }
        UiPart::Unknown(_) => {}
    }
}

/// Run one `get_collections` search and print the result
pub async fn run_search(config: &Config, keyword: Option<&str>, raw: bool) -> Result<()> {
    let client = CmrClient::new(&config.cmr)?;
    let text = client.get_collections(keyword).await?;

    if raw {
        println!("{}", text);
    } else {
        println!("{}", layout_colored(&render::render(&Value::String(text))));
    }
    Ok(())
}

/// Render a JSON document from a file, or stdin when no path is given
pub async fn run_render(path: Option<&Path>) -> Result<()> {
    let input = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut input = String::new();
            tokio::io::stdin().read_to_string(&mut input).await?;
            input
        }
    };

    println!("{}", layout_colored(&render::render(&Value::String(input))));
    Ok(())
}
