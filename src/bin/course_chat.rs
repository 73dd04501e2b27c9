//! Terminal chat client for the course assistant server.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use course_rag::client::{self, ApiClient, ChatController, ChatEvent};
use course_rag::core::logging;

#[derive(Debug, Parser)]
#[command(name = "course-chat", about = "Ask questions about course materials")]
struct Args {
    /// Base URL of the course assistant server
    #[arg(long, env = "COURSE_CHAT_SERVER", default_value = "http://127.0.0.1:8000")]
    server: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Ask a single question, print the answer and exit
    #[arg(long)]
    ask: Option<String>,
}

const HELP: &str = "Commands: /new (start a new chat), /courses (list courses), /help, /quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init_stderr("warn");

    let api = ApiClient::new(&args.server, Duration::from_secs(args.timeout))
        .with_context(|| format!("Failed to create client for {}", args.server))?;
    let mut chat = ChatController::new();

    if let Some(question) = args.ask {
        client::drive(&mut chat, &api, ChatEvent::Submit(question)).await;
        if let Some(message) = chat.transcript().last() {
            println!("{}", client::render_message(message));
        }
        return Ok(());
    }

    client::load_courses(&mut chat, &api).await;
    println!("{}\n", client::render_courses(chat.courses()));
    let mut shown = print_new(&chat, 0);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/courses" => {
                client::load_courses(&mut chat, &api).await;
                println!("{}", client::render_courses(chat.courses()));
            }
            "/new" => {
                client::drive(&mut chat, &api, ChatEvent::NewChat).await;
                shown = print_new(&chat, 0);
            }
            question => {
                client::drive(&mut chat, &api, ChatEvent::Submit(question.to_string())).await;
                shown = print_new(&chat, shown);
            }
        }
    }

    if let Some(session_id) = chat.session_id() {
        if let Err(err) = api.clear_session(session_id).await {
            tracing::warn!("Failed to clear session on exit: {}", err);
        }
    }
    Ok(())
}

/// Prints transcript entries from `from` onward (skipping the echoed user
/// line) and returns the new high-water mark.
fn print_new(chat: &ChatController, from: usize) -> usize {
    for message in chat.transcript().iter().skip(from) {
        if message.sender == client::Sender::Assistant {
            println!("\n{}", client::render_message(message));
        }
    }
    chat.transcript().len()
}
