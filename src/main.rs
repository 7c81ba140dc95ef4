//! Gemini Chat - terminal driver
//!
//! Reads turns from stdin and prints the conversation as it changes.
//! Words starting with `@` are image attachments (`describe this @photo.jpg`).

use futures::StreamExt;
use gemini_chat::{
    AttachmentRoot, ChatConfig, ConversationState, FileImageFetcher, ImageRef, MessageId, Sender,
    SessionManager,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for a turn's reply before reading the next line
const TURN_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout is reserved for the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ChatConfig::from_env()?;

    // Relative attachment paths resolve against the working directory
    let root = AttachmentRoot::new(std::env::current_dir()?);
    let fetcher = FileImageFetcher::new(&root).with_max_dimension(config.max_image_dimension);
    tracing::info!(dir = %root.dir().display(), "Resolving attachments");

    let manager = SessionManager::new(Arc::new(fetcher));
    let mut rx = manager.init_from_config(&config)?;
    let printer = tokio::spawn(print_updates(manager.stream()?));

    // One turn at a time; a turn only resolves the latest pending message
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let (text, images) = parse_input(&line);
        match manager.send_message(&text, images) {
            Ok(Some(_)) => wait_for_reply(&mut rx).await,
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "Failed to send message"),
        }
    }

    manager.shutdown();
    drop(root);
    printer.await?;
    Ok(())
}

async fn wait_for_reply(rx: &mut watch::Receiver<ConversationState>) {
    let settled = rx.wait_for(|s| s.pending_count() == 0 || s.is_closed());
    if tokio::time::timeout(TURN_TIMEOUT, settled).await.is_err() {
        tracing::warn!("Gave up waiting for the reply");
    }
}

/// Split a line into message text and `@` image references
fn parse_input(line: &str) -> (String, Vec<ImageRef>) {
    let mut words = Vec::new();
    let mut images = Vec::new();
    for word in line.split_whitespace() {
        match word.strip_prefix('@') {
            Some(reference) if !reference.is_empty() => images.push(ImageRef::new(reference)),
            _ => words.push(word),
        }
    }
    (words.join(" "), images)
}

/// Print each message once, as soon as it is settled
async fn print_updates(mut states: WatchStream<ConversationState>) {
    let mut printed: HashSet<MessageId> = HashSet::new();
    while let Some(state) = states.next().await {
        for message in state.messages() {
            if message.is_pending || printed.contains(message.id()) {
                continue;
            }
            let label = match message.sender() {
                Sender::User => "you",
                Sender::Model => "model",
                Sender::Error => "error",
            };
            let time = message.created_at().format("%H:%M:%S");
            let attachments = message.image_attachments().len();
            if attachments > 0 {
                println!("{time} [{label}] {} ({attachments} image(s))", message.text);
            } else {
                println!("{time} [{label}] {}", message.text);
            }
            printed.insert(message.id().clone());
        }
        if state.is_closed() {
            break;
        }
    }
}
