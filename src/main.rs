use std::sync::Arc;

use clap::{Parser, Subcommand};
use marketplace_chat::api::{ApiError, ChatApi, HttpChatApi};
use marketplace_chat::config::{ChatConfig, ConfigError};
use marketplace_chat::controller::{ChatViewController, InputError, ViewEvent};
use marketplace_chat::directory::ConversationDirectory;
use marketplace_chat::identity::{Identity, UserId};
use marketplace_chat::message::Message;
use marketplace_chat::reconcile::Applied;
use marketplace_chat::surface::ChatSurface;
use marketplace_chat::transport::{SendStatus, StatusLine, WsConnector};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("stdin read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("peer id must not be blank")]
    BlankPeer,
}

#[derive(Parser, Debug)]
#[command(name = "marketplace-chat", about = "Marketplace chat client")]
struct Cli {
    /// Signed-in user. Without it chat is not available.
    #[arg(long, env = "CHAT_USER_ID")]
    user_id: Option<String>,

    /// Bearer credential for REST calls.
    #[arg(long, env = "CHAT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the conversation list once.
    Conversations,
    /// Open a conversation and send each stdin line as a message.
    Chat {
        #[arg(long)]
        peer: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ChatConfig::from_env()?;
    let Some(identity) = Identity::resolve(cli.user_id.as_deref(), cli.token) else {
        println!("{}", StatusLine::Unavailable);
        return Ok(());
    };
    let api: Arc<dyn ChatApi> = Arc::new(HttpChatApi::new(
        &config.base_url,
        identity.token.clone(),
        config.timeouts,
    )?);

    match cli.command {
        Command::Conversations => run_conversations(&config, api, &identity).await,
        Command::Chat { peer } => run_chat(config, api, identity, &peer).await,
    }
}

async fn run_conversations(config: &ChatConfig, api: Arc<dyn ChatApi>, identity: &Identity) -> Result<(), CliError> {
    let directory = ConversationDirectory::new(api, config.admin.clone());
    for conversation in directory.refresh(&identity.user_id).await {
        println!(
            "{}\t{}\t{}\t{}",
            conversation.peer_id, conversation.peer_name, conversation.last_at, conversation.last_message
        );
    }
    Ok(())
}

async fn run_chat(config: ChatConfig, api: Arc<dyn ChatApi>, identity: Identity, peer: &str) -> Result<(), CliError> {
    let peer = UserId::new(peer);
    if peer.is_empty() {
        return Err(CliError::BlankPeer);
    }

    let connector = Arc::new(WsConnector::from_config(&config));
    let mut surface = ChatSurface::mount(config, connector, api, Some(identity));
    let result = match surface.select_peer(peer).await {
        Some(controller) => chat_loop(controller).await,
        None => {
            println!("{}", StatusLine::Unavailable);
            Ok(())
        }
    };
    surface.close().await;
    result
}

async fn chat_loop(controller: &mut ChatViewController) -> Result<(), CliError> {
    for message in controller.transcript() {
        print_message(message);
    }
    eprintln!("[{}]", controller.status());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                controller.set_input(line);
                match controller.send_current_input() {
                    Ok(receipt) => {
                        if receipt.delivery == SendStatus::NotConnected {
                            eprintln!("[{}]", StatusLine::NotConnected);
                        }
                        if let Some(message) = controller.transcript().get(receipt.index) {
                            print_message(message);
                        }
                    }
                    Err(InputError::Empty) => {}
                }
            }
            event = controller.next_event() => {
                let Some(event) = event else { break };
                match event {
                    ViewEvent::Transcript(Applied::Appended { index }) => {
                        if let Some(message) = controller.transcript().get(index) {
                            print_message(message);
                        }
                    }
                    ViewEvent::Transcript(Applied::Confirmed { index }) => {
                        if let Some(message) = controller.transcript().get(index) {
                            eprintln!("[delivered] {}", message.content);
                        }
                    }
                    ViewEvent::Foreign(frame) => eprintln!("[new message from {}]", frame.from),
                    ViewEvent::Notice(notice) => eprintln!("[{notice}]"),
                    ViewEvent::Status(status) => eprintln!("[{status}]"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn print_message(message: &Message) {
    let marker = if message.pending { " (sending)" } else { "" };
    println!(
        "{} {}: {}{marker}",
        message.sent_at.as_deref().unwrap_or("-"),
        message.from,
        message.content
    );
}
