//! A terminal client that tails the live transaction feed.
//!
//! Connects to a running ledgerfeed server's WebSocket endpoint, subscribes
//! to the transactions topic, and prints each new transaction as it
//! arrives, filtered and de-duplicated the same way a browser client
//! would be.

use std::error::Error;

use clap::Parser;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use ledgerfeed::{AccountType, FeedState, ServerFrame, TRANSACTIONS_TOPIC};

/// Tail the live transaction feed of a ledgerfeed server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The WebSocket URL of the server.
    #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    /// An API token issued by POST /api/tokens.
    #[arg(long)]
    token: String,

    /// Only show transactions for this account type.
    #[arg(long)]
    account_type: Option<AccountType>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let url = format!("{}?token={}", args.url, args.token);
    let (mut stream, _) = connect_async(url.as_str()).await?;

    let subscribe = json!({"event": "subscribe", "channel": TRANSACTIONS_TOPIC}).to_string();
    stream.send(Message::Text(subscribe.into())).await?;

    let mut state = FeedState::new(args.account_type);

    while let Some(message) = stream.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match serde_json::from_str::<ServerFrame>(&text) {
            Ok(ServerFrame::Connected { socket_id }) => {
                eprintln!("connected as {socket_id}, waiting for transactions...");
            }
            Ok(ServerFrame::NewTransaction { data, .. }) => {
                let row = data.clone();
                if state.merge(data) {
                    println!(
                        "{} {:>12} {:8} {} ({})",
                        row.created_at,
                        row.amount,
                        row.account_type.as_str(),
                        row.description,
                        row.user
                    );
                }
            }
            Err(error) => {
                eprintln!("ignoring unrecognized frame: {error}");
            }
        }
    }

    Ok(())
}
