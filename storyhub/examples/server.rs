//! Example StoryHub server backed by the in-memory store.
//!
//! Run with: `cargo run --example server`
//!
//! Then talk to it with newline-delimited JSON, e.g.
//! `echo '{"command":"fetchAssociations","data":{"storyId":"s1"}}' | nc 127.0.0.1 9000`

use std::net::SocketAddr;
use std::sync::Arc;
use storyhub::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let addr: SocketAddr = "127.0.0.1:9000".parse()?;
    let store: Arc<dyn StoryStore> = Arc::new(InMemoryStore::new());

    let (hub, handle) = HubBuilder::new(story_commands(store)?)
        .outbound_capacity(64)
        .build();
    let hub_task = tokio::spawn(hub.run());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Starting StoryHub server on {}", addr);
    println!("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        stream.set_nodelay(true)?;
                        let handle = handle.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, handle).await {
                                tracing::warn!("Connection from {} ended: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => tracing::error!("Accept error: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down server...");
                break;
            }
        }
    }

    let stats = handle.stats().await?;
    println!(
        "Dispatched {} messages ({} dropped, {} undelivered)",
        stats.dispatched, stats.dropped, stats.undelivered
    );
    handle.shutdown().await?;
    hub_task.await?;

    println!("Server stopped");
    Ok(())
}
