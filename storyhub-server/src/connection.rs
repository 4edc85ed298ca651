//! Drives one client connection against a hub.
//!
//! Frames are newline-delimited JSON envelopes, read as raw bytes so that a
//! frame which is not valid UTF-8 reaches the hub and is dropped there like
//! any other malformed message. Accepting the stream (TCP, WebSocket
//! upgrade, ...) is the caller's job.

use crate::error::ServerError;
use crate::hub::HubHandle;
use crate::session::Outbound;
use futures::SinkExt;
use futures::stream::{SplitSink, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::codec::{AnyDelimiterCodec, Framed};

const FRAME_DELIMITER: &[u8] = b"\n";

/// Serves a connected client until it disconnects.
///
/// Registers a new session, spawns its writer task, submits every inbound
/// line and unregisters on EOF or read error. Responses already queued when
/// the client stops sending are still written out before the writer exits.
///
/// # Errors
/// Returns `ServerError::Closed` if the hub stopped, or
/// `ServerError::Codec` on a framing error (for example an over-long line).
pub async fn serve_connection<S>(stream: S, hub: HubHandle) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let codec = AnyDelimiterCodec::new_with_max_length(
        FRAME_DELIMITER.to_vec(),
        FRAME_DELIMITER.to_vec(),
        hub.config().max_frame_length,
    );
    let (sink, mut frames) = Framed::new(stream, codec).split();

    let (session, outbound) = hub.new_session();
    let session_id = session.id();
    hub.register(session).await?;
    tracing::info!("Session {} connected", session_id);

    let writer = spawn_writer(outbound, sink);

    let result = loop {
        match frames.next().await {
            Some(Ok(frame)) => {
                if frame.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                if let Err(e) = hub.submit(session_id, frame.to_vec()).await {
                    break Err(e);
                }
            }
            Some(Err(e)) => {
                tracing::error!("Session {} read error: {}", session_id, e);
                break Err(ServerError::Codec(e));
            }
            None => {
                tracing::info!("Session {} disconnected", session_id);
                break Ok(());
            }
        }
    };

    // A stopped hub already dropped the session, which ends the writer too.
    if hub.unregister(session_id).await.is_err() {
        tracing::debug!("Session {} outlived the hub", session_id);
    }
    if let Err(e) = writer.await {
        tracing::error!("Session {} writer task failed: {}", session_id, e);
    }

    result
}

type LineSink<S> = SplitSink<Framed<S, AnyDelimiterCodec>, String>;

/// Spawns the task that writes a session's responses to the client.
///
/// Ends when the outbound queue closes or a write fails. A failed write
/// drops the queue, so the hub sees the session as gone on its next delivery.
fn spawn_writer<S>(mut outbound: Outbound, mut sink: LineSink<S>) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    tokio::spawn(async move {
        let session_id = outbound.id();

        while let Some(envelope) = outbound.recv().await {
            let line = match envelope.encode() {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Session {} dropping response: {}", session_id, e);
                    continue;
                }
            };

            if let Err(e) = sink.send(line).await {
                tracing::warn!("Session {} write error: {}", session_id, e);
                return;
            }
        }

        if let Err(e) = sink.close().await {
            tracing::debug!("Session {} close error: {}", session_id, e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::CommandTable;
    use crate::handler::FnHandler;
    use crate::hub::HubBuilder;
    use serde_json::{Value, json};
    use storyhub_core::Envelope;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn echo_hub() -> HubHandle {
        let table = CommandTable::builder()
            .handler("echo", FnHandler::new("echoed", "echoFailed", |data| Ok(data)))
            .build()
            .unwrap();
        let (hub, handle) = HubBuilder::new(table).max_frame_length(64).build();
        tokio::spawn(hub.run());
        handle
    }

    #[tokio::test]
    async fn test_connection_round_trip() {
        let handle = echo_hub();
        let (client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(serve_connection(server, handle.clone()));

        let (read_half, mut write_half) = tokio::io::split(client);
        let mut responses = BufReader::new(read_half).lines();

        write_half
            .write_all(b"{\"command\":\"echo\",\"data\":1}\n\n{\"command\":\"echo\",\"data\":2}\n")
            .await
            .unwrap();

        for n in 1..=2 {
            let line = responses.next_line().await.unwrap().unwrap();
            let envelope = Envelope::decode(line.as_bytes()).unwrap();
            assert_eq!(envelope, Envelope::with_data("echoed", json!(n)));
        }

        write_half.shutdown().await.unwrap();
        task.await.unwrap().unwrap();

        assert!(responses.next_line().await.unwrap().is_none());
        assert_eq!(handle.stats().await.unwrap().live_sessions, 0);
    }

    #[tokio::test]
    async fn test_connection_malformed_line_is_skipped() {
        let handle = echo_hub();
        let (client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(serve_connection(server, handle.clone()));

        let (read_half, mut write_half) = tokio::io::split(client);
        let mut responses = BufReader::new(read_half).lines();

        write_half
            .write_all(b"garbage\n{\"command\":\"echo\",\"data\":\"ok\"}\n")
            .await
            .unwrap();

        let line = responses.next_line().await.unwrap().unwrap();
        let envelope: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(envelope, json!({"command": "echoed", "data": "ok"}));

        drop(write_half);
        drop(responses);
        task.await.unwrap().unwrap();
        assert_eq!(handle.stats().await.unwrap().dropped, 1);
    }

    #[tokio::test]
    async fn test_connection_invalid_utf8_is_skipped() {
        let handle = echo_hub();
        let (client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(serve_connection(server, handle.clone()));

        let (read_half, mut write_half) = tokio::io::split(client);
        let mut responses = BufReader::new(read_half).lines();

        write_half
            .write_all(b"\xff\xfe\n{\"command\":\"echo\",\"data\":1}\r\n")
            .await
            .unwrap();

        let line = responses.next_line().await.unwrap().unwrap();
        let envelope = Envelope::decode(line.as_bytes()).unwrap();
        assert_eq!(envelope, Envelope::with_data("echoed", json!(1)));

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.live_sessions, 1);

        write_half.shutdown().await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connection_rejects_long_line() {
        let handle = echo_hub();
        let (client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(serve_connection(server, handle.clone()));

        let (_read_half, mut write_half) = tokio::io::split(client);
        let long = format!("{}\n", "x".repeat(128));
        write_half.write_all(long.as_bytes()).await.unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ServerError::Codec(_))));
        assert_eq!(handle.stats().await.unwrap().live_sessions, 0);
    }

    #[tokio::test]
    async fn test_connection_after_hub_shutdown() {
        let handle = echo_hub();
        handle.shutdown().await.unwrap();
        while !handle.is_closed() {
            tokio::task::yield_now().await;
        }

        let (_client, server) = tokio::io::duplex(64);
        let result = serve_connection(server, handle).await;
        assert!(matches!(result, Err(ServerError::Closed)));
    }
}
