use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::{FeedSignal, LiveFeed};

/// Derives the push channel address from the page/API origin: a secure
/// origin gets `wss`, anything else `ws`.
pub fn live_url(base_url: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).with_context(|| format!("Invalid base url: {}", base_url))?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("Cannot derive websocket url from {}", base_url))?;
    url.set_path(path);
    url.set_query(None);
    Ok(url)
}

enum SessionEnd {
    Cancelled,
    ReceiverGone,
    Closed,
}

pub struct WsFeed {
    url: Url,
    reconnect_delay: Option<Duration>,
}

impl WsFeed {
    /// A zero `reconnect_delay` means a dropped connection is not re-established.
    pub fn new(url: Url, reconnect_delay: Duration) -> Self {
        Self {
            url,
            reconnect_delay: (!reconnect_delay.is_zero()).then_some(reconnect_delay),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn session(
        &self,
        tx: &mpsc::Sender<FeedSignal>,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd> {
        let (stream, _) = tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            res = connect_async(self.url.as_str()) => {
                res.with_context(|| format!("Failed to connect to {}", self.url))?
            }
        };
        info!("Live feed connected: {}", self.url);
        if tx.send(FeedSignal::Connected).await.is_err() {
            return Ok(SessionEnd::ReceiverGone);
        }

        let (mut write, mut read) = stream.split();
        loop {
            let text = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Cancelled);
                }
                msg = read.next() => match msg {
                    None | Some(Ok(Message::Close(_))) => return Ok(SessionEnd::Closed),
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Message::Text(t))) => t,
                    Some(Ok(Message::Binary(b))) => match String::from_utf8(b) {
                        Ok(t) => t,
                        Err(_) => {
                            warn!("Dropped non UTF-8 binary frame from live feed");
                            continue;
                        }
                    },
                    // ping/pong are answered by tungstenite
                    Some(Ok(_)) => continue,
                }
            };
            if tx.send(FeedSignal::Message(text)).await.is_err() {
                return Ok(SessionEnd::ReceiverGone);
            }
        }
    }
}

#[async_trait]
impl LiveFeed for WsFeed {
    async fn run(&self, tx: mpsc::Sender<FeedSignal>, cancel: CancellationToken) -> Result<()> {
        loop {
            match self.session(&tx, &cancel).await {
                Ok(SessionEnd::Cancelled) | Ok(SessionEnd::ReceiverGone) => return Ok(()),
                Ok(SessionEnd::Closed) => warn!("Live feed closed by server"),
                Err(e) => warn!("Live feed error: {:#}", e),
            }

            if tx.send(FeedSignal::Disconnected).await.is_err() {
                return Ok(());
            }

            let delay = match self.reconnect_delay {
                Some(d) => d,
                None => return Ok(()),
            };
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => info!("Reconnecting live feed..."),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::ws::{Message as WsMessage, WebSocketUpgrade},
        response::Response,
        routing::get,
        Router,
    };

    use super::*;
    use crate::testing::spawn_server;

    const FRAME: &str = r#"{"type":"new_comment","data":{"id":1,"is_root":true}}"#;

    async fn push_once(upgrade: WebSocketUpgrade) -> Response {
        upgrade.on_upgrade(|mut socket| async move {
            let _ = socket.send(WsMessage::Text(FRAME.to_string())).await;
            let _ = socket.send(WsMessage::Close(None)).await;
        })
    }

    #[test]
    fn live_url_mirrors_origin_security() {
        assert_eq!(
            live_url("https://comments.example.org/page?x=1", "/ws/chat/")
                .unwrap()
                .as_str(),
            "wss://comments.example.org/ws/chat/"
        );
        assert_eq!(
            live_url("http://127.0.0.1:8000", "/ws/chat/").unwrap().as_str(),
            "ws://127.0.0.1:8000/ws/chat/"
        );
    }

    #[tokio::test]
    async fn forwards_frames_and_reports_disconnect() {
        let app = Router::new().route("/ws/chat/", get(push_once));
        let base = spawn_server(app).await;
        let feed = WsFeed::new(live_url(&base, "/ws/chat/").unwrap(), Duration::ZERO);

        let (tx, mut rx) = mpsc::channel(8);
        feed.run(tx, CancellationToken::new()).await.unwrap();

        assert_eq!(rx.recv().await, Some(FeedSignal::Connected));
        assert_eq!(rx.recv().await, Some(FeedSignal::Message(FRAME.to_string())));
        assert_eq!(rx.recv().await, Some(FeedSignal::Disconnected));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn reconnects_after_drop() {
        let app = Router::new().route("/ws/chat/", get(push_once));
        let base = spawn_server(app).await;
        let feed = WsFeed::new(
            live_url(&base, "/ws/chat/").unwrap(),
            Duration::from_millis(10),
        );

        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { feed.run(tx, cancel).await }
        });

        let mut connects = 0;
        while connects < 2 {
            match rx.recv().await {
                Some(FeedSignal::Connected) => connects += 1,
                Some(_) => {}
                None => panic!("feed stopped before reconnecting"),
            }
        }
        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancellation_stops_connect_loop() {
        // nothing listens on port 9 locally; connection attempts fail fast
        let feed = WsFeed::new(
            Url::parse("ws://127.0.0.1:9/ws/chat/").unwrap(),
            Duration::from_secs(30),
        );
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { feed.run(tx, cancel).await }
        });

        assert_eq!(rx.recv().await, Some(FeedSignal::Disconnected));
        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
