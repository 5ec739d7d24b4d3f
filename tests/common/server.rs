//! Live server harness
//!
//! `TestServer` runs the full router on `127.0.0.1:0`. `WsClient` speaks to
//! `/ws` with a session cookie and splits coalesced frames back into
//! individual JSON payloads.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use social_hub::backend::realtime::HubHandle;
use social_hub::backend::routes::create_router;
use social_hub::backend::server::build_state;
use social_hub::shared::AppConfig;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::database::TestDatabase;

/// How long a test waits for any single expected frame.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: HubHandle,
    pub db: TestDatabase,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(AppConfig::builder()).await
    }

    /// Start with a customized config; the database URL is filled in here.
    pub async fn start_with(builder: social_hub::shared::AppConfigBuilder) -> Self {
        let db = TestDatabase::new().await;
        let config = builder
            .database_url(db.url())
            .build()
            .expect("Invalid test config");

        let state = build_state(config, db.pool().clone());
        let hub = state.hub.clone();
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self { addr, hub, db }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Try to open `/ws` with the given cookie and origin.
    pub async fn try_connect(
        &self,
        token: Option<&str>,
        origin: Option<&str>,
    ) -> Result<WsClient, WsError> {
        let mut request = self.ws_url().into_client_request()?;
        if let Some(token) = token {
            let cookie = format!("session_token={}", token);
            request.headers_mut().insert(
                header::COOKIE,
                HeaderValue::from_str(&cookie).expect("bad cookie"),
            );
        }
        if let Some(origin) = origin {
            request.headers_mut().insert(
                header::ORIGIN,
                HeaderValue::from_str(origin).expect("bad origin"),
            );
        }

        let (stream, _) = connect_async(request).await?;
        Ok(WsClient {
            stream,
            pending: VecDeque::new(),
        })
    }

    /// Log `user_id` in, connect, and wait for the client's own `newUser`.
    pub async fn connect_as(&self, user_id: i64) -> WsClient {
        let token = self.db.login(user_id).await;
        let mut client = self
            .try_connect(Some(&token), None)
            .await
            .expect("WebSocket handshake failed");
        client.expect_presence("newUser", user_id).await;
        client
    }
}

pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pending: VecDeque<String>,
}

impl WsClient {
    pub async fn send_json(&mut self, value: Value) {
        self.stream
            .send(Message::Text(value.to_string()))
            .await
            .expect("Failed to send frame");
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string()))
            .await
            .expect("Failed to send frame");
    }

    /// Next JSON payload, or `None` if the server closed the connection.
    pub async fn next_payload(&mut self) -> Option<Value> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(serde_json::from_str(&line).expect("Server sent invalid JSON"));
            }

            let frame = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .expect("Timed out waiting for a frame");

            match frame {
                Some(Ok(Message::Text(text))) => {
                    self.pending
                        .extend(text.split('\n').map(str::to_string));
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => {}
            }
        }
    }

    pub async fn expect_payload(&mut self) -> Value {
        self.next_payload()
            .await
            .expect("Connection closed while waiting for a payload")
    }

    /// Skip ahead to the presence event `action` for `user_id`.
    pub async fn expect_presence(&mut self, action: &str, user_id: i64) {
        loop {
            let payload = self.expect_payload().await;
            if payload["action"] == action && payload["data"] == user_id {
                return;
            }
        }
    }

    /// Skip presence events and return the first other payload.
    pub async fn expect_non_presence(&mut self) -> Value {
        loop {
            let payload = self.expect_payload().await;
            match payload["action"].as_str() {
                Some("newUser") | Some("disconnectUser") => continue,
                _ => return payload,
            }
        }
    }

    /// Drain until the server closes the connection.
    pub async fn expect_closed(&mut self) {
        while self.next_payload().await.is_some() {}
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
