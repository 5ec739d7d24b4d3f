//! End-to-end tests over a real socket: admission, presence, direct
//! messages, history and connection teardown.

mod common;

use std::time::Duration;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use social_hub::shared::AppConfig;
use tokio_tungstenite::tungstenite::Error as WsError;

async fn wait_for_connections(server: &TestServer, expected: usize) {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            if server.hub.stats().await.unwrap().connections == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Hub never reached the expected connection count");
}

fn assert_rejected(result: Result<WsClient, WsError>, status: u16) {
    match result {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), status),
        Err(other) => panic!("unexpected handshake error: {other}"),
        Ok(_) => panic!("handshake should have been refused"),
    }
}

#[tokio::test]
async fn test_upgrade_refused_without_valid_session() {
    let server = TestServer::start().await;

    assert_rejected(server.try_connect(None, None).await, 401);
    assert_rejected(server.try_connect(Some("forged"), None).await, 401);

    let expired = server.db.expired_login(7).await;
    assert_rejected(server.try_connect(Some(&expired), None).await, 401);

    assert_eq!(server.hub.stats().await.unwrap().connections, 0);
}

#[tokio::test]
async fn test_upgrade_refused_from_foreign_origin() {
    let server =
        TestServer::start_with(AppConfig::builder().allowed_origin("https://social.example")).await;
    let token = server.db.login(1).await;

    assert_rejected(
        server.try_connect(Some(&token), Some("https://evil.example")).await,
        403,
    );

    let mut client = server
        .try_connect(Some(&token), Some("https://social.example"))
        .await
        .expect("allowed origin should connect");
    client.expect_presence("newUser", 1).await;
}

#[tokio::test]
async fn test_presence_is_broadcast_to_everyone() {
    let server = TestServer::start().await;
    let mut alice = server.connect_as(1).await;
    let bob = server.connect_as(2).await;

    alice.expect_presence("newUser", 2).await;

    bob.close().await;
    alice.expect_presence("disconnectUser", 2).await;
    wait_for_connections(&server, 1).await;

    let stats = server.hub.stats().await.unwrap();
    assert_eq!(stats.users, 1);
}

#[tokio::test]
async fn test_direct_message_reaches_recipient_and_is_stored() {
    let server = TestServer::start().await;
    let mut alice = server.connect_as(1).await;
    let mut bob = server.connect_as(2).await;

    alice
        .send_json(json!({"action": "send_message", "content": "hello bob", "recipientID": 2}))
        .await;

    let received = bob.expect_non_presence().await;
    assert_eq!(received["content"], "hello bob");
    assert_eq!(received["recipientID"], 2);
    assert_eq!(received["sender"], 1);
    assert!(received["timestamp"].as_str().unwrap().ends_with('Z'));

    // persisted even though it was delivered live; the sender's own
    // connection handles frames in order, so the store has finished
    alice
        .send_json(json!({"action": "fetch_chat_history", "user": 2, "page": 1}))
        .await;
    let history = alice.expect_non_presence().await;
    assert_eq!(history["action"], "chat_history");
    assert_eq!(history["content"][0]["text"], "hello bob");
    assert_eq!(history["content"][0]["sender"], 1);
    assert_eq!(history["content"][0]["receiver"], 2);
    assert_eq!(server.db.stored_messages().await, 1);
}

#[tokio::test]
async fn test_message_to_offline_user_is_kept_for_history() {
    let server = TestServer::start().await;
    let mut alice = server.connect_as(1).await;

    for i in 0..12 {
        alice
            .send_json(json!({"action": "send_message", "content": format!("m{i}"), "recipientID": 3}))
            .await;
    }

    alice
        .send_json(json!({"action": "fetch_chat_history", "user": 3, "page": 1}))
        .await;
    let first_page = alice.expect_non_presence().await;
    assert_eq!(first_page["content"].as_array().unwrap().len(), 10);
    assert_eq!(first_page["content"][0]["text"], "m11");

    let mut carol = server.connect_as(3).await;
    carol
        .send_json(json!({"action": "fetch_chat_history", "user": 1, "page": 2}))
        .await;

    let history = carol.expect_non_presence().await;
    let texts: Vec<_> = history["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["m1", "m0"]);
}

#[tokio::test]
async fn test_bad_frames_are_dropped_without_closing() {
    let server = TestServer::start().await;
    let mut alice = server.connect_as(1).await;

    alice.send_raw("not json").await;
    alice.send_raw(r#"{"action":"dance"}"#).await;
    alice
        .send_json(json!({"action": "send_message", "content": "   ", "recipientID": 2}))
        .await;
    alice
        .send_json(json!({"action": "fetch_chat_history", "user": 2, "page": 0}))
        .await;

    // still connected, and nothing was stored
    alice
        .send_json(json!({"action": "fetch_chat_history", "user": 2, "page": 1}))
        .await;
    let history = alice.expect_non_presence().await;
    assert_eq!(history, json!({"action": "chat_history", "content": []}));
    assert_eq!(server.db.stored_messages().await, 0);
}

#[tokio::test]
async fn test_every_session_of_a_user_receives_direct_messages() {
    let server = TestServer::start().await;
    let mut phone = server.connect_as(2).await;
    let mut laptop = server.connect_as(2).await;
    let mut alice = server.connect_as(1).await;

    alice
        .send_json(json!({"action": "send_message", "content": "both", "recipientID": 2}))
        .await;

    for client in [&mut phone, &mut laptop] {
        let received = client.expect_non_presence().await;
        assert_eq!(received["content"], "both");
    }
    assert_eq!(server.hub.session_count(2).await.unwrap(), 2);
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let server = TestServer::start_with(
        AppConfig::builder()
            .idle_timeout(Duration::from_millis(400))
            .ping_interval(Duration::from_millis(150)),
    )
    .await;
    let mut quiet = server.connect_as(1).await;

    // never read, so pings go unanswered
    tokio::time::sleep(Duration::from_millis(800)).await;

    quiet.expect_closed().await;
    assert_eq!(server.hub.stats().await.unwrap().connections, 0);
}
