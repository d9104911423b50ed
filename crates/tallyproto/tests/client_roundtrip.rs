//! StatsClient against a bare REP socket.

use std::time::Duration;

use serde_json::{json, Map};
use tallyproto::{decode, encode, Action, Request, Response, StatsClient};
use zeromq::{RepSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

async fn bind_rep() -> (RepSocket, String) {
    let mut socket = RepSocket::new();
    let endpoint = socket.bind("tcp://127.0.0.1:0").await.unwrap();
    (socket, endpoint.to_string())
}

#[tokio::test]
async fn test_query_roundtrip() {
    let (mut server, endpoint) = bind_rep().await;

    let server_handle = tokio::spawn(async move {
        let msg = server.recv().await.unwrap();
        let frame = msg.into_vec().pop().unwrap();
        let request = decode(&frame).unwrap();

        let mut data = Map::new();
        data.insert("action".to_string(), json!(request.action.as_str()));
        data.insert("handle".to_string(), json!(request.handle));
        let reply = encode(&Response::success(data)).unwrap();
        server.send(ZmqMessage::from(reply)).await.unwrap();
    });

    let mut client = StatsClient::connect(&endpoint).await.unwrap();
    let response = client.query(&Request::info("svc-a")).await.unwrap();

    assert!(response.is_ok());
    let data = response.data.unwrap();
    assert_eq!(data["action"], json!(Action::Info.as_str()));
    assert_eq!(data["handle"], json!("svc-a"));

    server_handle.await.unwrap();
}

#[tokio::test]
async fn test_query_times_out_without_reply() {
    let (mut server, endpoint) = bind_rep().await;

    let server_handle = tokio::spawn(async move {
        let _ = server.recv().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let mut client = StatsClient::connect(&endpoint)
        .await
        .unwrap()
        .with_timeout(Duration::from_millis(100));

    let err = client.query(&Request::cache_stats()).await.unwrap_err();
    assert!(err.to_string().contains("no reply"), "unexpected error: {}", err);

    server_handle.await.unwrap();
}
