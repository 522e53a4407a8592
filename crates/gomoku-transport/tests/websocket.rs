//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a plain `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use gomoku_transport::{
        Connection, Transport, WebSocketConnection, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on port 0, connects one client, and returns both ends.
    async fn pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let (client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
        let conn = server.await.expect("accept task");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (conn, mut client) = pair().await;
        assert!(conn.id().into_inner() > 0);

        conn.send(br#"{"type":"ERROR"}"#).await.expect("send");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "UTF-8 payloads should be text frames");
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"ERROR"}"#);

        client
            .send(Message::text("hello from client"))
            .await
            .unwrap();
        let received = conn.recv().await.expect("recv").expect("data");
        assert_eq!(received, b"hello from client");

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_non_utf8_goes_out_as_binary() {
        let (conn, mut client) = pair().await;

        conn.send(&[0xff, 0x00, 0xfe]).await.expect("send");

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0xff, 0x00, 0xfe]);
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_not_blocked_by_pending_recv() {
        let (conn, mut client) = pair().await;
        let conn = Arc::new(conn);

        // Park a reader on the stream half; nothing will arrive.
        let reader = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), conn.send(b"ping"))
            .await
            .expect("send must not wait for the reader")
            .expect("send");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"ping");

        reader.abort();
    }
}
