use std::time::Duration;

use keypunch::telnet::negotiation::{DO, ESCAPE, IAC, NAWS, SB, SE, WILL, WONT};
use keypunch::{CloseReason, Console, SessionState, TelnetError, TelnetSession};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const ECHO: u8 = 1;
const TERMINAL_TYPE: u8 = 24;
const TIMEOUT: Option<Duration> = Some(Duration::from_secs(5));

async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[tokio::test]
async fn negotiation_then_login_dialogue() {
    let (listener, port) = listener().await;
    let (prompted_tx, prompted_rx) = oneshot::channel();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(&[IAC, DO, NAWS]).await.unwrap();
        let mut naws = [0u8; 12];
        socket.read_exact(&mut naws).await.unwrap();

        socket.write_all(&[IAC, WILL, ECHO]).await.unwrap();
        let mut echo = [0u8; 3];
        socket.read_exact(&mut echo).await.unwrap();

        socket.write_all(&[IAC, DO, TERMINAL_TYPE]).await.unwrap();
        let mut ttype = [0u8; 3];
        socket.read_exact(&mut ttype).await.unwrap();

        socket.write_all(b"login: ").await.unwrap();
        prompted_tx.send(()).unwrap();
        let mut typed = [0u8; 7];
        socket.read_exact(&mut typed).await.unwrap();
        socket.write_all(b"Welcome\r\n").await.unwrap();
        socket.shutdown().await.unwrap();
        (naws, echo, ttype, typed)
    });

    let mut session = TelnetSession::connect("127.0.0.1", port, TIMEOUT)
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Connected);

    let (tx, mut console) = Console::channel();
    let operator = async move {
        prompted_rx.await.unwrap();
        tx.send(b"guest\n".to_vec()).await.unwrap();
        tx
    };
    let mut screen = Vec::new();
    let (_tx, reason) = tokio::join!(operator, session.run(&mut console, &mut screen));

    assert_eq!(reason.unwrap(), CloseReason::RemoteClosed);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(screen, b"login: Welcome\r\n");

    let (naws, echo, ttype, typed) = server.await.unwrap();
    assert_eq!(naws, [IAC, WILL, NAWS, IAC, SB, NAWS, 0, 80, 0, 24, IAC, SE]);
    assert_eq!(echo, [IAC, DO, ECHO]);
    assert_eq!(ttype, [IAC, WONT, TERMINAL_TYPE]);
    assert_eq!(&typed, b"guest\n\r");
}

#[tokio::test]
async fn escape_byte_is_never_sent() {
    let (listener, port) = listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        received
    });

    let mut session = TelnetSession::connect("127.0.0.1", port, TIMEOUT)
        .await
        .unwrap();
    let (tx, mut console) = Console::channel();
    tx.send(vec![ESCAPE, b'\n']).await.unwrap();
    let reason = session
        .run(&mut console, &mut Vec::<u8>::new())
        .await
        .unwrap();

    assert_eq!(reason, CloseReason::Escape);
    assert!(server.await.unwrap().is_empty());
}

#[tokio::test]
async fn refused_connection_never_enters_loop() {
    let (listener, port) = listener().await;
    drop(listener);
    let err = TelnetSession::connect("127.0.0.1", port, TIMEOUT)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, TelnetError::Connect { .. }));
    assert_eq!(err.to_string(), "Error connecting - no/bad response.");
}

#[tokio::test]
async fn unknown_host_is_reported() {
    let err = TelnetSession::connect("no-such-host.invalid", 23, TIMEOUT)
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        TelnetError::Resolve { .. } | TelnetError::Timeout(_)
    ));
}
