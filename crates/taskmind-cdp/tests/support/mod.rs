//! In-process stand-in for a browser's DevTools WebSocket endpoint.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use taskmind_config::SessionConfig;

/// How the fake answers one request.
pub enum Reply {
    Result(Value),
    Error(i64, String),
    /// Never answer.
    Silent,
    /// Drop the connection instead of answering.
    Drop,
}

pub type Handler = Arc<dyn Fn(&str, &Value) -> Reply + Send + Sync>;

#[derive(Clone, Debug)]
enum Control {
    DropAll,
    Event(String),
}

pub struct FakeBrowser {
    addr: SocketAddr,
    accepting: Arc<AtomicBool>,
    connections: Arc<AtomicUsize>,
    control: broadcast::Sender<Control>,
    task: JoinHandle<()>,
}

impl FakeBrowser {
    /// Echoes `params` back as the result of every call.
    pub async fn echo() -> Self {
        Self::start(Arc::new(|_, params| Reply::Result(params.clone()))).await
    }

    pub async fn start(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepting = Arc::new(AtomicBool::new(true));
        let connections = Arc::new(AtomicUsize::new(0));
        let (control, _) = broadcast::channel(64);

        let task = {
            let accepting = accepting.clone();
            let connections = connections.clone();
            let control = control.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    if !accepting.load(Ordering::SeqCst) {
                        drop(stream);
                        continue;
                    }
                    connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve_connection(stream, handler.clone(), control.subscribe()));
                }
            })
        };

        Self {
            addr,
            accepting,
            connections,
            control,
            task,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/devtools/page/fake", self.addr)
    }

    /// Session config pointing straight at this fake, with a fast reconnect schedule.
    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            call_timeout_ms: 2_000,
            connect_timeout_ms: 1_000,
            reconnect_base_delay_ms: 20,
            reconnect_max_delay_ms: 100,
            ..SessionConfig::for_websocket(self.ws_url())
        }
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Drop every open connection.
    pub fn drop_connections(&self) {
        let _ = self.control.send(Control::DropAll);
    }

    pub fn push_event(&self, method: &str, params: Value) {
        let frame = json!({"method": method, "params": params}).to_string();
        let _ = self.control.send(Control::Event(frame));
    }
}

impl Drop for FakeBrowser {
    fn drop(&mut self) {
        self.task.abort();
        let _ = self.control.send(Control::DropAll);
    }
}

async fn serve_connection(stream: TcpStream, handler: Handler, mut control: broadcast::Receiver<Control>) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = ws.split();

    loop {
        tokio::select! {
            msg = source.next() => {
                let Some(Ok(Message::Text(text))) = msg else {
                    return;
                };
                let request: Value = serde_json::from_str(&text).unwrap();
                let id = request["id"].as_u64().unwrap();
                let method = request["method"].as_str().unwrap_or_default().to_string();
                let params = request.get("params").cloned().unwrap_or(Value::Null);

                let frame = match handler(&method, &params) {
                    Reply::Result(result) => json!({"id": id, "result": result}),
                    Reply::Error(code, message) => {
                        json!({"id": id, "error": {"code": code, "message": message}})
                    }
                    Reply::Silent => continue,
                    Reply::Drop => return,
                };
                if sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                    return;
                }
            }
            ctl = control.recv() => match ctl {
                Ok(Control::Event(frame)) => {
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
                Ok(Control::DropAll) | Err(_) => return,
            }
        }
    }
}

/// Wait until `check` holds, polling every 10ms for up to two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// HTTP proxy that answers every CONNECT with `status`. With 200 it relays
/// bytes to the requested authority.
pub async fn http_proxy(status: u16) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut client, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut byte = [0u8; 1];
                while !head.ends_with(b"\r\n\r\n") {
                    if client.read(&mut byte).await.unwrap_or(0) == 0 {
                        return;
                    }
                    head.push(byte[0]);
                }
                let head = String::from_utf8_lossy(&head).to_string();
                let authority = head.split_whitespace().nth(1).unwrap_or_default().to_string();

                if status != 200 {
                    let reply = format!("HTTP/1.1 {} Denied\r\nContent-Length: 0\r\n\r\n", status);
                    let _ = client.write_all(reply.as_bytes()).await;
                    return;
                }
                let Ok(mut upstream) = TcpStream::connect(authority).await else {
                    return;
                };
                let _ = client
                    .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
                    .await;
                let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
            });
        }
    });
    addr
}

/// SOCKS5 proxy that demands username/password and rejects every credential.
pub async fn socks_proxy_rejecting() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut client, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut header = [0u8; 2];
                if client.read_exact(&mut header).await.is_err() {
                    return;
                }
                let mut methods = vec![0u8; header[1] as usize];
                if client.read_exact(&mut methods).await.is_err() {
                    return;
                }
                if !methods.contains(&0x02) {
                    let _ = client.write_all(&[0x05, 0xFF]).await;
                    return;
                }
                let _ = client.write_all(&[0x05, 0x02]).await;

                let mut ver_ulen = [0u8; 2];
                if client.read_exact(&mut ver_ulen).await.is_err() {
                    return;
                }
                let mut user = vec![0u8; ver_ulen[1] as usize];
                let _ = client.read_exact(&mut user).await;
                let mut plen = [0u8; 1];
                let _ = client.read_exact(&mut plen).await;
                let mut pass = vec![0u8; plen[0] as usize];
                let _ = client.read_exact(&mut pass).await;
                let _ = client.write_all(&[0x01, 0x01]).await;
            });
        }
    });
    addr
}
