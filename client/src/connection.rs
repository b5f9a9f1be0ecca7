use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::time::Duration;

use tabletop_shared::protocol::{ClientMsg, ServerMsg, PROTOCOL_VERSION};
use url::Url;

#[derive(Debug, Clone)]
pub enum NetEvent {
    Connected,
    Disconnected,
    Message(ServerMsg),
    ProtocolMismatch { server: u32, client: u32 },
}

type CmdSender = tokio::sync::mpsc::UnboundedSender<ClientMsg>;

/// Join URL for a host endpoint, carrying the display name.
pub fn join_url(base: &str, name: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    if !name.is_empty() {
        url.query_pairs_mut().append_pair("name", name);
    }
    Ok(url)
}

/// Websocket link to the host on its own thread, reconnecting with back-off.
/// Events are polled; nothing here blocks the caller except `wait_event`.
pub struct ServerConnection {
    event_rx: Mutex<Receiver<NetEvent>>,
    cmd_tx: CmdSender,
}

impl ServerConnection {
    pub fn new(url: Url) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<NetEvent>();
        let cmd_tx = spawn_network_thread(url, event_tx);
        Self {
            event_rx: Mutex::new(event_rx),
            cmd_tx,
        }
    }

    pub fn poll_events(&self) -> Vec<NetEvent> {
        let mut out = Vec::new();
        if let Ok(rx) = self.event_rx.lock() {
            while let Ok(evt) = rx.try_recv() {
                out.push(evt);
            }
        }
        out
    }

    /// Block for the next event. `None` on timeout or when the network thread is gone.
    pub fn wait_event(&self, timeout: Duration) -> Option<NetEvent> {
        let rx = self.event_rx.lock().ok()?;
        match rx.recv_timeout(timeout) {
            Ok(evt) => Some(evt),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Fire-and-forget. Messages sent while disconnected go out after reconnecting.
    pub fn send(&self, msg: ClientMsg) {
        if self.cmd_tx.send(msg).is_err() {
            tracing::warn!("Network thread is gone, dropping message");
        }
    }
}

fn spawn_network_thread(url: Url, event_tx: Sender<NetEvent>) -> CmdSender {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    let (cmd_tx, mut cmd_rx) = tokio::sync::mpsc::unbounded_channel::<ClientMsg>();

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .enable_io()
            .enable_time()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Failed to build tokio runtime: {}", e);
                return;
            }
        };

        rt.block_on(async move {
            let mut reconnect_delay = Duration::from_millis(1000);
            let max_delay = Duration::from_millis(30_000);

            loop {
                let connect = tokio_tungstenite::connect_async(url.as_str()).await;

                let (ws_stream, _) = match connect {
                    Ok(x) => x,
                    Err(e) => {
                        tracing::debug!("Connect to {} failed: {}", url, e);
                        tokio::time::sleep(reconnect_delay).await;
                        reconnect_delay = (reconnect_delay.mul_f32(1.5)).min(max_delay);
                        continue;
                    }
                };

                reconnect_delay = Duration::from_millis(1000);
                if event_tx.send(NetEvent::Connected).is_err() {
                    return;
                }

                let (mut write, mut read) = ws_stream.split();

                loop {
                    tokio::select! {
                        biased;

                        Some(cmd) = cmd_rx.recv() => {
                            if let Ok(text) = serde_json::to_string(&cmd) {
                                if write.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                        }

                        msg = read.next() => {
                            match msg {
                                Some(Ok(Message::Text(txt))) => {
                                    match serde_json::from_str::<ServerMsg>(&txt) {
                                        Ok(server_msg) => {
                                            if let ServerMsg::Welcome(w) = &server_msg {
                                                if w.protocol_version != PROTOCOL_VERSION {
                                                    let _ = event_tx.send(NetEvent::ProtocolMismatch {
                                                        server: w.protocol_version,
                                                        client: PROTOCOL_VERSION,
                                                    });
                                                    let _ = write.close().await;
                                                    break;
                                                }
                                            }
                                            let _ = event_tx.send(NetEvent::Message(server_msg));
                                        }
                                        Err(e) => tracing::debug!("Ignoring unparsable host message: {}", e),
                                    }
                                }
                                Some(Ok(Message::Close(_))) => {
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(_)) => {
                                    break;
                                }
                                None => {
                                    break;
                                }
                            }
                        }
                    }
                }

                if event_tx.send(NetEvent::Disconnected).is_err() {
                    return;
                }
                tokio::time::sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay.mul_f32(1.5)).min(max_delay);
            }
        });
    });

    cmd_tx
}
