//! CDP WebSocket client and target attachment.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use formpilot_protocols::BrowserError;

use crate::page::CdpPage;
use crate::protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// A command in flight, waiting for its reply.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, BrowserError>>,
}

/// Connection to a Chrome instance with remote debugging enabled.
///
/// Holds the single browser-level WebSocket; page sessions share the
/// sink and route their commands with `sessionId`.
pub struct CdpClient {
    http_endpoint: String,
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    request_id: Arc<AtomicU64>,
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    _recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at the given debugging endpoint
    /// (e.g. `http://127.0.0.1:9222`).
    pub async fn connect(endpoint: &str) -> Result<Self, BrowserError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| {
                BrowserError::ConnectionFailed(format!(
                    "{}: {}. Start Chrome with --remote-debugging-port",
                    endpoint, e
                ))
            })?
            .json()
            .await
            .map_err(|e| BrowserError::ConnectionFailed(format!("{}: {}", endpoint, e)))?;

        debug!("Connected to browser: {}", version.browser);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.web_socket_debugger_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let ws_tx = Arc::new(tokio::sync::Mutex::new(ws_sink));
        let pending: Arc<Mutex<HashMap<u64, PendingRequest>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let recv_task = {
            let pending = pending.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending).await;
            })
        };

        Ok(Self {
            http_endpoint,
            ws_tx,
            request_id: Arc::new(AtomicU64::new(1)),
            pending,
            _recv_task: recv_task,
        })
    }

    /// Route replies to their callers; events carry no `id` and are
    /// dropped since all waiting here is poll-based.
    async fn receive_loop(
        mut ws_source: WsSource,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    ) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => {
                            if let Some(id) = resp.id {
                                let pending_req = pending.lock().remove(&id);
                                if let Some(req) = pending_req {
                                    let result = if let Some(err) = resp.error {
                                        Err(BrowserError::ActionFailed(format!(
                                            "{} (code {})",
                                            err.message, err.code
                                        )))
                                    } else {
                                        Ok(resp.result.unwrap_or(Value::Null))
                                    };
                                    let _ = req.tx.send(result);
                                }
                            }
                        }
                        Err(e) => warn!("Failed to parse CDP message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    }

    /// Send a browser-level CDP command and wait for its reply.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, BrowserError> {
        dispatch(
            &self.ws_tx,
            &self.pending,
            &self.request_id,
            method,
            params,
            None,
        )
        .await
    }

    /// Attach to an existing page tab, or open a fresh one when the
    /// browser has none.
    pub async fn open_page(&self) -> Result<CdpPage, BrowserError> {
        let list_url = format!("{}/json/list", self.http_endpoint);
        let tabs: Vec<PageInfo> = reqwest::get(&list_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;

        let target_id = match tabs.into_iter().find(|t| t.page_type == "page") {
            Some(tab) => tab.id,
            None => {
                // Chrome requires PUT for /json/new.
                let create_url = format!("{}/json/new", self.http_endpoint);
                let tab: PageInfo = reqwest::Client::new()
                    .put(&create_url)
                    .send()
                    .await
                    .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?
                    .json()
                    .await
                    .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;
                debug!("Created new page tab {}", tab.id);
                tab.id
            }
        };

        self.attach(&target_id).await
    }

    async fn attach(&self, target_id: &str) -> Result<CdpPage, BrowserError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({ "targetId": target_id, "flatten": true })),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| BrowserError::ConnectionFailed("Missing sessionId".to_string()))?
            .to_string();

        let page = CdpPage::new(
            session_id,
            self.ws_tx.clone(),
            self.pending.clone(),
            self.request_id.clone(),
        );
        page.enable_domains().await?;
        Ok(page)
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}

/// Shared command dispatch for the client and its page sessions.
pub(crate) async fn dispatch(
    ws_tx: &tokio::sync::Mutex<WsSink>,
    pending: &Mutex<HashMap<u64, PendingRequest>>,
    request_id: &AtomicU64,
    method: &str,
    params: Option<Value>,
    session_id: Option<&str>,
) -> Result<Value, BrowserError> {
    let id = request_id.fetch_add(1, Ordering::SeqCst);

    let request = CdpRequest {
        id,
        method: method.to_string(),
        params,
        session_id: session_id.map(|s| s.to_string()),
    };

    let json = serde_json::to_string(&request)
        .map_err(|e| BrowserError::ActionFailed(format!("Encoding {}: {}", method, e)))?;
    trace!("CDP send: {}", json);

    let (tx, rx) = oneshot::channel();
    pending.lock().insert(id, PendingRequest { tx });

    {
        let mut ws = ws_tx.lock().await;
        ws.send(Message::Text(json.into()))
            .await
            .map_err(|_| BrowserError::SessionClosed)?;
    }

    match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(BrowserError::SessionClosed),
        Err(_) => {
            pending.lock().remove(&id);
            Err(BrowserError::Timeout(format!("{} reply", method)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_increment() {
        let id = AtomicU64::new(1);
        assert_eq!(id.fetch_add(1, Ordering::SeqCst), 1);
        assert_eq!(id.fetch_add(1, Ordering::SeqCst), 2);
        assert_eq!(id.load(Ordering::SeqCst), 3);
    }
}
