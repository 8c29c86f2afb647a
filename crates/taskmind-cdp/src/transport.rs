//! Target discovery and WebSocket connection setup.

use futures::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};
use url::Url;

use taskmind_config::SessionConfig;

use crate::error::CdpError;
use crate::protocol::PageInfo;
use crate::proxy;

pub(crate) type WsStream = WebSocketStream<TcpStream>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
pub(crate) type WsSource = SplitStream<WsStream>;

/// Resolved route to one target: where to connect and how.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    config: SessionConfig,
    ws_url: String,
}

impl Transport {
    /// Resolve the target WebSocket URL, discovering it over HTTP when the
    /// configuration does not name one.
    pub(crate) async fn resolve(config: &SessionConfig) -> Result<Self, CdpError> {
        let ws_url = match &config.websocket_url {
            Some(url) => url.clone(),
            None => discover(config).await?,
        };
        Ok(Self {
            config: config.clone(),
            ws_url,
        })
    }

    pub(crate) fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open a fresh WebSocket to the target, tunnelling through the proxy
    /// when one is configured. Bounded by the connect timeout.
    pub(crate) async fn open(&self) -> Result<WsStream, CdpError> {
        let timeout = self.config.connect_timeout();
        tokio::time::timeout(timeout, self.open_inner())
            .await
            .map_err(|_| {
                CdpError::ConnectionFailed(format!(
                    "connecting to {} timed out after {:?}",
                    self.ws_url, timeout
                ))
            })?
    }

    async fn open_inner(&self) -> Result<WsStream, CdpError> {
        let url = Url::parse(&self.ws_url)?;
        if url.scheme() != "ws" {
            return Err(CdpError::ConnectionFailed(format!(
                "unsupported WebSocket scheme '{}', only ws:// targets are supported",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| CdpError::ConnectionFailed(format!("no host in {}", self.ws_url)))?;
        let port = url.port_or_known_default().unwrap_or(80);

        let tcp = match &self.config.proxy {
            Some(proxy) => proxy::tunnel(proxy, host, port).await?,
            None => TcpStream::connect((host, port)).await.map_err(|e| {
                CdpError::ConnectionFailed(format!("{}:{}: {}", host, port, e))
            })?,
        };
        let _ = tcp.set_nodelay(true);

        let (ws, _) = tokio_tungstenite::client_async(self.ws_url.as_str(), tcp).await?;
        debug!("WebSocket connected to {}", self.ws_url);
        Ok(ws)
    }
}

/// Pick the target from `/json/list`.
async fn discover(config: &SessionConfig) -> Result<String, CdpError> {
    let list_url = format!("{}/json/list", config.http_endpoint());
    debug!("Discovering targets from {}", list_url);

    let mut builder = reqwest::Client::builder().timeout(config.connect_timeout());
    if let Some(proxy) = &config.proxy {
        let mut rp = reqwest::Proxy::all(proxy.url())?;
        if let Some(creds) = proxy.credentials() {
            rp = rp.basic_auth(&creds.username, &creds.password);
        }
        builder = builder.proxy(rp);
    } else {
        builder = builder.no_proxy();
    }
    let client = builder.build()?;

    let response = client
        .get(&list_url)
        .send()
        .await
        .map_err(|e| CdpError::ConnectionFailed(format!("{}: {}", list_url, e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::PROXY_AUTHENTICATION_REQUIRED {
        return Err(CdpError::ProxyAuth(format!(
            "discovery through proxy answered {}",
            status
        )));
    }
    if !status.is_success() {
        return Err(CdpError::Http(format!("{} answered {}", list_url, status)));
    }

    let pages: Vec<PageInfo> = response.json().await?;
    let page = select_target(&pages, config.target_id.as_deref())?;
    info!(target_id = %page.id, url = %page.url, "Selected browser target");

    page.web_socket_debugger_url
        .clone()
        .ok_or_else(|| CdpError::TargetNotFound(format!("target {} is not debuggable", page.id)))
}

fn select_target<'a>(pages: &'a [PageInfo], target_id: Option<&str>) -> Result<&'a PageInfo, CdpError> {
    match target_id {
        Some(id) => pages
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| CdpError::TargetNotFound(id.to_string())),
        None => pages
            .iter()
            .find(|p| p.page_type == "page" && p.web_socket_debugger_url.is_some())
            .ok_or_else(|| CdpError::TargetNotFound("no debuggable page target".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, kind: &str, ws: bool) -> PageInfo {
        PageInfo {
            id: id.to_string(),
            page_type: kind.to_string(),
            title: String::new(),
            url: "about:blank".to_string(),
            web_socket_debugger_url: ws.then(|| format!("ws://127.0.0.1:9222/devtools/page/{}", id)),
        }
    }

    #[test]
    fn test_select_first_page() {
        let pages = vec![page("sw", "service_worker", true), page("p1", "page", true)];
        assert_eq!(select_target(&pages, None).unwrap().id, "p1");
    }

    #[test]
    fn test_select_by_id() {
        let pages = vec![page("p1", "page", true), page("p2", "page", true)];
        assert_eq!(select_target(&pages, Some("p2")).unwrap().id, "p2");
        assert!(matches!(
            select_target(&pages, Some("p3")),
            Err(CdpError::TargetNotFound(_))
        ));
    }

    #[test]
    fn test_no_debuggable_page() {
        let pages = vec![page("p1", "page", false)];
        assert!(select_target(&pages, None).is_err());
    }

    #[tokio::test]
    async fn test_rejects_tls_websocket() {
        let config = SessionConfig::for_websocket("wss://127.0.0.1:9222/devtools/page/1");
        let transport = Transport::resolve(&config).await.unwrap();
        let err = transport.open().await.unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }
}
