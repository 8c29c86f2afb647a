//! Proxy tunnelling for the CDP WebSocket.
//!
//! HTTP(S) proxies are traversed with `CONNECT`; SOCKS proxies with a SOCKS5
//! handshake (RFC 1928) and username/password auth (RFC 1929). Either way the
//! result is a plain TCP stream to the target on which the WebSocket
//! handshake runs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use taskmind_config::{ProxyConfig, ProxyScheme};

use crate::error::CdpError;

const MAX_RESPONSE_HEADER: usize = 8192;

const SOCKS_VERSION: u8 = 0x05;
const SOCKS_AUTH_NONE: u8 = 0x00;
const SOCKS_AUTH_PASSWORD: u8 = 0x02;
const SOCKS_AUTH_REJECTED: u8 = 0xFF;
const SOCKS_CMD_CONNECT: u8 = 0x01;
const SOCKS_ATYP_IPV4: u8 = 0x01;
const SOCKS_ATYP_DOMAIN: u8 = 0x03;
const SOCKS_ATYP_IPV6: u8 = 0x04;

/// Open a TCP stream to `host:port` through `proxy`.
pub(crate) async fn tunnel(proxy: &ProxyConfig, host: &str, port: u16) -> Result<TcpStream, CdpError> {
    let mut stream = TcpStream::connect(proxy.address()).await.map_err(|e| {
        CdpError::ConnectionFailed(format!("proxy {} unreachable: {}", proxy.address(), e))
    })?;

    debug!(proxy = %proxy.address(), scheme = %proxy.scheme(), dest = %format!("{}:{}", host, port), "Opening proxy tunnel");

    match proxy.scheme() {
        ProxyScheme::Http | ProxyScheme::Https => http_connect(&mut stream, proxy, host, port).await?,
        ProxyScheme::Socks => socks5_connect(&mut stream, proxy, host, port).await?,
    }
    Ok(stream)
}

/// `Proxy-Authorization` header value for the configured credentials.
pub(crate) fn basic_auth(proxy: &ProxyConfig) -> Option<String> {
    proxy.credentials().map(|c| {
        let token = BASE64.encode(format!("{}:{}", c.username, c.password));
        format!("Basic {}", token)
    })
}

async fn http_connect(
    stream: &mut TcpStream,
    proxy: &ProxyConfig,
    host: &str,
    port: u16,
) -> Result<(), CdpError> {
    let authority = format!("{}:{}", host, port);
    let mut request = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\n", authority);
    if let Some(auth) = basic_auth(proxy) {
        request.push_str(&format!("Proxy-Authorization: {}\r\n", auth));
    }
    request.push_str("\r\n");

    stream.write_all(request.as_bytes()).await.map_err(io_failed)?;

    let head = read_response_head(stream).await?;
    let status = parse_status(&head)?;
    match status {
        200..=299 => Ok(()),
        407 => Err(CdpError::ProxyAuth(format!(
            "proxy {} answered 407 Proxy Authentication Required",
            proxy.address()
        ))),
        other => Err(CdpError::ConnectionFailed(format!(
            "proxy {} refused CONNECT {}: status {}",
            proxy.address(),
            authority,
            other
        ))),
    }
}

/// Read up to the blank line that ends the response head. Reads byte by byte
/// so nothing past the head is consumed from the tunnel.
async fn read_response_head(stream: &mut TcpStream) -> Result<String, CdpError> {
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_RESPONSE_HEADER {
            return Err(CdpError::ConnectionFailed(
                "proxy response header too large".to_string(),
            ));
        }
        let n = stream.read(&mut byte).await.map_err(io_failed)?;
        if n == 0 {
            return Err(CdpError::ConnectionFailed(
                "proxy closed the connection during CONNECT".to_string(),
            ));
        }
        head.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}

fn parse_status(head: &str) -> Result<u16, CdpError> {
    let status_line = head.lines().next().unwrap_or_default();
    let mut parts = status_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => code
            .parse::<u16>()
            .map_err(|_| CdpError::ConnectionFailed(format!("bad proxy status line: {}", status_line))),
        _ => Err(CdpError::ConnectionFailed(format!(
            "bad proxy status line: {}",
            status_line
        ))),
    }
}

async fn socks5_connect(
    stream: &mut TcpStream,
    proxy: &ProxyConfig,
    host: &str,
    port: u16,
) -> Result<(), CdpError> {
    let credentials = proxy.credentials();

    let greeting: &[u8] = if credentials.is_some() {
        &[SOCKS_VERSION, 2, SOCKS_AUTH_NONE, SOCKS_AUTH_PASSWORD]
    } else {
        &[SOCKS_VERSION, 1, SOCKS_AUTH_NONE]
    };
    stream.write_all(greeting).await.map_err(io_failed)?;

    let mut choice = [0u8; 2];
    stream.read_exact(&mut choice).await.map_err(io_failed)?;
    if choice[0] != SOCKS_VERSION {
        return Err(CdpError::ConnectionFailed(format!(
            "proxy {} is not a SOCKS5 server",
            proxy.address()
        )));
    }

    match (choice[1], credentials) {
        (SOCKS_AUTH_NONE, _) => {}
        (SOCKS_AUTH_PASSWORD, Some(creds)) => {
            let user = creds.username.as_bytes();
            let pass = creds.password.as_bytes();
            if user.len() > 255 || pass.len() > 255 {
                return Err(CdpError::ProxyAuth(
                    "SOCKS5 credentials longer than 255 bytes".to_string(),
                ));
            }
            let mut auth = Vec::with_capacity(3 + user.len() + pass.len());
            auth.push(0x01);
            auth.push(user.len() as u8);
            auth.extend_from_slice(user);
            auth.push(pass.len() as u8);
            auth.extend_from_slice(pass);
            stream.write_all(&auth).await.map_err(io_failed)?;

            let mut status = [0u8; 2];
            stream.read_exact(&mut status).await.map_err(io_failed)?;
            if status[1] != 0x00 {
                return Err(CdpError::ProxyAuth(format!(
                    "proxy {} rejected the SOCKS5 credentials",
                    proxy.address()
                )));
            }
        }
        (SOCKS_AUTH_REJECTED, _) | (SOCKS_AUTH_PASSWORD, None) => {
            return Err(CdpError::ProxyAuth(format!(
                "proxy {} requires authentication",
                proxy.address()
            )));
        }
        (other, _) => {
            return Err(CdpError::ConnectionFailed(format!(
                "proxy {} chose unsupported SOCKS5 method {:#04x}",
                proxy.address(),
                other
            )));
        }
    }

    let host_bytes = host.as_bytes();
    if host_bytes.len() > 255 {
        return Err(CdpError::ConnectionFailed(format!("host name too long: {}", host)));
    }
    let mut request = Vec::with_capacity(7 + host_bytes.len());
    request.extend_from_slice(&[SOCKS_VERSION, SOCKS_CMD_CONNECT, 0x00, SOCKS_ATYP_DOMAIN]);
    request.push(host_bytes.len() as u8);
    request.extend_from_slice(host_bytes);
    request.extend_from_slice(&port.to_be_bytes());
    stream.write_all(&request).await.map_err(io_failed)?;

    let mut reply = [0u8; 4];
    stream.read_exact(&mut reply).await.map_err(io_failed)?;
    if reply[1] != 0x00 {
        return Err(CdpError::ConnectionFailed(format!(
            "SOCKS5 connect to {}:{} failed with reply {:#04x}",
            host, port, reply[1]
        )));
    }

    // Bound address and port, discarded.
    let addr_len = match reply[3] {
        SOCKS_ATYP_IPV4 => 4,
        SOCKS_ATYP_IPV6 => 16,
        SOCKS_ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await.map_err(io_failed)?;
            len[0] as usize
        }
        other => {
            return Err(CdpError::ConnectionFailed(format!(
                "SOCKS5 reply with unknown address type {:#04x}",
                other
            )));
        }
    };
    let mut bound = vec![0u8; addr_len + 2];
    stream.read_exact(&mut bound).await.map_err(io_failed)?;
    Ok(())
}

fn io_failed(e: std::io::Error) -> CdpError {
    CdpError::ConnectionFailed(format!("proxy I/O: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmind_config::ProxyCredentials;

    #[test]
    fn test_basic_auth_header() {
        let proxy = ProxyConfig::new(
            "http",
            "proxy.local",
            3128,
            Some(ProxyCredentials {
                username: "alice".to_string(),
                password: "secret".to_string(),
            }),
        )
        .unwrap();
        assert_eq!(basic_auth(&proxy).unwrap(), "Basic YWxpY2U6c2VjcmV0");
    }

    #[test]
    fn test_no_auth_without_credentials() {
        let proxy = ProxyConfig::new("http", "proxy.local", 3128, None).unwrap();
        assert!(basic_auth(&proxy).is_none());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("HTTP/1.1 200 Connection established\r\n\r\n").unwrap(), 200);
        assert_eq!(parse_status("HTTP/1.0 407 Proxy Authentication Required\r\n").unwrap(), 407);
        assert!(parse_status("garbage\r\n").is_err());
        assert!(parse_status("").is_err());
    }
}
