//! WebSocket transport for the message stream.
//!
//! Thin wrapper around `tokio-tungstenite` providing type-isolated
//! reader/writer halves, bearer authentication, and an optional
//! skip-verify TLS mode for self-signed servers.
//!
//! # Architecture
//!
//! [`subscription_url`] turns the configured base address into the stream
//! URL. [`connect`] builds the handshake request, inserts the
//! `Authorization` header, negotiates TLS per [`TlsPolicy`] and returns a
//! ([`WsWriter`], [`WsReader`]) pair ready for a `tokio::select!` loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

use crate::constants::{
    CLOSE_CODE_NO_STATUS, HTTPS_SCHEME, HTTP_SCHEME, STREAM_PATH, WSS_SCHEME, WS_SCHEME,
};

/// Concrete WebSocket stream type.
type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Server certificate handling for `wss://` connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Verify the server certificate against the bundled web PKI roots.
    Verify,
    /// Accept any server certificate. Handshake signatures are still checked.
    SkipVerify,
}

impl TlsPolicy {
    /// Map a "verify certificates" flag to a policy.
    #[must_use]
    pub fn from_verify(verify: bool) -> Self {
        if verify {
            Self::Verify
        } else {
            Self::SkipVerify
        }
    }
}

/// Received WebSocket message.
#[derive(Debug)]
pub enum WsMessage {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Ping frame (answered by tungstenite).
    Ping,
    /// Pong frame.
    Pong,
    /// Close frame with status code and reason.
    Close {
        /// WebSocket close code (1000 = normal, 1005 = no code).
        code: u16,
        /// Human-readable close reason.
        reason: String,
    },
}

/// Write half of a WebSocket connection.
#[derive(Debug)]
pub struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    /// Send a close frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the send fails.
    pub async fn send_close(&mut self) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Close(None))
            .await
            .context("WebSocket send_close failed")
    }

    /// Flush pending frames and close the sink.
    ///
    /// After the peer's close frame has been read this sends the queued
    /// close reply, completing the closing handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn close(&mut self) -> Result<()> {
        self.sink.close().await.context("WebSocket close failed")
    }
}

/// Read half of a WebSocket connection.
#[derive(Debug)]
pub struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WsReader {
    /// Receive the next message, returning `None` when the stream ends.
    ///
    /// Raw `Frame` variants are skipped internally.
    pub async fn recv(&mut self) -> Option<Result<WsMessage>> {
        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Some(Ok(WsMessage::Text(text.to_string())));
                }
                Some(Ok(tungstenite::Message::Binary(data))) => {
                    return Some(Ok(WsMessage::Binary(data.to_vec())));
                }
                Some(Ok(tungstenite::Message::Ping(_))) => return Some(Ok(WsMessage::Ping)),
                Some(Ok(tungstenite::Message::Pong(_))) => return Some(Ok(WsMessage::Pong)),
                Some(Ok(tungstenite::Message::Close(close_frame))) => {
                    let (code, reason) = close_frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((CLOSE_CODE_NO_STATUS, String::new()));
                    return Some(Ok(WsMessage::Close { code, reason }));
                }
                Some(Ok(tungstenite::Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    return Some(Err(anyhow::anyhow!("WebSocket read error: {e}")));
                }
                None => return None,
            }
        }
    }
}

/// Connect to the stream URL with a bearer token.
///
/// # Errors
///
/// Returns an error if the URL is invalid, the token cannot be used as a
/// header value, or the handshake fails (including HTTP 401 from the
/// server).
pub async fn connect(url: &str, token: &str, tls: TlsPolicy) -> Result<(WsWriter, WsReader)> {
    use tungstenite::client::IntoClientRequest;

    let mut request = url
        .into_client_request()
        .with_context(|| format!("invalid WebSocket URL: {url}"))?;

    let auth = tungstenite::http::HeaderValue::from_str(&format!("Bearer {token}"))
        .context("invalid characters in token")?;
    request
        .headers_mut()
        .insert(tungstenite::http::header::AUTHORIZATION, auth);

    let connector = match tls {
        TlsPolicy::Verify => None,
        TlsPolicy::SkipVerify => Some(insecure_connector()?),
    };

    let (ws_stream, _response) =
        tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector)
            .await
            .context("WebSocket connect failed")?;

    let (sink, stream) = ws_stream.split();

    Ok((WsWriter { sink }, WsReader { stream }))
}

/// Build the stream URL from a base server address.
///
/// - `https://host` → `wss://host/stream`
/// - `http://host` → `ws://host/stream`
/// - `ws://…` / `wss://…` pass through, `/stream` appended if missing
/// - anything else is treated as a plain HTTP host
#[must_use]
pub fn subscription_url(base: &str) -> String {
    let base = base.trim();
    let base = base.strip_suffix('/').unwrap_or(base);

    let ws_base = if let Some(rest) = base.strip_prefix(HTTPS_SCHEME) {
        format!("{WSS_SCHEME}{rest}")
    } else if let Some(rest) = base.strip_prefix(HTTP_SCHEME) {
        format!("{WS_SCHEME}{rest}")
    } else if base.starts_with(WSS_SCHEME) || base.starts_with(WS_SCHEME) {
        base.to_string()
    } else {
        format!("{WS_SCHEME}{base}")
    };

    if ws_base.ends_with(STREAM_PATH) {
        ws_base
    } else {
        format!("{ws_base}{STREAM_PATH}")
    }
}

// =============================================================================
// Skip-verify TLS
// =============================================================================

fn insecure_connector() -> Result<tokio_tungstenite::Connector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .context("failed to configure TLS protocol versions")?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert { provider }))
        .with_no_client_auth();
    Ok(tokio_tungstenite::Connector::Rustls(Arc::new(config)))
}

/// Accepts every server certificate; signatures are still verified with
/// the provider's algorithms.
#[derive(Debug)]
struct AcceptAnyCert {
    provider: Arc<rustls::crypto::CryptoProvider>,
}

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &rustls::pki_types::CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &rustls::pki_types::CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
