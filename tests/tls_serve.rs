//! The accept loop only speaks HTTP inside TLS.

use anyhow::{Context, Result};
use axum::http::{Request, StatusCode, header::HOST};
use gatehouse::{
    api::{password_router, serve_on},
    auth::{CredentialVerifier, StaticCredentials},
    tls::{TlsPaths, load_server_config},
};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper_util::rt::TokioIo;
use rustls::{ClientConfig, RootCertStore, crypto::ring, pki_types::ServerName};
use std::{fs, net::SocketAddr, sync::Arc};
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
};
use tokio_rustls::TlsConnector;

struct TlsServer {
    _dir: TempDir,
    addr: SocketAddr,
    roots: RootCertStore,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TlsServer {
    async fn start() -> Result<Self> {
        let dir = TempDir::new()?;
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        fs::write(&cert, certified.cert.pem())?;
        fs::write(&key, certified.key_pair.serialize_pem())?;
        fs::write(dir.path().join("index.html"), "<form></form>")?;

        let mut roots = RootCertStore::empty();
        roots.add(certified.cert.der().clone())?;

        let config = load_server_config(&TlsPaths::new(cert, key))?;
        let verifier = Arc::new(CredentialVerifier::new(Arc::new(StaticCredentials::default())));
        let app = password_router(verifier, dir.path());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve_on(listener, config, app, async {
            let _ = signal.await;
        }));

        Ok(Self {
            _dir: dir,
            addr,
            roots,
            shutdown,
            handle,
        })
    }

    fn connector(&self) -> Result<TlsConnector> {
        let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(self.roots.clone())
            .with_no_client_auth();
        Ok(TlsConnector::from(Arc::new(config)))
    }

    async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.handle.await?;
        Ok(())
    }
}

#[tokio::test]
async fn health_is_served_over_tls() -> Result<()> {
    let server = TlsServer::start().await?;

    let tcp = TcpStream::connect(server.addr).await?;
    let tls = server
        .connector()?
        .connect(ServerName::try_from("localhost")?, tcp)
        .await
        .context("TLS handshake failed")?;

    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(tls)).await?;
    let connection = tokio::spawn(connection);

    let request = Request::get("/health")
        .header(HOST, "localhost")
        .body(Empty::<Bytes>::new())?;
    let response = sender.send_request(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await?.to_bytes();
    let health: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(health["service"], "password");

    drop(sender);
    connection.abort();
    server.stop().await
}

#[tokio::test]
async fn plaintext_http_gets_no_response() -> Result<()> {
    let server = TlsServer::start().await?;

    let mut tcp = TcpStream::connect(server.addr).await?;
    tcp.write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await?;

    // the handshake fails and the connection is closed without an HTTP reply
    let mut reply = Vec::new();
    let _ = tcp.read_to_end(&mut reply).await;
    assert!(!reply.starts_with(b"HTTP/"));

    server.stop().await
}
