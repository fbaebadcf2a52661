use crate::auth::CredentialVerifier;
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::options,
};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
};
use std::{future::Future, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{
    request_id::PropagateRequestIdLayer,
    services::{ServeDir, ServeFile},
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, debug, info, info_span, warn};
use ulid::Ulid;

pub mod handlers;
// OpenAPI route registration lives in openapi.rs.
mod openapi;

pub use handlers::sso::SsoState;
pub use openapi::openapi;

/// Which of the two services a router belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    Sso,
    Password,
}

impl Service {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sso => "sso",
            Self::Password => "password",
        }
    }
}

/// Router of the single sign-on service.
#[must_use]
pub fn sso_router(state: Arc<SsoState>, static_dir: &Path) -> Router {
    let (router, _openapi) = openapi::sso_routes().split_for_parts();
    finish(router, Service::Sso, static_dir).layer(Extension(state))
}

/// Router of the password login service.
#[must_use]
pub fn password_router(verifier: Arc<CredentialVerifier>, static_dir: &Path) -> Router {
    let (router, _openapi) = openapi::password_routes().split_for_parts();
    finish(router, Service::Password, static_dir).layer(Extension(verifier))
}

// Extend the documented routes with the login page, static files and
// preflight-only `OPTIONS /health`, then add the shared layers.
fn finish(router: Router, service: Service, static_dir: &Path) -> Router {
    router
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route("/health", options(handlers::health::health))
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(service)),
        )
}

/// Serve `app` over TLS on `[::]:port` until Ctrl-C.
///
/// # Errors
/// Return error if the listener cannot be bound
pub async fn serve(port: u16, tls: rustls::ServerConfig, app: Router) -> Result<()> {
    let listener = TcpListener::bind(format!("[::]:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    serve_on(listener, tls, app, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {err}");
        }
    })
    .await;

    Ok(())
}

/// Accept TLS connections on `listener` until `shutdown` resolves.
///
/// Every connection must complete a TLS handshake before any HTTP is read;
/// plaintext clients are dropped.
pub async fn serve_on<F>(
    listener: TcpListener,
    tls: rustls::ServerConfig,
    app: Router,
    shutdown: F,
) where
    F: Future<Output = ()> + Send,
{
    let acceptor = TlsAcceptor::from(Arc::new(tls));
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            () = &mut shutdown => {
                info!("Gracefully shutdown");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(connection) => connection,
                Err(err) => {
                    warn!("Failed to accept connection: {err}");
                    continue;
                }
            },
        };

        let acceptor = acceptor.clone();
        let app = app.clone();

        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    debug!(%peer, "TLS handshake failed: {err}");
                    return;
                }
            };

            let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                app.clone().oneshot(request)
            });

            if let Err(err) = Builder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(TokioIo::new(stream), service)
                .await
            {
                debug!(%peer, "Connection closed with error: {err}");
            }
        });
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
