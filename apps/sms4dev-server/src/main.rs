//! SMS4Dev Server - authentication and access key management for the SMS4Dev
//! mock SMS provider.
//!
//! # Usage
//!
//! ```text
//! SMS4DEV_ACCESS_KEYS=K1:S1 sms4dev-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:5081` | Bind address (`PORT` alone binds `0.0.0.0:$PORT`) |
//! | `SMS4DEV_DEV_MODE` | `false` | Seed and protect the example key, expose string-to-sign |
//! | `SMS4DEV_ALLOW_INSECURE_KEYS` | `false` | Admit requests that carry no credentials |
//! | `SMS4DEV_TIMESTAMP_WINDOW_SECS` | `900` | Freshness window for signed requests |
//! | `SMS4DEV_ACCESS_KEY_ID` / `SMS4DEV_ACCESS_KEY_SECRET` | *(unset)* | One seeded credential |
//! | `SMS4DEV_ACCESS_KEYS` | *(unset)* | Seeded credentials, `id:secret,id:secret` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sms4dev_auth::{Authenticator, AuthenticatorConfig, CredentialStore, KeyManager};
use sms4dev_core::{EXAMPLE_ACCESS_KEY_ID, EXAMPLE_ACCESS_KEY_SECRET, Sms4devConfig};
use sms4dev_http::{ApiHttpConfig, ApiHttpService, KeyApiHandler};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the credential store from the seeded keys.
///
/// In development mode the example credential is added unless a seeded key
/// already uses its id.
fn build_store(config: &Sms4devConfig) -> Arc<CredentialStore> {
    let store = CredentialStore::from_pairs(
        config
            .access_keys
            .iter()
            .map(|(id, secret)| (id.as_str(), secret.as_str())),
    );

    if config.dev_mode {
        if store.insert_new(EXAMPLE_ACCESS_KEY_ID, EXAMPLE_ACCESS_KEY_SECRET) {
            info!(
                key_id = EXAMPLE_ACCESS_KEY_ID,
                "development mode: seeded example access key"
            );
        } else {
            warn!(
                key_id = EXAMPLE_ACCESS_KEY_ID,
                "development mode: example key id already configured, keeping configured secret"
            );
        }
    }

    if store.is_empty() {
        warn!("no access keys configured, every protected request will be rejected");
    }

    Arc::new(store)
}

/// Wire store, authenticator and key manager into the HTTP service.
fn build_service(config: &Sms4devConfig) -> ApiHttpService<KeyApiHandler> {
    let store = build_store(config);

    let mut keys = KeyManager::new(Arc::clone(&store));
    if config.dev_mode {
        keys = keys.with_protected_key(EXAMPLE_ACCESS_KEY_ID);
    }

    let authenticator = Authenticator::new(
        store,
        AuthenticatorConfig {
            freshness_window_secs: config.timestamp_window_secs,
            allow_insecure: config.allow_insecure_keys,
        },
    );

    ApiHttpService::new(
        Arc::new(KeyApiHandler::new(keys)),
        ApiHttpConfig {
            authenticator: Arc::new(authenticator),
            expose_string_to_sign: config.dev_mode,
        },
    )
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: ApiHttpService<KeyApiHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by requesting the health endpoint.
///
/// Succeeds only on a 200 response reporting status `ok`.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"ok\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

/// Read the log level from the environment.
fn log_level() -> String {
    std::env::var("LOG_LEVEL").unwrap_or_else(|_| Sms4devConfig::default().log_level)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let healthy = match Sms4devConfig::from_env() {
            Ok(config) => {
                let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
                run_health_check(&addr).await.is_ok()
            }
            Err(_) => false,
        };
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&log_level())?;

    let config = Sms4devConfig::from_env().context("failed to load configuration")?;
    info!(
        dev_mode = config.dev_mode,
        allow_insecure_keys = config.allow_insecure_keys,
        timestamp_window_secs = config.timestamp_window_secs,
        seeded_keys = config.access_keys.len(),
        "loaded configuration",
    );

    let service = build_service(&config);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, version = VERSION, "starting SMS4Dev Server");

    serve(listener, service).await
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::service::Service as _;
    use sms4dev_auth::CredentialProvider;

    use super::*;

    fn config(dev_mode: bool, access_keys: &[(&str, &str)]) -> Sms4devConfig {
        Sms4devConfig {
            dev_mode,
            access_keys: access_keys
                .iter()
                .map(|(id, secret)| ((*id).to_owned(), (*secret).to_owned()))
                .collect(),
            ..Sms4devConfig::default()
        }
    }

    async fn call(
        service: &ApiHttpService<KeyApiHandler>,
        method: &str,
        uri: &str,
        key: &str,
        secret: &str,
    ) -> (http::StatusCode, serde_json::Value) {
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .header("x-sms4dev-key", key)
            .header("x-sms4dev-secret", secret)
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = service.call(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_should_seed_configured_keys_only_outside_dev_mode() {
        let store = build_store(&config(false, &[("K1", "S1")]));
        assert_eq!(store.len(), 1);
        assert!(store.validate("K1", "S1").valid);
        assert!(!store.contains(EXAMPLE_ACCESS_KEY_ID));
    }

    #[test]
    fn test_should_seed_example_key_in_dev_mode() {
        let store = build_store(&config(true, &[("K1", "S1")]));
        assert_eq!(store.len(), 2);
        assert!(
            store
                .validate(EXAMPLE_ACCESS_KEY_ID, EXAMPLE_ACCESS_KEY_SECRET)
                .valid
        );
    }

    #[test]
    fn test_should_keep_configured_secret_for_example_key_id() {
        let store = build_store(&config(true, &[(EXAMPLE_ACCESS_KEY_ID, "custom")]));
        assert_eq!(store.len(), 1);
        assert!(store.validate(EXAMPLE_ACCESS_KEY_ID, "custom").valid);
    }

    #[tokio::test]
    async fn test_should_protect_example_key_in_dev_mode() {
        let service = build_service(&config(true, &[]));
        let (status, json) = call(
            &service,
            "GET",
            "/api/auth/verify",
            EXAMPLE_ACCESS_KEY_ID,
            EXAMPLE_ACCESS_KEY_SECRET,
        )
        .await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(json["keyId"], EXAMPLE_ACCESS_KEY_ID);

        let uri = format!("/api/keys/{EXAMPLE_ACCESS_KEY_ID}");
        let (status, json) = call(
            &service,
            "DELETE",
            &uri,
            EXAMPLE_ACCESS_KEY_ID,
            EXAMPLE_ACCESS_KEY_SECRET,
        )
        .await;
        assert_eq!(status, http::StatusCode::FORBIDDEN);
        assert_eq!(json["Code"], "KeyProtected");
    }

    #[tokio::test]
    async fn test_should_reject_example_key_outside_dev_mode() {
        let service = build_service(&config(false, &[("K1", "S1")]));
        let (status, json) = call(
            &service,
            "GET",
            "/api/keys",
            EXAMPLE_ACCESS_KEY_ID,
            EXAMPLE_ACCESS_KEY_SECRET,
        )
        .await;
        assert_eq!(status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(json["Code"], "AuthFailure");
    }
}
