//! The HTTP server, handler and routes.
//!
//! This file itself contains fairly little business logic and just sets up the
//! `hyper` server and catches errors. The main logic is in `handlers.rs`.

use bytes::Bytes;
use futures::FutureExt;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use std::{
    convert::Infallible,
    fs,
    future::Future,
    net::{IpAddr, SocketAddr},
    os::unix::fs::PermissionsExt,
    panic::AssertUnwindSafe,
    path::PathBuf,
    sync::Arc,
};
use tokio::net::{TcpListener, UnixListener};

use crate::{
    auth::{GroupHeaderAuthorizer, HeaderPrincipalMapping},
    config::Config,
    prelude::*,
};
use self::response::internal_server_error;


mod handlers;
mod log;
mod response;


/// HTTP server configuration.
#[derive(Debug, Clone, confique::Config)]
pub(crate) struct HttpConfig {
    /// The TCP port the HTTP server should listen on.
    #[config(default = 3090)]
    pub(crate) port: u16,

    /// The bind address to listen on.
    #[config(default = "127.0.0.1")]
    pub(crate) address: IpAddr,

    /// Unix domain socket to listen on. Specifying this will overwrite
    /// the TCP configuration. Example: "/tmp/groupgate.socket".
    pub(crate) unix_socket: Option<PathBuf>,

    /// Unix domain socket file permissions.
    #[config(default = 0o755)]
    pub(crate) unix_socket_permissions: u32,
}


type Body = Full<Bytes>;
type Response<T = Body> = hyper::Response<T>;
type Request<T> = hyper::Request<T>;


/// Context that the request handler has access to.
struct Context {
    authorizer: GroupHeaderAuthorizer,
    config: Config,
}

impl Context {
    fn new(config: Config) -> Result<Self> {
        let mapping = HeaderPrincipalMapping::from_config(&config.groups)?;
        Ok(Self {
            authorizer: GroupHeaderAuthorizer::new(mapping),
            config,
        })
    }
}


/// Starts the HTTP server and runs it until Ctrl+C is pressed.
pub(crate) async fn serve(config: Config) -> Result<()> {
    let http_config = config.http.clone();
    let ctx = Arc::new(Context::new(config)?);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // TCP and Unix listeners have different `accept` types, so the loop is
    // generated for each of them.
    macro_rules! accept_loop {
        ($listener:expr) => {
            loop {
                let stream = tokio::select! {
                    res = $listener.accept() => match res {
                        Ok((stream, _)) => stream,
                        Err(e) => {
                            warn!("Failed to accept incoming connection: {e}");
                            continue;
                        }
                    },
                    _ = &mut shutdown => {
                        info!("Received shutdown signal, stopping HTTP server");
                        break;
                    }
                };

                tokio::spawn(serve_connection(TokioIo::new(stream), Arc::clone(&ctx)));
            }
        };
    }

    if let Some(unix_socket) = &http_config.unix_socket {
        if unix_socket.exists() {
            fs::remove_file(unix_socket).with_context(|| {
                format!("failed to remove old socket file '{}'", unix_socket.display())
            })?;
        }
        let listener = UnixListener::bind(unix_socket)
            .with_context(|| format!("failed to bind to '{}'", unix_socket.display()))?;
        let permissions = fs::Permissions::from_mode(http_config.unix_socket_permissions);
        fs::set_permissions(unix_socket, permissions)?;
        info!("Listening on unix://{}", unix_socket.display());
        accept_loop!(listener);
    } else {
        let addr = SocketAddr::new(http_config.address, http_config.port);
        let listener = TcpListener::bind(addr).await
            .with_context(|| format!("failed to bind to '{addr}'"))?;
        info!("Listening on http://{}", listener.local_addr()?);
        accept_loop!(listener);
    }

    Ok(())
}

async fn serve_connection<I>(io: I, ctx: Arc<Context>)
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let service = service_fn(move |req| {
        let ctx = Arc::clone(&ctx);
        handle_internal_errors(async move { handlers::handle(req, &ctx).await })
    });

    if let Err(e) = auto::Builder::new(TokioExecutor::new()).serve_connection(io, service).await {
        debug!("Error while serving HTTP connection: {e}");
    }
}

/// This just wraps another future and catches all panics that might occur when
/// resolving/polling that given future. This ensures that we always answer with
/// `500` instead of just closing the connection.
async fn handle_internal_errors(
    future: impl Future<Output = Response>,
) -> Result<Response, Infallible> {
    // We assert that a panicking handler leaves no broken global state behind.
    // All handlers only read from the shared context.
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(response) => Ok(response),
        Err(panic) => {
            // For most panics (which use `panic!` like `println!`), the payload
            // is either `&str` or `String`.
            let msg = panic.downcast_ref::<String>()
                .map(|s| s.as_str())
                .or(panic.downcast_ref::<&str>().copied());

            match msg {
                Some(msg) => error!("INTERNAL SERVER ERROR: HTTP handler panicked: '{}'", msg),
                None => error!("INTERNAL SERVER ERROR: HTTP handler panicked"),
            }

            Ok(internal_server_error())
        }
    }
}
