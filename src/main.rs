use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

mod config;
mod controller;
mod handler;
mod logger;
mod transport;

use logger::{Logger, StdoutLogger};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;

    let logger: Arc<dyn Logger> = StdoutLogger::new(&cfg.logging);
    let state = Arc::new(config::AppState::new(&cfg));
    let connections = Arc::new(AtomicUsize::new(0));

    logger.info("======================================");
    logger.info(&format!("JSON API server listening on: http://{addr}"));
    logger.info(&format!("Log level: {}", cfg.logging.level));
    if let Some(workers) = cfg.server.workers {
        logger.info(&format!("Worker threads: {workers}"));
    }
    logger.info(&format!("Max body size: {} bytes", cfg.http.max_body_size));
    logger.info(&format!(
        "Max connections: {:?}",
        cfg.performance.max_connections
    ));
    logger.info("======================================");

    // LocalSet: per-connection tasks are spawned locally, so the per-exchange
    // futures never need to be Send.
    let local = tokio::task::LocalSet::new();
    local
        .run_until(run_server(listener, state, logger, connections))
        .await
}

async fn run_server(
    listener: TcpListener,
    state: Arc<config::AppState>,
    logger: Arc<dyn Logger>,
    connections: Arc<AtomicUsize>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                accept_connection(stream, peer_addr, &state, &logger, &connections);
            }
            Err(e) => {
                logger.error(&format!("Failed to accept connection: {e}"));
            }
        }
    }
}

/// Accept one connection, enforcing the configured connection limit.
fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<config::AppState>,
    logger: &Arc<dyn Logger>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment first, then check the limit, to avoid racing other accepts.
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= max_conn as usize {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger.error(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if state.config.logging.access_log {
        logger.info(&format!("[Connection] Accepted from: {peer_addr}"));
    }

    handle_connection(
        stream,
        Arc::clone(state),
        Arc::clone(logger),
        Arc::clone(conn_counter),
    );
}

/// Serve a single HTTP/1.1 connection in a spawned task.
fn handle_connection(
    stream: tokio::net::TcpStream,
    state: Arc<config::AppState>,
    logger: Arc<dyn Logger>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);

        let keep_alive_timeout = state.config.performance.keep_alive_timeout;
        let timeout_duration = std::time::Duration::from_secs(std::cmp::max(
            state.config.performance.read_timeout,
            state.config.performance.write_timeout,
        ));

        let mut builder = http1::Builder::new();
        if keep_alive_timeout > 0 {
            builder.keep_alive(true);
        }

        let svc_state = Arc::clone(&state);
        let svc_logger = Arc::clone(&logger);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&svc_state);
                let logger = Arc::clone(&svc_logger);
                async move {
                    Ok::<_, Infallible>(handler::handle_request(req, state, logger).await)
                }
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger.error(&format!("Failed to serve connection: {err:?}")),
            Err(_) => logger.error(&format!(
                "Connection timeout after {} seconds",
                timeout_duration.as_secs()
            )),
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Create a `TcpListener` with SO_REUSEPORT and SO_REUSEADDR enabled, so a
/// replacement process can bind the same address before this one exits.
fn create_reusable_listener(addr: std::net::SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_port(true)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
