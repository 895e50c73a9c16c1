// TCP accept loop serving one connection at a time through the handler
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Srv;
use crate::features::RequestProcessor;
use crate::handler::HttpHandler;
use crate::stream::TcpConnection;

pub static SHUTDOWN: AtomicBool = AtomicBool::new(false);

const ACCEPT_IDLE: Duration = Duration::from_millis(50);

/// Stops every running server after its current connection.
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::Release);
}

/// Serves connections strictly in accept order on the calling thread.
/// A slow client holds up everyone queued behind it for at most one
/// request timeout.
pub struct Server<P> {
    cfg: Srv,
    handler: HttpHandler<P>,
    stop: Arc<AtomicBool>,
}

impl<P: RequestProcessor> Server<P> {
    pub fn new(cfg: Srv, handler: HttpHandler<P>) -> Self {
        Server { cfg, handler, stop: Arc::new(AtomicBool::new(false)) }
    }

    /// Flag that stops only this server once set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn stopping(&self) -> bool {
        SHUTDOWN.load(Ordering::Acquire) || self.stop.load(Ordering::Acquire)
    }

    pub fn handler(&self) -> &HttpHandler<P> {
        &self.handler
    }

    pub fn run(&mut self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.cfg.listen_addr)?;
        info!("Listening on {} (http)", self.cfg.listen_addr);
        info!(
            "Buffer: {} bytes | Request timeout: {}ms",
            self.handler.buffer_size(),
            self.handler.timeout().as_millis()
        );
        self.serve(listener)?;
        info!("Server stopped.");
        Ok(())
    }

    /// Accepts on `listener` until [`request_shutdown`] is called or the
    /// [`stop_handle`](Server::stop_handle) is set.
    pub fn serve(&mut self, listener: TcpListener) -> std::io::Result<()> {
        listener.set_nonblocking(true)?;
        let write_timeout = Some(self.handler.timeout());

        loop {
            if self.stopping() {
                break;
            }

            match listener.accept() {
                Ok((stream, peer)) => {
                    // accepted sockets may inherit the listener's mode
                    if let Err(e) = stream.set_nonblocking(false) {
                        warn!(%peer, "Dropping connection: {e}");
                        continue;
                    }
                    let mut conn = TcpConnection::new(stream);
                    let _ = conn.set_nodelay(true);
                    let _ = conn.set_write_timeout(write_timeout);

                    match self.handler.handle(&mut conn) {
                        Ok(outcome) => debug!(%peer, ?outcome, "Connection closed"),
                        Err(e) => debug!(%peer, reason = e.reason(), "Connection failed"),
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock
                           || e.kind() == std::io::ErrorKind::TimedOut => {
                    thread::sleep(ACCEPT_IDLE);
                }
                Err(e) => {
                    if !self.stopping() {
                        error!("Accept error: {e}");
                    }
                    thread::sleep(ACCEPT_IDLE);
                }
            }
        }
        Ok(())
    }
}
