//! Minimal HTTP/1.1 server for exercising the runner against real sockets.

use std::sync::{ Arc, atomic::{ AtomicU64, Ordering } };
use std::time::Duration;
use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use tokio::net::{ TcpListener, TcpStream };

/// How the server answers one request.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status { code: u16, delay: Duration },
    Hang, // read the request, never answer
    Close, // read the request, close without answering
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Status { code: 200, delay: Duration::ZERO }
    }

    pub fn ok_after(delay: Duration) -> Self {
        Reply::Status { code: 200, delay }
    }

    pub fn status(code: u16) -> Self {
        Reply::Status { code, delay: Duration::ZERO }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
}

pub struct MockServer {
    port: u16,
    counters: Arc<Counters>,
}

impl MockServer {
    /// Start serving on an ephemeral localhost port. `reply` receives the
    /// zero-based index of each request across all connections.
    pub async fn start<F>(reply: F) -> Self where F: Fn(u64) -> Reply + Send + Sync + 'static {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let counters = Arc::new(Counters::default());
        let reply = Arc::new(reply);

        let accept_counters = Arc::clone(&counters);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let counters = Arc::clone(&accept_counters);
                let reply = Arc::clone(&reply);
                tokio::spawn(async move {
                    let _ = Self::serve(stream, counters, reply).await;
                });
            }
        });

        Self { port, counters }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn hits(&self) -> u64 {
        self.counters.hits.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> u64 {
        self.counters.peak_in_flight.load(Ordering::SeqCst)
    }

    // keep-alive loop: one request at a time per connection
    async fn serve<F>(
        mut stream: TcpStream,
        counters: Arc<Counters>,
        reply: Arc<F>
    ) -> std::io::Result<()>
        where F: Fn(u64) -> Reply + Send + Sync + 'static
    {
        while Self::read_request_head(&mut stream).await? {
            let index = counters.hits.fetch_add(1, Ordering::SeqCst);
            let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            counters.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            match reply(index) {
                Reply::Hang => {
                    // hold the socket open until the client gives up
                    let mut sink = [0u8; 64];
                    while stream.read(&mut sink).await? > 0 {}
                    counters.in_flight.fetch_sub(1, Ordering::SeqCst);
                    return Ok(());
                }
                Reply::Close => {
                    counters.in_flight.fetch_sub(1, Ordering::SeqCst);
                    return Ok(());
                }
                Reply::Status { code, delay } => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let reason = if code == 200 { "OK" } else { "Status" };
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nok",
                        code,
                        reason
                    );
                    counters.in_flight.fetch_sub(1, Ordering::SeqCst);
                    stream.write_all(response.as_bytes()).await?;
                }
            }
        }
        Ok(())
    }

    /// Returns false once the peer closes the connection.
    async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<bool> {
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = stream.read(&mut chunk).await?;
            if read == 0 {
                return Ok(false);
            }
            head.extend_from_slice(&chunk[..read]);
            if head.windows(4).any(|window| window == b"\r\n\r\n") {
                return Ok(true);
            }
        }
    }
}

/// A localhost port with nothing listening on it.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
