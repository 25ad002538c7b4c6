// crates/mcp-gateway/src/pool.rs
// ============================================================================
// Module: TCP Connection Pool
// Description: Per-backend pool of live TCP connections with health checks.
// ============================================================================

use std::collections::VecDeque;
use std::io::Write;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use mcp_framing::read_frame;
use mcp_framing::write_frame;

/// Connection pool configuration for one gateway backend.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Minimum number of connections to keep warm.
    pub min: usize,
    /// Maximum number of live connections (idle + in-use).
    pub max: usize,
    /// How long an idle connection may sit before being closed.
    pub idle_timeout: Duration,
    /// Timeout applied to opening a new TCP connection.
    pub connect_timeout: Duration,
    /// Interval between health-check sweeps.
    pub health_check_interval: Duration,
    /// Timeout applied to each health-check probe.
    pub health_check_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: 8,
            idle_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(2),
            health_check_interval: Duration::from_secs(30),
            health_check_timeout: Duration::from_millis(500),
        }
    }
}

/// Errors raised while acquiring or using a pooled connection.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No connection became available before the caller's deadline.
    #[error("timed out waiting for a pooled connection")]
    AcquireTimeout,
    /// Opening a fresh TCP connection failed.
    #[error("failed to connect to backend: {0}")]
    Connect(#[from] std::io::Error),
}

struct IdleConn {
    stream: TcpStream,
    last_used: Instant,
}

struct State {
    idle: VecDeque<IdleConn>,
    in_use: usize,
}

/// A bounded pool of TCP connections to a single gateway backend.
///
/// # Invariants
/// - `in_use + idle.len()` never exceeds `config.max`.
/// - Connections that fail release or a health probe are closed, never
///   returned to the free list.
pub struct ConnectionPool {
    address: String,
    config: PoolConfig,
    state: Mutex<State>,
    condvar: Condvar,
    shutdown: Arc<AtomicBool>,
    health_thread: Mutex<Option<JoinHandle<()>>>,
    warmed_up: AtomicBool,
}

impl ConnectionPool {
    /// Builds a new pool for `address`, starting its background health-check
    /// thread.
    #[must_use]
    pub fn new(address: impl Into<String>, config: PoolConfig) -> Arc<Self> {
        let pool = Arc::new(Self {
            address: address.into(),
            config,
            state: Mutex::new(State {
                idle: VecDeque::new(),
                in_use: 0,
            }),
            condvar: Condvar::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            health_thread: Mutex::new(None),
            warmed_up: AtomicBool::new(false),
        });
        let health_pool = Arc::clone(&pool);
        let handle = thread::spawn(move || health_check_loop(&health_pool));
        *pool.health_thread.lock().unwrap_or_else(|poison| poison.into_inner()) = Some(handle);
        pool
    }

    /// Acquires a connection, opening a new one if under `max` and none are
    /// idle, or waiting on released connections until `deadline`.
    ///
    /// # Errors
    /// Returns [`PoolError::AcquireTimeout`] if no connection becomes
    /// available before `deadline`, or [`PoolError::Connect`] if opening a
    /// fresh connection fails.
    pub fn acquire(&self, deadline: Instant) -> Result<TcpStream, PoolError> {
        loop {
            let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
            if let Some(conn) = state.idle.pop_front() {
                state.in_use += 1;
                drop(state);
                self.warm_up_once();
                return Ok(conn.stream);
            }
            if state.in_use + state.idle.len() < self.config.max {
                state.in_use += 1;
                drop(state);
                let conn = self.connect()?;
                self.warm_up_once();
                return Ok(conn);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(PoolError::AcquireTimeout);
            }
            let (guard, timeout) = self
                .condvar
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poison| poison.into_inner());
            drop(guard);
            if timeout.timed_out() {
                return Err(PoolError::AcquireTimeout);
            }
        }
    }

    /// Opens connections up to `config.min`, once, the first time `acquire`
    /// succeeds. A best-effort soft floor: connect failures here are
    /// swallowed since the caller's own acquisition already succeeded.
    fn warm_up_once(&self) {
        if self.config.min == 0 || self.warmed_up.swap(true, Ordering::AcqRel) {
            return;
        }
        loop {
            let total = {
                let state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
                state.in_use + state.idle.len()
            };
            if total >= self.config.min || total >= self.config.max {
                return;
            }
            match self.connect() {
                Ok(stream) => {
                    let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
                    state.idle.push_back(IdleConn {
                        stream,
                        last_used: Instant::now(),
                    });
                }
                Err(_) => return,
            }
        }
    }

    fn connect(&self) -> Result<TcpStream, PoolError> {
        let addrs: Vec<_> = self
            .address
            .to_socket_addrs()
            .map_err(PoolError::Connect)?
            .collect();
        let addr = addrs.into_iter().next().ok_or_else(|| {
            PoolError::Connect(std::io::Error::new(std::io::ErrorKind::NotFound, "no resolvable address"))
        })?;
        let stream = TcpStream::connect_timeout(&addr, self.config.connect_timeout)?;
        stream.set_nodelay(true).map_err(PoolError::Connect)?;
        Ok(stream)
    }

    /// Returns a connection to the pool if `ok` is true; otherwise closes it.
    /// Connections handed back unhealthy are dropped, decrementing the
    /// in-use count without re-entering the free list.
    pub fn release(&self, conn: TcpStream, ok: bool) {
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        state.in_use = state.in_use.saturating_sub(1);
        if ok {
            state.idle.push_back(IdleConn {
                stream: conn,
                last_used: Instant::now(),
            });
        }
        drop(state);
        self.condvar.notify_one();
    }

    /// Returns `(in_use, idle)` connection counts.
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        (state.in_use, state.idle.len())
    }

    /// Stops the health-check thread and drops all idle connections.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.condvar.notify_all();
        let handle = self.health_thread.lock().unwrap_or_else(|poison| poison.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        state.idle.clear();
    }
}

fn health_check_loop(pool: &ConnectionPool) {
    while !pool.shutdown.load(Ordering::Acquire) {
        thread::sleep(pool.config.health_check_interval.min(Duration::from_millis(200)));
        if pool.shutdown.load(Ordering::Acquire) {
            break;
        }
        let mut state = pool.state.lock().unwrap_or_else(|poison| poison.into_inner());
        let now = Instant::now();
        let mut survivors = VecDeque::new();
        while let Some(mut conn) = state.idle.pop_front() {
            let expired = now.duration_since(conn.last_used) >= pool.config.idle_timeout;
            if expired || !probe(&mut conn.stream, pool.config.health_check_timeout) {
                continue;
            }
            survivors.push_back(conn);
        }
        state.idle = survivors;
    }
}

fn probe(stream: &mut TcpStream, timeout: Duration) -> bool {
    stream.set_write_timeout(Some(timeout)).is_ok() && stream.flush().is_ok()
}

/// Forwards `request_payload` over `stream` as one framed message and reads
/// back one framed reply, bounded by `read_timeout`.
///
/// # Errors
/// Returns a [`mcp_framing::FramingError`] on write or read failure,
/// including a read that exceeds `read_timeout`.
pub fn forward_framed(
    stream: &mut TcpStream,
    request_payload: &[u8],
    max_frame_bytes: usize,
    read_timeout: Duration,
) -> Result<Vec<u8>, mcp_framing::FramingError> {
    write_frame(stream, request_payload)?;
    stream.set_read_timeout(Some(read_timeout)).map_err(mcp_framing::FramingError::Io)?;
    read_frame(stream, max_frame_bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;

    use super::*;

    fn echo_server() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local_addr").to_string();
        (listener, addr)
    }

    #[test]
    fn acquire_opens_new_connection_when_under_max() {
        let (listener, addr) = echo_server();
        let pool = ConnectionPool::new(addr, PoolConfig::default());
        let accept_handle = thread::spawn(move || {
            let _ = listener.accept();
        });
        let conn = pool.acquire(Instant::now() + Duration::from_secs(2)).expect("acquire");
        let (in_use, idle) = pool.counts();
        assert_eq!(in_use, 1);
        assert_eq!(idle, 0);
        pool.release(conn, true);
        let (in_use, idle) = pool.counts();
        assert_eq!(in_use, 0);
        assert_eq!(idle, 1);
        pool.shutdown();
        let _ = accept_handle.join();
    }

    #[test]
    fn acquire_respects_max_and_times_out() {
        let (listener, addr) = echo_server();
        let accept_handle = thread::spawn(move || {
            let _first = listener.accept();
            let _second = listener.accept();
        });
        let config = PoolConfig {
            min: 0,
            max: 1,
            ..PoolConfig::default()
        };
        let pool = ConnectionPool::new(addr, config);
        let _conn = pool.acquire(Instant::now() + Duration::from_secs(2)).expect("first acquire");
        let err = pool
            .acquire(Instant::now() + Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, PoolError::AcquireTimeout));
        pool.shutdown();
        drop(accept_handle);
    }

    #[test]
    fn acquire_warms_the_pool_up_to_min_after_first_acquisition() {
        let (listener, addr) = echo_server();
        let accept_handle = thread::spawn(move || {
            let _first = listener.accept();
            let _second = listener.accept();
        });
        let config = PoolConfig {
            min: 2,
            max: 5,
            ..PoolConfig::default()
        };
        let pool = ConnectionPool::new(addr, config);
        let conn = pool.acquire(Instant::now() + Duration::from_secs(2)).expect("acquire");
        let (in_use, idle) = pool.counts();
        assert_eq!(in_use, 1);
        assert_eq!(idle, 1);
        pool.release(conn, true);
        pool.shutdown();
        let _ = accept_handle.join();
    }

    #[test]
    fn forward_framed_round_trips_through_echo_server() {
        let (listener, addr) = echo_server();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut header = [0u8; 4];
            stream.read_exact(&mut header).expect("read header");
            let len = u32::from_be_bytes(header) as usize;
            let mut payload = vec![0u8; len];
            stream.read_exact(&mut payload).expect("read payload");
            write_frame(&mut stream, &payload).expect("reply");
        });
        let mut stream = TcpStream::connect(&addr).expect("connect");
        let reply = forward_framed(&mut stream, b"{\"jsonrpc\":\"2.0\"}", 1024, Duration::from_secs(2))
            .expect("forward");
        assert_eq!(reply, b"{\"jsonrpc\":\"2.0\"}");
        server.join().expect("server thread");
    }
}
