//! fake Solo Cloudwatcher for integration tests
//!
//! serves `/cgi-bin/cgiLastData` from an axum router on its own tokio runtime
//! thread, so tests stay plain synchronous #[test] functions like the code
//! under test.

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use tokio::sync::oneshot;

pub const FULL_BODY: &str = "\
dataGMTTime=2024/01/05 21:14:07
cwinfo=Serial: 2058, FW: 5.89
clouds=-18.520000
cloudsSafe=1
temp=11.250000
wind=7
windSafe=1
gust=12
rainSafe=1
lightSafe=1
safe=1
hum=63
humSafe=1
dewp=4.310000
relpress=1016.800000
pressureSafe=1
";

#[derive(Default)]
pub struct StationState {
    pub body: Mutex<String>,
    pub status: AtomicU16,
    pub delay_ms: AtomicU64,
    pub started: AtomicUsize,
    pub finished: AtomicUsize,
}

pub struct FakeStation {
    pub addr: SocketAddr,
    pub state: Arc<StationState>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FakeStation {
    pub fn start(body: &str) -> Self {
        let state = Arc::new(StationState {
            body: Mutex::new(body.to_string()),
            status: AtomicU16::new(200),
            ..Default::default()
        });

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake station");
        listener.set_nonblocking(true).expect("nonblocking listener");
        let addr = listener.local_addr().expect("local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = Router::new()
            .route("/cgi-bin/cgiLastData", get(last_data))
            .route("/moved", get(|| async { Redirect::temporary("/cgi-bin/cgiLastData") }))
            .with_state(state.clone());

        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("fake station runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("fake station server");
            });
        });

        Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    /// `host:port` as a session address.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn set_body(&self, body: &str) {
        *self.state.body.lock().unwrap() = body.to_string();
    }

    pub fn set_status(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn started(&self) -> usize {
        self.state.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.state.finished.load(Ordering::SeqCst)
    }
}

impl Drop for FakeStation {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn last_data(State(state): State<Arc<StationState>>) -> (StatusCode, String) {
    state.started.fetch_add(1, Ordering::SeqCst);
    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let status = StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK);
    let body = state.body.lock().unwrap().clone();
    state.finished.fetch_add(1, Ordering::SeqCst);
    (status, body)
}

/// Poll `check` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    check()
}
