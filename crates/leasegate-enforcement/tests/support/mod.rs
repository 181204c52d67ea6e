//! Shared fixtures: lease builders and a stub remote policy service.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};

use leasegate_core::{Allocation, EnforcementContext, Lease, Reservation};

pub fn ctx() -> EnforcementContext {
    EnforcementContext::new("u1", "p1", "http://keystone.local/v3", "RegionOne")
}

pub fn ctx_for(project: &str) -> EnforcementContext {
    EnforcementContext::new("u1", project, "http://keystone.local/v3", "RegionOne")
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

/// Lease starting at `t0() + offset_secs` lasting `length_secs`.
pub fn lease_at(offset_secs: i64, length_secs: i64) -> Lease {
    let start = t0() + chrono::Duration::seconds(offset_secs);
    Lease::new(start, start + chrono::Duration::seconds(length_secs)).with_reservation(
        Reservation::new("physical:host", 1, 1)
            .with_allocation(Allocation::new("host-1", "compute-01").with_extra("availability_zone", "az1")),
    )
}

pub fn lease_secs(length_secs: i64) -> Lease {
    lease_at(0, length_secs)
}

/// One request as seen by the stub.
#[derive(Debug, Clone)]
pub struct Captured {
    pub path: String,
    pub authorization: Option<String>,
    pub x_auth_token: Option<String>,
    pub content_type: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Captured>>>,
}

pub struct Stub {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl Stub {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Captured {
        self.requests.lock().unwrap().last().cloned().expect("no request captured")
    }
}

async fn handle(
    State(st): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    st.hits.fetch_add(1, Ordering::SeqCst);
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    st.requests.lock().unwrap().push(Captured {
        path: uri.path().to_owned(),
        authorization: header("authorization"),
        x_auth_token: header("x-auth-token"),
        content_type: header("content-type"),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });

    if !st.delay.is_zero() {
        tokio::time::sleep(st.delay).await;
    }
    (st.status, st.body).into_response()
}

/// Serve every path with `status` and `body` after `delay`.
pub async fn spawn_stub(status: u16, body: &'static str, delay: Duration) -> Stub {
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        status: StatusCode::from_u16(status).unwrap(),
        body,
        delay,
        hits: Arc::clone(&hits),
        requests: Arc::clone(&requests),
    };

    let app = Router::new().fallback(handle).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Stub {
        base_url: format!("http://{addr}"),
        hits,
        requests,
    }
}

/// Base URL of a port nothing listens on.
pub fn dead_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
