use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    admitted: u32,
}

/// How many list requests may start per window. A single list request turns into one backend
/// call per candidate plus one per probed interview, so the budget counts requests, not calls.
#[derive(Clone, Debug)]
pub struct ListBudget {
    limit: u32,
    length: Duration,
    window: Arc<Mutex<Window>>,
}

impl ListBudget {
    pub fn per_second(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(1))
    }

    fn new(limit: u32, length: Duration) -> Self {
        Self {
            limit: limit.max(1),
            length,
            window: Arc::new(Mutex::new(Window {
                opened: Instant::now(),
                admitted: 0,
            })),
        }
    }

    pub fn admit(&self, now: Instant) -> Admission {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = now.saturating_duration_since(window.opened);
        if elapsed >= self.length {
            window.opened = now;
            window.admitted = 0;
        }

        if window.admitted < self.limit {
            window.admitted += 1;
            return Admission::Allowed;
        }
        Admission::Limited {
            retry_after: self.length.saturating_sub(elapsed),
        }
    }
}

fn too_many_requests(retry_after: Duration) -> Response {
    let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": "rate_limit_exceeded", "retryable": true })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(seconds.max(1)));
    response
}

pub async fn limit_list_requests(
    State(budget): State<ListBudget>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match budget.admit(Instant::now()) {
        Admission::Allowed => next.run(req).await,
        Admission::Limited { retry_after } => {
            tracing::warn!(path = %req.uri().path(), ?retry_after, "List budget exhausted");
            too_many_requests(retry_after)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_refills_when_the_window_ends() {
        let budget = ListBudget::per_second(2);
        let start = Instant::now();
        assert_eq!(budget.admit(start), Admission::Allowed);
        assert_eq!(budget.admit(start), Admission::Allowed);
        assert!(matches!(
            budget.admit(start + Duration::from_millis(500)),
            Admission::Limited { .. }
        ));
        assert_eq!(
            budget.admit(start + Duration::from_millis(1500)),
            Admission::Allowed
        );
    }

    #[test]
    fn limited_response_carries_retry_after() {
        let response = too_many_requests(Duration::from_millis(300));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }
}
