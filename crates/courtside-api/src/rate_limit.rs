//! Fixed-window rate limiter for the routes that call the generative model.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Window {
    started: Instant,
    used: u64,
}

/// Allows `max_per_window` requests per second across all callers.
/// A limit of 0 disables limiting.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_per_window: u64,
    window: Arc<Mutex<Window>>,
}

impl RateLimiter {
    pub fn new(max_per_sec: u64) -> Self {
        Self {
            max_per_window: max_per_sec,
            window: Arc::new(Mutex::new(Window {
                started: Instant::now(),
                used: 0,
            })),
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        if self.max_per_window == 0 {
            return true;
        }
        let mut window = match self.window.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if now.saturating_duration_since(window.started) >= WINDOW {
            window.started = now;
            window.used = 0;
        }
        if window.used < self.max_per_window {
            window.used += 1;
            true
        } else {
            false
        }
    }
}

/// Axum middleware rejecting requests over the limit with 429.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if state.limiter.try_acquire() {
        next.run(req).await
    } else {
        warn!(path = %req.uri().path(), "Rate limit exceeded");
        ApiError::TooManyRequests.into_response()
    }
}
