use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Fixed-window counter for one client.
#[derive(Debug)]
pub struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// Per-IP request cap, scoped to the API router. Rejects before any body
/// parsing or business logic runs.
pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(req.headers());
    let max = state.config.rate_limit.max_requests;
    let window = Duration::from_secs(state.config.rate_limit.window_secs);

    let mut entry = state
        .rate_limits
        .entry(client.clone())
        .or_insert_with(|| RateWindow {
            count: 0,
            window_start: Instant::now(),
        });

    if entry.window_start.elapsed() > window {
        entry.count = 0;
        entry.window_start = Instant::now();
    }

    if entry.count >= max {
        drop(entry);
        warn!(%client, "rate limit exceeded");
        return Err(ApiError::TooManyRequests);
    }
    entry.count += 1;
    drop(entry);

    Ok(next.run(req).await)
}

fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown")
        .trim()
        .to_string()
}
