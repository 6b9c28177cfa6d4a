use std::collections::HashMap;

use axum::{
    extract::Request,
    http::uri::{PathAndQuery, Uri},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Fields that legitimately repeat (filter/sort fields); everything else
/// collapses to its last occurrence.
const ARRAY_WHITELIST: &[&str] = &[
    "duration",
    "ratingsQuantity",
    "ratingsAverage",
    "maxGroupSize",
    "difficulty",
    "price",
];

/// Collapses duplicate query parameters before routing. Operates on the raw
/// query text, so percent-encoding is preserved as-is.
pub async fn dedupe_query_params(mut req: Request, next: Next) -> Response {
    if let Some(query) = req.uri().query() {
        if let Some(collapsed) = collapse_query(query) {
            let path_and_query = if collapsed.is_empty() {
                req.uri().path().to_string()
            } else {
                format!("{}?{}", req.uri().path(), collapsed)
            };
            let mut parts = req.uri().clone().into_parts();
            match PathAndQuery::try_from(path_and_query.as_str()) {
                Ok(pq) => {
                    parts.path_and_query = Some(pq);
                    if let Ok(uri) = Uri::from_parts(parts) {
                        debug!(%uri, "collapsed duplicate query parameters");
                        *req.uri_mut() = uri;
                    }
                }
                Err(_) => {}
            }
        }
    }
    next.run(req).await
}

/// Returns the rewritten query, or None when nothing needed collapsing.
fn collapse_query(query: &str) -> Option<String> {
    let mut kept: Vec<&str> = Vec::new();
    let mut last_index: HashMap<&str, usize> = HashMap::new();
    let mut changed = false;

    for segment in query.split('&') {
        let key = segment.split('=').next().unwrap_or(segment);
        if ARRAY_WHITELIST.contains(&key) {
            kept.push(segment);
            continue;
        }
        match last_index.get(key) {
            Some(&i) => {
                kept[i] = segment;
                changed = true;
            }
            None => {
                last_index.insert(key, kept.len());
                kept.push(segment);
            }
        }
    }

    changed.then(|| kept.join("&"))
}
