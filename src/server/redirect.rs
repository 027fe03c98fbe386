//! Plain-HTTP helper that bounces browsers over to the TLS listener.

use axum::{
    extract::State,
    http::{header, HeaderMap, Uri},
    response::Redirect,
    Router,
};

/// A router whose only job is to redirect every request to `https://`,
/// preserving host, path and query. The port is dropped from the target
/// when the TLS listener sits on 443.
pub fn redirect_router(https_port: u16) -> Router {
    Router::new()
        .fallback(redirect_to_https)
        .with_state(https_port)
}

async fn redirect_to_https(
    State(https_port): State<u16>,
    headers: HeaderMap,
    uri: Uri,
) -> Redirect {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|host| host.split(':').next())
        .unwrap_or("localhost");

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let target = if https_port == 443 {
        format!("https://{}{}", host, path_and_query)
    } else {
        format!("https://{}:{}{}", host, https_port, path_and_query)
    };

    Redirect::permanent(&target)
}
