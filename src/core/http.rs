use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = concat!("VitaLite-Launcher/", env!("CARGO_PKG_VERSION"));

/// Bound on establishing a connection to any remote endpoint.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on a metadata request, and on the gap between two chunks of a download.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    // Identity encoding keeps Content-Length equal to the bytes we stream,
    // which the download progress depends on.
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
}
