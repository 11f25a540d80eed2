use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::error::FetchError;

const REQUEST_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let timeout = std::env::var("MATCHBOARD_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(REQUEST_TIMEOUT_SECS)
            .clamp(1, 120);
        Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .context("failed to build http client")
    })
}

/// GET `url` and return the body, mapping transport and status failures onto
/// the fetch taxonomy. `what` names the entity for `NotFound`.
pub fn fetch_text(url: &str, what: &str) -> Result<String, FetchError> {
    let client = http_client().map_err(|err| FetchError::Network(format!("{err:#}")))?;
    let resp = client
        .get(url)
        .header(USER_AGENT, concat!("matchboard/", env!("CARGO_PKG_VERSION")))
        .header(ACCEPT, "application/json")
        .send()
        .map_err(|err| FetchError::Network(err.to_string()))?;

    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound(what.to_string()));
    }
    let body = resp
        .text()
        .map_err(|err| FetchError::Network(format!("failed reading body: {err}")))?;
    if !status.is_success() {
        return Err(FetchError::Network(format!("http {status}: {}", truncate(&body, 120))));
    }
    Ok(body)
}

fn truncate(raw: &str, max: usize) -> &str {
    match raw.char_indices().nth(max) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}
