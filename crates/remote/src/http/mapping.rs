use reqwest::{Response, Url};
use serde::de::DeserializeOwned;

use crate::api::RemoteError;

const BODY_EXCERPT_LEN: usize = 200;

/// Append percent-encoded path segments to `base`.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    // `RemoteConfig` only accepts base URLs, so this cannot fail.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_owned(),
    }
}

/// Check the status and decode a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let status = response.status();
    let body = response.text().await?;

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound(excerpt(&body)));
    }
    if !status.is_success() {
        return Err(RemoteError::HttpStatus {
            status,
            body: excerpt(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
}
