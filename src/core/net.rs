use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use url::Url;

use crate::core::{ApiError, RequestOptions};

/// Validates the option headers once, so every retry attempt can reuse them.
pub(crate) fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ApiError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Builds one attempt of a logical request.
pub(crate) fn build(
    http: &reqwest::Client,
    url: &Url,
    options: &RequestOptions,
    headers: &HeaderMap,
) -> reqwest::RequestBuilder {
    let req = http
        .request(options.method.to_reqwest(), url.clone())
        .headers(headers.clone());
    match &options.body {
        Some(body) => req.body(body.clone()),
        None => req,
    }
}

/// Read the response body as text.
pub(crate) async fn get_text(resp: reqwest::Response) -> Result<String, ApiError> {
    Ok(resp.text().await?)
}
