//! Evaluation of the decision endpoint.
//!
//! One exchange is a `POST` of the current input as JSON; the endpoint
//! answers `200 OK` with the computed output as JSON.

use http::header::{ACCEPT, CONTENT_TYPE};
use http::HeaderValue;
use serde_json::Value;
use url::Url;

use super::{FetchError, HttpClient, HttpRequest, HttpResponse};

const APPLICATION_JSON: &str = "application/json";

/// Builds the evaluation request for `input`.
///
/// # Errors
///
/// Returns [`FetchError::Encode`] if the input cannot be serialized.
pub fn build_request(endpoint: &Url, input: &Value) -> Result<HttpRequest, FetchError> {
    let body = serde_json::to_vec(input).map_err(FetchError::Encode)?;

    Ok(HttpRequest::post(endpoint.clone())
        .with_header(ACCEPT, HeaderValue::from_static(APPLICATION_JSON))
        .with_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))
        .with_body(body))
}

/// Interprets an endpoint response.
///
/// # Errors
///
/// Returns [`FetchError::Status`] for anything but `200 OK` and
/// [`FetchError::Decode`] when the body is not JSON.
pub fn decode_response(response: &HttpResponse) -> Result<Value, FetchError> {
    if !response.is_ok() {
        return Err(FetchError::Status {
            status: response.status,
            body: response.body_text().map(ToString::to_string),
        });
    }

    serde_json::from_slice(&response.body).map_err(FetchError::Decode)
}

/// Sends `input` to `endpoint` and returns the decoded output.
///
/// # Errors
///
/// Returns a [`FetchError`] on encode, transport, status or decode failure.
pub async fn evaluate<H>(client: &H, endpoint: &Url, input: &Value) -> Result<Value, FetchError>
where
    H: HttpClient + ?Sized,
{
    let request = build_request(endpoint, input)?;
    let response = client.request(request).await?;
    decode_response(&response)
}
