//! Form body classification and parsing
//!
//! The dispatcher needs two things from a request body: a cheap answer to
//! "is this a form submission?" from the `Content-Type` header, and the
//! submitted fields as a flat name/value list. URL-encoded bodies parse via
//! `serde_urlencoded`; `multipart/form-data` bodies parse via `multer`
//! (text fields only; file parts are skipped, this layer transports
//! action arguments, not uploads).

use axum::http::{header::CONTENT_TYPE, HeaderMap};
use bytes::Bytes;
use mime::Mime;
use thiserror::Error;

/// Errors produced while parsing a submitted form body.
#[derive(Debug, Error)]
pub enum FormError {
    /// The body was not valid for its declared content type.
    #[error("malformed form body: {0}")]
    Malformed(String),

    /// A `multipart/form-data` body carried no usable boundary.
    #[error("multipart body is missing a boundary")]
    MissingBoundary,
}

/// Parsed form fields, in submission order.
///
/// Duplicate field names are preserved; [`FormData::get`] returns the
/// first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    /// Build form data from already-parsed pairs.
    #[must_use]
    pub fn from_pairs(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// First value submitted under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Remove and return the first value submitted under `name`.
    pub fn take(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(field, _)| field == name)?;
        Some(self.entries.remove(index).1)
    }

    /// All `(name, value)` pairs in submission order.
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Whether no fields were submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn content_type(headers: &HeaderMap) -> Option<Mime> {
    headers
        .get(CONTENT_TYPE)?
        .to_str()
        .ok()?
        .parse::<Mime>()
        .ok()
}

/// Whether the request declares a form content type
/// (`application/x-www-form-urlencoded` or `multipart/form-data`).
#[must_use]
pub fn is_form_content_type(headers: &HeaderMap) -> bool {
    content_type(headers).is_some_and(|mime| {
        (mime.type_() == mime::APPLICATION && mime.subtype() == mime::WWW_FORM_URLENCODED)
            || (mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA)
    })
}

/// Whether the request declares a JSON content type.
#[must_use]
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    content_type(headers).is_some_and(|mime| {
        mime.type_() == mime::APPLICATION
            && (mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON))
    })
}

/// Parse a buffered form body according to its declared content type.
///
/// # Errors
///
/// Returns [`FormError`] when the body does not match its declared
/// content type. A non-form content type parses as empty form data.
pub async fn parse_form(headers: &HeaderMap, body: Bytes) -> Result<FormData, FormError> {
    let Some(mime) = content_type(headers) else {
        return Ok(FormData::default());
    };

    if mime.type_() == mime::APPLICATION && mime.subtype() == mime::WWW_FORM_URLENCODED {
        return parse_urlencoded(&body);
    }
    if mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA {
        let boundary = mime
            .get_param(mime::BOUNDARY)
            .ok_or(FormError::MissingBoundary)?
            .to_string();
        return parse_multipart(body, boundary).await;
    }
    Ok(FormData::default())
}

fn parse_urlencoded(body: &[u8]) -> Result<FormData, FormError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|err| FormError::Malformed(err.to_string()))?;
    Ok(FormData::from_pairs(pairs))
}

async fn parse_multipart(body: Bytes, boundary: String) -> Result<FormData, FormError> {
    let stream = futures_util::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut entries = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| FormError::Malformed(err.to_string()))?
    {
        // File parts are not action arguments; skip them.
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|err| FormError::Malformed(err.to_string()))?;
        entries.push((name, value));
    }
    Ok(FormData::from_pairs(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_form_content_type_classification() {
        assert!(is_form_content_type(&headers_with(
            "application/x-www-form-urlencoded"
        )));
        assert!(is_form_content_type(&headers_with(
            "application/x-www-form-urlencoded; charset=utf-8"
        )));
        assert!(is_form_content_type(&headers_with(
            "multipart/form-data; boundary=xyz"
        )));
        assert!(!is_form_content_type(&headers_with("application/json")));
        assert!(!is_form_content_type(&headers_with("text/html")));
        assert!(!is_form_content_type(&HeaderMap::new()));
    }

    #[test]
    fn test_json_content_type_classification() {
        assert!(is_json_content_type(&headers_with("application/json")));
        assert!(is_json_content_type(&headers_with(
            "application/problem+json"
        )));
        assert!(!is_json_content_type(&headers_with("text/json-ish")));
        assert!(!is_json_content_type(&HeaderMap::new()));
    }

    #[tokio::test]
    async fn test_parse_urlencoded_body() {
        let headers = headers_with("application/x-www-form-urlencoded");
        let body = Bytes::from_static(b"__action=submit&name=Ada+Lovelace&tag=a&tag=b");

        let mut form = parse_form(&headers, body).await.unwrap();

        assert_eq!(form.get("name"), Some("Ada Lovelace"));
        assert_eq!(form.take("__action"), Some("submit".to_string()));
        assert_eq!(form.get("__action"), None);
        assert_eq!(form.get("tag"), Some("a"));
        assert_eq!(form.entries().len(), 3);
    }

    #[tokio::test]
    async fn test_parse_multipart_body() {
        let body = Bytes::from_static(
            b"--boundary\r\n\
              Content-Disposition: form-data; name=\"__action\"\r\n\r\n\
              submit\r\n\
              --boundary\r\n\
              Content-Disposition: form-data; name=\"note\"\r\n\r\n\
              hello world\r\n\
              --boundary\r\n\
              Content-Disposition: form-data; name=\"upload\"; filename=\"f.txt\"\r\n\
              Content-Type: text/plain\r\n\r\n\
              file contents\r\n\
              --boundary--\r\n",
        );
        let headers = headers_with("multipart/form-data; boundary=boundary");

        let form = parse_form(&headers, body).await.unwrap();

        assert_eq!(form.get("__action"), Some("submit"));
        assert_eq!(form.get("note"), Some("hello world"));
        // File parts are skipped.
        assert_eq!(form.get("upload"), None);
    }

    #[tokio::test]
    async fn test_multipart_without_boundary_fails() {
        let headers = headers_with("multipart/form-data");
        let result = parse_form(&headers, Bytes::new()).await;

        assert!(matches!(result, Err(FormError::MissingBoundary)));
    }

    #[tokio::test]
    async fn test_non_form_content_type_parses_empty() {
        let headers = headers_with("text/plain");
        let form = parse_form(&headers, Bytes::from_static(b"whatever")).await.unwrap();

        assert!(form.is_empty());
    }
}
