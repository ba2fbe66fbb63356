//! Response under construction for one request.
//!
//! # Design Decisions
//! - Ending is explicit and happens once; a second `end` is an error
//! - Writes after the end are ignored and logged
//! - A body without a content type is sent as UTF-8 text

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use thiserror::Error;

/// Errors raised by [`ResponseWriter`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("response already ended")]
    AlreadyEnded,
}

/// Status, headers and body a handler composes before ending the response.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    ended: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            ended: false,
        }
    }
}

impl ResponseWriter {
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        if self.ended {
            tracing::warn!(status = %status, "Ignoring status change after response ended");
        } else {
            self.status = status;
        }
        self
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        if self.ended {
            tracing::warn!(header = %name, "Ignoring header after response ended");
        } else {
            self.headers.insert(name, value);
        }
        self
    }

    /// End the response without a body.
    pub fn end(&mut self) -> Result<(), ResponseError> {
        self.end_with(Bytes::new())
    }

    /// End the response with `body`.
    pub fn end_with(&mut self, body: impl Into<Bytes>) -> Result<(), ResponseError> {
        if self.ended {
            return Err(ResponseError::AlreadyEnded);
        }
        self.body = body.into();
        self.ended = true;
        Ok(())
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Discard anything written so far. No-op once ended.
    pub(crate) fn reset(&mut self) {
        if !self.ended {
            *self = Self::default();
        }
    }

    pub(crate) fn into_response(self) -> Response<Body> {
        let mut headers = self.headers;
        if !self.body.is_empty() && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
        }

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_once() {
        let mut writer = ResponseWriter::default();
        assert!(writer.set_status(StatusCode::CREATED).end_with("done").is_ok());
        assert!(writer.is_ended());
        assert_eq!(writer.end(), Err(ResponseError::AlreadyEnded));
    }

    #[test]
    fn test_writes_after_end_are_ignored() {
        let mut writer = ResponseWriter::default();
        writer.set_status(StatusCode::ACCEPTED).end().unwrap();
        writer.set_status(StatusCode::BAD_GATEWAY);
        assert_eq!(writer.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_reset_before_end() {
        let mut writer = ResponseWriter::default();
        writer
            .set_status(StatusCode::IM_A_TEAPOT)
            .insert_header(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        writer.reset();
        assert_eq!(writer.status(), StatusCode::OK);
        assert!(writer.headers().is_empty());
    }

    #[test]
    fn test_text_content_type_only_with_body() {
        let mut writer = ResponseWriter::default();
        writer.end_with("hello").unwrap();
        let response = writer.into_response();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        let mut writer = ResponseWriter::default();
        writer.end().unwrap();
        assert!(writer.into_response().headers().get(header::CONTENT_TYPE).is_none());
    }
}
