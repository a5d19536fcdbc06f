//! Output Sink
//!
//! The write side of an HTTP response: status, headers, incremental writes and
//! a finalize step.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{response::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::Result;

// == Response Sink ==
/// Destination of a response as it is produced.
#[async_trait]
pub trait ResponseSink: Send {
    /// Current status code.
    fn status(&self) -> StatusCode;

    fn set_status(&mut self, status: StatusCode);

    /// Current response headers.
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends one body chunk.
    async fn write(&mut self, chunk: Bytes) -> Result<()>;

    /// Sends an optional last chunk and completes the response.
    async fn finalize(&mut self, chunk: Option<Bytes>) -> Result<()>;
}

// == Buffered Response ==
/// Sink that assembles the response in memory and hands it back to the
/// router once finalized.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    finalized: bool,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the status and headers of an already produced response.
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            status: parts.status,
            headers: parts.headers.clone(),
            ..Self::default()
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Body bytes written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[async_trait]
impl ResponseSink for BufferedResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        if self.finalized {
            debug!("Write after finalize ignored ({} bytes)", chunk.len());
            return Ok(());
        }
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    async fn finalize(&mut self, chunk: Option<Bytes>) -> Result<()> {
        if self.finalized {
            debug!("Response already finalized");
            return Ok(());
        }
        if let Some(chunk) = chunk {
            self.body.extend_from_slice(&chunk);
        }
        self.finalized = true;
        Ok(())
    }
}

impl IntoResponse for BufferedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
