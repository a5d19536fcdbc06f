//! Body Interceptor
//!
//! Decorates a [`ResponseSink`] so every byte written is also captured and
//! handed to a hook right before the real finalize.

use std::borrow::Cow;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use bytes::{Bytes, BytesMut};

use super::ResponseSink;
use crate::error::Result;

// == Captured Body ==
/// Every byte written to the sink, final chunk included, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedBody(Bytes);

impl CapturedBody {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The body as text, or `None` when it is not valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// The body as text with invalid sequences replaced.
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&'static str> for CapturedBody {
    fn from(text: &'static str) -> Self {
        Self(Bytes::from_static(text.as_bytes()))
    }
}

// == Finalize Hook ==
/// Work to run with the captured body before the response is finalized.
///
/// The hook may still change status or headers through `sink`.
#[async_trait]
pub trait FinalizeHook: Send {
    async fn on_finalize(
        self: Box<Self>,
        body: CapturedBody,
        sink: &mut dyn ResponseSink,
    ) -> Result<()>;
}

// == Body Interceptor ==
/// Capturing decorator around an inner sink.
///
/// Writes reach the inner sink unchanged and in order. On the first finalize
/// the captured body (last chunk included) is decoded as UTF-8 and given to
/// the hook; the inner finalize runs after the hook completes, whether or not
/// it failed, and the hook's error is returned afterwards. Later finalize
/// calls are forwarded without running the hook again.
pub struct BodyInterceptor<S> {
    inner: S,
    chunks: Vec<Bytes>,
    hook: Option<Box<dyn FinalizeHook>>,
}

impl<S: ResponseSink> BodyInterceptor<S> {
    pub fn new(inner: S, hook: impl FinalizeHook + 'static) -> Self {
        Self {
            inner,
            chunks: Vec::new(),
            hook: Some(Box::new(hook)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn captured_body(&mut self) -> CapturedBody {
        let chunks = std::mem::take(&mut self.chunks);
        let mut bytes = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in chunks {
            bytes.extend_from_slice(&chunk);
        }
        CapturedBody(bytes.freeze())
    }
}

#[async_trait]
impl<S: ResponseSink> ResponseSink for BodyInterceptor<S> {
    fn status(&self) -> StatusCode {
        self.inner.status()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.inner.set_status(status);
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        if self.hook.is_some() {
            self.chunks.push(chunk.clone());
        }
        self.inner.write(chunk).await
    }

    async fn finalize(&mut self, chunk: Option<Bytes>) -> Result<()> {
        let Some(hook) = self.hook.take() else {
            return self.inner.finalize(chunk).await;
        };

        if let Some(last) = &chunk {
            self.chunks.push(last.clone());
        }
        let body = self.captured_body();

        let hooked = hook.on_finalize(body, &mut self.inner).await;
        self.inner.finalize(chunk).await?;
        hooked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::intercept::BufferedResponse;
    use axum::http::HeaderValue;
    use std::sync::{Arc, Mutex};

    /// Hook recording every body it receives.
    #[derive(Clone, Default)]
    struct Recorder {
        bodies: Arc<Mutex<Vec<CapturedBody>>>,
    }

    #[async_trait]
    impl FinalizeHook for Recorder {
        async fn on_finalize(
            self: Box<Self>,
            body: CapturedBody,
            _sink: &mut dyn ResponseSink,
        ) -> Result<()> {
            self.bodies.lock().unwrap().push(body);
            Ok(())
        }
    }

    /// Hook that tags the response and checks it has not been finalized yet.
    struct Tagger;

    #[async_trait]
    impl FinalizeHook for Tagger {
        async fn on_finalize(
            self: Box<Self>,
            body: CapturedBody,
            sink: &mut dyn ResponseSink,
        ) -> Result<()> {
            tokio::task::yield_now().await;
            let value = HeaderValue::from_str(&body.as_bytes().len().to_string()).unwrap();
            sink.headers_mut().insert("x-body-len", value);
            sink.set_status(StatusCode::ACCEPTED);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl FinalizeHook for Failing {
        async fn on_finalize(
            self: Box<Self>,
            _body: CapturedBody,
            _sink: &mut dyn ResponseSink,
        ) -> Result<()> {
            Err(CacheError::backend("set", "The client is closed"))
        }
    }

    #[tokio::test]
    async fn test_captures_body_from_finalize() {
        let recorder = Recorder::default();
        let mut sink = BodyInterceptor::new(BufferedResponse::new(), recorder.clone());

        sink.finalize(Some(Bytes::from("lorem dolor"))).await.unwrap();

        assert_eq!(*recorder.bodies.lock().unwrap(), vec![CapturedBody::from("lorem dolor")]);
        assert_eq!(sink.inner().body(), b"lorem dolor");
    }

    #[tokio::test]
    async fn test_captures_body_from_writes() {
        let recorder = Recorder::default();
        let mut sink = BodyInterceptor::new(BufferedResponse::new(), recorder.clone());

        sink.write(Bytes::from("Lorem ipsum dolor sit amet")).await.unwrap();
        sink.write(Bytes::from("consectetur adipiscing elit")).await.unwrap();
        sink.finalize(None).await.unwrap();

        let expected = "Lorem ipsum dolor sit ametconsectetur adipiscing elit";
        assert_eq!(*recorder.bodies.lock().unwrap(), vec![CapturedBody::from(expected)]);
        assert_eq!(sink.inner().body(), expected.as_bytes());
    }

    #[tokio::test]
    async fn test_hook_runs_before_inner_finalize() {
        let mut sink = BodyInterceptor::new(BufferedResponse::new(), Tagger);

        sink.write(Bytes::from("abc")).await.unwrap();
        sink.finalize(Some(Bytes::from("de"))).await.unwrap();

        let inner = sink.into_inner();
        assert!(inner.is_finalized());
        assert_eq!(inner.status(), StatusCode::ACCEPTED);
        assert_eq!(inner.headers()["x-body-len"], "5");
    }

    #[tokio::test]
    async fn test_second_finalize_does_not_recapture() {
        let recorder = Recorder::default();
        let mut sink = BodyInterceptor::new(BufferedResponse::new(), recorder.clone());

        sink.finalize(Some(Bytes::from("first"))).await.unwrap();
        sink.finalize(Some(Bytes::from("second"))).await.unwrap();

        assert_eq!(recorder.bodies.lock().unwrap().len(), 1);
        assert_eq!(sink.inner().body(), b"first");
    }

    #[tokio::test]
    async fn test_hook_error_still_finalizes() {
        let mut sink = BodyInterceptor::new(BufferedResponse::new(), Failing);

        let result = sink.finalize(Some(Bytes::from("payload"))).await;

        assert!(matches!(result, Err(CacheError::Backend { .. })));
        assert!(sink.inner().is_finalized());
        assert_eq!(sink.inner().body(), b"payload");
    }

    #[tokio::test]
    async fn test_interceptors_compose() {
        let outer_rec = Recorder::default();
        let inner_rec = Recorder::default();
        let inner = BodyInterceptor::new(BufferedResponse::new(), inner_rec.clone());
        let mut sink = BodyInterceptor::new(inner, outer_rec.clone());

        sink.write(Bytes::from("a")).await.unwrap();
        sink.finalize(Some(Bytes::from("b"))).await.unwrap();

        assert_eq!(*outer_rec.bodies.lock().unwrap(), vec![CapturedBody::from("ab")]);
        assert_eq!(*inner_rec.bodies.lock().unwrap(), vec![CapturedBody::from("ab")]);
    }

    #[tokio::test]
    async fn test_binary_body_captured_byte_for_byte() {
        let recorder = Recorder::default();
        let mut sink = BodyInterceptor::new(BufferedResponse::new(), recorder.clone());

        sink.write(Bytes::from_static(b"\xff")).await.unwrap();
        sink.finalize(Some(Bytes::from_static(b"\x01"))).await.unwrap();

        let bodies = recorder.bodies.lock().unwrap();
        assert_eq!(bodies[0].as_bytes(), b"\xff\x01");
        assert_eq!(bodies[0].as_text(), None);
        assert_eq!(bodies[0].text_lossy(), "\u{fffd}\u{1}");
    }
}
