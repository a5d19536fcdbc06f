//! Intercept Module
//!
//! Output sink abstraction and the capturing decorator used to observe a
//! response body as it is produced.

mod interceptor;
mod sink;

pub use interceptor::{BodyInterceptor, CapturedBody, FinalizeHook};
pub use sink::{BufferedResponse, ResponseSink};
