//! Trace/span correlation for distributed tracing

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trace correlation attached to a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// 128-bit trace id
    pub trace_id: u128,

    /// 64-bit span id
    pub span_id: u64,

    /// Whether the trace is sampled
    pub sampled: bool,
}

impl TraceContext {
    pub fn new(trace_id: u128, span_id: u64) -> Self {
        Self {
            trace_id,
            span_id,
            sampled: false,
        }
    }

    pub fn with_sampled(mut self, sampled: bool) -> Self {
        self.sampled = sampled;
        self
    }

    /// Build from W3C trace flags (bit 0 = sampled)
    pub fn from_flags(trace_id: u128, span_id: u64, flags: u8) -> Self {
        Self::new(trace_id, span_id).with_sampled(flags & 0x01 == 0x01)
    }

    /// All-zero ids are invalid per W3C trace context
    pub fn is_valid(&self) -> bool {
        self.trace_id != 0 && self.span_id != 0
    }

    /// Trace id as 32 lowercase hex digits
    pub fn trace_id_hex(&self) -> String {
        format!("{:032x}", self.trace_id)
    }

    /// Span id as 16 lowercase hex digits
    pub fn span_id_hex(&self) -> String {
        format!("{:016x}", self.span_id)
    }
}

/// Source of ambient trace correlation, queried on the logging thread
///
/// Implementations bridge to whatever tracing system is in use. Returning
/// `None` means "no active span"; it is never an error.
pub trait TraceContextProvider: Send + Sync {
    fn current(&self) -> Option<TraceContext>;
}

impl<F> TraceContextProvider for F
where
    F: Fn() -> Option<TraceContext> + Send + Sync,
{
    fn current(&self) -> Option<TraceContext> {
        self()
    }
}

pub type SharedTraceProvider = Arc<dyn TraceContextProvider>;

/// Query a provider, discarding invalid contexts and provider panics
pub(crate) fn query_provider(provider: &dyn TraceContextProvider) -> Option<TraceContext> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| provider.current()))
        .ok()
        .flatten()
        .filter(TraceContext::is_valid)
}
