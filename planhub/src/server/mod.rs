//! HTTP surface
//!
//! Thin axum layer over the aggregator, prompt compiler, and run engine.
//! Every response uses the `{success, data?, error?}` envelope; CORS
//! preflight is handled by the cors layer.

mod routes;

pub use routes::create_router;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::prompts::PromptCompiler;
use crate::runtime::RunEngine;
use crate::signals::{AggregatorMetrics, SignalAggregator};

/// Shared application state, constructed once at startup
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<SignalAggregator>,
    pub compiler: Arc<PromptCompiler>,
    pub engine: Arc<RunEngine>,
    pub metrics: Arc<AggregatorMetrics>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(aggregator: Arc<SignalAggregator>, compiler: Arc<PromptCompiler>, engine: Arc<RunEngine>) -> Self {
        let metrics = aggregator.metrics();
        Self {
            aggregator,
            compiler,
            engine,
            metrics,
            start_time: Instant::now(),
        }
    }
}

/// JSON response wrapper
#[derive(Debug, Serialize)]
pub struct JsonResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }

    /// Failure that still carries a (partial) body for observability
    pub fn err_with_data(msg: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(msg.into()),
        }
    }
}
