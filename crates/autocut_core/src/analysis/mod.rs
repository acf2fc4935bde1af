//! Content analysis: service boundary, normalization, probing, caching.

mod adapter;
mod cache;
mod probe;
mod service;

pub use adapter::{normalize, BatchAnalysis, ContentAnalysisAdapter, RetryPolicy};
pub use cache::AnalysisCache;
pub use probe::{ClipProber, FfprobeProber, ProbeError, ProbeResult};
pub use service::{
    AnalysisError, AnalysisRequest, AnalysisServiceResult, CommandAnalyzer, ContentAnalyzer,
};
