//! Query side of Scout: result cache, intent boost plans, heuristic reranking and multi-hop
//! tracing on top of an [`scout_engine::Engine`].

mod cache;
mod error;
mod intent;
mod pipeline;
mod rerank;
pub mod trace;

pub use cache::{CacheKey, ResultCache, DEFAULT_CACHE_CAPACITY};
pub use error::{Result, SearchError};
pub use intent::{
    infer_intent, BoostPlan, BoostRule, BoostTarget, ConfigKind, SearchIntent, DEFAULT_BOOST,
};
pub use pipeline::SearchPipeline;
pub use rerank::{RankedHit, RerankEngine, RerankWeights};
pub use trace::{
    classify, route_controller_marker, summarize, EntryType, TraceDepth, TraceEngine, TraceHit,
    TraceResult, DEFAULT_STAGE_LIMIT,
};
