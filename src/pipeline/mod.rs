//! Inbound message pipeline.
//!
//! Every event from the channel flows through:
//! 1. `MessageRouter::route()` - self-sent commands vs. messages from others
//! 2. `filter::evaluate()` - group lists and the direct-message switch
//! 3. `RelevanceOrchestrator::analyze()` - LLM relevance verdict
//! 4. Notification to the notification chat

pub mod filter;
pub mod router;
pub mod types;

pub use router::{MessageRouter, RouteOutcome, SkipReason};
