//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: the session lifecycle (`Idle → Seeding → Running → Draining → Done`)
//! - `PageOutcome`: the result of processing one frontier item

mod outcome;
mod phase;

// Re-export main types
pub use outcome::PageOutcome;
pub use phase::CrawlPhase;
