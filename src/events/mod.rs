//! Crawl events and progress publishing
//!
//! - `CrawlEvent`: what the scheduler emits, in order, for one job
//! - `ProgressMessage`: the JSON payload observers receive
//! - `EventBus`: one broadcast channel per job between the pipeline and
//!   any number of subscribers

mod bus;
mod crawl_event;
mod progress;

pub use bus::{EventBus, DEFAULT_CAPACITY};
pub use crawl_event::{CrawlEvent, CrawlEventKind, CrawlSummary, PageOutcome};
pub use progress::{EventDetail, Level, ProgressMessage};
