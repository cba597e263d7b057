//! Data model shared by the crawler, detectors, scoring, and ingestion

mod finding;
mod page;

pub use finding::{Category, Finding, Severity};
pub use page::{
    ConsoleEntry, ConsoleLevel, FormDescriptor, FormInput, FrontierEntry, Heading, NetworkEntry,
    PageRecord, PageStructure, PerformanceMetrics, ResourceType,
};
