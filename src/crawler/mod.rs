//! Crawler module for discovering and rendering pages
//!
//! This module contains the core crawling logic, including:
//! - The URL frontier and its admission rules
//! - Breadth-first, concurrency-bounded scheduling
//! - The renderer port and its scoped render slots
//! - A plain HTTP renderer and HTML extraction

mod frontier;
mod http_renderer;
mod parser;
mod renderer;
mod scheduler;

pub use frontier::{Frontier, Skip};
pub use http_renderer::{build_http_client, HttpRenderer};
pub use parser::{parse_html, resolve_link, visible_text, ParsedPage};
pub use renderer::{
    NavigationError, NavigationOptions, RenderSlot, RenderSlots, RenderedPage, Renderer, Viewport,
};
pub use scheduler::{start, CrawlStream, Scheduler};
