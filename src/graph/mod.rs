//! Link and issue topology
//!
//! Pages, the links between them, and the issues found on them form a graph
//! that is written incrementally while a scan runs. Writes merge by key, so
//! replaying the same page or findings leaves the graph unchanged. Page keys
//! are normalized URLs, so `/docs` and `/docs/` are one node.

mod memory;

pub use memory::MemoryGraph;

use crate::model::{Category, Finding, PageRecord, Severity};
use crate::url::normalize_url;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors from a graph backend
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Page not in graph: {0}")]
    UnknownPage(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Graph ingestion port
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Merges a page node keyed by URL and sets its `LINKS_TO` edges
    ///
    /// The page's outbound edges become exactly `links`, deduplicated after
    /// normalization. Link targets that are not yet pages are created as
    /// bare page nodes.
    async fn upsert_page(&self, job_id: &str, page: &PageRecord, links: &[String])
        -> GraphResult<()>;

    /// Merges issue nodes keyed by `(detector, category, title)` and links
    /// them to the page
    ///
    /// False positives are skipped. Severity and description are taken from
    /// the latest write.
    async fn upsert_issues(&self, page_url: &str, findings: &[Finding]) -> GraphResult<()>;

    /// Projects the job's part of the graph for display
    ///
    /// `limit` bounds the number of (page, link, issue) rows read, not the
    /// number of pages: a page with many links and issues uses up many rows.
    async fn get_graph(&self, job_id: &str, limit: usize) -> GraphResult<GraphView>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Page,
    Issue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    LinksTo,
    HasIssue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

/// Node and edge lists, each element unique by id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphView {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_of(&self, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }
}

/// Identifier of a page node in a [`GraphView`]
///
/// The normalized form of `url`, or `url` itself when it does not normalize.
pub fn page_node_id(url: &str) -> String {
    normalize_url(url).unwrap_or_else(|_| url.to_string())
}

/// Identifier of an issue node in a [`GraphView`]
///
/// Carries the whole merge key, so issues that share a detector and title
/// but not a category stay apart.
pub fn issue_node_id(detector: &str, category: Category, title: &str) -> String {
    format!("issue-{}-{}-{}", detector, category.as_str(), title)
}
