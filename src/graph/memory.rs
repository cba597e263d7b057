use super::{
    issue_node_id, page_node_id, EdgeKind, GraphEdge, GraphError, GraphNode, GraphResult,
    GraphStore, GraphView, NodeKind,
};
use crate::model::{Category, Finding, PageRecord, Severity};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
struct PageNode {
    title: Option<String>,
    http_status: Option<u16>,
    job_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IssueKey {
    detector: String,
    category: Category,
    title: String,
}

#[derive(Debug, Clone)]
struct IssueNode {
    severity: Severity,
    description: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Keyed by [`page_node_id`]
    pages: HashMap<String, PageNode>,
    /// Page keys in first-seen order
    page_order: Vec<String>,
    links: HashMap<String, Vec<String>>,
    issues: HashMap<IssueKey, IssueNode>,
    has_issue: HashMap<String, Vec<IssueKey>>,
}

impl Inner {
    fn merge_page(&mut self, url: &str) -> &mut PageNode {
        if !self.pages.contains_key(url) {
            self.page_order.push(url.to_string());
        }
        self.pages.entry(url.to_string()).or_default()
    }

    fn page_node(&self, url: &str) -> GraphNode {
        let page = self.pages.get(url);
        GraphNode {
            id: url.to_string(),
            label: self.label(url),
            kind: NodeKind::Page,
            http_status: page.and_then(|p| p.http_status),
            severity: None,
            description: None,
        }
    }

    fn label(&self, url: &str) -> String {
        self.pages
            .get(url)
            .and_then(|p| p.title.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| url.to_string())
    }
}

/// In-process graph backend
///
/// Holds the whole graph behind a mutex; suitable for single-process scans
/// and tests.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    inner: Mutex<Inner>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn page_count(&self) -> usize {
        self.lock().pages.len()
    }

    pub fn issue_count(&self) -> usize {
        self.lock().issues.len()
    }

    pub fn link_count(&self) -> usize {
        self.lock().links.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn upsert_page(
        &self,
        job_id: &str,
        page: &PageRecord,
        links: &[String],
    ) -> GraphResult<()> {
        let mut inner = self.lock();
        let key = page_node_id(&page.url);

        let node = inner.merge_page(&key);
        node.title = Some(page.title.clone());
        node.http_status = Some(page.http_status);
        node.job_id = Some(job_id.to_string());

        let mut targets: Vec<String> = Vec::with_capacity(links.len());
        for link in links {
            let target = page_node_id(link);
            inner.merge_page(&target);
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        inner.links.insert(key, targets);
        Ok(())
    }

    async fn upsert_issues(&self, page_url: &str, findings: &[Finding]) -> GraphResult<()> {
        let mut inner = self.lock();
        let page_key = page_node_id(page_url);
        if !inner.pages.contains_key(&page_key) {
            return Err(GraphError::UnknownPage(page_url.to_string()));
        }

        for finding in findings.iter().filter(|f| !f.is_false_positive) {
            let key = IssueKey {
                detector: finding.detector.clone(),
                category: finding.category,
                title: finding.title.clone(),
            };
            inner.issues.insert(
                key.clone(),
                IssueNode {
                    severity: finding.severity,
                    description: finding.description.clone(),
                },
            );
            let attached = inner.has_issue.entry(page_key.clone()).or_default();
            if !attached.contains(&key) {
                attached.push(key);
            }
        }
        Ok(())
    }

    async fn get_graph(&self, job_id: &str, limit: usize) -> GraphResult<GraphView> {
        let inner = self.lock();
        let mut view = GraphView::default();
        let mut node_ids = HashSet::new();
        let mut edge_ids = HashSet::new();
        let mut rows = 0;

        let job_pages = inner
            .page_order
            .iter()
            .filter(|url| {
                inner.pages.get(*url).and_then(|p| p.job_id.as_deref()) == Some(job_id)
            });

        'pages: for url in job_pages {
            let targets: Vec<Option<&String>> = match inner.links.get(url) {
                Some(targets) if !targets.is_empty() => targets.iter().map(Some).collect(),
                _ => vec![None],
            };
            let issues: Vec<Option<&IssueKey>> = match inner.has_issue.get(url) {
                Some(keys) if !keys.is_empty() => keys.iter().map(Some).collect(),
                _ => vec![None],
            };

            for target in &targets {
                for issue in &issues {
                    if rows >= limit {
                        break 'pages;
                    }
                    rows += 1;

                    if node_ids.insert(url.clone()) {
                        view.nodes.push(inner.page_node(url));
                    }

                    if let Some(target) = target {
                        if node_ids.insert((*target).clone()) {
                            view.nodes.push(inner.page_node(target));
                        }
                        let edge_id = format!("{}-links-{}", url, target);
                        if edge_ids.insert(edge_id.clone()) {
                            view.edges.push(GraphEdge {
                                id: edge_id,
                                source: url.clone(),
                                target: (*target).clone(),
                                kind: EdgeKind::LinksTo,
                            });
                        }
                    }

                    if let Some(key) = issue {
                        let issue_id = issue_node_id(&key.detector, key.category, &key.title);
                        if node_ids.insert(issue_id.clone()) {
                            let node = inner.issues.get(*key);
                            view.nodes.push(GraphNode {
                                id: issue_id.clone(),
                                label: key.title.clone(),
                                kind: NodeKind::Issue,
                                http_status: None,
                                severity: node.map(|i| i.severity),
                                description: node.and_then(|i| i.description.clone()),
                            });
                        }
                        let edge_id = format!("{}-has_issue-{}", url, issue_id);
                        if edge_ids.insert(edge_id.clone()) {
                            view.edges.push(GraphEdge {
                                id: edge_id,
                                source: url.clone(),
                                target: issue_id,
                                kind: EdgeKind::HasIssue,
                            });
                        }
                    }
                }
            }
        }

        Ok(view)
    }
}
