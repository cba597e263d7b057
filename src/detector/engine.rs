use super::{Detector, LivePage};
use crate::model::{Finding, PageRecord};
use futures::future::join_all;

/// Runs every enabled detector against a page
pub struct DetectorEngine {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorEngine {
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Runs all detectors concurrently and concatenates their findings
    ///
    /// Findings come back in detector order. A failing detector is logged
    /// and contributes nothing; the others are unaffected.
    pub async fn run_all(&self, page: &PageRecord, live: Option<&dyn LivePage>) -> Vec<Finding> {
        let runs = self.detectors.iter().map(|detector| async move {
            (detector.name(), detector.detect(page, live).await)
        });

        let mut findings = Vec::new();
        for (name, result) in join_all(runs).await {
            match result {
                Ok(mut found) => {
                    for finding in &mut found {
                        finding.detector = name.to_string();
                    }
                    tracing::debug!("{} reported {} findings on {}", name, found.len(), page.url);
                    findings.extend(found);
                }
                Err(e) => {
                    tracing::error!("Detector {} failed on {}: {}", name, page.url, e);
                }
            }
        }
        findings
    }
}

impl std::fmt::Debug for DetectorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorEngine")
            .field("detectors", &self.detector_names())
            .finish()
    }
}
