//! Performance detectors

use crate::detector::{Detector, DetectorError, LivePage};
use crate::model::{Category, Finding, PageRecord, Severity};
use async_trait::async_trait;

/// Poor thresholds, in milliseconds
const POOR_LCP_MS: f64 = 4000.0;
const POOR_FID_MS: f64 = 300.0;
const SLOW_TTFB_MS: f64 = 1800.0;

/// Core Web Vitals and server response time
///
/// Metrics the renderer could not measure are skipped.
pub struct CoreWebVitals;

#[async_trait]
impl Detector for CoreWebVitals {
    fn name(&self) -> &'static str {
        "core_web_vitals"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    async fn detect(
        &self,
        page: &PageRecord,
        _live: Option<&dyn LivePage>,
    ) -> Result<Vec<Finding>, DetectorError> {
        let metrics = &page.performance;
        let checks = [
            (
                metrics.lcp_ms,
                POOR_LCP_MS,
                "poor_lcp",
                Severity::High,
                "Poor LCP (Largest Contentful Paint)",
                "lcp",
            ),
            (
                metrics.fid_ms,
                POOR_FID_MS,
                "poor_fid",
                Severity::High,
                "Poor FID (First Input Delay)",
                "fid",
            ),
            (
                metrics.ttfb_ms,
                SLOW_TTFB_MS,
                "slow_ttfb",
                Severity::Medium,
                "Slow Time to First Byte",
                "ttfb",
            ),
        ];

        let findings = checks
            .into_iter()
            .filter_map(|(value, limit, subcategory, severity, title, key)| {
                let value = value.filter(|v| *v > limit)?;
                Some(
                    self.finding(subcategory, severity, title)
                        .with_description(format!(
                            "{} is {:.0}ms (poor above {:.0}ms)",
                            key.to_uppercase(),
                            value,
                            limit
                        ))
                        .with_evidence(key, value),
                )
            })
            .collect();

        Ok(findings)
    }
}
