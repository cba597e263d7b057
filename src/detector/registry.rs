use super::builtin::{
    ApiErrors, BrokenContent, BrokenLinks, CoreWebVitals, Crawlability, DeadEndPages,
    FormValidation, HeadingStructure, InsecureHeaders, JavaScriptErrors, MetaTags,
    MissingAltText, MixedContent, SensitiveDataExposure, StructuredData, UrlStructure,
};
use super::{Detector, DetectorEngine};
use crate::config::DetectorsConfig;
use crate::ConfigError;
use std::collections::HashSet;

/// Builds one detector instance from the detector settings
pub type Constructor = Box<dyn Fn(&DetectorsConfig) -> Box<dyn Detector> + Send + Sync>;

/// Identifiers of the built-in detectors, in registration order
pub const BUILTIN_IDS: [&str; 16] = [
    "javascript_errors",
    "api_errors",
    "form_validation",
    "broken_links",
    "dead_links",
    "missing_alt_text",
    "heading_structure",
    "meta_tags",
    "url_structure",
    "crawlability",
    "structured_data",
    "mixed_content",
    "insecure_headers",
    "sensitive_data_exposure",
    "core_web_vitals",
    "broken_content",
];

/// Explicit map from detector identifier to constructor
///
/// The active detector set is exactly what was registered here; nothing is
/// discovered at runtime.
pub struct DetectorRegistry {
    entries: Vec<(&'static str, Constructor)>,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// A registry holding every built-in detector
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register("javascript_errors", |_| Box::new(JavaScriptErrors))
            .register("api_errors", |_| Box::new(ApiErrors))
            .register("form_validation", |_| Box::new(FormValidation))
            .register("broken_links", |config| Box::new(BrokenLinks::new(config)))
            .register("dead_links", |_| Box::new(DeadEndPages))
            .register("missing_alt_text", |_| Box::new(MissingAltText))
            .register("heading_structure", |_| Box::new(HeadingStructure))
            .register("meta_tags", |_| Box::new(MetaTags))
            .register("url_structure", |_| Box::new(UrlStructure))
            .register("crawlability", |_| Box::new(Crawlability))
            .register("structured_data", |_| Box::new(StructuredData))
            .register("mixed_content", |_| Box::new(MixedContent))
            .register("insecure_headers", |_| Box::new(InsecureHeaders))
            .register("sensitive_data_exposure", |_| Box::new(SensitiveDataExposure))
            .register("core_web_vitals", |_| Box::new(CoreWebVitals))
            .register("broken_content", |_| Box::new(BrokenContent));
        registry
    }

    /// Identifiers [`DetectorRegistry::with_builtin`] registers
    pub fn builtin_ids() -> &'static [&'static str] {
        &BUILTIN_IDS
    }

    /// Registers a constructor, replacing any previous one under `id`
    pub fn register<F>(&mut self, id: &'static str, constructor: F) -> &mut Self
    where
        F: Fn(&DetectorsConfig) -> Box<dyn Detector> + Send + Sync + 'static,
    {
        let constructor: Constructor = Box::new(constructor);
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = constructor,
            None => self.entries.push((id, constructor)),
        }
        self
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|(existing, _)| *existing == id)
    }

    /// Builds an engine with the detectors selected by `config`
    ///
    /// `enabled` (all when absent) minus `disabled`, in registration order.
    /// Unknown identifiers in either list are an error.
    pub fn build(&self, config: &DetectorsConfig) -> Result<DetectorEngine, ConfigError> {
        for id in config.enabled.iter().flatten().chain(&config.disabled) {
            if !self.contains(id) {
                return Err(ConfigError::UnknownDetector(id.clone()));
            }
        }

        let enabled: Option<HashSet<&str>> = config
            .enabled
            .as_ref()
            .map(|ids| ids.iter().map(String::as_str).collect());
        let disabled: HashSet<&str> = config.disabled.iter().map(String::as_str).collect();

        let detectors = self
            .entries
            .iter()
            .filter(|(id, _)| enabled.as_ref().map_or(true, |set| set.contains(id)))
            .filter(|(id, _)| !disabled.contains(id))
            .map(|(_, constructor)| constructor(config))
            .collect();

        Ok(DetectorEngine::new(detectors))
    }
}
