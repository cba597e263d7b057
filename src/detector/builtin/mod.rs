//! Built-in detectors, one file per category family

mod accessibility;
mod content;
mod functional;
mod performance;
mod security;
mod seo;

pub use accessibility::{HeadingStructure, MissingAltText};
pub use content::BrokenContent;
pub use functional::{ApiErrors, BrokenLinks, DeadEndPages, FormValidation, JavaScriptErrors};
pub use performance::CoreWebVitals;
pub use security::{InsecureHeaders, MixedContent, SensitiveDataExposure};
pub use seo::{Crawlability, MetaTags, StructuredData, UrlStructure};
