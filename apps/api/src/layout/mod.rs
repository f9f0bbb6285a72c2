// Composition engine: geometry, typography and measurement feeding two page
// paginators. Composition is CPU-bound and must run inside
// tokio::task::spawn_blocking.

pub mod composer;
pub mod features;
pub mod font_metrics;
pub mod geometry;
pub mod handlers;
pub mod measure;
pub mod normalize;
pub mod paginator;
pub mod render;
pub mod scheduler;
pub mod typography;

// Re-export the public API consumed by handlers, config and the font registry.
pub use composer::{Composer, CompositionInput, CompositionResult, Strategy};
pub use features::FeatureSet;
pub use font_metrics::GenericFamily;
pub use geometry::{LayoutError, Margins, PageGeometry, DEFAULT_DPI};
pub use scheduler::PreviewSessions;
pub use typography::TypographyConfig;
