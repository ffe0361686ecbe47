//! Asset pipeline for bootstrapy sites.
//!
//! Pages are rendered from templates, stylesheets compiled from SCSS and
//! prefixed, scripts and styles minified, and images and fonts copied,
//! each by a named step in a small task graph.

pub mod assets;
pub mod builder;
pub mod clean;
pub mod config;
pub mod error;
pub mod glob;
pub mod graph;
pub mod step;
pub mod templates;
pub mod transform;

pub use builder::{ExportedTask, Pipeline, REBUILD_TARGETS};
pub use clean::CleanTask;
pub use config::{Category, CategoryPaths, PathConfig, PipelineSettings, TemplateData};
pub use error::PipelineError;
pub use graph::{GraphError, RunReport, TaskGraph, TaskReport};
pub use step::{StepReport, TransformStep};
pub use transform::{Asset, Transform, TransformError};
