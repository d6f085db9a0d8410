//! # cloudstrap_templates
//!
//! Infrastructure definition rendering for cloudstrap.
//!
//! [`TemplateRenderer`] turns a [`cloudstrap_config::DeploymentConfig`] into
//! the text of a Terraform definition. Rendering is pure: no filesystem or
//! network access, and every `{{ placeholder }}` must resolve.
//! [`DefinitionWriter`] is the separate step that puts the text on disk.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cloudstrap_config::{ConfigCollector, OptionTables, Selections};
//! use cloudstrap_templates::{DefinitionWriter, TemplateRenderer};
//! use std::path::Path;
//!
//! let tables = OptionTables::standard();
//! let config = ConfigCollector::new(&tables)
//!     .collect(&Selections::new().ami("ubuntu").instance_type("t3.small")
//!         .availability_zone("us-east-1a").load_balancer_name("web"))
//!     .unwrap();
//!
//! let definition = TemplateRenderer::new().render(&config).unwrap();
//! DefinitionWriter::new(Path::new("./terraform")).write(&definition).unwrap();
//! ```

pub mod error;
pub mod renderer;
pub mod writer;

pub use error::{TemplateError, TemplateResult};
pub use renderer::{TemplateRenderer, DEFAULT_TEMPLATE};
pub use writer::{DefinitionWriter, DEFINITION_FILE};
