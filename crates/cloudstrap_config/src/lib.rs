//! # cloudstrap_config
//!
//! Deployment parameters for cloudstrap.
//!
//! The operator picks values from fixed option tables (machine images,
//! instance types, availability zones) and names the load balancer. The
//! [`ConfigCollector`] validates those raw [`Selections`] against an
//! [`OptionTables`] value and produces an immutable [`DeploymentConfig`].
//!
//! ## Example
//!
//! ```rust
//! use cloudstrap_config::{ConfigCollector, OptionTables, Selections};
//!
//! let tables = OptionTables::standard();
//! let selections = Selections::new()
//!     .ami("ubuntu")
//!     .instance_type("t3.small")
//!     .region("us-east-1")
//!     .availability_zone("us-east-1a")
//!     .load_balancer_name("my-test-alb");
//!
//! let config = ConfigCollector::new(&tables).collect(&selections).unwrap();
//! assert_eq!(config.region(), "us-east-1");
//! ```

pub mod collector;
pub mod error;
pub mod models;
pub mod tables;

pub use collector::{check_load_balancer_name, ConfigCollector, MAX_LOAD_BALANCER_NAME_LEN};
pub use error::{ConfigError, ConfigResult};
pub use models::{DeploymentConfig, Selections};
pub use tables::{AmiOption, OptionTables};
