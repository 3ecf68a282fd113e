//! Client library for the RabbitMQ management HTTP API.
//!
//! The pieces compose in one direction:
//!
//! - [`config`] merges command-line values, an INI config file section and
//!   built-in defaults into a [`Config`].
//! - [`catalog`] holds a [`Descriptor`] for every (verb, kind) pair.
//! - [`request`] validates `name=value` arguments against a descriptor and
//!   produces a [`Request`].
//! - [`transport`] sends the request and classifies the answer.
//!
//! ```no_run
//! use mgmtkit::{Catalog, PartialConfig, Resolver, Transport, Verb, request};
//!
//! let resolution = Resolver::new().resolve(PartialConfig::default())?;
//! let descriptor = Catalog::global().lookup(Verb::Declare, "queue")?;
//! let fields = request::parse_fields(["name=orders"])?;
//! let request = request::build(descriptor, &fields, &resolution.config)?;
//! Transport::new(&resolution.config)?.send(&request)?;
//! # Ok::<(), mgmtkit::Error>(())
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod paths;
pub mod request;
pub mod transport;

pub use catalog::{Catalog, Descriptor, Method, Verb};
pub use config::{Config, OutputFormat, PartialConfig, Resolution, Resolver};
pub use error::{Error, ErrorCategory, Result};
pub use request::{FieldMap, Request};
pub use transport::{Response, Transport};
