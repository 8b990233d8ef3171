// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Per-container configuration for gadget containers.
//!
//! A container is a named set of JSON values such as the host a proxy is served from or the
//! path JavaScript libraries live under. Containers form an inheritance tree: every container
//! inherits the keys it does not set from its `parent`, or from [`DEFAULT_CONTAINER`] when it
//! names none.
//!
//! # Core Types
//!
//! - [`ContainerConfig`] - read access used by everything that consumes configuration.
//! - [`SnapshotContainerConfig`] - an in-memory implementation publishing immutable
//!   [`ConfigSnapshot`]s.
//! - [`Transaction`] - a batch of definition changes applied atomically.
//!
//! # Live Updates
//!
//! Consumers read through [`ContainerConfig`] on every operation and never cache values. A
//! committed [`Transaction`] swaps in a fully resolved snapshot, so the very next read observes
//! the new values and no read ever observes a partially applied change.
//!
//! ```
//! use container_config::{ContainerConfig, SnapshotContainerConfig};
//!
//! let config = SnapshotContainerConfig::from_json(
//!     r#"[
//!         {"gadgets.container": ["default"], "gadgets.uri.iframe.lockedDomainSuffix": "-a.example.com"},
//!         {"gadgets.container": ["social"]}
//!     ]"#,
//! )?;
//! assert_eq!(
//!     config.get_string("social", "gadgets.uri.iframe.lockedDomainSuffix").as_deref(),
//!     Some("-a.example.com")
//! );
//!
//! config
//!     .transaction()
//!     .add_containers_json(
//!         r#"{"gadgets.container": ["social"], "gadgets.uri.iframe.lockedDomainSuffix": "-b.example.com"}"#,
//!     )?
//!     .commit()?;
//! assert_eq!(
//!     config.get_string("social", "gadgets.uri.iframe.lockedDomainSuffix").as_deref(),
//!     Some("-b.example.com")
//! );
//! # Ok::<_, container_config::ConfigError>(())
//! ```

#![doc(
    html_logo_url = "https://media.githubusercontent.com/media/microsoft/oxidizer/refs/heads/main/crates/container_config/logo.png"
)]
#![doc(
    html_favicon_url = "https://media.githubusercontent.com/media/microsoft/oxidizer/refs/heads/main/crates/container_config/favicon.ico"
)]

mod config;
mod error;
mod snapshot;
mod store;

pub use config::{CONTAINER_KEY, ContainerConfig, DEFAULT_CONTAINER, PARENT_KEY};
pub use error::ConfigError;
pub use snapshot::ConfigSnapshot;
pub use store::{SnapshotContainerConfig, Transaction};
