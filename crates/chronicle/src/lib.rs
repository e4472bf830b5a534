//! Chronicle - incremental repository and commit sync.
//!
//! This library mirrors a GitHub repository's metadata and commit history into
//! a relational store, polling on a fixed interval and only fetching commits
//! newer than what is already stored.
//!
//! # Features
//!
//! - `sqlite` / `postgres` - Database backends.
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chronicle::{connect_and_migrate, github::{GitHubClient, GitHubSettings}};
//! use chronicle::shutdown::ShutdownSignal;
//! use chronicle::store::{SeaOrmStore, WriterSettings};
//! use chronicle::sync::Syncer;
//!
//! let db = connect_and_migrate("sqlite://chronicle.db?mode=rwc").await?;
//! let signal = ShutdownSignal::never();
//! let client = GitHubClient::new(&GitHubSettings::new(token), signal.clone())?;
//! let store = SeaOrmStore::new(db, WriterSettings::default(), signal.clone());
//!
//! let syncer = Syncer::new(Arc::new(client), Arc::new(store), signal);
//! let outcome = syncer.sync_once(&"acme/widget".parse()?, None).await?;
//! println!("{} commits written", outcome.written);
//! ```

pub mod db;
pub mod entity;
pub mod error;
pub mod github;
pub mod http;
pub mod platform;
pub mod pool;
pub mod shutdown;
pub mod store;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::{DatabaseSettings, connect, connect_with};
#[cfg(feature = "migrate")]
pub use db::{connect_and_migrate, connect_and_migrate_with};
pub use entity::prelude::*;
pub use error::ErrorKind;
pub use platform::{PlatformClient, PlatformError, RepoKey};
pub use store::{SeaOrmStore, StoreError, SyncStore};
pub use sync::{Monitor, SyncError, Syncer};
