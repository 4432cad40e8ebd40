//! SQLite access to persistence stores.
//!
//! A store written by the persistence engine keeps a compressed archive of
//! the object model it was written with in its `Z_MODELCACHE` table, and a
//! metadata row describing that model in `Z_METADATA`. This crate reads both
//! and can write stores in the same layout.
//!
//! The crate is organized into these modules:
//!
//! - **`extract`** — [`StoreModelExtractor`], blob to [`ObjectModel`](store_model_core::ObjectModel)
//! - **`reader`** — [`CacheBlobReader`] and its rusqlite implementation
//! - **`codec`** — zlib and raw DEFLATE inflation with an output cap
//! - **`metadata`** — [`SqliteMetadataSource`] for the cheap compatibility check
//! - **`fixture`** — [`StoreWriter`] for producing stores
//! - **`schema`** — table layout and SQL generation
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use store_model_sqlite::StoreModelExtractor;
//!
//! let model = StoreModelExtractor::new()
//!     .extract(Path::new("Model.sqlite"))
//!     .unwrap();
//! println!("{} entities", model.entities.len());
//! ```
//!
//! Every call opens its own read-only connection and closes it before
//! returning, so the store file can be moved or deleted right afterwards.

mod codec;
mod config;
mod error;
mod extract;
mod fixture;
mod metadata;
mod reader;
mod schema;

pub use codec::{BlobFormat, deflate, has_zlib_header, inflate};
pub use config::{CacheRowPolicy, DEFAULT_MAX_INFLATED_BYTES, ExtractorConfig};
pub use error::{ExtractError, FixtureError, MetadataError, Result};
pub use extract::StoreModelExtractor;
pub use fixture::{DEFAULT_STORE_UUID, FixtureOptions, StoreWriter, create_store};
pub use metadata::{SqliteMetadataSource, StoreOptions};
pub use reader::{CacheBlobReader, SqliteCacheReader};
pub use schema::{
    METADATA_PLIST_COLUMN, METADATA_TABLE, MODEL_CACHE_CONTENT_COLUMN, MODEL_CACHE_TABLE,
    generate_store_sql,
};
