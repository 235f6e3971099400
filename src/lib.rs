//! Muninn - data-loading cache and render convergence engine
//!
//! Page-rendering code requests asynchronously-fetched data as if it
//! were already available; the engine re-invokes rendering until every
//! request has resolved, deduplicates concurrent identical requests,
//! and persists TTL'd results across process runs.
//!
//! Rendering functions stay synchronous: [`LoadEngine::load`] returns
//! the cached value when there is one and `None` on the pass that first
//! triggers the fetch, while [`LoadEngine::flush`] drains the triggered
//! work and renders again until a pass triggers nothing new.
//!
//! # Flush Example
//!
//! ```rust,no_run
//! use muninn::{LoadOptions, Muninn};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let engine = Muninn::builder().cache_name("demo-site").build()?;
//!
//!     let flushed = engine
//!         .flush(|| {
//!             let title = engine.load(
//!                 || async { Ok(json!("Memory of the World")) },
//!                 LoadOptions::new("/title"),
//!             );
//!             match title {
//!                 Some(value) => format!("<h1>{value}</h1>"),
//!                 None => String::new(),
//!             }
//!         })
//!         .await?;
//!
//!     println!("{}", flushed.content); // <h1>"Memory of the World"</h1>
//!     println!("{:?}", flushed.data["/title"]);
//!     Ok(())
//! }
//! ```
//!
//! # Awaiting call sites
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use muninn::{LoadOptions, Muninn};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let engine = Muninn::builder().build()?;
//!
//!     // Awaiting call sites use `cache`: a hit resolves without
//!     // invoking the loader, a miss awaits it in place.
//!     let posts = engine
//!         .cache(
//!             || async { Ok(json!(["first-post", "second-post"])) },
//!             LoadOptions::new("/posts").duration(Duration::from_secs(60)),
//!         )
//!         .await?;
//!
//!     println!("{posts}");
//!     Ok(())
//! }
//! ```

mod engine;
pub mod error;
mod lock;
mod registry;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use engine::{LoadEngine, Muninn, MuninnBuilder};
pub use error::{LoaderError, MuninnError, Result};
pub use store::{CacheEntry, CacheStore};
pub use types::{Flushed, LoadOptions};
