//! Concurrent memoization tables.
//!
//! A [`MemoTable`] maps keys to values and computes each missing value at most once, no
//! matter how many threads ask for it at the same time. [`AsyncMemoTable`] offers the same
//! guarantee to async tasks, and [`Cache`] puts a [`Source`] behind it to get a read-through
//! cache.
//!
//! ```
//! use memotable::MemoTable;
//!
//! let table: MemoTable = MemoTable::new();
//! assert_eq!(table.get(&"key".to_string()), None);
//!
//! let value = table.get_or_compute("key".to_string(), || "value".to_string());
//! assert_eq!(value, "value");
//! assert_eq!(table.get(&"key".to_string()), Some("value".to_string()));
//! ```
//!
//! Tables never evict and never expire entries.

mod async_table;
mod cache;
mod table;

pub use async_table::AsyncMemoTable;
pub use cache::{Cache, Source};
pub use table::MemoTable;
