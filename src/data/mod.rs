/// Data layer: core types, loading, reshaping and site selection.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json
///        │
///        ▼
///   ┌──────────┐     ┌──────────┐
///   │  loader   │◄────│  cache    │  memoized per source path
///   └──────────┘     └──────────┘
///        │ Table
///        ├───────────────────────┐
///        ▼                       ▼
///   ┌──────────┐           ┌──────────┐
///   │ reshape  │ melt      │  select   │ site key → matching rows
///   └──────────┘           └──────────┘
///        │ LongTable             │ Selection
///        ▼                       ▼
///      GDP chart           ┌──────────┐
///                          │  assets   │ glob pattern → sorted images
///                          └──────────┘
/// ```

pub mod assets;
pub mod cache;
pub mod error;
pub mod loader;
pub mod model;
pub mod reshape;
pub mod schema;
pub mod select;

pub use error::DataError;
