//! Annotations: the protected resource.
//!
//! ## Components
//! - `models`: Annotation, Range, Permissions and Extras
//! - `codec`: Flat wire object <-> typed record
//! - `policy`: Per-action authorization
//! - `search`: Equality-filter search with readability filtering
//! - `repository`: Store contract and in-memory store
//! - `pg`: PostgreSQL store

pub mod codec;
pub mod models;
pub mod pg;
pub mod policy;
pub mod repository;
pub mod search;

pub use codec::{AnnotationPatch, SchemaError, from_wire, from_wire_object, to_wire};
pub use models::{Action, Annotation, EVERYONE, Extras, Permissions, Range};
pub use pg::PgAnnotationStore;
pub use policy::{authorise, readable};
pub use repository::{AnnotationStore, MemoryAnnotationStore, StoreError};
pub use search::{DEFAULT_LIMIT, Filter, SearchError, SearchQuery, SearchResult, run_search};
