//! Server half: filtered search, pagination, the read-side lookup join and the
//! workshop profile operations.

pub mod join;
pub mod pagination;
pub mod profile;
pub mod query;
pub mod search;

pub use pagination::{PageWindow, PaginationEngine, PAGE_SIZE};
pub use profile::WorkshopProfileService;
pub use query::{Clause, Predicate, SearchQueryBuilder};
pub use search::{SearchQuery, SearchService};
