pub mod filter;
pub mod manager;
pub mod pagination;
pub mod state;
pub mod types;

pub use filter::{FilterChange, ValidationError};
pub use manager::{Intent, QueryManager, DEFAULT_DEBOUNCE};
pub use pagination::page_window;
pub use state::{Completion, FetchRequest, QueryError, QuerySnapshot, QueryState};
pub use types::{FilterSet, LoadState, Query, QueryResult, SortKey, MAX_PAGE};
