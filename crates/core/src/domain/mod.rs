mod address;
mod error;
mod file_object;
mod predicate;
mod sort;

pub use address::{base_address, build_url, first_segment, relative_path, strip_trailing_segment};
pub use error::DomainError;
pub use file_object::{FileObject, FileType, QueryableMap, RESOURCE_KEY_MAP, queryable_key};
pub use predicate::{CompoundKind, ComparisonOp, Predicate, translate};
pub use sort::{SortType, compare_entries, natural_cmp, sort_entries};
