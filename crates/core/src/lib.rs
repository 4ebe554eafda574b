pub mod filter;
pub mod sort;
pub mod value;

pub use filter::{ColumnFilter, FilterModel, TextFilter, TextFilterMode};
pub use sort::{SortDirection, SortSpec};
pub use value::{NormalizedValue, RowValue};
