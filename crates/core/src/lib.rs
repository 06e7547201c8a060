pub mod catalogue;
pub mod direction;
pub mod entry;
pub mod money;

pub use catalogue::{CategoryCatalogue, DEFAULT_CATEGORIES, DEFAULT_UNITS};
pub use direction::Direction;
pub use entry::{EntryStatus, LedgerEntry};
pub use money::Money;
