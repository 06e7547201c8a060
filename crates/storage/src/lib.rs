pub mod db;

pub use db::{
    add_category, add_unit, create_db, get_ledger_entries, insert_ledger_entries, load_catalogue,
    load_units, seed_defaults, DbPool, StorageError,
};
