pub mod flag_store;

pub use flag_store::{FlagStore, StoreError};
