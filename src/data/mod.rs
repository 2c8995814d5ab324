//! Data access layer: the record store trait and its backends.

pub mod db {
    pub use crate::db::*;
}

pub mod storage {
    pub use crate::storage::*;
}

pub mod db_storage {
    pub use crate::db_storage::*;
}

pub mod memory_storage {
    pub use crate::memory_storage::*;
}
