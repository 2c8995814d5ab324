// Domain-layer modules and shared errors/models
pub mod enrollment {
    pub use crate::enrollment::*;
}

pub mod stats {
    pub use crate::stats::*;
}

pub mod import {
    pub use crate::import::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
