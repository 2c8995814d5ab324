//! Clients for talking to a running dashboard API.

pub mod api_client {
    pub use crate::api_client::*;
}
