pub mod auth;
pub mod common;
pub mod feed;

pub use common::{Envelope, ListAttributes, ListEnvelope, ResourceData};
