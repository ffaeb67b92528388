pub mod methods;
pub mod types;

pub use methods::{auth, feed};
