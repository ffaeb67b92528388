pub mod pagination;

pub use pagination::{Identified, Page, Paginator};
