pub mod guard;
pub mod logging;
