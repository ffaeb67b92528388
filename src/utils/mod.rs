pub mod security;
pub mod server;
