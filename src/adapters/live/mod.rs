pub mod client;
pub mod retry;
pub mod transport;
