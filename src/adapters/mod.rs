pub mod live;
pub mod mock;
pub mod normalizer;
pub mod webhook;
