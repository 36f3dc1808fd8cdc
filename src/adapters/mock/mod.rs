pub mod provider;

pub use provider::MockProvider;
