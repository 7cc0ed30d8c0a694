pub mod documents;
pub mod health;
pub mod metrics;
pub mod queue;
pub mod view;
