pub mod error;
pub mod features;
pub mod generator;
pub mod pipeline;
pub mod record;
pub mod store;
pub mod validate;
