pub mod builder;
pub mod field_model;
pub mod store;
