pub mod propagate;
pub mod session;
pub mod validate;
