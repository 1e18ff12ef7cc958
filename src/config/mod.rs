pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{load_config, resolve_shared_secret};
pub use models::*;
pub use validation::{GatewayConfigValidator, ValidationError, ValidationResult};
