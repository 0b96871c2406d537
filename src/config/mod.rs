pub mod credentials;
pub mod error;
pub mod manager;
pub mod paths;
pub mod providers;
pub mod store;
pub mod types;
pub mod validate;

pub use credentials::{mask, AuthMethod, SecureString};
pub use error::{ConfigError, ValidationError};
pub use manager::ConfigManager;
pub use paths::Paths;
pub use providers::{builtin_registry, ProviderDef};
pub use store::{Store, StoreOptions};
pub use types::{ApiConfig, ConfigFile, ConfigPatch, EditOutcome, ModelsUpdate};
