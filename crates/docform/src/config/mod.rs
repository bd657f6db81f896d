pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, load_from_env, resolve};
pub use schema::{Config, LogFormat};
