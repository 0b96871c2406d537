//! Named API credential profiles with global and per-shell activation.
//!
//! ```text
//! config/      - document types, store (locking + atomic writes), manager
//! env/         - environment projection and activation script
//! session.rs   - per-shell local override markers
//! sync.rs      - mirror into Claude's settings.json
//! activation.rs - global/local switch orchestration
//! cli/         - command-line surface
//! ```

pub mod activation;
pub mod cli;
pub mod config;
pub mod env;
pub mod logging;
pub mod session;
pub mod sync;
