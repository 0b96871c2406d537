//! Projection of a configuration into environment variables.

pub mod builder;
pub mod script;

pub use builder::{
    EnvSet, ACTIVE_ALIAS_VAR, API_KEY_VAR, AUTH_TOKEN_VAR, BASE_URL_VAR, MODEL_VAR,
    RECOGNIZED_VARS, SYNCED_VARS,
};
pub use script::{render_script, render_unset_all, ScriptGenerator};
