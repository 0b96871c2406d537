//! Shell integration snippets printed by `apimgr init`.

use super::{Shell, SHELL_PID_ENV};

/// Snippet for the user to add to their shell rc file.
///
/// It wraps the binary in a function that evals stdout, loads the global
/// configuration at startup, and cleans up the shell's local override on
/// exit.
pub fn render(shell: Shell) -> String {
    let exit_hook = match shell {
        Shell::Bash => "trap '_apimgr_cleanup' EXIT".to_string(),
        Shell::Zsh => "zshexit_functions+=(_apimgr_cleanup)".to_string(),
    };

    format!(
        r#"export {pid_var}=$$
apimgr() {{
    local __apimgr_out
    __apimgr_out="$(command apimgr "$@")" || return $?
    [ -n "$__apimgr_out" ] && eval "$__apimgr_out"
    return 0
}}
_apimgr_cleanup() {{
    command apimgr cleanup-session $$ >/dev/null 2>&1
}}
eval "$(command apimgr load-active)"
{exit_hook}
"#,
        pid_var = SHELL_PID_ENV,
    )
}
