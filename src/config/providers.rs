//! Builtin provider registry.
//!
//! Adding a provider: add one `ProviderDef` to `builtin_registry()`.
//! The `id` is what users put in the `provider` field; once published, do
//! not rename.

/// Normalization rules for a known provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDef {
    pub id: &'static str,
    pub label: &'static str,
    /// Filled into `base_url` when a config names this provider but no URL.
    pub default_base_url: &'static str,
}

/// Look up a provider by tag, case-insensitively.
pub fn lookup(tag: &str) -> Option<&'static ProviderDef> {
    let tag = tag.trim();
    builtin_registry()
        .iter()
        .find(|def| def.id.eq_ignore_ascii_case(tag))
}

/// All known providers, in display order.
pub fn builtin_registry() -> &'static [ProviderDef] {
    &[
        ProviderDef {
            id: "anthropic",
            label: "Anthropic",
            default_base_url: "https://api.anthropic.com",
        },
        ProviderDef {
            id: "openrouter",
            label: "OpenRouter",
            default_base_url: "https://openrouter.ai/api",
        },
        ProviderDef {
            id: "deepseek",
            label: "DeepSeek",
            default_base_url: "https://api.deepseek.com/anthropic",
        },
        ProviderDef {
            id: "moonshot",
            label: "Moonshot (Kimi)",
            default_base_url: "https://api.moonshot.cn/anthropic",
        },
        ProviderDef {
            id: "zhipu",
            label: "Zhipu GLM",
            default_base_url: "https://open.bigmodel.cn/api/anthropic",
        },
    ]
}
