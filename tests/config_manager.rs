mod common;

use std::fs;

use apimgr::config::{ApiConfig, ConfigError, ConfigFile, ConfigPatch, ValidationError};
use common::{seed, TestEnv};

#[test]
fn test_duplicate_alias_is_rejected_and_original_kept() {
    let env = TestEnv::new();
    let mgr = env.manager();

    mgr.add(ApiConfig::new("a").with_api_key("first")).unwrap();
    let err = mgr
        .add(ApiConfig::new("a").with_api_key("second"))
        .unwrap_err();

    assert!(matches!(err, ConfigError::DuplicateAlias { ref alias } if alias == "a"));
    assert_eq!(mgr.get("a").unwrap().api_key, "first");
    assert_eq!(mgr.list().unwrap().len(), 1);
}

#[test]
fn test_add_requires_an_auth_method() {
    let env = TestEnv::new();
    let mgr = env.manager();

    let err = mgr
        .add(ApiConfig::new("a").with_base_url("https://x.test"))
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Validation(ValidationError::BothAuthMethodsEmpty)
    ));
    assert!(mgr.list().unwrap().is_empty());
}

#[test]
fn test_add_rejects_empty_alias_and_bad_url() {
    let env = TestEnv::new();
    let mgr = env.manager();

    assert!(matches!(
        mgr.add(ApiConfig::new("   ").with_api_key("k")),
        Err(ConfigError::Validation(ValidationError::EmptyAlias))
    ));
    assert!(matches!(
        mgr.add(ApiConfig::new("a").with_api_key("k").with_base_url("ftp://x.test")),
        Err(ConfigError::Validation(ValidationError::InvalidBaseUrl { .. }))
    ));
}

#[test]
fn test_list_preserves_insertion_order() {
    let env = TestEnv::new();
    let mgr = env.manager();
    for alias in ["zeta", "alpha", "mid"] {
        mgr.add(ApiConfig::new(alias).with_api_key("k")).unwrap();
    }
    let aliases: Vec<String> = mgr.list().unwrap().into_iter().map(|c| c.alias).collect();
    assert_eq!(aliases, ["zeta", "alpha", "mid"]);
}

#[test]
fn test_update_partial_validates_resulting_record() {
    let env = TestEnv::new();
    let mgr = env.manager();
    mgr.add(ApiConfig::new("a").with_api_key("k")).unwrap();

    // Clearing the only credential must fail.
    let patch = ConfigPatch {
        api_key: Some(String::new()),
        ..ConfigPatch::default()
    };
    assert!(matches!(
        mgr.update_partial("a", &patch),
        Err(ConfigError::Validation(ValidationError::BothAuthMethodsEmpty))
    ));
    assert_eq!(mgr.get("a").unwrap().api_key, "k");

    // Swapping credentials in one patch is fine.
    let patch = ConfigPatch {
        api_key: Some(String::new()),
        auth_token: Some("tok".to_string()),
        ..ConfigPatch::default()
    };
    let updated = mgr.update_partial("a", &patch).unwrap();
    assert_eq!(updated.api_key, "");
    assert_eq!(updated.auth_token, "tok");
}

#[test]
fn test_update_partial_applies_nothing_on_failure() {
    let env = TestEnv::new();
    let mgr = env.manager();
    mgr.add(ApiConfig::new("a").with_api_key("k").with_model("m"))
        .unwrap();

    let patch = ConfigPatch {
        model: Some("m2".to_string()),
        base_url: Some("not a url".to_string()),
        ..ConfigPatch::default()
    };
    assert!(mgr.update_partial("a", &patch).is_err());
    let stored = mgr.get("a").unwrap();
    assert_eq!(stored.model, "m");
    assert_eq!(stored.base_url, "");
}

#[test]
fn test_update_partial_enforces_model_list() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);

    let patch = ConfigPatch {
        model: Some("other".to_string()),
        ..ConfigPatch::default()
    };
    assert!(matches!(
        mgr.update_partial("work", &patch),
        Err(ConfigError::Validation(ValidationError::ModelNotInList { .. }))
    ));
}

#[test]
fn test_update_partial_unknown_alias() {
    let env = TestEnv::new();
    let mgr = env.manager();
    assert!(matches!(
        mgr.update_partial("ghost", &ConfigPatch::default()),
        Err(ConfigError::NotFound { .. })
    ));
}

#[test]
fn test_edit_with_bad_credentials_keeps_model_list() {
    let env = TestEnv::new();
    let mgr = env.manager();
    mgr.add(
        ApiConfig::new("a")
            .with_api_key("k")
            .with_models(["m1"]),
    )
    .unwrap();
    let before = mgr.load().unwrap();

    let patch = ConfigPatch {
        models: Some(vec!["n1".to_string(), "n2".to_string()]),
        api_key: Some(String::new()),
        ..ConfigPatch::default()
    };
    assert!(matches!(
        mgr.edit("a", &patch),
        Err(ConfigError::Validation(ValidationError::BothAuthMethodsEmpty))
    ));

    assert_eq!(mgr.load().unwrap(), before);
    let stored = mgr.get("a").unwrap();
    assert_eq!(stored.models, ["m1"]);
    assert_eq!(stored.model, "m1");
}

#[test]
fn test_edit_with_taken_alias_keeps_fields() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);
    let before = mgr.load().unwrap();

    let patch = ConfigPatch {
        api_key: Some("k2".to_string()),
        alias: Some("home".to_string()),
        ..ConfigPatch::default()
    };
    assert!(matches!(
        mgr.edit("work", &patch),
        Err(ConfigError::DuplicateAlias { ref alias }) if alias == "home"
    ));

    assert_eq!(mgr.load().unwrap(), before);
    assert_eq!(mgr.get("work").unwrap().api_key, "sk-work");
}

#[test]
fn test_edit_applies_fields_models_and_rename_together() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);
    mgr.set_active("work").unwrap();

    let patch = ConfigPatch {
        api_key: Some("sk-new".to_string()),
        models: Some(vec!["w3".to_string(), "w2".to_string()]),
        alias: Some(" job ".to_string()),
        ..ConfigPatch::default()
    };
    let outcome = mgr.edit("work", &patch).unwrap();

    assert_eq!(outcome.config.alias, "job");
    assert_eq!(outcome.config.model, "w3");
    let update = outcome.models.unwrap();
    assert!(update.fell_back);
    assert_eq!(update.previous, "w1");

    let doc = mgr.load().unwrap();
    assert_eq!(doc.active, "job");
    assert!(!doc.contains("work"));
    let stored = mgr.get("job").unwrap();
    assert_eq!(stored.api_key, "sk-new");
    assert_eq!(stored.models, ["w3", "w2"]);
}

#[test]
fn test_edit_explicit_model_beats_fallback() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);

    let patch = ConfigPatch {
        models: Some(vec!["x1".to_string(), "x2".to_string()]),
        model: Some("x2".to_string()),
        ..ConfigPatch::default()
    };
    let outcome = mgr.edit("work", &patch).unwrap();

    assert_eq!(outcome.config.model, "x2");
    assert!(!outcome.models.unwrap().fell_back);
}

#[test]
fn test_rename_follows_active_pointer() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);
    mgr.set_active("work").unwrap();

    mgr.rename_alias("work", "job").unwrap();

    let doc = mgr.load().unwrap();
    assert_eq!(doc.active, "job");
    assert!(doc.contains("job"));
    assert!(!doc.contains("work"));
}

#[test]
fn test_rename_errors() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);

    assert!(matches!(
        mgr.rename_alias("ghost", "x"),
        Err(ConfigError::NotFound { .. })
    ));
    assert!(matches!(
        mgr.rename_alias("work", "home"),
        Err(ConfigError::DuplicateAlias { .. })
    ));
    assert!(matches!(
        mgr.rename_alias("work", " "),
        Err(ConfigError::Validation(ValidationError::EmptyAlias))
    ));
    mgr.rename_alias("work", "work").unwrap();
}

#[test]
fn test_set_models_falls_back_to_first_entry() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);
    assert_eq!(mgr.get("work").unwrap().model, "w1");

    let update = mgr.set_models("work", ["n1", "n2"]).unwrap();
    assert!(update.fell_back);
    assert_eq!(update.previous, "w1");
    assert_eq!(update.current, "n1");

    let stored = mgr.get("work").unwrap();
    assert_eq!(stored.models, ["n1", "n2"]);
    assert_eq!(stored.model, "n1");
}

#[test]
fn test_set_models_empty_clears_model() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);

    let update = mgr.set_models("work", Vec::<String>::new()).unwrap();
    assert!(update.fell_back);
    let stored = mgr.get("work").unwrap();
    assert!(stored.models.is_empty());
    assert!(stored.model.is_empty());
}

#[test]
fn test_switch_model_respects_list() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);

    assert_eq!(mgr.switch_model("work", "w2").unwrap().model, "w2");
    assert!(matches!(
        mgr.switch_model("work", "zzz"),
        Err(ConfigError::Validation(ValidationError::ModelNotInList { .. }))
    ));
    // No list: anything goes.
    assert_eq!(mgr.switch_model("home", "h9").unwrap().model, "h9");
    assert!(matches!(
        mgr.switch_model("ghost", "m"),
        Err(ConfigError::NotFound { .. })
    ));
}

#[test]
fn test_get_active_without_active() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);
    assert!(matches!(mgr.get_active(), Err(ConfigError::NoActiveConfig)));
    assert!(matches!(
        mgr.set_active("ghost"),
        Err(ConfigError::NotFound { .. })
    ));
}

#[test]
fn test_set_active_then_remove_clears_it() {
    let env = TestEnv::new();
    fs::create_dir_all(env.paths.config_dir()).unwrap();
    fs::write(
        env.paths.config_file(),
        r#"{"active":"old","configs":[{"alias":"old","api_key":"sk-a"},{"alias":"new","api_key":"sk-b"}]}"#,
    )
    .unwrap();
    let mgr = env.manager();

    mgr.set_active("new").unwrap();
    assert_eq!(mgr.load().unwrap().active, "new");
    assert_eq!(mgr.get_active().unwrap().api_key, "sk-b");

    assert!(mgr.remove("new").unwrap());
    let doc = mgr.load().unwrap();
    assert_eq!(doc.active, "");
    assert_eq!(doc.configs.len(), 1);
}

#[test]
fn test_remove_inactive_keeps_active() {
    let env = TestEnv::new();
    let mgr = env.manager();
    seed(&mgr);
    mgr.set_active("work").unwrap();

    assert!(!mgr.remove("home").unwrap());
    assert_eq!(mgr.load().unwrap().active, "work");
    assert!(matches!(mgr.remove("home"), Err(ConfigError::NotFound { .. })));
}

#[test]
fn test_round_trip_through_store() {
    let env = TestEnv::new();
    let mgr = env.manager();
    let doc = ConfigFile {
        active: "b".to_string(),
        configs: vec![
            ApiConfig::new("a").with_auth_token("t"),
            ApiConfig::new("b")
                .with_provider("openrouter")
                .with_api_key("k")
                .with_auth_token("t2")
                .with_base_url("https://openrouter.ai/api")
                .with_models(["x", "y"])
                .with_model("y"),
        ],
    };

    let written = doc.clone();
    mgr.store()
        .atomic_update(move |d| {
            *d = written;
            Ok(())
        })
        .unwrap();
    assert_eq!(mgr.load().unwrap(), doc);
}

#[test]
fn test_provider_normalization_on_add() {
    let env = TestEnv::new();
    let mgr = env.manager();
    let stored = mgr
        .add(ApiConfig::new("ds").with_provider("DeepSeek").with_api_key("k"))
        .unwrap();
    assert_eq!(stored.provider, "deepseek");
    assert_eq!(stored.base_url, "https://api.deepseek.com/anthropic");
}
