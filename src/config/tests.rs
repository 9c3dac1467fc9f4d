use super::*;
use serde_json::json;
use std::fs;
use std::time::Duration;

use super::source::PolicyCache;

const FULL_TOML: &str = r#"
completion_url = "https://proxy.example.com"
api_token = "Bearer abc123"
policy_ttl_ms = 5000

[history_summary]
enabled = true
client_compaction_enabled = true
trigger_strategy = "RATIO"
trigger_on_history_size_chars = 40000
history_tail_size_chars_to_exclude = 8000
trigger_on_context_ratio = 0.8
target_context_ratio = 0.5
min_tail_exchanges = 3
cache_ttl_ms = 0
timeout_seconds = 30
max_tokens = 512
provider_id = "anthropic"
model = "claude-haiku"
prompt = "Summarize."
summary_node_request_message_template = "{summary}"
rolling_summary = true

[history_summary.abridged_history_params]
total_chars_limit = 2000

[history_summary.context_window_tokens_overrides]
"claude-sonnet" = 200000
"#;

#[test]
fn test_parse_full_config() {
    let config: Config = toml::from_str(FULL_TOML).unwrap();
    assert_eq!(config.base_url().as_deref(), Some("https://proxy.example.com/"));
    assert_eq!(config.policy_ttl_ms(), 5000);

    let hs = config.history_summary.unwrap();
    assert!(hs.is_active());
    assert_eq!(hs.trigger_strategy(), TriggerStrategy::Ratio);
    assert_eq!(hs.trigger_chars(), 40_000);
    assert_eq!(hs.tail_exclude_chars(), 8_000);
    assert_eq!(hs.trigger_ratio(), Some(0.8));
    assert_eq!(hs.target_ratio(), 0.5);
    assert_eq!(hs.min_tail_exchanges(), 3);
    assert_eq!(hs.cache_ttl_ms(), 0);
    assert_eq!(hs.timeout(), Duration::from_secs(30));
    assert_eq!(hs.summary_max_tokens(), 512);
    assert_eq!(hs.abridged_chars_limit(), 2000);
    assert_eq!(hs.summary_overhead_chars(), 2000 + 512 * 4 + 4096);
    assert_eq!(hs.context_window_tokens_overrides.get("claude-sonnet"), Some(&200_000));
    assert_eq!(hs.provider_id(), Some("anthropic"));
    assert_eq!(hs.summary_model(), Some("claude-haiku"));
    assert!(hs.rolling_summary());
}

#[test]
fn test_policy_defaults() {
    let hs = HistorySummaryPolicy::default();
    assert!(!hs.is_active());
    assert_eq!(hs.trigger_strategy(), TriggerStrategy::Auto);
    assert_eq!(hs.trigger_chars(), 0);
    assert_eq!(hs.trigger_ratio(), None);
    assert_eq!(hs.target_ratio(), 0.55);
    assert_eq!(hs.min_tail_exchanges(), 2);
    assert_eq!(hs.max_summarization_input_chars(), 250_000);
    assert_eq!(hs.cache_ttl_ms(), 30 * 60 * 1000);
    assert_eq!(hs.timeout(), Duration::from_secs(60));
    assert_eq!(hs.summary_max_tokens(), 1024);
    assert_eq!(hs.abridged_chars_limit(), 10_000);
    assert_eq!(hs.summary_overhead_chars(), 10_000 + 4096 + 4096);
    assert!(hs.prompt().is_none());
    assert!(!hs.rolling_summary());
}

#[test]
fn test_zero_values_fall_back_to_defaults() {
    let hs = HistorySummaryPolicy {
        min_tail_exchanges: Some(0),
        max_summarization_input_chars: Some(0),
        timeout_seconds: Some(0),
        max_tokens: Some(0),
        abridged_history_params: Some(AbridgedHistoryParams {
            total_chars_limit: Some(0),
        }),
        ..Default::default()
    };
    assert_eq!(hs.min_tail_exchanges(), 2);
    assert_eq!(hs.max_summarization_input_chars(), 250_000);
    assert_eq!(hs.timeout(), Duration::from_secs(60));
    assert_eq!(hs.summary_max_tokens(), 1024);
    assert_eq!(hs.abridged_chars_limit(), 10_000);
}

#[test]
fn test_invalid_ratios_rejected() {
    for bad in [0.0, -0.5, 1.5, f64::NAN] {
        let hs = HistorySummaryPolicy {
            trigger_on_context_ratio: Some(bad),
            target_context_ratio: Some(bad),
            ..Default::default()
        };
        assert_eq!(hs.trigger_ratio(), None);
        assert_eq!(hs.target_ratio(), 0.55);
    }
    let hs = HistorySummaryPolicy {
        trigger_on_context_ratio: Some(1.0),
        ..Default::default()
    };
    assert_eq!(hs.trigger_ratio(), Some(1.0));
}

#[test]
fn test_client_compaction_switch() {
    let mut hs = HistorySummaryPolicy {
        enabled: Some(true),
        ..Default::default()
    };
    // Server-side summarization alone does not opt the client in.
    assert!(!hs.is_active());
    hs.client_compaction_enabled = Some(true);
    assert!(hs.is_active());
    hs.client_compaction_enabled = Some(false);
    assert!(!hs.is_active());
    hs.enabled = Some(false);
    hs.client_compaction_enabled = Some(true);
    assert!(!hs.is_active());
}

#[test]
fn test_trigger_strategy_parse() {
    assert_eq!(TriggerStrategy::parse("chars"), TriggerStrategy::Chars);
    assert_eq!(TriggerStrategy::parse(" Ratio "), TriggerStrategy::Ratio);
    assert_eq!(TriggerStrategy::parse("AUTO"), TriggerStrategy::Auto);
    assert_eq!(TriggerStrategy::parse(""), TriggerStrategy::Auto);
    assert_eq!(TriggerStrategy::parse("tokens"), TriggerStrategy::Chars);
}

#[test]
fn test_normalize_token() {
    assert_eq!(normalize_token("  abc  ").as_deref(), Some("abc"));
    assert_eq!(normalize_token("Bearer abc").as_deref(), Some("abc"));
    assert_eq!(normalize_token("bearer   abc").as_deref(), Some("abc"));
    assert_eq!(normalize_token("AUGMENT_API_TOKEN=xyz").as_deref(), Some("xyz"));
    assert_eq!(normalize_token("MY_KEY = xyz").as_deref(), Some("xyz"));
    // Not env-shaped: kept verbatim.
    assert_eq!(normalize_token("abc=def").as_deref(), Some("abc=def"));
    assert_eq!(normalize_token("MY_SECRET=def").as_deref(), Some("MY_SECRET=def"));
    assert_eq!(normalize_token("   "), None);
    assert_eq!(normalize_token("Bearer   "), Some("Bearer".to_string()));
}

#[test]
fn test_normalize_base_url() {
    assert_eq!(normalize_base_url("http://h").as_deref(), Some("http://h/"));
    assert_eq!(normalize_base_url(" http://h/ ").as_deref(), Some("http://h/"));
    assert_eq!(normalize_base_url(""), None);
}

#[test]
fn test_env_substitution() {
    std::env::set_var("BYOK_COMPACT_TEST_MODEL", "claude-haiku-4-5");
    assert_eq!(
        Config::resolve_str("m={env:BYOK_COMPACT_TEST_MODEL}!"),
        "m=claude-haiku-4-5!"
    );
    assert_eq!(Config::resolve_str("{env:BYOK_COMPACT_TEST_UNSET_VAR}"), "");
    assert_eq!(Config::resolve_str("{env:unterminated"), "{env:unterminated");

    let mut config = Config {
        completion_url: Some("{env:BYOK_COMPACT_TEST_MODEL}".into()),
        history_summary: Some(HistorySummaryPolicy {
            model: Some("{env:BYOK_COMPACT_TEST_MODEL}".into()),
            ..Default::default()
        }),
        ..Default::default()
    };
    config.resolve_substitutions();
    assert_eq!(config.completion_url.as_deref(), Some("claude-haiku-4-5"));
    assert_eq!(
        config.history_summary.unwrap().model.as_deref(),
        Some("claude-haiku-4-5")
    );
}

#[test]
fn test_merge_project_wins() {
    let global: Config = toml::from_str(FULL_TOML).unwrap();
    let project: Config = toml::from_str(
        r#"
completion_url = "http://localhost:8080"

[history_summary]
model = "gpt-4.1-mini"

[history_summary.context_window_tokens_overrides]
"gpt-4.1" = 1000000
"#,
    )
    .unwrap();

    let merged = Config::merge(global, project);
    assert_eq!(merged.completion_url.as_deref(), Some("http://localhost:8080"));
    assert_eq!(merged.api_token.as_deref(), Some("Bearer abc123"));
    let hs = merged.history_summary.unwrap();
    assert_eq!(hs.summary_model(), Some("gpt-4.1-mini"));
    assert_eq!(hs.provider_id(), Some("anthropic"));
    assert_eq!(hs.context_window_tokens_overrides.len(), 2);
}

#[test]
fn test_merge_keeps_single_policy() {
    let global = Config {
        history_summary: Some(HistorySummaryPolicy {
            enabled: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };
    let merged = Config::merge(global, Config::default());
    assert_eq!(merged.history_summary.unwrap().enabled, Some(true));
}

#[test]
fn test_load_global_creates_default_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let config = Config::load_global_from(&path).unwrap();
    assert!(path.exists());
    assert_eq!(
        config.completion_url.as_deref(),
        Some("{env:BYOK_COMPLETION_URL}")
    );
    assert!(config.history_summary.is_none());

    // Second load reads the file that was written.
    let again = Config::load_global_from(&path).unwrap();
    assert_eq!(again, config);
}

#[test]
fn test_load_global_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "completion_url = [").unwrap();
    let err = Config::load_global_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn test_load_project_walks_up_to_git_root() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join(".git")).unwrap();
    fs::write(
        root.path().join(crate::constants::PROJECT_CONFIG_FILENAME),
        "completion_url = \"http://project\"\n",
    )
    .unwrap();
    let nested = root.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let found = Config::load_project_from(nested).unwrap().unwrap();
    assert_eq!(found.completion_url.as_deref(), Some("http://project"));
}

#[test]
fn test_load_project_stops_at_git_root() {
    let root = tempfile::tempdir().unwrap();
    fs::write(
        root.path().join(crate::constants::PROJECT_CONFIG_FILENAME),
        "completion_url = \"http://outside\"\n",
    )
    .unwrap();
    let repo = root.path().join("repo");
    fs::create_dir_all(repo.join(".git")).unwrap();
    assert!(Config::load_project_from(repo).unwrap().is_none());
}

#[test]
fn test_redacted_hides_token() {
    let config: Config = toml::from_str(FULL_TOML).unwrap();
    let shown = toml::to_string_pretty(&config.redacted()).unwrap();
    assert!(!shown.contains("abc123"));
    assert!(shown.contains("***"));
}

#[test]
fn test_policy_from_proxy_config() {
    let doc = json!({
        "history_summary": {
            "enabled": true,
            "client_compaction_enabled": true,
            "trigger_on_history_size_chars": 1000,
            "context_window_tokens_overrides": { "claude": 200000 },
            "unknown_field": "ignored"
        },
        "other": 1
    });
    let policy = policy_from_proxy_config(&doc).unwrap().unwrap();
    assert!(policy.is_active());
    assert_eq!(policy.trigger_chars(), 1000);

    assert!(policy_from_proxy_config(&json!({})).unwrap().is_none());
    assert!(policy_from_proxy_config(&json!({ "history_summary": null }))
        .unwrap()
        .is_none());
    assert!(policy_from_proxy_config(&json!({ "history_summary": { "enabled": "yes" } })).is_err());
}

#[test]
fn test_proxy_policy_reads_numbers_leniently() {
    let doc = json!({
        "history_summary": {
            "enabled": true,
            "client_compaction_enabled": true,
            "trigger_on_history_size_chars": 400000.0,
            "cache_ttl_ms": " 60000 ",
            "trigger_on_context_ratio": "0.8",
            "max_tokens": "lots",
            "min_tail_exchanges": -1,
            "timeout_seconds": null,
            "abridged_history_params": { "total_chars_limit": 1500.7 },
            "context_window_tokens_overrides": { "claude": 200000.0, "gpt": "128000", "bad": [] }
        }
    });
    let policy = policy_from_proxy_config(&doc).unwrap().unwrap();
    assert!(policy.is_active());
    assert_eq!(policy.trigger_chars(), 400_000);
    assert_eq!(policy.cache_ttl_ms(), 60_000);
    assert_eq!(policy.trigger_ratio(), Some(0.8));
    assert_eq!(policy.summary_max_tokens(), 1024);
    assert_eq!(policy.min_tail_exchanges(), 2);
    assert_eq!(policy.timeout(), Duration::from_secs(60));
    assert_eq!(policy.abridged_chars_limit(), 1500);
    assert_eq!(
        policy.context_window_tokens_overrides,
        std::collections::BTreeMap::from([
            ("claude".to_string(), 200_000),
            ("gpt".to_string(), 128_000),
        ])
    );
}

#[test]
fn test_toml_policy_accepts_float_sizes() {
    let config: Config = toml::from_str(
        "[history_summary]\ntrigger_on_history_size_chars = 1000.0\nmax_tokens = 256\n",
    )
    .unwrap();
    let hs = config.history_summary.unwrap();
    assert_eq!(hs.trigger_chars(), 1000);
    assert_eq!(hs.summary_max_tokens(), 256);
}

#[test]
fn test_proxy_policy_requires_client_opt_in() {
    let doc = json!({ "history_summary": { "enabled": true, "trigger_strategy": "chars" } });
    let policy = policy_from_proxy_config(&doc).unwrap().unwrap();
    assert!(!policy.is_active());
}

#[test]
fn test_policy_cache_ttl() {
    let cache = PolicyCache::new(10_000);
    assert!(cache.get(0).is_none());

    let policy = HistorySummaryPolicy {
        enabled: Some(true),
        ..Default::default()
    };
    cache.put(1_000, Some(policy.clone()));
    assert_eq!(cache.get(1_000), Some(Some(policy.clone())));
    assert_eq!(cache.get(10_999), Some(Some(policy)));
    assert!(cache.get(11_000).is_none());

    let disabled = PolicyCache::new(0);
    disabled.put(0, None);
    assert!(disabled.get(0).is_none());
}

#[tokio::test]
async fn test_static_policy_source() {
    let source = StaticPolicySource::new(Some(HistorySummaryPolicy {
        model: Some("m".into()),
        ..Default::default()
    }));
    let policy = source.fetch().await.unwrap().unwrap();
    assert_eq!(policy.summary_model(), Some("m"));
    assert!(StaticPolicySource::default().fetch().await.unwrap().is_none());
}

#[test]
fn test_remote_source_requires_endpoint_and_token() {
    assert!(RemotePolicySource::new("", "tok", 1000).is_err());
    assert!(RemotePolicySource::new("http://h", "  ", 1000).is_err());
    assert!(RemotePolicySource::new("http://h", "tok", 1000).is_ok());
}
