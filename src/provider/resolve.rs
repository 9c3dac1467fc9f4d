//! Model id resolution for byok-compact.
//!
//! Requests routed through the BYOK proxy name their model as
//! `byok:<provider>:<model>`. Context-window lookups match on the bare model
//! id, and summarization calls address their model in the prefixed form.

/// Prefix of proxy-routed model ids.
const BYOK_PREFIX: &str = "byok:";

/// Normalizes a model id for context-window matching.
///
/// Accepts these formats:
///   byok:anthropic:claude-sonnet-4-5   (provider segment dropped)
///   gemini-claude-sonnet-4-5           (gateway alias, becomes claude-sonnet-4-5)
///   claude-sonnet-4-5                  (unchanged)
pub fn normalize_model_for_match(raw: &str) -> String {
    let s = raw.trim();
    if let Some(rest) = s.strip_prefix(BYOK_PREFIX) {
        if let Some(idx) = rest.find(':') {
            if idx > 0 {
                return rest[idx + 1..].trim().to_string();
            }
        }
    }
    if let Some(alias) = s.strip_prefix("gemini-") {
        if alias.starts_with("claude-") {
            return alias.to_string();
        }
    }
    s.to_string()
}

/// Builds the proxy model id `byok:<provider>:<model>`. `None` when either
/// part is blank.
pub fn byok_model_id(provider_id: &str, model: &str) -> Option<String> {
    let provider_id = provider_id.trim();
    let model = model.trim();
    if provider_id.is_empty() || model.is_empty() {
        return None;
    }
    Some(format!("{BYOK_PREFIX}{provider_id}:{model}"))
}
