//! C1 — backend config resolver.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{BackendSpec, GatewayConfig};

/// Resolve `provider` to its backend id and declarative spec.
///
/// No side effects (spec §4.1). `provider` is matched verbatim against the
/// configured backend ids; callers needing alias-style provider names
/// should resolve those upstream (this function only normalizes *model*
/// names via [`BackendSpec::normalize_model`], not backend names).
///
/// # Errors
///
/// Returns [`ConfigError::UnknownBackend`] if no backend with that id is
/// configured.
pub fn resolve_backend<'a>(
    provider: &str,
    config: &'a GatewayConfig,
) -> ConfigResult<(&'a str, &'a BackendSpec)> {
    config
        .backends
        .get_key_value(provider)
        .map(|(id, spec)| (id.as_str(), spec))
        .ok_or_else(|| ConfigError::UnknownBackend(provider.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendSpec;
    use std::collections::HashMap;

    fn config_with_backend(id: &str) -> GatewayConfig {
        let mut backends = HashMap::new();
        backends.insert(
            id.to_owned(),
            BackendSpec {
                command: "claude".to_owned(),
                args: Vec::new(),
                resume_args: Vec::new(),
                session_arg: None,
                session_args: Vec::new(),
                session_mode: crate::types::SessionMode::Existing,
                system_prompt_arg: None,
                system_prompt_when: crate::types::SystemPromptWhen::First,
                model_arg: None,
                model_aliases: HashMap::new(),
                image_arg: None,
                image_mode: crate::types::ImageMode::Repeat,
                input: crate::types::PromptInput::Arg,
                max_prompt_arg_chars: 0,
                output: crate::types::OutputMode::StreamJsonl,
                resume_output: None,
                env: HashMap::new(),
                clear_env: false,
                sandbox_mode: crate::types::SandboxMode::Off,
                sandbox_overrides: HashMap::new(),
                serialize: false,
                enable_tools: true,
                session_id_fields: vec!["session_id".to_owned()],
            },
        );
        GatewayConfig {
            backends,
            ..Default::default()
        }
    }

    #[test]
    fn resolves_known_backend() {
        let config = config_with_backend("claude-cli");
        let (id, spec) = resolve_backend("claude-cli", &config).unwrap();
        assert_eq!(id, "claude-cli");
        assert_eq!(spec.command, "claude");
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let config = config_with_backend("claude-cli");
        let err = resolve_backend("gpt-cli", &config).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackend(p) if p == "gpt-cli"));
    }
}
