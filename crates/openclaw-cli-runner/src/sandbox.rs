//! Sandboxed (containerized) execution wrapping (spec §4.3).
//!
//! Wraps an inner command as `docker exec -i [-w <workdir>] [-e K=V]…
//! <container> sh -lc '<cmd>'`. Every token of the inner command is
//! single-quoted individually before being joined into the `sh -lc`
//! payload — this is a security invariant (spec §8 property 7): untrusted
//! prompt contents must never be interpretable by the shell.

use std::collections::HashMap;

use crate::types::SandboxContext;

/// Wrap `argv` for execution inside `sandbox.container` via `docker exec`.
#[must_use]
pub fn wrap_for_sandbox(argv: &[String], sandbox: &SandboxContext) -> Vec<String> {
    let mut wrapped = vec!["docker".to_owned(), "exec".to_owned(), "-i".to_owned()];

    if let Some(workdir) = &sandbox.workdir {
        wrapped.push("-w".to_owned());
        wrapped.push(workdir.clone());
    }

    for (key, value) in ordered_env(&sandbox.env) {
        wrapped.push("-e".to_owned());
        wrapped.push(format!("{key}={value}"));
    }

    wrapped.push(sandbox.container.clone());
    wrapped.push("sh".to_owned());
    wrapped.push("-lc".to_owned());
    wrapped.push(quote_argv(argv));
    wrapped
}

/// Single-quote every token of `argv` and join with spaces, producing the
/// payload passed to `sh -lc`.
#[must_use]
pub fn quote_argv(argv: &[String]) -> String {
    argv.iter().map(|arg| shell_quote(arg)).collect::<Vec<_>>().join(" ")
}

/// POSIX single-quote an argument: wrap it in `'...'`, escaping any
/// embedded `'` as `'\''` (close quote, escaped literal quote, reopen
/// quote). This makes the token opaque to the shell regardless of its
/// contents.
#[must_use]
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Deterministic ordering for env var flags, so command construction is
/// reproducible (useful for tests and for stable process-listing matches
/// in the stale-process cleanup step).
fn ordered_env(env: &HashMap<String, String>) -> Vec<(&String, &String)> {
    let mut pairs: Vec<_> = env.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_wraps_plain_text() {
        assert_eq!(shell_quote("hello"), "'hello'");
    }

    #[test]
    fn shell_quote_escapes_embedded_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn sandbox_quoting_contains_quoted_prompt_and_not_unquoted() {
        // Scenario S5: sandbox quoting.
        let argv = vec!["claude".to_owned(), "hello; echo pwned".to_owned()];
        let sandbox = SandboxContext {
            enabled: true,
            container: "agent-1".to_owned(),
            workdir: None,
            env: HashMap::new(),
        };

        let wrapped = wrap_for_sandbox(&argv, &sandbox);
        let inner = wrapped.last().unwrap();

        assert!(inner.contains("'hello; echo pwned'"));
        assert!(!inner.replace("'hello; echo pwned'", "").contains("hello; echo pwned"));
    }

    #[test]
    fn wrap_includes_workdir_and_env_flags() {
        let argv = vec!["claude".to_owned()];
        let mut env = HashMap::new();
        env.insert("FOO".to_owned(), "bar".to_owned());
        let sandbox = SandboxContext {
            enabled: true,
            container: "agent-1".to_owned(),
            workdir: Some("/work".to_owned()),
            env,
        };

        let wrapped = wrap_for_sandbox(&argv, &sandbox);
        assert!(wrapped.contains(&"-w".to_owned()));
        assert!(wrapped.contains(&"/work".to_owned()));
        assert!(wrapped.contains(&"-e".to_owned()));
        assert!(wrapped.contains(&"FOO=bar".to_owned()));
        assert_eq!(wrapped[0], "docker");
        assert_eq!(wrapped[1], "exec");
    }
}
