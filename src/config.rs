use std::env;

use crate::consts::DEFAULT_REGISTRAR_METHOD_NAME;

/// Environment variable enabling strict mode (`1`, `true`, `yes`, `on`)
pub const STRICT_ENV: &str = "CLASSPATCH_STRICT";
/// Environment variable toggling output verification
pub const VERIFY_ENV: &str = "CLASSPATCH_VERIFY";

/// Options shared by every transformation and generation entry point
#[derive(Debug, Clone)]
pub struct Config {
    /// Treat a refused method declaration as an error instead of a logged skip
    pub strict: bool,
    /// Run the structural verifier on every class before returning its bytes
    pub verify: bool,
    /// Name used for a generated registrar method when none is given
    pub registrar_method_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict: false,
            verify: true,
            registrar_method_name: DEFAULT_REGISTRAR_METHOD_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by `CLASSPATCH_STRICT` / `CLASSPATCH_VERIFY` when set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(strict) = env_flag(STRICT_ENV) {
            config.strict = strict;
        }
        if let Some(verify) = env_flag(VERIFY_ENV) {
            config.verify = verify;
        }
        config
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_registrar_method_name(mut self, name: impl Into<String>) -> Self {
        self.registrar_method_name = name.into();
        self
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    parse_flag(&value).or_else(|| {
        log::warn!("ignoring {}={:?}: expected a boolean", name, value);
        None
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lenient_and_verifying() {
        let config = Config::default();
        assert!(!config.strict);
        assert!(config.verify);
        assert_eq!(config.registrar_method_name, DEFAULT_REGISTRAR_METHOD_NAME);
    }

    #[test]
    fn parses_boolean_flags() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
