//! Translator configuration.
//!
//! Settings are resolved once, either programmatically or from the
//! environment, and read without cost during translation.

use std::sync::Arc;

/// Module name used when none is configured.
pub const DEFAULT_MODULE_NAME: &str = "dummy";

/// Default limit on the symbolic operand stack depth.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1024;

// =============================================================================
// Translate Configuration
// =============================================================================

/// Complete translator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateConfig {
    /// Name of the module being translated; prefixes every nested qualified name.
    pub module_name: Arc<str>,

    /// Fold constant-only literal collections into a single constant.
    pub fold_constants: bool,

    /// Maximum depth of the symbolic operand stack.
    pub max_stack_depth: usize,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            module_name: DEFAULT_MODULE_NAME.into(),
            fold_constants: true,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }
}

impl TranslateConfig {
    /// Configuration for a module called `name`, other settings defaulted.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::default().with_module_name(name)
    }

    /// Resolve configuration from environment variables.
    ///
    /// - `PYSSA_MODULE`: module name
    /// - `PYSSA_NO_FOLD`: any truthy value disables constant folding
    /// - `PYSSA_MAX_STACK`: stack depth limit
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = std::env::var("PYSSA_MODULE") {
            if !name.is_empty() {
                config.module_name = name.into();
            }
        }
        if Self::env_bool("PYSSA_NO_FOLD") {
            config.fold_constants = false;
        }
        if let Some(limit) = Self::env_usize("PYSSA_MAX_STACK") {
            config.max_stack_depth = limit;
        }
        config
    }

    pub fn with_module_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.module_name = name.into();
        self
    }

    pub fn with_fold_constants(mut self, fold: bool) -> Self {
        self.fold_constants = fold;
        self
    }

    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    /// Check if an environment variable is set to a non-empty, truthy value.
    #[inline]
    fn env_bool(var: &str) -> bool {
        std::env::var(var)
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false)
    }

    fn env_usize(var: &str) -> Option<usize> {
        std::env::var(var).ok()?.parse().ok().filter(|&n| n > 0)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TranslateConfig::default();
        assert_eq!(&*config.module_name, "dummy");
        assert!(config.fold_constants);
        assert_eq!(config.max_stack_depth, DEFAULT_MAX_STACK_DEPTH);
    }

    #[test]
    fn test_builder_setters() {
        let config = TranslateConfig::new("pkg")
            .with_fold_constants(false)
            .with_max_stack_depth(8);
        assert_eq!(&*config.module_name, "pkg");
        assert!(!config.fold_constants);
        assert_eq!(config.max_stack_depth, 8);
    }

    #[test]
    fn test_from_env_reads_variables() {
        std::env::set_var("PYSSA_MODULE", "from_env");
        std::env::set_var("PYSSA_NO_FOLD", "1");
        std::env::set_var("PYSSA_MAX_STACK", "not a number");
        let config = TranslateConfig::from_env();
        std::env::remove_var("PYSSA_MODULE");
        std::env::remove_var("PYSSA_NO_FOLD");
        std::env::remove_var("PYSSA_MAX_STACK");

        assert_eq!(&*config.module_name, "from_env");
        assert!(!config.fold_constants);
        assert_eq!(config.max_stack_depth, DEFAULT_MAX_STACK_DEPTH);
    }
}
