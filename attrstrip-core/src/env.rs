//! Resolution of the current build environment.

/// Variable [`EnvVarGate`] reads by default.
pub const DEFAULT_ENV_VAR: &str = "NODE_ENV";

/// Supplies the identifier of the environment the build runs in.
///
/// Returning `None` means the environment cannot be determined; a pipeline
/// treats that as "stripping disabled".
pub trait EnvironmentGate: Send + Sync {
    fn current_environment(&self) -> Option<String>;
}

/// Reads the environment from a process environment variable.
#[derive(Debug, Clone)]
pub struct EnvVarGate {
    var: String,
}

impl EnvVarGate {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvVarGate {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_VAR)
    }
}

impl EnvironmentGate for EnvVarGate {
    fn current_environment(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}

/// A fixed, injected environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedEnvironment(Option<String>);

impl FixedEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    /// An environment that cannot be resolved.
    pub fn unresolved() -> Self {
        Self(None)
    }
}

impl EnvironmentGate for FixedEnvironment {
    fn current_environment(&self) -> Option<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_environment_reports_its_value() {
        assert_eq!(
            FixedEnvironment::new("production").current_environment(),
            Some("production".to_string())
        );
        assert_eq!(FixedEnvironment::unresolved().current_environment(), None);
    }

    #[test]
    fn missing_variable_is_unresolved() {
        let gate = EnvVarGate::new("ATTRSTRIP_TEST_VARIABLE_THAT_IS_NEVER_SET");
        assert_eq!(gate.current_environment(), None);
    }

    #[test]
    fn default_gate_reads_node_env() {
        assert_eq!(EnvVarGate::default().var(), "NODE_ENV");
    }
}
