//! Environment builder for the backend process.

use std::collections::BTreeMap;
use std::ffi::OsString;

use crate::config::BackendConfig;

/// Full environment handed to the backend: a copy of a base environment with
/// the configured overrides applied on top.
#[derive(Debug, Clone, Default)]
pub struct BackendEnv {
    vars: BTreeMap<OsString, OsString>,
}

impl BackendEnv {
    /// Start from the current process environment.
    pub fn inherit() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    /// Start from an explicit set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Set or replace one variable.
    pub fn set(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Apply the mode flag, the listening port and any extra variables.
    ///
    /// Extra variables are applied last and may override the other two.
    pub fn with_overrides(self, config: &BackendConfig) -> Self {
        let mut env = self
            .set(&config.mode_var, &config.mode)
            .set(&config.port_var, config.port.to_string());
        for (key, value) in &config.env {
            env = env.set(key, value);
        }
        env
    }

    pub fn get(&self, key: &str) -> Option<&OsString> {
        self.vars.get(&OsString::from(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsString, &OsString)> {
        self.vars.iter()
    }
}
