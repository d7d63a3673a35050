//! Invocation description for pipe-attached children
//!
//! An [`Invocation`] is built once and immutable from the moment it is
//! spawned: builder methods consume `self`, and the spawn path only ever
//! borrows it.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::utils::{SearchPath, is_env_true};

/// How the child's standard error stream is wired up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrMode {
    /// Child stderr joins the invoking process's stderr
    Inherit,
    /// Child stderr goes to the null sink; launch diagnostics are still
    /// printed by the spawning side
    Null,
    /// Child stderr goes to the null sink and launch diagnostics are
    /// suppressed as well
    Discard,
}

/// Whether the pipe carries output only, or input and output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeMode {
    /// Capture the child's output; its input is left attached to the caller
    Read,
    /// Feed the child's input and capture its output through one handle
    ReadWrite,
}

/// Settings resolved once at the call boundary
///
/// The stderr default is an externally observed toggle (`LADLE_STDERR`); it
/// is read here, when the configuration is constructed, never implicitly at
/// spawn depth.
#[derive(Debug, Clone, Default)]
pub struct ExecConfig {
    /// Leave child stderr attached to the caller instead of the null sink
    pub inherit_stderr: bool,
}

impl ExecConfig {
    /// Resolve the configuration from the process environment
    pub fn from_env() -> Self {
        ExecConfig {
            inherit_stderr: is_env_true("LADLE_STDERR"),
        }
    }
}

/// One command to run: argv tokens plus redirection and environment options
#[derive(Debug, Clone)]
pub struct Invocation {
    argv: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    stderr: StderrMode,
    path_prepends: SearchPath,
}

impl Invocation {
    /// Build an invocation from an ordered token list, the first token being
    /// the executable name
    ///
    /// The stderr default comes from [`ExecConfig::from_env`].
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(argv, &ExecConfig::from_env())
    }

    /// Build an invocation with an explicit configuration
    pub fn with_config<I, S>(argv: I, config: &ExecConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            argv: argv.into_iter().map(Into::into).collect(),
            env: HashMap::new(),
            cwd: None,
            stderr: if config.inherit_stderr {
                StderrMode::Inherit
            } else {
                StderrMode::Null
            },
            path_prepends: SearchPath::default(),
        }
    }

    /// Set an environment variable for the child
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the child's working directory
    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Override the stderr disposition
    pub fn stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }

    /// Prepend an entry to the child's `PATH`
    pub fn prepend_path<S: AsRef<str>>(mut self, entry: S) -> Self {
        self.path_prepends.append([entry.as_ref()]);
        self
    }

    /// The full argument vector
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// The executable name (first token), if any
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// The arguments after the executable name
    pub(crate) fn args(&self) -> &[String] {
        if self.argv.is_empty() { &[] } else { &self.argv[1..] }
    }

    /// Environment overrides for the child
    pub(crate) fn env_overrides(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// The child's working directory, if overridden
    pub(crate) fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// The stderr disposition
    pub fn stderr_mode(&self) -> StderrMode {
        self.stderr
    }

    /// Assemble the child's `PATH` entry: prepends first, then the value from
    /// the env overrides or the parent environment, deduplicated in order
    ///
    /// `None` when no prepends were requested, leaving `PATH` untouched.
    pub(crate) fn build_path_env(&self) -> Option<String> {
        if self.path_prepends.is_empty() {
            return None;
        }
        let mut path = self.path_prepends.clone();
        if let Some(current) = self
            .env
            .get("PATH")
            .cloned()
            .or_else(|| env::var("PATH").ok())
        {
            path.append([current.as_str()]);
        }
        Some(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{ExecConfig, Invocation, StderrMode};

    fn plain_config() -> ExecConfig {
        ExecConfig {
            inherit_stderr: false,
        }
    }

    #[test]
    fn test_argv_order_preserved() {
        let inv = Invocation::with_config(["tr", "a-z", "A-Z"], &plain_config());
        assert_eq!(inv.program(), Some("tr"));
        assert_eq!(inv.args(), ["a-z", "A-Z"]);
    }

    #[test]
    fn test_stderr_default_from_config() {
        let inv = Invocation::with_config(["true"], &plain_config());
        assert_eq!(inv.stderr_mode(), StderrMode::Null);

        let inherit = ExecConfig {
            inherit_stderr: true,
        };
        let inv = Invocation::with_config(["true"], &inherit);
        assert_eq!(inv.stderr_mode(), StderrMode::Inherit);
    }

    #[test]
    fn test_explicit_stderr_overrides_default() {
        let inv = Invocation::with_config(["true"], &plain_config()).stderr(StderrMode::Discard);
        assert_eq!(inv.stderr_mode(), StderrMode::Discard);
    }

    #[test]
    fn test_path_env_prepends_before_existing_value() {
        let inv = Invocation::with_config(["tool"], &plain_config())
            .env("PATH", "/usr/bin:/bin")
            .prepend_path("/opt/tool/bin");
        assert_eq!(
            inv.build_path_env().as_deref(),
            Some("/opt/tool/bin:/usr/bin:/bin")
        );
    }

    #[test]
    fn test_path_env_untouched_without_prepends() {
        let inv = Invocation::with_config(["tool"], &plain_config()).env("PATH", "/bin");
        assert_eq!(inv.build_path_env(), None);
    }

    #[test]
    fn test_empty_program() {
        let inv = Invocation::with_config(Vec::<String>::new(), &plain_config());
        assert_eq!(inv.program(), None);
        assert!(inv.args().is_empty());
    }
}
