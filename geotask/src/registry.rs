//! Static task-type registry.
//!
//! The workflow engine refers to task implementations by a string code. The
//! registry is an explicit table built at startup mapping each code to a
//! factory; there is no runtime discovery.

use std::collections::HashMap;

use tracing::debug;

use crate::client::{ClientError, ReqwestHttpClient};
use crate::executor::TaskExecutor;
use crate::settings::{ExecutionSettings, PluginConfig};

/// Code of the built-in FME Server extraction task.
pub const FME_SERVER_CODE: &str = "FMESERVER";

/// Builds a ready-to-run executor for one task type.
pub type TaskFactory =
    fn(ExecutionSettings, PluginConfig) -> Result<TaskExecutor<ReqwestHttpClient>, ClientError>;

/// Table of known task types.
pub struct TaskRegistry {
    entries: HashMap<&'static str, TaskFactory>,
}

impl TaskRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers `factory` under `code`, replacing any previous entry.
    pub fn register(&mut self, code: &'static str, factory: TaskFactory) {
        debug!(code, "registering task type");
        self.entries.insert(code, factory);
    }

    /// Whether `code` is a known task type.
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Registered task codes, for diagnostics.
    pub fn codes(&self) -> Vec<&'static str> {
        let mut codes: Vec<_> = self.entries.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    /// Instantiates the executor registered under `code`.
    pub fn create(
        &self,
        code: &str,
        settings: ExecutionSettings,
        config: PluginConfig,
    ) -> Option<Result<TaskExecutor<ReqwestHttpClient>, ClientError>> {
        self.entries
            .get(code)
            .map(|factory| factory(settings, config))
    }
}

impl Default for TaskRegistry {
    /// The registry with the built-in task types.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(FME_SERVER_CODE, fme_server_factory);
        registry
    }
}

fn fme_server_factory(
    settings: ExecutionSettings,
    config: PluginConfig,
) -> Result<TaskExecutor<ReqwestHttpClient>, ClientError> {
    let http = ReqwestHttpClient::new(config.connect_timeout, config.request_timeout)?;
    Ok(TaskExecutor::new(http, settings).with_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Auth, ExecutionMode};

    fn settings() -> ExecutionSettings {
        ExecutionSettings {
            service_url: "https://fme.example.org/fmedatadownload/ws.fmw".to_string(),
            auth: Auth::Token("t".to_string()),
            geojson_parameter: "GEOJSON_INPUT".to_string(),
            mode: ExecutionMode::Sync,
        }
    }

    #[test]
    fn test_builtin_task_registered() {
        let registry = TaskRegistry::default();
        assert!(registry.contains(FME_SERVER_CODE));
        assert_eq!(registry.codes(), vec![FME_SERVER_CODE]);
    }

    #[test]
    fn test_builtin_factory_builds_an_executor() {
        let registry = TaskRegistry::default();
        let executor = registry.create(FME_SERVER_CODE, settings(), PluginConfig::default());
        assert!(matches!(executor, Some(Ok(_))));
    }

    #[test]
    fn test_unknown_code_yields_none() {
        let registry = TaskRegistry::default();
        assert!(registry
            .create("NO_SUCH_TASK", settings(), PluginConfig::default())
            .is_none());
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = TaskRegistry::new();
        registry.register("CUSTOM", fme_server_factory);
        assert!(registry.contains("CUSTOM"));
        assert!(!registry.contains(FME_SERVER_CODE));
    }
}
