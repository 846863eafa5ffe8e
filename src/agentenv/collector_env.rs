//! Environment collector: runtime and host information.

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::process::Command;

use crate::agentenv::collector::Collector;

pub const ENVIRONMENT_COLLECTOR_NAME: &str = "environment";

pub struct EnvironmentCollector {
    env_vars: Vec<String>,
}

impl EnvironmentCollector {
    pub fn new(env_vars: Vec<String>) -> Self {
        Self { env_vars }
    }
}

impl Collector for EnvironmentCollector {
    fn name(&self) -> &str {
        ENVIRONMENT_COLLECTOR_NAME
    }

    fn priority(&self) -> i32 {
        20
    }

    fn collect(&self) -> Result<Map<String, Value>> {
        let mut result = Map::new();

        let ci = std::env::var("CI").unwrap_or_default();
        result.insert("is_ci".into(), json!(ci == "true"));
        result.insert("ci_mode".into(), json!(ci));
        result.insert("os".into(), json!(std::env::consts::OS));
        result.insert("arch".into(), json!(std::env::consts::ARCH));
        result.insert(
            "runtime_version".into(),
            json!(format!("rust {}", env!("CARGO_PKG_RUST_VERSION"))),
        );
        result.insert(
            "num_cpu".into(),
            json!(std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)),
        );

        let now = Utc::now();
        result.insert("timestamp".into(), json!(now.timestamp()));
        result.insert("timestamp_iso".into(), json!(now.to_rfc3339()));

        if let Ok(wd) = std::env::current_dir() {
            result.insert("working_dir".into(), json!(wd.display().to_string()));
        }
        if let Some(hostname) = hostname() {
            result.insert("hostname".into(), json!(hostname));
        }
        if let Ok(user) = std::env::var("USER") {
            result.insert("user".into(), json!(user));
        }
        if let Ok(home) = std::env::var("HOME") {
            result.insert("user_home".into(), json!(home));
        }

        for key in &self.env_vars {
            if let Ok(value) = std::env::var(key) {
                if !value.is_empty() {
                    result.insert(key.clone(), json!(value));
                }
            }
        }

        Ok(result)
    }
}

fn hostname() -> Option<String> {
    let output = Command::new("hostname").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_base_fields() {
        let data = EnvironmentCollector::new(vec![]).collect().unwrap();
        assert!(data.contains_key("os"));
        assert!(data.contains_key("arch"));
        assert!(data.contains_key("num_cpu"));
        assert!(data.contains_key("timestamp"));
        assert!(data.contains_key("timestamp_iso"));
        assert!(data.contains_key("is_ci"));
    }

    #[test]
    fn requested_env_vars_are_included_when_set() {
        std::env::set_var("DEVX_COLLECTOR_TEST_VAR", "42");
        let data = EnvironmentCollector::new(vec!["DEVX_COLLECTOR_TEST_VAR".to_string()])
            .collect()
            .unwrap();
        assert_eq!(data["DEVX_COLLECTOR_TEST_VAR"], "42");
    }
}
