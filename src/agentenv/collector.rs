//! Template context collection.
//!
//! A collector contributes one named submap to the template context.
//! The manager runs collectors sequentially in ascending priority order
//! (registration order breaks ties); a failing collector is logged and
//! skipped, and empty results are omitted from the final context.

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::warn;

pub trait Collector: Send + Sync {
    fn name(&self) -> &str;
    /// Merge-order hint, lower first. Not a schedule.
    fn priority(&self) -> i32;
    fn collect(&self) -> Result<Map<String, Value>>;
}

#[derive(Default)]
pub struct Manager {
    collectors: Vec<Box<dyn Collector>>,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    /// Run all collectors and build the combined context.
    pub fn collect(&mut self) -> Map<String, Value> {
        self.collectors.sort_by_key(|c| c.priority());

        let mut result = Map::new();
        for collector in &self.collectors {
            match collector.collect() {
                Ok(data) if data.is_empty() => {}
                Ok(data) => {
                    result.insert(collector.name().to_string(), Value::Object(data));
                }
                Err(err) => {
                    warn!(collector = collector.name(), error = %err, "collector failed");
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use serde_json::json;

    struct Fixed {
        name: &'static str,
        priority: i32,
        value: Option<Value>,
    }

    impl Collector for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn collect(&self) -> Result<Map<String, Value>> {
            match &self.value {
                Some(v) => Ok(v.as_object().cloned().unwrap_or_default()),
                None => bail!("boom"),
            }
        }
    }

    #[test]
    fn results_are_nested_under_collector_name() {
        let mut manager = Manager::new();
        manager.register(Box::new(Fixed {
            name: "project",
            priority: 5,
            value: Some(json!({"name": "demo"})),
        }));
        let ctx = manager.collect();
        assert_eq!(ctx["project"]["name"], "demo");
    }

    #[test]
    fn failures_are_skipped() {
        let mut manager = Manager::new();
        manager.register(Box::new(Fixed {
            name: "broken",
            priority: 1,
            value: None,
        }));
        manager.register(Box::new(Fixed {
            name: "ok",
            priority: 2,
            value: Some(json!({"k": 1})),
        }));
        let ctx = manager.collect();
        assert!(!ctx.contains_key("broken"));
        assert!(ctx.contains_key("ok"));
    }

    #[test]
    fn empty_results_are_omitted() {
        let mut manager = Manager::new();
        manager.register(Box::new(Fixed {
            name: "empty",
            priority: 1,
            value: Some(json!({})),
        }));
        assert!(manager.collect().is_empty());
    }
}
