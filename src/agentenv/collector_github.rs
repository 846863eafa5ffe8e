//! GitHub Actions collector: workflow context from the runner environment.
//!
//! Active only when `GITHUB_ACTIONS=true`; otherwise yields an empty map
//! and is omitted from the context.

use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::agentenv::collector::Collector;

pub const GITHUB_ACTIONS_COLLECTOR_NAME: &str = "github_actions";

pub struct GitHubActionsCollector;

impl GitHubActionsCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GitHubActionsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn env(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

fn insert_if_set(map: &mut Map<String, Value>, key: &str, value: String) {
    if !value.is_empty() {
        map.insert(key.to_string(), json!(value));
    }
}

impl Collector for GitHubActionsCollector {
    fn name(&self) -> &str {
        GITHUB_ACTIONS_COLLECTOR_NAME
    }

    fn priority(&self) -> i32 {
        30
    }

    fn collect(&self) -> Result<Map<String, Value>> {
        let mut result = Map::new();

        if env("GITHUB_ACTIONS") != "true" {
            return Ok(result);
        }

        collect_basic_info(&mut result);
        collect_repository_info(&mut result);
        collect_event_info(&mut result);
        collect_pr_issue_info(&mut result);
        collect_actor_info(&mut result);
        collect_workflow_info(&mut result);
        collect_runner_info(&mut result);
        derive_build_url(&mut result);

        Ok(result)
    }
}

fn collect_basic_info(result: &mut Map<String, Value>) {
    let vars = [
        ("action", "GITHUB_ACTION"),
        ("action_path", "GITHUB_ACTION_PATH"),
        ("actor", "GITHUB_ACTOR"),
        ("api_url", "GITHUB_API_URL"),
        ("base_ref", "GITHUB_BASE_REF"),
        ("event_name", "GITHUB_EVENT_NAME"),
        ("event_path", "GITHUB_EVENT_PATH"),
        ("head_ref", "GITHUB_HEAD_REF"),
        ("job", "GITHUB_JOB"),
        ("ref", "GITHUB_REF"),
        ("ref_name", "GITHUB_REF_NAME"),
        ("ref_type", "GITHUB_REF_TYPE"),
        ("repository_owner", "GITHUB_REPOSITORY_OWNER"),
        ("run_id", "GITHUB_RUN_ID"),
        ("run_number", "GITHUB_RUN_NUMBER"),
        ("run_attempt", "GITHUB_RUN_ATTEMPT"),
        ("sha", "GITHUB_SHA"),
        ("workspace", "GITHUB_WORKSPACE"),
        ("server_url", "GITHUB_SERVER_URL"),
    ];
    for (key, var) in vars {
        insert_if_set(result, key, env(var));
    }
}

fn collect_repository_info(result: &mut Map<String, Value>) {
    let mut repo = Map::new();
    let full_name = match env("REPOSITORY") {
        name if !name.is_empty() => name,
        _ => env("GITHUB_REPOSITORY"),
    };
    insert_if_set(&mut repo, "full_name", full_name);
    insert_if_set(&mut repo, "owner", env("GITHUB_REPOSITORY_OWNER"));
    if !repo.is_empty() {
        result.insert("repository".into(), Value::Object(repo));
    }
}

fn collect_event_info(result: &mut Map<String, Value>) {
    let mut event = Map::new();
    let name = match env("EVENT_NAME") {
        n if !n.is_empty() => n,
        _ => env("GITHUB_EVENT_NAME"),
    };
    insert_if_set(&mut event, "name", name);

    let event_path = env("GITHUB_EVENT_PATH");
    if !event_path.is_empty() {
        if let Ok(data) = std::fs::read_to_string(&event_path) {
            if let Ok(payload) = serde_json::from_str::<Value>(&data) {
                event.insert("payload".into(), payload);
            }
        }
    }

    if !event.is_empty() {
        result.insert("event".into(), Value::Object(event));
    }
}

fn collect_pr_issue_info(result: &mut Map<String, Value>) {
    let is_pr = env("IS_PR").parse::<bool>().unwrap_or(false);
    let number = env("ISSUE_NUMBER").parse::<i64>().unwrap_or(0);

    if is_pr {
        let mut pr = Map::new();
        pr.insert("number".into(), json!(number));
        pr.insert("is_pr".into(), json!(true));
        insert_if_set(&mut pr, "title", env("PR_TITLE"));
        insert_if_set(&mut pr, "body", env("PR_BODY"));
        insert_if_set(&mut pr, "base", env("PR_BASE"));
        insert_if_set(&mut pr, "head", env("PR_HEAD"));
        result.insert("pull_request".into(), Value::Object(pr));
    } else if number > 0 {
        result.insert(
            "issue".into(),
            json!({"number": number, "is_pr": false}),
        );
    }

    insert_if_set(result, "user_request", env("USER_REQUEST"));
}

fn collect_actor_info(result: &mut Map<String, Value>) {
    let mut actor = Map::new();
    let login = match env("ACTOR") {
        a if !a.is_empty() => a,
        _ => env("GITHUB_ACTOR"),
    };
    insert_if_set(&mut actor, "login", login);
    insert_if_set(&mut actor, "triggering_actor", env("GITHUB_TRIGGERING_ACTOR"));
    if !actor.is_empty() {
        result.insert("actor".into(), Value::Object(actor));
    }
}

fn collect_workflow_info(result: &mut Map<String, Value>) {
    let mut workflow = Map::new();
    insert_if_set(&mut workflow, "name", env("GITHUB_WORKFLOW"));
    insert_if_set(&mut workflow, "ref", env("GITHUB_WORKFLOW_REF"));
    insert_if_set(&mut workflow, "sha", env("GITHUB_WORKFLOW_SHA"));
    if !workflow.is_empty() {
        result.insert("workflow".into(), Value::Object(workflow));
    }
}

fn collect_runner_info(result: &mut Map<String, Value>) {
    let mut runner = Map::new();
    insert_if_set(&mut runner, "name", env("RUNNER_NAME"));
    insert_if_set(&mut runner, "os", env("RUNNER_OS"));
    insert_if_set(&mut runner, "arch", env("RUNNER_ARCH"));
    insert_if_set(&mut runner, "temp_dir", env("RUNNER_TEMP"));
    insert_if_set(&mut runner, "tool_cache", env("RUNNER_TOOL_CACHE"));
    if !runner.is_empty() {
        result.insert("runner".into(), Value::Object(runner));
    }
}

fn derive_build_url(result: &mut Map<String, Value>) {
    result.insert(
        "build_url".into(),
        json!(format!(
            "{}/{}/actions/runs/{}",
            env("GITHUB_SERVER_URL"),
            env("GITHUB_REPOSITORY"),
            env("GITHUB_RUN_ID"),
        )),
    );
}
