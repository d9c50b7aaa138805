use std::env;
use std::sync::{Mutex, OnceLock};

use freeflow_cli::commands::{config, doctor, migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_against_in_memory_database() {
    with_env(
        &[("FREEFLOW_DATABASE_URL", "sqlite::memory:"), ("FREEFLOW_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
        },
    );
}

#[test]
fn migrate_returns_config_failure_for_invalid_database_url() {
    with_env(&[("FREEFLOW_DATABASE_URL", "postgres://nope")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_reports_one_project_per_pipeline_stage() {
    with_env(
        &[
            ("FREEFLOW_DATABASE_URL", "sqlite://cli_seed?mode=memory&cache=shared"),
            ("FREEFLOW_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "expected seed success");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "seed");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("  - Intake: seed-project-intake"));
            assert!(message.contains("  - Contract: seed-project-contract"));
            assert!(message.contains("  - Billing: seed-project-billing"));
        },
    );
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_env(
        &[
            ("FREEFLOW_DATABASE_URL", "sqlite://cli_seed_twice?mode=memory&cache=shared"),
            ("FREEFLOW_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let first = seed::run();
            assert_eq!(first.exit_code, 0, "expected first seed invocation success");

            let second = seed::run();
            assert_eq!(second.exit_code, 0, "expected second seed invocation success");

            let first_payload = parse_payload(&first.output);
            let second_payload = parse_payload(&second.output);
            assert_eq!(first_payload["message"], second_payload["message"]);
        },
    );
}

#[test]
fn doctor_passes_with_reachable_in_memory_database() {
    with_env(
        &[("FREEFLOW_DATABASE_URL", "sqlite::memory:"), ("FREEFLOW_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let output = doctor::run(true);
            let payload = parse_payload(&output);
            assert_eq!(payload["overall_status"], "pass");

            let checks = payload["checks"].as_array().expect("checks array");
            let names: Vec<&str> =
                checks.iter().filter_map(|check| check["name"].as_str()).collect();
            assert!(names.contains(&"config_validation"));
            assert!(names.contains(&"llm_readiness"));
            assert!(names.contains(&"database_connectivity"));
        },
    );
}

#[test]
fn config_lists_effective_values_with_sources() {
    with_env(&[("FREEFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let output = config::run();

        assert!(output.contains("database.url = sqlite::memory:"));
        assert!(output.contains("env FREEFLOW_DATABASE_URL"));
        assert!(output.contains("llm.provider = Ollama"));
        assert!(output.contains("(default)"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FREEFLOW_CONFIG",
        "FREEFLOW_DATABASE_URL",
        "FREEFLOW_DATABASE_MAX_CONNECTIONS",
        "FREEFLOW_DATABASE_TIMEOUT_SECS",
        "FREEFLOW_LLM_PROVIDER",
        "FREEFLOW_LLM_API_KEY",
        "FREEFLOW_LLM_BASE_URL",
        "FREEFLOW_LLM_MODEL",
        "FREEFLOW_LLM_TIMEOUT_SECS",
        "FREEFLOW_SERVER_BIND_ADDRESS",
        "FREEFLOW_SERVER_PORT",
        "FREEFLOW_SERVER_HEALTH_CHECK_PORT",
        "FREEFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "FREEFLOW_LOGGING_LEVEL",
        "FREEFLOW_LOGGING_FORMAT",
        "FREEFLOW_LOG_LEVEL",
        "FREEFLOW_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
