#[allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ─── helpers ───────────────────────────────────────────────────────

struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let dir = TempDir::new().expect("create tempdir");
        Self { dir }
    }

    fn home(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskboard").expect("binary");
        cmd.current_dir(self.dir.path())
            .env("TASKBOARD_HOME", self.dir.path())
            .env_remove("RUST_LOG");
        cmd
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let mut a: Vec<&str> = args.to_vec();
        a.push("--json");
        let output = self.cmd().args(&a).output().expect("run");
        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&stdout)
            .unwrap_or_else(|e| panic!("parse JSON failed: {e}\nstdout: {stdout}"))
    }

    fn run_ok(&self, args: &[&str]) -> Value {
        let v = self.run_json(args);
        assert_eq!(v["success"], true, "expected success=true: {v}");
        v
    }

    fn run_err(&self, args: &[&str]) -> Value {
        let v = self.run_json(args);
        assert_eq!(v["success"], false, "expected success=false: {v}");
        v
    }

    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let p = self.dir.path().join(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&p, content).expect("write file");
        p
    }

    fn store_raw(&self) -> String {
        fs::read_to_string(self.dir.path().join("tasks.json")).expect("read store")
    }

    fn add(&self, args: &[&str]) -> String {
        let mut a = vec!["task", "add"];
        a.extend_from_slice(args);
        let v = self.run_ok(&a);
        v["data"]["task"]["id"].as_str().unwrap().to_string()
    }

    /// Only the cron file and memory dir are enabled, so no external program runs.
    fn configure_local_sources(&self) {
        self.write(
            "config.toml",
            r#"
[sources.cron]
enabled = true
file = "cron-jobs.json"

[sources.heartbeat]
enabled = false

[sources.memory]
enabled = true
dir = "memory"
max_age_days = 30

[sources.project]
enabled = false

[sources.github]
enabled = false
"#,
        );
    }
}

fn titles(v: &Value) -> Vec<String> {
    v["data"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect()
}

// ─── 1. init ───────────────────────────────────────────────────────

#[test]
fn test_init() {
    let env = TestEnv::new();
    let v = env.run_ok(&["init"]);
    assert_eq!(v["data"]["created"], true);
    assert_eq!(v["data"]["configWritten"], true);
    assert!(env.home().join("config.toml").exists());

    let doc: Value = serde_json::from_str(&env.store_raw()).unwrap();
    assert_eq!(doc["tasks"], serde_json::json!([]));
    assert!(doc["lastUpdated"].is_string());
}

#[test]
fn test_init_idempotent() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.add(&["Keep me"]);
    let v = env.run_ok(&["init"]);
    assert_eq!(v["data"]["created"], false);
    assert_eq!(titles(&env.run_ok(&["task", "list"])), vec!["Keep me"]);
}

#[test]
fn test_init_required_before_commands() {
    let env = TestEnv::new();
    let v = env.run_err(&["task", "list"]);
    assert_eq!(v["error"]["code"], "NOT_INITIALIZED");

    env.cmd()
        .args(["stats"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_home_flag_overrides_env() {
    let env = TestEnv::new();
    let other = TempDir::new().unwrap();
    let home = other.path().to_str().unwrap();
    env.run_ok(&["init", "--home", home]);
    assert!(other.path().join("tasks.json").exists());
    assert!(!env.home().join("tasks.json").exists());
}

// ─── 2. task CRUD ──────────────────────────────────────────────────

#[test]
fn test_task_add_and_show() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    let v = env.run_ok(&[
        "task",
        "add",
        "Renew passport",
        "--description",
        "before June",
        "--priority",
        "high",
        "--category",
        "maintenance",
        "--tag",
        "admin",
        "--tag",
        "Admin",
        "--due",
        "2025-06-01",
    ]);
    let task = &v["data"]["task"];
    assert_eq!(task["status"], "backlog");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["category"], "maintenance");
    assert_eq!(task["source"], "manual");
    assert_eq!(task["tags"], serde_json::json!(["admin"]));
    assert_eq!(task["dueDate"], "2025-06-01");
    assert!(task["completedAt"].is_null());

    let id = task["id"].as_str().unwrap();
    let shown = env.run_ok(&["task", "show", id]);
    assert_eq!(shown["data"]["task"]["title"], "Renew passport");
    assert_eq!(shown["data"]["task"]["description"], "before June");
}

#[test]
fn test_task_add_validation() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    assert_eq!(env.run_err(&["task", "add", "   "])["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(
        env.run_err(&["task", "add", "x", "--priority", "whenever"])["error"]["code"],
        "VALIDATION_ERROR"
    );
    assert_eq!(
        env.run_err(&["task", "add", "x", "--due", "next week"])["error"]["code"],
        "VALIDATION_ERROR"
    );
    assert!(titles(&env.run_ok(&["task", "list"])).is_empty());
}

#[test]
fn test_task_update_status_tracks_completion() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    let id = env.add(&["Write report", "--status", "todo"]);

    let v = env.run_ok(&["task", "update", &id, "--status", "done"]);
    assert_eq!(v["data"]["task"]["status"], "done");
    assert!(v["data"]["task"]["completedAt"].is_string());

    let v = env.run_ok(&["task", "update", &id, "--status", "in progress", "--due", "2025-01-31"]);
    assert_eq!(v["data"]["task"]["status"], "in-progress");
    assert!(v["data"]["task"]["completedAt"].is_null());
    assert_eq!(v["data"]["task"]["dueDate"], "2025-01-31");

    let v = env.run_ok(&["task", "update", &id, "--clear-due"]);
    assert!(v["data"]["task"]["dueDate"].is_null());
    assert_eq!(v["data"]["task"]["id"], id.as_str());
}

#[test]
fn test_task_update_errors() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    let id = env.add(&["Something"]);
    assert_eq!(env.run_err(&["task", "update", &id])["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(
        env.run_err(&["task", "update", "nope", "--status", "done"])["error"]["code"],
        "TASK_NOT_FOUND"
    );
    assert_eq!(env.run_err(&["task", "show", "nope"])["error"]["code"], "TASK_NOT_FOUND");
}

#[test]
fn test_task_list_filters() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.add(&["Gym", "--status", "todo", "--tag", "daily"]);
    env.add(&["Email landlord", "--status", "done", "--category", "communication"]);
    env.add(&["Fix bike", "--priority", "urgent"]);

    assert_eq!(titles(&env.run_ok(&["task", "list", "--status", "todo"])), vec!["Gym"]);
    assert_eq!(titles(&env.run_ok(&["task", "list", "--tag", "DAILY"])), vec!["Gym"]);
    assert_eq!(
        titles(&env.run_ok(&["task", "list", "--category", "communication"])),
        vec!["Email landlord"]
    );
    assert_eq!(
        titles(&env.run_ok(&["task", "list", "--priority", "urgent"])),
        vec!["Fix bike"]
    );
    assert_eq!(env.run_ok(&["task", "list", "--source", "manual"])["data"]["count"], 3);
    assert_eq!(env.run_ok(&["task", "list", "--source", "cron"])["data"]["count"], 0);
}

#[test]
fn test_delete_and_bulk_update() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    let a = env.add(&["A"]);
    let b = env.add(&["B"]);
    let c = env.add(&["C"]);

    let v = env.run_ok(&["task", "bulk-update", &a, &b, "ghost", "--status", "done", "--priority", "low"]);
    assert_eq!(v["data"]["affected"], 2);
    assert_eq!(v["data"]["missing"], serde_json::json!(["ghost"]));
    let done = env.run_ok(&["task", "list", "--status", "done"]);
    assert_eq!(titles(&done), vec!["A", "B"]);
    assert!(done["data"]["tasks"][0]["completedAt"].is_string());

    let v = env.run_ok(&["task", "delete", &a, &c]);
    assert_eq!(v["data"]["affected"], 2);
    assert_eq!(titles(&env.run_ok(&["task", "list"])), vec!["B"]);

    assert_eq!(env.run_err(&["task", "delete", &a])["error"]["code"], "TASK_NOT_FOUND");
    assert_eq!(
        env.run_err(&["task", "bulk-update", &b])["error"]["code"],
        "VALIDATION_ERROR"
    );
}

// ─── 3. search & stats ─────────────────────────────────────────────

#[test]
fn test_search() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.add(&["Buy milk", "--tag", "groceries"]);
    env.add(&["Call plumber", "--description", "kitchen SINK leaks"]);
    env.add(&["Read book"]);

    assert_eq!(titles(&env.run_ok(&["search", "MILK"])), vec!["Buy milk"]);
    assert_eq!(titles(&env.run_ok(&["search", "sink"])), vec!["Call plumber"]);
    assert_eq!(titles(&env.run_ok(&["search", "grocer"])), vec!["Buy milk"]);
    assert!(titles(&env.run_ok(&["search", "zebra"])).is_empty());
    assert_eq!(env.run_err(&["search", "  "])["error"]["code"], "VALIDATION_ERROR");
}

#[test]
fn test_stats() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    let a = env.add(&["A", "--status", "todo"]);
    env.add(&["B", "--priority", "urgent"]);
    env.run_ok(&["task", "update", &a, "--status", "done"]);

    let v = env.run_ok(&["stats"]);
    let d = &v["data"];
    assert_eq!(d["total"], 2);
    assert_eq!(d["byStatus"]["done"], 1);
    assert_eq!(d["byStatus"]["backlog"], 1);
    assert_eq!(d["byStatus"]["in-progress"], 0);
    assert_eq!(d["byPriority"]["urgent"], 1);
    assert_eq!(d["byCategory"]["project"], 2);
    assert_eq!(d["completedToday"], 1);
    assert_eq!(d["completedThisWeek"], 1);
}

// ─── 4. store robustness ───────────────────────────────────────────

#[test]
fn test_malformed_store_fails_every_request() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.write("tasks.json", "{\"tasks\": [ oops");

    assert_eq!(env.run_err(&["task", "list"])["error"]["code"], "MALFORMED_STORE");
    assert_eq!(env.run_err(&["task", "add", "x"])["error"]["code"], "MALFORMED_STORE");
    assert_eq!(env.run_err(&["sync"])["error"]["code"], "MALFORMED_STORE");
    assert_eq!(env.store_raw(), "{\"tasks\": [ oops");
}

#[test]
fn test_bare_array_store_is_accepted_and_rewritten_wrapped() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.write(
        "tasks.json",
        r#"[{"id": "legacy-1", "title": "Old task", "status": "todo", "priority": "high",
            "category": "project", "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z", "cronJobId": "x"}]"#,
    );

    assert_eq!(titles(&env.run_ok(&["task", "list"])), vec!["Old task"]);
    env.run_ok(&["task", "update", "legacy-1", "--status", "done"]);

    let doc: Value = serde_json::from_str(&env.store_raw()).unwrap();
    assert_eq!(doc["tasks"][0]["status"], "done");
    assert_eq!(doc["tasks"][0]["cronJobId"], "x");
    assert_eq!(doc["tasks"][0]["source"], "cron");
    assert_eq!(doc["tasks"][0]["metadata"]["cronId"], "x");
    assert!(doc["lastUpdated"].is_string());
}

// ─── 5. sync ───────────────────────────────────────────────────────

#[test]
fn test_sync_imports_cron_and_memory() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.configure_local_sources();
    env.write(
        "cron-jobs.json",
        r#"{"jobs": [
            {"id": "7", "name": "Gym - 19:00", "enabled": true,
             "schedule": {"kind": "cron", "expr": "0 19 * * *"}},
            {"id": "8", "name": "Old Backup", "enabled": false}
        ]}"#,
    );
    env.write("memory/2025-01-01.md", "# Today\n- [x] Buy milk\nTODO: call the bank\n");

    let v = env.run_ok(&["sync"]);
    assert_eq!(v["data"]["added"], 4);
    assert_eq!(v["data"]["saved"], true);

    let gym = env.run_ok(&["search", "gym"]);
    let gym = &gym["data"]["tasks"][0];
    assert_eq!(gym["source"], "cron");
    assert_eq!(gym["status"], "todo");
    assert_eq!(gym["metadata"]["cronId"], "7");
    assert_eq!(gym["tags"], serde_json::json!(["cron", "daily"]));

    let backup = env.run_ok(&["search", "backup"]);
    assert_eq!(backup["data"]["tasks"][0]["status"], "backlog");

    let milk = env.run_ok(&["search", "milk"]);
    assert_eq!(milk["data"]["tasks"][0]["title"], "Buy milk");
    assert_eq!(milk["data"]["tasks"][0]["status"], "done");
    assert!(milk["data"]["tasks"][0]["completedAt"].is_string());
}

#[test]
fn test_sync_is_idempotent_and_leaves_manual_tasks_alone() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.configure_local_sources();
    env.write("cron-jobs.json", r#"[{"id": "5", "name": "Backup", "enabled": true}]"#);
    fs::create_dir_all(env.home().join("memory")).unwrap();
    let manual = env.add(&["Backup", "--status", "in-progress"]);

    env.run_ok(&["sync"]);
    let after_first = env.store_raw();

    let v = env.run_ok(&["sync"]);
    assert_eq!(v["data"]["added"], 0);
    assert_eq!(v["data"]["updated"], 0);
    assert_eq!(v["data"]["saved"], false);
    assert_eq!(env.store_raw(), after_first);

    let shown = env.run_ok(&["task", "show", &manual]);
    assert_eq!(shown["data"]["task"]["status"], "in-progress");
    assert_eq!(shown["data"]["task"]["source"], "manual");
    assert_eq!(env.run_ok(&["task", "list"])["data"]["count"], 2);
}

#[test]
fn test_sync_status_change_then_done_is_final() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.configure_local_sources();
    fs::create_dir_all(env.home().join("memory")).unwrap();
    env.write("cron-jobs.json", r#"[{"id": "5", "name": "Backup", "enabled": false}]"#);
    env.run_ok(&["sync"]);

    env.write("cron-jobs.json", r#"[{"id": "5", "name": "Backup renamed", "enabled": true}]"#);
    let v = env.run_ok(&["sync"]);
    assert_eq!(v["data"]["updated"], 1);
    let list = env.run_ok(&["task", "list", "--source", "cron"]);
    assert_eq!(titles(&list), vec!["Backup"]);
    assert_eq!(list["data"]["tasks"][0]["status"], "todo");

    let id = list["data"]["tasks"][0]["id"].as_str().unwrap().to_string();
    env.run_ok(&["task", "update", &id, "--status", "done"]);
    env.write("cron-jobs.json", r#"[{"id": "5", "name": "Backup", "enabled": false}]"#);
    let v = env.run_ok(&["sync"]);
    assert_eq!(v["data"]["updated"], 0);
    assert_eq!(env.run_ok(&["task", "show", &id])["data"]["task"]["status"], "done");
}

#[test]
fn test_sync_dry_run_and_unavailable_source() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.configure_local_sources();
    // memory dir missing: that source yields nothing, cron still syncs
    env.write("cron-jobs.json", r#"[{"id": "1", "name": "Backup", "enabled": true}]"#);
    let before = env.store_raw();

    let v = env.run_ok(&["sync", "--dry-run"]);
    assert_eq!(v["data"]["added"], 1);
    assert_eq!(v["data"]["dryRun"], true);
    assert_eq!(env.store_raw(), before);

    let v = env.run_ok(&["sync", "--source", "cron"]);
    assert_eq!(v["data"]["added"], 1);
    assert_eq!(v["data"]["sources"].as_array().unwrap().len(), 1);

    assert_eq!(
        env.run_err(&["sync", "--source", "email"])["error"]["code"],
        "VALIDATION_ERROR"
    );
}

#[test]
fn test_bad_config_is_config_error() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.write("config.toml", "[sync\ninterval_secs = ");
    assert_eq!(env.run_err(&["task", "list"])["error"]["code"], "CONFIG_ERROR");
}

// ─── 6. maintenance ────────────────────────────────────────────────

#[test]
fn test_maint_tag_and_reset_daily() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    let gym = env.add(&["Gym session", "--status", "done"]);
    env.add(&["Read novel", "--status", "done"]);

    let v = env.run_ok(&["maint", "tag-daily"]);
    assert_eq!(v["data"]["tagged"], 1);

    let v = env.run_ok(&["maint", "reset-daily"]);
    assert_eq!(v["data"]["reset"], 1);
    let shown = env.run_ok(&["task", "show", &gym]);
    assert_eq!(shown["data"]["task"]["status"], "todo");
    assert!(shown["data"]["task"]["completedAt"].is_null());

    assert_eq!(env.run_ok(&["task", "list", "--status", "done"])["data"]["count"], 1);
}

#[test]
fn test_maint_dedupe() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.write(
        "tasks.json",
        r#"{"tasks": [
            {"id": "1", "title": "Gym", "source": "cron", "metadata": {"cronId": "7"},
             "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"},
            {"id": "2", "title": "Gym again", "source": "cron", "metadata": {"cronId": "7"},
             "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"},
            {"id": "3", "title": "Gym", "source": "manual",
             "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"}
        ]}"#,
    );
    let v = env.run_ok(&["maint", "dedupe"]);
    assert_eq!(v["data"]["removed"], 1);
    assert_eq!(v["data"]["tasks"][0]["id"], "2");
    assert_eq!(env.run_ok(&["task", "list"])["data"]["count"], 2);
}

// ─── 7. notifications ──────────────────────────────────────────────

#[test]
fn test_notify_appends_to_queue() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    let v = env.run_ok(&["notify", "Ship release"]);
    assert_eq!(v["data"]["notification"]["message"], "🚀 Task started: Ship release");
    env.run_ok(&["notify", "Ship release", "--status", "done"]);

    let raw = fs::read_to_string(env.home().join("task-notifications.queue")).unwrap();
    let lines: Vec<Value> = raw.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["taskTitle"], "Ship release");
    assert_eq!(lines[1]["status"], "done");
    assert_eq!(lines[1]["message"], "✅ Task completed: Ship release");
}

#[test]
fn test_text_output() {
    let env = TestEnv::new();
    env.cmd()
        .args(["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized taskboard"));
    env.cmd()
        .args(["task", "add", "Water plants"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added task: Water plants"));
    env.cmd()
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[backlog] Water plants"));
}
