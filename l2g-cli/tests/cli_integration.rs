mod common;

use anyhow::Result;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value;

use common::*;

fn stdout_json(output: &std::process::Output) -> Result<Value> {
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn test_cli_help_command() {
    l2g_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("simulate"));
}

#[test]
fn test_discover_lists_local_attributes() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env
        .cmd()
        .args(["--json", "discover", "--parent", "100"])
        .output()?;

    assert!(output.status.success());
    let locals = stdout_json(&output)?;
    assert_eq!(locals[0]["name"], "Cor");
    assert_eq!(locals[0]["values"], serde_json::json!(["Azul", "Preto"]));
    assert_eq!(locals[0]["used_in_children"], true);
    Ok(())
}

#[test]
fn test_discover_table_output() -> Result<()> {
    let env = TestEnvironment::new()?;

    env.cmd()
        .args(["discover", "--parent", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cor"))
        .stdout(predicate::str::contains("Azul | Preto"));
    Ok(())
}

#[test]
fn test_apply_inline_mapping() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env
        .cmd()
        .args(["--json", "apply", "--parent", "100", "--attr", "Cor:pa_cor"])
        .args(["--term", "Azul:azul", "--term", "Preto:preto", "--create-missing"])
        .output()?;

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output)?;
    assert_eq!(report["updated_attributes"], serde_json::json!(["pa_cor"]));
    assert_eq!(report["per_child_stats"]["pa_cor"]["updated"], 2);

    let snapshot = env.snapshot()?;
    assert_eq!(child_meta(&snapshot, 101, "attribute_pa_cor").as_deref(), Some("azul"));
    assert_eq!(child_meta(&snapshot, 101, "attribute_cor"), None);
    assert!(snapshot.taxonomies.iter().any(|t| t.key == "pa_cor" && t.terms.len() == 2));
    Ok(())
}

#[test]
fn test_plan_leaves_catalog_untouched() -> Result<()> {
    let env = TestEnvironment::new()?;
    let before = read(&env.catalog);

    let output = env
        .cmd()
        .args(["--json", "plan", "--parent", "100", "--attr", "Cor:pa_cor"])
        .args(["--term", "Azul:azul", "--create-missing"])
        .output()?;

    assert!(output.status.success());
    let preview = stdout_json(&output)?;
    assert_eq!(preview["attributes"][0]["will_create_attribute"], true);
    assert_eq!(preview["attributes"][0]["create_terms"], serde_json::json!(["azul"]));
    assert_eq!(read(&env.catalog), before);
    Ok(())
}

#[test]
fn test_plan_tree_output() -> Result<()> {
    let env = TestEnvironment::new()?;

    env.cmd()
        .args(["plan", "--parent", "100", "--attr", "Cor:pa_cor", "--term", "Azul:azul"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cor → pa_cor"))
        .stdout(predicate::str::contains("creation is disabled"));
    Ok(())
}

#[test]
fn test_missing_product_exits_with_validation_code() -> Result<()> {
    let env = TestEnvironment::new()?;

    env.cmd()
        .args(["discover", "--parent", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("l2g_invalid_product"));

    env.cmd()
        .args(["apply", "--parent", "999", "--attr", "Cor:pa_cor", "--create-missing"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Product 999 not found"));
    Ok(())
}

#[test]
fn test_missing_attribute_exits_with_dependency_code() -> Result<()> {
    let env = TestEnvironment::new()?;
    let before = read(&env.catalog);

    env.cmd()
        .args(["apply", "--parent", "100", "--attr", "Cor:pa_cor", "--term", "Azul:azul"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("l2g_attribute_missing"))
        .stderr(predicate::str::contains("l2g_"));

    assert_eq!(read(&env.catalog), before);
    Ok(())
}

#[test]
fn test_missing_catalog_is_reported() {
    let env = TestEnvironment::empty().unwrap();

    env.cmd()
        .args(["discover", "--parent", "100"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Catalog file not found"));
}

#[test]
fn test_mapping_input_is_required() -> Result<()> {
    let env = TestEnvironment::new()?;

    env.cmd()
        .args(["apply", "--parent", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--attr"));
    Ok(())
}

#[test]
fn test_suggest_then_apply_mapping_file() -> Result<()> {
    let env = TestEnvironment::new()?;
    let mapping = env.path("mapping.json");

    env.cmd()
        .args(["suggest", "--parent", "100", "--out"])
        .arg(&mapping)
        .assert()
        .success();

    let suggested: Value = serde_json::from_str(&read(&mapping))?;
    assert_eq!(suggested[0]["target"]["taxonomy_key"], "pa_cor");

    env.cmd()
        .args(["apply", "--parent", "100", "--mapping"])
        .arg(&mapping)
        .assert()
        .success();

    let snapshot = env.snapshot()?;
    assert_eq!(child_meta(&snapshot, 102, "attribute_pa_cor").as_deref(), Some("preto"));
    Ok(())
}

#[test]
fn test_terms_after_apply() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.cmd()
        .args(["apply", "--parent", "100", "--attr", "Cor:pa_cor"])
        .args(["--term", "Azul:azul", "--term", "Preto:preto", "--create-missing"])
        .assert()
        .success();

    let output = env
        .cmd()
        .args(["--json", "terms", "cor", "--search", "azu"])
        .output()?;

    assert!(output.status.success());
    let terms = stdout_json(&output)?;
    assert_eq!(terms.as_array().map(Vec::len), Some(1));
    assert_eq!(terms[0]["slug"], "azul");

    env.cmd()
        .args(["terms", "pa_material"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("l2g_attribute_missing"));
    Ok(())
}

#[test]
fn test_resync_after_apply() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.cmd()
        .args(["apply", "--parent", "100", "--attr", "Cor:pa_cor"])
        .args(["--term", "Azul:azul", "--term", "Preto:preto", "--create-missing"])
        .assert()
        .success();

    let output = env
        .cmd()
        .args(["--json", "resync", "--parent", "100", "--tax", "cor"])
        .output()?;

    assert!(output.status.success());
    let report = stdout_json(&output)?;
    assert_eq!(report["per_taxonomy"]["pa_cor"]["reasons"]["already_ok"], 2);
    assert_eq!(report["aggregate"]["updated"], 0);
    Ok(())
}

#[test]
fn test_backup_and_rollback() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env
        .cmd()
        .args(["--json", "apply", "--parent", "100", "--attr", "Cor:pa_cor"])
        .args(["--term", "Azul:azul", "--term", "Preto:preto", "--create-missing", "--backup"])
        .output()?;
    assert!(output.status.success());
    let report = stdout_json(&output)?;
    let backup = report["backup_id"].as_str().unwrap_or_default().to_string();
    assert!(!backup.is_empty());

    env.cmd()
        .args(["backups", "--parent", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains(backup.as_str()));

    env.cmd()
        .args(["rollback", "--parent", "100", "--backup", &backup])
        .assert()
        .success();

    let snapshot = env.snapshot()?;
    assert_eq!(child_meta(&snapshot, 101, "attribute_cor").as_deref(), Some("Azul"));
    assert_eq!(child_meta(&snapshot, 101, "attribute_pa_cor"), None);

    env.cmd()
        .args(["rollback", "--parent", "100", "--backup", &backup])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    Ok(())
}

#[test]
fn test_simulate_creates_catalog() -> Result<()> {
    let env = TestEnvironment::empty()?;

    let output = env
        .cmd()
        .args(["--json", "simulate", "--variations", "3"])
        .output()?;

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output)?;
    assert_eq!(report["updated_attributes"], serde_json::json!(["pa_cor"]));
    // only two values exist, so only two variations are created
    assert_eq!(report["per_child_stats"]["pa_cor"]["total"], 2);
    assert!(report["backup_id"].is_string());

    let snapshot = env.snapshot()?;
    assert_eq!(snapshot.parents.len(), 1);
    assert_eq!(child_meta(&snapshot, 1, "attribute_pa_cor").as_deref(), Some("azul"));
    Ok(())
}

#[test]
fn test_simulate_dry_run() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env
        .cmd()
        .args(["--json", "simulate", "--attr", "Tamanho:pa_tamanho", "--val", "P:p", "--dry-run"])
        .output()?;

    assert!(output.status.success());
    let preview = stdout_json(&output)?;
    assert_eq!(preview["attributes"][0]["taxonomy"], "pa_tamanho");
    assert_eq!(preview["attributes"][0]["create_terms"], serde_json::json!(["p"]));

    let snapshot = env.snapshot()?;
    assert_eq!(snapshot.parents.len(), 2);
    assert!(snapshot.taxonomies.is_empty());
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.path("l2g.toml");
    std::fs::write(&config, "[matching]\nterm_threshold = 1.5\n")?;

    env.cmd()
        .arg("--config")
        .arg(&config)
        .args(["discover", "--parent", "100"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("term_threshold"));
    Ok(())
}

#[test]
fn test_audit_file_records_corr_id() -> Result<()> {
    let env = TestEnvironment::new()?;
    let audit = env.path("audit.jsonl");

    let output = env
        .cmd()
        .arg("--audit-file")
        .arg(&audit)
        .args(["--json", "apply", "--parent", "100", "--attr", "Cor:pa_cor"])
        .args(["--term", "Azul:azul", "--term", "Preto:preto", "--create-missing"])
        .output()?;
    assert!(output.status.success());
    let corr_id = stdout_json(&output)?["corr_id"].as_str().unwrap_or_default().to_string();

    let lines: Vec<Value> = read(&audit)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert!(lines.iter().any(|r| r["event"] == "term.created"));
    assert!(lines
        .iter()
        .filter(|r| r["context"]["operation"] == "apply")
        .all(|r| r["context"]["corr_id"] == corr_id.as_str()));
    Ok(())
}
