use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

fn get_test_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target/tmp/tests").join(name);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// X -> Y (2), X -> Z (2); X is "a", Y and Z are "b".
fn write_small(dir: &Path) -> (PathBuf, PathBuf) {
    let edges = dir.join("edges.csv");
    let nodes = dir.join("nodes.csv");
    fs::write(&edges, "source,sink,weight\nX,Y,2\nX,Z,2\n").unwrap();
    fs::write(&nodes, "id,type\nX,a\nY,b\nZ,b\n").unwrap();
    (edges, nodes)
}

/// Every node both sends and receives.
fn write_cyclic(dir: &Path) -> (PathBuf, PathBuf) {
    let edges = dir.join("edges.csv");
    let nodes = dir.join("nodes.csv");
    fs::write(
        &edges,
        "pre,post,syn\nA,B,3\nB,A,1\nA,C,1\nC,A,2\nB,C,4\nC,D,1\nD,B,2\n",
    )
    .unwrap();
    fs::write(&nodes, "bodyId,cellType\nA,t1\nB,t2\nC,t1\nD,t3\n").unwrap();
    (edges, nodes)
}

fn cyclic_columns(cmd: &mut Command) -> &mut Command {
    cmd.args([
        "--source-column",
        "pre",
        "--sink-column",
        "post",
        "--weight-column",
        "syn",
        "--id-column",
        "bodyId",
        "--category-column",
        "cellType",
    ])
}

#[test]
fn test_cli_stats() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir("stats");
    let (edges, nodes) = write_small(&dir);

    let mut cmd = Command::cargo_bin("connectropy")?;
    cmd.arg("stats").arg(&edges).arg(&nodes);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Nodes:          3"))
        .stdout(predicate::str::contains("Edges:          2"))
        .stdout(predicate::str::contains("Categories:     2 (a, b)"))
        .stdout(predicate::str::contains("Coverage:       4/4 endpoints"));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_fingerprint_table() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir("fingerprint");
    let (edges, nodes) = write_small(&dir);
    let output = dir.join("fingerprints.csv");

    let mut cmd = Command::cargo_bin("connectropy")?;
    cmd.arg("fingerprint").arg(&edges).arg(&nodes).arg("-o").arg(&output);
    cmd.assert().success();

    let table = fs::read_to_string(&output)?;
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines[0], "node,a_in,a_out,b_in,b_out,in_entropy,out_entropy");
    assert_eq!(lines[1], "X,,0,,1,,0");
    assert_eq!(lines[2], "Y,1,,0,,0,");
    assert_eq!(lines.len(), 4);

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_fingerprint_single_node_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir("fingerprint_node");
    let (edges, nodes) = write_small(&dir);

    let mut cmd = Command::cargo_bin("connectropy")?;
    cmd.arg("fingerprint")
        .arg(&edges)
        .arg(&nodes)
        .args(["--node", "X", "--format", "json"]);
    let out = cmd.assert().success().get_output().stdout.clone();

    let row: serde_json::Value = serde_json::from_slice(&out)?;
    assert_eq!(row["fingerprint"]["outbound"], serde_json::json!([0.0, 1.0]));
    assert_eq!(row["fingerprint"]["inbound"], serde_json::json!([null, null]));
    assert_eq!(row["out_entropy"], serde_json::json!(0.0));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_specialization_and_cache() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir("specialization");
    let (edges, nodes) = write_cyclic(&dir);
    let cache = dir.join("cache");

    let run = || -> Result<String, Box<dyn std::error::Error>> {
        let mut cmd = Command::cargo_bin("connectropy")?;
        cmd.arg("specialization").arg(&edges).arg(&nodes);
        cyclic_columns(&mut cmd)
            .arg("--cache-dir")
            .arg(&cache)
            .args(["--cache-key", "toy"]);
        let out = cmd.assert().success().get_output().stdout.clone();
        Ok(String::from_utf8(out)?)
    };

    let first = run()?;
    assert!(first.starts_with("node,in_ent_of_avg_U,out_ent_of_avg_U,"));
    assert_eq!(first.lines().count(), 5);
    assert!(cache.join("toy_fingerprints.json").exists());
    assert!(cache.join("toy_specialization.json").exists());

    // Second run reads the cached table.
    assert_eq!(run()?, first);

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_hubs() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir("hubs");
    let (edges, nodes) = write_cyclic(&dir);

    let mut cmd = Command::cargo_bin("connectropy")?;
    cmd.arg("hubs").arg(&edges).arg(&nodes);
    cyclic_columns(&mut cmd).args(["--flow", "up", "--top", "1000"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out)?;

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "rank,node,total,out_diff,in_diff");
    // Four nodes, all with incoming and outgoing edges.
    assert_eq!(lines.len(), 5);
    let totals: Vec<f64> = lines[1..]
        .iter()
        .map(|l| l.split(',').nth(2).unwrap().parse().unwrap())
        .collect();
    assert!(totals.windows(2).all(|w| w[0] >= w[1]));

    let mut cmd = Command::cargo_bin("connectropy")?;
    cmd.arg("hubs").arg(&edges).arg(&nodes);
    cyclic_columns(&mut cmd).args(["--flow", "downstream", "-t", "2"]);
    cmd.assert()
        .success()
        .stdout(predicate::function(|s: &str| s.lines().count() == 3));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_missing_column_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir("missing_column");
    let (edges, nodes) = write_cyclic(&dir);

    let mut cmd = Command::cargo_bin("connectropy")?;
    cmd.arg("stats").arg(&edges).arg(&nodes);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("missing column 'source'"));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cli_empty_categories_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir("empty_categories");
    let edges = dir.join("edges.csv");
    let nodes = dir.join("nodes.csv");
    fs::write(&edges, "source,sink,weight\nX,Y,1\n")?;
    fs::write(&nodes, "id,type\nX,\nY,NaN\n")?;

    let mut cmd = Command::cargo_bin("connectropy")?;
    cmd.arg("fingerprint").arg(&edges).arg(&nodes);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no categories"));

    fs::remove_dir_all(dir)?;
    Ok(())
}
