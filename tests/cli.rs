use std::fs;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rstest::*;
use serde_json::{Value, json};

macro_rules! cargo_run {
    ($env:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin("imlabel")?;
            cmd.arg("-c").arg($env.conf.path())
                .arg("-e").arg($env.export.path())
                .arg("-i").arg($env.raw.path());
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

struct Env {
    _root: TempDir,
    conf: assert_fs::fixture::ChildPath,
    export: assert_fs::fixture::ChildPath,
    raw: assert_fs::fixture::ChildPath,
}

#[fixture]
fn env() -> Env {
    let root = TempDir::new().unwrap();
    let conf = root.child("conf");
    let export = root.child("export");
    let raw = root.child("raw");
    raw.create_dir_all().unwrap();
    raw.child("a.jpg").write_binary(b"a").unwrap();
    raw.child("b.png").write_binary(b"b").unwrap();
    raw.child("notes.txt").write_str("not an image").unwrap();
    Env { _root: root, conf, export, raw }
}

fn read_json(path: &std::path::Path) -> Result<Value> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[rstest]
fn save_and_show(env: Env) -> Result<()> {
    cargo_run!(env, "schema", "add", "count", "integer").success();
    cargo_run!(env, "schema", "add", "tags", "array").success();

    cargo_run!(env, "save", "a.jpg", "-s", "count=3", "-s", "tags=x, y")
        .success()
        .stdout(predicate::str::contains("[OK] Add"));

    assert_eq!(
        read_json(&env.export.path().join("annotations/a.json"))?,
        json!({ "count": 3, "tags": ["x", "y"] })
    );
    env.export.child("images/a.jpg").assert(predicate::path::exists());

    cargo_run!(env, "save", "a.jpg", "-s", "count=4")
        .success()
        .stdout(predicate::str::contains("[OK] Update"));

    cargo_run!(env, "show", "a.jpg")
        .success()
        .stdout(predicate::str::contains("count: 4").and(predicate::str::contains("tags: x, y")));
    cargo_run!(env, "show", "a.jpg", "--json")
        .success()
        .stdout(predicate::str::contains("\"count\": 4"));

    Ok(())
}

#[rstest]
fn save_rejects_bad_input(env: Env) -> Result<()> {
    cargo_run!(env, "schema", "add", "count", "integer").success();

    cargo_run!(env, "save", "a.jpg", "-s", "count=three").failure();
    cargo_run!(env, "save", "a.jpg", "-s", "color=red").failure();
    cargo_run!(env, "save", "a.jpg")
        .success()
        .stdout(predicate::str::contains("[SKIP]"));
    env.export.child("annotations/a.json").assert(predicate::path::missing());
    Ok(())
}

#[rstest]
fn schema_is_persisted(env: Env) -> Result<()> {
    cargo_run!(env, "schema", "add", "caption", "--required").success();
    cargo_run!(env, "schema", "add", "caption").failure();
    cargo_run!(env, "schema", "add", "id").failure();

    cargo_run!(env, "schema", "list")
        .success()
        .stdout(
            predicate::str::contains("frame_path")
                .and(predicate::str::contains("caption\tstring (required)")),
        );
    cargo_run!(env, "schema", "example")
        .success()
        .stdout(predicate::str::contains("\"caption\""));

    cargo_run!(env, "schema", "remove", "frame_path").failure();
    cargo_run!(env, "schema", "remove", "caption").success();
    cargo_run!(env, "schema", "list")
        .success()
        .stdout(predicate::str::contains("caption").not());
    Ok(())
}

#[rstest]
fn scan_lists_images(env: Env) -> Result<()> {
    cargo_run!(env, "scan")
        .success()
        .stdout(
            predicate::str::contains("a.jpg")
                .and(predicate::str::contains("b.png"))
                .and(predicate::str::contains("notes.txt").not()),
        );
    Ok(())
}

#[rstest]
fn next_saves_current_image(env: Env) -> Result<()> {
    cargo_run!(env, "schema", "add", "caption").success();

    cargo_run!(env, "next", "-s", "caption=first")
        .success()
        .stdout(predicate::str::contains("[2/2]").and(predicate::str::contains("b.png")));
    assert_eq!(
        read_json(&env.export.path().join("annotations/a.json"))?,
        json!({ "caption": "first" })
    );

    cargo_run!(env, "prev")
        .success()
        .stdout(predicate::str::contains("[1/2]").and(predicate::str::contains("caption: first")));
    env.export.child("annotations/b.json").assert(predicate::path::missing());
    Ok(())
}

#[rstest]
fn delete_and_clear(env: Env) -> Result<()> {
    cargo_run!(env, "schema", "add", "count", "integer").success();
    cargo_run!(env, "save", "a.jpg", "-s", "count=1").success();
    cargo_run!(env, "save", "b.png", "-s", "count=2").success();

    cargo_run!(env, "delete", "a.jpg")
        .success()
        .stdout(predicate::str::contains("[OK] Delete"));
    env.export.child("annotations/a.json").assert(predicate::path::missing());
    cargo_run!(env, "delete", "a.jpg").failure();

    cargo_run!(env, "list", "--output-format", "json")
        .success()
        .stdout(predicate::str::contains("b.png").and(predicate::str::contains("a.jpg").not()));

    cargo_run!(env, "clear", "--yes").success();
    env.export.child("annotations/b.json").assert(predicate::path::missing());
    assert_eq!(read_json(&env.export.path().join("index.json"))?, json!([]));
    Ok(())
}

#[rstest]
fn delete_by_printed_id(env: Env) -> Result<()> {
    cargo_run!(env, "schema", "add", "count", "integer").success();
    let output = cargo_run!(env, "save", "a.jpg", "-s", "count=1").success();
    let stdout = String::from_utf8(output.get_output().stdout.clone())?;
    let id = stdout
        .rsplit_once('(')
        .and_then(|(_, rest)| rest.trim().strip_suffix(')'))
        .unwrap()
        .to_string();

    cargo_run!(env, "list")
        .success()
        .stdout(predicate::str::contains(id.as_str()));
    cargo_run!(env, "delete", &id)
        .success()
        .stdout(predicate::str::contains(id.as_str()));
    env.export.child("annotations/a.json").assert(predicate::path::missing());
    Ok(())
}

#[rstest]
fn reload_recovers_from_export(env: Env) -> Result<()> {
    env.export.child("images").create_dir_all()?;
    env.export.child("annotations").create_dir_all()?;
    env.export.child("images/c.jpg").write_binary(b"c")?;
    env.export.child("annotations/c.json").write_str(r#"{"score": 0.5, "labels": ["cat"]}"#)?;
    env.export
        .child("index.json")
        .write_str(r#"[{"image": "images/c.jpg", "annotation": "annotations/c.json"}]"#)?;

    cargo_run!(env, "reload")
        .success()
        .stdout(predicate::str::contains("加载了 1 条标注"));
    env.raw.child("c.jpg").assert(predicate::path::exists());

    cargo_run!(env, "schema", "list")
        .success()
        .stdout(
            predicate::str::contains("score\tfloat").and(predicate::str::contains("labels\tarray")),
        );
    cargo_run!(env, "show", "c.jpg")
        .success()
        .stdout(predicate::str::contains("labels: cat"));
    Ok(())
}
