//! Integration tests for the orchestration lifecycle: idempotence, inverse
//! restore, group ordering, and failure tolerance.

use cakeinstr::orchestrator::{Instrumentator, APPLY_ORDER, REVERT_ORDER};
use cakeinstr::set::GroupKind;
use cakeinstr::settings::{AnnotationSpec, CopySpec, InstrumentationSettings, OverrideSpec};
use cakeinstr::target::TargetContext;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn live_tree(temp: &TempDir) -> TargetContext {
    let app = temp.path().join("app");
    let framework = temp.path().join("cakephp");
    let webroot = app.join("webroot");
    fs::create_dir_all(&webroot).unwrap();
    fs::create_dir_all(app.join("config")).unwrap();
    fs::create_dir_all(&framework).unwrap();
    TargetContext::new(app, framework, webroot, "4.4.12").unwrap()
}

fn write_resource(patch_dir: &Path, root: &str, rel: &str, content: &str) {
    let path = patch_dir.join("cakephp").join("4").join(root).join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const HOOK_PATCH: &str = "\
--- a/config/app.php
+++ b/config/app.php
@@ -1,2 +1,3 @@
 <?php
+require 'fuzz_hooks.php';
 return [];
";

#[test]
fn test_revert_order_literal_sequences() {
    assert_eq!(
        APPLY_ORDER,
        [
            GroupKind::Overrides,
            GroupKind::Patches,
            GroupKind::Copies,
            GroupKind::AnnotationRemovals,
        ]
    );
    assert_eq!(
        REVERT_ORDER,
        [
            GroupKind::AnnotationRemovals,
            GroupKind::Overrides,
            GroupKind::Patches,
            GroupKind::Copies,
        ]
    );
}

// Scenario: version 4, no discovered resources, no declared operations.
#[tokio::test]
async fn test_empty_configuration_reports_all_zero() {
    let temp = TempDir::new().unwrap();
    let ctx = live_tree(&temp);

    let settings = InstrumentationSettings {
        patch_dir: temp.path().join("no-such-resources"),
        ..Default::default()
    };
    let instrumentator = Instrumentator::new(ctx, settings);

    let report = instrumentator.apply().await.unwrap();
    assert!(report.is_clean());
    for kind in GroupKind::ALL {
        assert_eq!(report.changed(kind), 0);
    }

    let status = instrumentator.status().await.unwrap();
    for kind in GroupKind::ALL {
        assert_eq!(status.status(kind), (0, 0));
    }
}

// Scenario: one declared copy whose destination does not exist.
#[tokio::test]
async fn test_declared_copy_lifecycle() {
    let temp = TempDir::new().unwrap();
    let ctx = live_tree(&temp);
    let webroot = ctx.webroot_dir.clone();

    let src = temp.path().join("stub.php");
    fs::write(&src, "<?php // fuzzing stub\n").unwrap();

    let settings = InstrumentationSettings {
        patch_dir: temp.path().join("resources"),
        copies: vec![CopySpec {
            src,
            dst: webroot.join("stub.php"),
        }],
        ..Default::default()
    };
    let instrumentator = Instrumentator::new(ctx, settings);

    let report = instrumentator.apply().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.changed(GroupKind::Copies), 1);
    assert!(webroot.join("stub.php").exists());

    let status = instrumentator.status().await.unwrap();
    assert_eq!(status.status(GroupKind::Copies), (1, 0));

    let report = instrumentator.revert().await.unwrap();
    assert_eq!(report.changed(GroupKind::Copies), 1);
    assert!(!webroot.join("stub.php").exists());
}

// Scenario: a discovered patch whose target drifted fails, the other
// operation in the same group still succeeds.
#[tokio::test]
async fn test_patch_failure_does_not_abort_batch() {
    let temp = TempDir::new().unwrap();
    let ctx = live_tree(&temp);
    let patch_dir = temp.path().join("resources");

    fs::write(ctx.app_dir.join("config/app.php"), "<?php\n// drifted\n").unwrap();
    fs::write(ctx.app_dir.join("config/routes.php"), "<?php\nreturn [];\n").unwrap();

    write_resource(&patch_dir, "APP_DIR", "config/app.php.patch", HOOK_PATCH);
    write_resource(
        &patch_dir,
        "APP_DIR",
        "config/routes.php.patch",
        "\
--- a/config/routes.php
+++ b/config/routes.php
@@ -1,2 +1,3 @@
 <?php
+// instrumented routes
 return [];
",
    );

    let settings = InstrumentationSettings {
        patch_dir,
        ..Default::default()
    };
    let instrumentator = Instrumentator::new(ctx.clone(), settings);

    let report = instrumentator.apply().await.unwrap();
    assert_eq!(report.changed(GroupKind::Patches), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].group, GroupKind::Patches);
    assert!(report.failures[0].error.contains("context mismatch"));

    // The failed operation stays unapplied and retryable.
    let status = instrumentator.status().await.unwrap();
    assert_eq!(status.status(GroupKind::Patches), (1, 1));
    assert_eq!(
        fs::read_to_string(ctx.app_dir.join("config/app.php")).unwrap(),
        "<?php\n// drifted\n"
    );
}

// Full lifecycle across all four groups: apply twice (idempotence), then
// revert back to a byte-identical tree (inverse).
#[tokio::test]
async fn test_apply_is_idempotent_and_revert_is_inverse() {
    let temp = TempDir::new().unwrap();
    let ctx = live_tree(&temp);
    let patch_dir = temp.path().join("resources");

    let bootstrap = ctx.app_dir.join("config/bootstrap.php");
    let app_config = ctx.app_dir.join("config/app.php");
    let model = ctx.app_dir.join("config/post.php");
    fs::write(&bootstrap, "<?php // original bootstrap\n").unwrap();
    fs::write(&app_config, "<?php\nreturn [];\n").unwrap();
    fs::write(&model, "<?php\n/** @locked */\nclass Post {}\n").unwrap();

    write_resource(&patch_dir, "APP_DIR", "config/app.php.patch", HOOK_PATCH);
    write_resource(&patch_dir, "WEBROOT", "fuzz_entry.php", "<?php // entry\n");

    let settings = InstrumentationSettings {
        patch_dir,
        overrides: vec![OverrideSpec {
            target: bootstrap.clone(),
            content: Some("<?php // instrumented bootstrap\n".to_string()),
            content_file: None,
        }],
        annotation_removals: vec![AnnotationSpec {
            target: model.clone(),
            pattern: r"/\*\* @locked \*/\n".to_string(),
        }],
        ..Default::default()
    };
    let instrumentator = Instrumentator::new(ctx.clone(), settings);

    let before_bootstrap = fs::read(&bootstrap).unwrap();
    let before_app_config = fs::read(&app_config).unwrap();
    let before_model = fs::read(&model).unwrap();

    let first = instrumentator.apply().await.unwrap();
    assert!(first.is_clean());
    assert_eq!(first.changed(GroupKind::Overrides), 1);
    assert_eq!(first.changed(GroupKind::Patches), 1);
    assert_eq!(first.changed(GroupKind::Copies), 1);
    assert_eq!(first.changed(GroupKind::AnnotationRemovals), 1);

    // A second apply reports zero newly-applied operations.
    let second = instrumentator.apply().await.unwrap();
    assert!(second.is_clean());
    assert_eq!(second.total_changed(), 0);

    let status = instrumentator.status().await.unwrap();
    for kind in GroupKind::ALL {
        let (applied, unapplied) = status.status(kind);
        assert_eq!(unapplied, 0, "{kind} should be fully applied");
        assert_eq!(applied, 1);
    }

    // Revert restores every file byte-identically.
    let revert = instrumentator.revert().await.unwrap();
    assert!(revert.is_clean());
    assert_eq!(revert.total_changed(), 4);

    assert_eq!(fs::read(&bootstrap).unwrap(), before_bootstrap);
    assert_eq!(fs::read(&app_config).unwrap(), before_app_config);
    assert_eq!(fs::read(&model).unwrap(), before_model);
    assert!(!ctx.webroot_dir.join("fuzz_entry.php").exists());

    // A second revert reports zero.
    let again = instrumentator.revert().await.unwrap();
    assert_eq!(again.total_changed(), 0);
}
