//! Subcommand handlers over temporary document trees.

use std::path::{Path, PathBuf};

use stamp_cli::check::{run_check, CheckArgs};
use stamp_cli::fix::{run_fix, FixArgs};
use stamp_cli::propose::{render_proposals, run_propose, ProposeArgs};
use stamp_cli::{render_remediation, GlobalOptions, Session};
use stamp_engine::RunOptions;

const DOC: &str = "---
title: Governance Notes
filetype: governance
type: policy
domain: governance
version: 0.3.0
doi: 10.5281/zenodo.7
status: Draft
created: 2026-01-01
updated: 2026-01-02
author:
  name: Waveframe Labs
license: CC-BY-4.0
ai_assisted: none
anchors:
  - governance-notes
---
Body.
";

fn global() -> GlobalOptions {
    GlobalOptions {
        schema: Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../schemas/ari-metadata.schema.json")
            .display()
            .to_string(),
        config: None,
        json: false,
        trace: None,
    }
}

fn tree(docs: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in docs {
        std::fs::write(dir.path().join(name), text).unwrap();
    }
    dir
}

fn paths(dir: &tempfile::TempDir) -> Vec<PathBuf> {
    vec![dir.path().to_path_buf()]
}

#[test]
fn check_exit_codes() {
    let clean = tree(&[("a.md", DOC)]);
    assert_eq!(run_check(&CheckArgs { paths: paths(&clean) }, &global()).unwrap(), 0);

    let repairable = tree(&[("a.md", DOC.replace("license:", "extra: 1\nlicense:").as_str())]);
    assert_eq!(run_check(&CheckArgs { paths: paths(&repairable) }, &global()).unwrap(), 1);

    let fatal = tree(&[("a.md", DOC), ("b.md", DOC.replace("status: Draft", "status: Unknown").as_str())]);
    assert_eq!(run_check(&CheckArgs { paths: paths(&fatal) }, &global()).unwrap(), 2);
}

#[test]
fn check_writes_trace() {
    let dir = tree(&[("a.md", DOC)]);
    let trace = dir.path().join("trace.json");
    let mut g = global();
    g.trace = Some(trace.clone());
    g.json = true;

    let docs = vec![dir.path().join("a.md")];
    run_check(&CheckArgs { paths: docs }, &g).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&trace).unwrap()).unwrap();
    assert_eq!(json["tool"], "stamp");
    assert_eq!(json["command"], "check");
    assert_eq!(json["exit_code"], 0);
    assert_eq!(json["artifacts"][0]["passed"], true);
    assert_eq!(json["artifacts"][0]["diagnostic_count"], 0);
}

#[test]
fn fix_without_approval_leaves_documents_untouched() {
    let text = DOC.replace("license:", "scratch: yes\nlicense:");
    let dir = tree(&[("a.md", text.as_str())]);
    let doc = dir.path().join("a.md");

    let args = FixArgs {
        paths: vec![doc.clone()],
        approve: false,
        include_inferred: false,
        output_dir: None,
    };
    assert_eq!(run_fix(&args, &global()).unwrap(), 1);
    assert_eq!(std::fs::read_to_string(&doc).unwrap(), text);
}

#[test]
fn approved_fix_prunes_into_output_dir() {
    let text = DOC.replace("license:", "scratch: yes\nlicense:");
    let dir = tree(&[("a.md", text.as_str())]);
    let out = dir.path().join("fixed");
    let docs = vec![dir.path().join("a.md")];

    let planned = FixArgs {
        paths: docs.clone(),
        approve: false,
        include_inferred: false,
        output_dir: Some(out.clone()),
    };
    assert_eq!(run_fix(&planned, &global()).unwrap(), 1);
    assert!(!out.exists());

    let approved = FixArgs {
        approve: true,
        ..planned
    };
    run_fix(&approved, &global()).unwrap();
    let fixed = std::fs::read_to_string(out.join("a.md")).unwrap();
    assert!(!fixed.contains("scratch"));
    assert_eq!(std::fs::read_to_string(&docs[0]).unwrap(), text);

    let recheck = run_check(&CheckArgs { paths: vec![out.join("a.md")] }, &global()).unwrap();
    assert_eq!(recheck, 0);
}

#[test]
fn propose_lists_inferred_and_prohibited() {
    let text = DOC
        .replace("status: Draft", "status: draft")
        .replace("domain: governance\n", "");
    let dir = tree(&[("a.md", text.as_str())]);
    assert_eq!(
        run_propose(&ProposeArgs { paths: paths(&dir) }, &global()).unwrap(),
        2
    );

    let session = Session::open(&global(), &paths(&dir)).unwrap();
    let report = session
        .orchestrator
        .run(&session.documents, &RunOptions::default());
    let listing = render_proposals(&report);
    assert!(listing.contains("2 proposal(s) (0 mechanical, 1 inferred, 1 prohibited)"), "{listing}");
    assert!(listing.contains("replace /status"));
    assert!(listing.contains("[never applied]"));
}

#[test]
fn check_output_carries_remediation_summary() {
    let text = DOC.replace("status: Draft", "status: draft");
    let dir = tree(&[("a.md", text.as_str())]);
    let session = Session::open(&global(), &paths(&dir)).unwrap();
    let report = session
        .orchestrator
        .run(&session.documents, &RunOptions::default());

    let rendered = render_remediation(&report);
    assert!(rendered.contains("action required:"), "{rendered}");
    assert!(rendered.contains("(blocking)"));
    assert!(rendered.contains("  - status [governance_decision]"));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    let summary = &json["remediation"][0];
    assert_eq!(summary["validation"]["passed"], false);
    assert_eq!(summary["human_action_required"]["required"], true);
    assert_eq!(summary["human_action_required"]["items"][0]["field"], "status");
    assert_eq!(summary["human_action_required"]["items"][0]["action_type"], "governance_decision");
}

#[test]
fn clean_documents_need_no_remediation() {
    let dir = tree(&[("a.md", DOC)]);
    let session = Session::open(&global(), &paths(&dir)).unwrap();
    let report = session
        .orchestrator
        .run(&session.documents, &RunOptions::default());
    assert_eq!(render_remediation(&report), "");
    assert_eq!(report.remediation.len(), 1);
    assert!(!report.remediation[0].human_action_required.required);
}
