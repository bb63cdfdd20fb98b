//! Shared test utilities for document integration tests
#![allow(dead_code)]

use authz::config::DocumentConfig;
use authz::model::{AccessLevel, Document};
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A document with one repository, two users and two nested groups:
///
/// - repository `project`
/// - users `alice` (alias `a1`) and `bob`
/// - `alice` in `dev`, `dev` in `all`
pub fn setup_document() -> Document {
    setup_document_with(DocumentConfig::default())
}

pub fn setup_document_with(config: DocumentConfig) -> Document {
    init_tracing();
    let mut doc = Document::with_config(config);
    doc.create_repository("project").unwrap();
    doc.create_user("alice", Some("a1")).unwrap();
    doc.create_user("bob", None).unwrap();
    doc.create_user_group("dev").unwrap();
    doc.create_user_group("all").unwrap();
    doc.add_user_to_user_group("alice", "dev").unwrap();
    doc.add_user_group_to_user_group("dev", "all").unwrap();
    doc
}

/// Give `alice` and `dev` a few rules across both trees
pub fn add_rules(doc: &mut Document) {
    doc.create_access_rule_for_user(Some("project"), "trunk/src", "alice", AccessLevel::ReadWrite, false)
        .unwrap();
    doc.create_access_rule_for_user(None, "/", "alice", AccessLevel::ReadOnly, false)
        .unwrap();
    doc.create_access_rule_for_user_group(Some("project"), "/", "dev", AccessLevel::ReadOnly, false)
        .unwrap();
    doc.create_access_rule_for_user_group(Some("project"), "branches", "dev", AccessLevel::DenyAccess, true)
        .unwrap();
}

/// Panic with every violation if the document is inconsistent
pub fn assert_consistent(doc: &Document) {
    if let Err(violations) = doc.check_integrity() {
        let report: Vec<String> = violations.iter().map(ToString::to_string).collect();
        panic!("document is inconsistent:\n{}", report.join("\n"));
    }
}
