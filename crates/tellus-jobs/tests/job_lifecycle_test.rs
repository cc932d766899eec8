// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the basic job lifecycle: create, read, modify, estimate.

mod common;

use common::{ndvi_payload, submission, TestContext};
use tellus_api::{JobStatus, JobSubmission, ProcessPayload};
use tellus_jobs::error::JobError;

#[tokio::test]
async fn test_create_stores_graph_and_record() {
    let ctx = TestContext::new();

    let record = ctx.service.create("alice", submission()).await.unwrap();

    assert_eq!(record.status, JobStatus::Created);
    assert_eq!(record.user_id, "alice");
    assert_eq!(record.title.as_deref(), Some("NDVI composite"));
    assert_eq!(record.lock_version, 0);

    // the payload went to the graph store under the generated id
    let stored = ctx.graphs.stored("alice", &record.process_graph_id).expect("stored graph");
    assert_eq!(stored.process_graph, ndvi_payload().process_graph);
    assert_eq!(record.process_graph_id.len(), 16);

    assert_eq!(ctx.store.record(&record.id).status, JobStatus::Created);
}

#[tokio::test]
async fn test_create_keeps_client_chosen_graph_id() {
    let ctx = TestContext::new();
    let payload = ProcessPayload { id: Some("evi_v2".to_string()), ..ndvi_payload() };
    let submission = JobSubmission { process: Some(payload), ..submission() };

    let record = ctx.service.create("alice", submission).await.unwrap();

    assert_eq!(record.process_graph_id, "evi_v2");
    assert!(ctx.graphs.stored("alice", "evi_v2").is_some());
}

#[tokio::test]
async fn test_create_without_process_is_rejected() {
    let ctx = TestContext::new();
    let submission = JobSubmission { process: None, ..submission() };

    let err = ctx.service.create("alice", submission).await.unwrap_err();

    assert!(matches!(err, JobError::InvalidProcess { .. }), "got {err:?}");
    assert_eq!(ctx.store.job_count(), 0);
}

#[tokio::test]
async fn test_create_converts_budget_to_cents() {
    let ctx = TestContext::new();
    let submission = JobSubmission { budget: Some(2.5), ..submission() };

    let record = ctx.service.create("alice", submission).await.unwrap();

    assert_eq!(record.budget_cents, Some(250));
    assert_eq!(record.budget_euros(), Some(2.5));
}

#[tokio::test]
async fn test_get_returns_details_with_process() {
    let ctx = TestContext::new();
    let record = ctx.service.create("alice", submission()).await.unwrap();

    let details = ctx.service.get("alice", &record.id).await.unwrap();

    assert_eq!(details.summary.id, record.id);
    assert_eq!(details.summary.status, JobStatus::Created);
    assert_eq!(details.process.process_graph, ndvi_payload().process_graph);
}

#[tokio::test]
async fn test_get_unknown_job_is_not_found() {
    let ctx = TestContext::new();

    let err = ctx.service.get("alice", "no-such-job").await.unwrap_err();

    match &err {
        JobError::JobNotFound { job_id } => assert_eq!(job_id, "no-such-job"),
        other => panic!("expected JobNotFound, got {other:?}"),
    }
    assert_eq!(err.to_string(), "The job with id 'no-such-job' does not exist.");
}

#[tokio::test]
async fn test_get_foreign_job_is_denied() {
    let ctx = TestContext::new();
    let record = ctx.service.create("alice", submission()).await.unwrap();

    let err = ctx.service.get("bob", &record.id).await.unwrap_err();

    assert!(matches!(err, JobError::NotOwner { .. }), "got {err:?}");
    assert_eq!(err.to_string(), format!("You are not allowed to access the job {}.", record.id));
}

#[tokio::test]
async fn test_get_all_lists_own_jobs_in_creation_order() {
    let ctx = TestContext::new();
    let first = ctx.service.create("alice", submission()).await.unwrap();
    let second = ctx.service.create("alice", submission()).await.unwrap();
    ctx.service.create("bob", submission()).await.unwrap();

    let summaries = ctx.service.get_all("alice").await.unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].id, first.id);
    assert_eq!(summaries[1].id, second.id);
}

#[tokio::test]
async fn test_modify_patches_metadata() {
    let ctx = TestContext::new();
    let record = ctx.service.create("alice", submission()).await.unwrap();

    let patch = JobSubmission {
        title: Some("EVI composite".to_string()),
        description: Some("switched to EVI".to_string()),
        process: None,
        ..JobSubmission::default()
    };
    ctx.service.modify("alice", &record.id, patch).await.unwrap();

    let stored = ctx.store.record(&record.id);
    assert_eq!(stored.title.as_deref(), Some("EVI composite"));
    assert_eq!(stored.description.as_deref(), Some("switched to EVI"));
    // untouched fields survive the patch
    assert_eq!(stored.process_graph_id, record.process_graph_id);
    assert_eq!(stored.lock_version, record.lock_version + 1);
}

#[tokio::test]
async fn test_modify_replaces_process_under_fresh_id() {
    let ctx = TestContext::new();
    let record = ctx.service.create("alice", submission()).await.unwrap();

    let patch = JobSubmission { process: Some(ndvi_payload()), ..JobSubmission::default() };
    ctx.service.modify("alice", &record.id, patch).await.unwrap();

    let stored = ctx.store.record(&record.id);
    assert_ne!(stored.process_graph_id, record.process_graph_id);
    // both graphs are kept; dispatched runs reference the old one
    assert_eq!(ctx.graphs.graph_count(), 2);
}

#[tokio::test]
async fn test_modify_active_job_is_locked() {
    let ctx = TestContext::new();
    let record = ctx.service.create("alice", submission()).await.unwrap();
    ctx.engine.set_job_state(&record.id, JobStatus::Running);

    let patch = JobSubmission {
        title: Some("too late".to_string()),
        process: None,
        ..JobSubmission::default()
    };
    let err = ctx.service.modify("alice", &record.id, patch).await.unwrap_err();

    match err {
        JobError::Locked { status, .. } => assert_eq!(status, JobStatus::Running),
        other => panic!("expected Locked, got {other:?}"),
    }
    // the refresh that discovered the active run was persisted
    assert_eq!(ctx.store.record(&record.id).status, JobStatus::Running);
    assert_eq!(ctx.store.record(&record.id).title.as_deref(), Some("NDVI composite"));
}

#[tokio::test]
async fn test_modify_version_clash_is_a_conflict() {
    let ctx = TestContext::new();
    let record = ctx.service.create("alice", submission()).await.unwrap();
    ctx.store.reject_next_cas(1);

    let patch = JobSubmission {
        title: Some("raced".to_string()),
        process: None,
        ..JobSubmission::default()
    };
    let err = ctx.service.modify("alice", &record.id, patch).await.unwrap_err();

    assert!(matches!(err, JobError::Conflict { .. }), "got {err:?}");
    assert_eq!(ctx.store.record(&record.id).title.as_deref(), Some("NDVI composite"));
}

#[tokio::test]
async fn test_modify_with_empty_patch_is_a_noop() {
    let ctx = TestContext::new();
    let record = ctx.service.create("alice", submission()).await.unwrap();

    let patch = JobSubmission { process: None, ..JobSubmission::default() };
    ctx.service.modify("alice", &record.id, patch).await.unwrap();

    assert_eq!(ctx.store.record(&record.id).lock_version, record.lock_version);
}

#[tokio::test]
async fn test_estimate_defaults_to_free() {
    let ctx = TestContext::new();
    let record = ctx.service.create("alice", submission()).await.unwrap();

    let estimate = ctx.service.estimate("alice", &record.id).await.unwrap();
    assert_eq!(estimate.costs, 0.0);

    let err = ctx.service.estimate("alice", "no-such-job").await.unwrap_err();
    assert!(matches!(err, JobError::JobNotFound { .. }), "got {err:?}");
}
