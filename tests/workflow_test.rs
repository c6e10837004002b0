//! Integration tests for approve/reject transitions.

mod helpers;

use serde_json::json;

use approval_core::types::{ApprovalId, TargetId};
use approval_database::ApprovalStore;
use approval_entity::{ApprovalAction, ApprovalStatus, FieldValue, NewApproval};
use approval_workflow::{ActorContext, ErrorKind};

use helpers::{TestApp, Widget, fields};

async fn submit_update(app: &TestApp, target: TargetId, field1: &str) -> ApprovalId {
    app.engine
        .submission()
        .submit_change(
            &app.requester,
            "widget",
            Some(target),
            fields(&[("field1", field1.into())]),
            None,
        )
        .await
        .unwrap()
        .into_pending()
        .unwrap()
        .id
}

async fn insert_raw(app: &TestApp, data: NewApproval) -> ApprovalId {
    let mut tx = app.store.begin().await.unwrap();
    let record = tx.insert_approval(data).await.unwrap();
    tx.commit().await.unwrap();
    record.id
}

#[tokio::test]
async fn test_create_is_materialized_on_approval() {
    let app = TestApp::new();

    let outcome = app
        .engine
        .submission()
        .submit_entity(&app.requester, &Widget::new("x"), None, None)
        .await
        .unwrap();
    let pending = outcome.into_pending().unwrap();
    assert_eq!(pending.action, ApprovalAction::Create);
    assert_eq!(pending.target_id, None);
    assert_eq!(app.widget_count().await, 0);

    let approved = app.engine.approve(&app.reviewer, pending.id).await.unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert_eq!(approved.decided_by, Some(app.reviewer_id()));
    assert!(approved.decided_at.is_some());

    let target = approved.target_id.unwrap();
    let widget = app.widget(target).await.unwrap();
    assert_eq!(widget.get("field1"), Some(&FieldValue::from("x")));
    assert_eq!(widget.get("size"), Some(&FieldValue::Null));

    let stored = app.engine.query().get(pending.id).await.unwrap();
    assert_eq!(stored, approved);
}

#[tokio::test]
async fn test_approving_update_retires_competing_updates() {
    let app = TestApp::new();
    let target = app.seed_widget("original", None).await;
    let a = submit_update(&app, target, "a").await;
    let b = submit_update(&app, target, "b").await;

    let approved = app.engine.approve(&app.reviewer, b).await.unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert_eq!(approved.target_id, Some(target));

    let retired = app.engine.query().get(a).await.unwrap();
    assert_eq!(retired.status, ApprovalStatus::Rejected);
    assert_eq!(retired.decided_by, Some(app.reviewer_id()));

    let widget = app.widget(target).await.unwrap();
    assert_eq!(widget.get("field1"), Some(&FieldValue::from("b")));
    assert!(
        app.engine
            .query()
            .pending_for("widget", target)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_second_competing_approval_is_invalid() {
    let app = TestApp::new();
    let target = app.seed_widget("original", None).await;
    let a = submit_update(&app, target, "a").await;
    let b = submit_update(&app, target, "b").await;

    app.engine.approve(&app.reviewer, a).await.unwrap();
    let err = app.engine.approve(&app.reviewer, b).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidTransition);

    let widget = app.widget(target).await.unwrap();
    assert_eq!(widget.get("field1"), Some(&FieldValue::from("a")));
}

#[tokio::test]
async fn test_updates_on_other_targets_stay_pending() {
    let app = TestApp::new();
    let first = app.seed_widget("one", None).await;
    let second = app.seed_widget("two", None).await;
    let a = submit_update(&app, first, "a").await;
    let b = submit_update(&app, second, "b").await;

    app.engine.approve(&app.reviewer, a).await.unwrap();
    let untouched = app.engine.query().get(b).await.unwrap();
    assert_eq!(untouched.status, ApprovalStatus::Pending);
}

#[tokio::test]
async fn test_terminal_records_refuse_transitions() {
    let app = TestApp::new();
    let target = app.seed_widget("original", None).await;
    let id = submit_update(&app, target, "a").await;

    let rejected = app.engine.reject(&app.reviewer, id).await.unwrap();
    assert_eq!(rejected.status, ApprovalStatus::Rejected);

    let err = app.engine.approve(&app.reviewer, id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidTransition);
    let err = app.engine.reject(&app.reviewer, id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidTransition);

    assert_eq!(app.engine.query().get(id).await.unwrap(), rejected);
    let widget = app.widget(target).await.unwrap();
    assert_eq!(widget.get("field1"), Some(&FieldValue::from("original")));
}

#[tokio::test]
async fn test_update_without_target_is_inconsistent() {
    let app = TestApp::new();
    let id = insert_raw(
        &app,
        NewApproval {
            target_type: "widget".to_string(),
            target_id: None,
            action: ApprovalAction::Update,
            snapshot: Some(json!({"type": "widget", "pk": null,
                "fields": {"field1": "x", "size": null}})),
            diff: None,
            comment: None,
            requested_by: None,
        },
    )
    .await;

    let err = app.engine.approve(&app.reviewer, id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InconsistentState);

    let record = app.engine.query().get(id).await.unwrap();
    assert_eq!(record.status, ApprovalStatus::Pending);
    assert_eq!(app.widget_count().await, 0);
}

#[tokio::test]
async fn test_delete_approval_removes_target() {
    let app = TestApp::new();
    let target = app.seed_widget("doomed", None).await;
    let pending = app
        .engine
        .submission()
        .submit_delete(&app.requester, "widget", target, None)
        .await
        .unwrap()
        .into_pending()
        .unwrap();
    assert_eq!(pending.snapshot, None);
    assert!(app.widget(target).await.is_some());

    let approved = app.engine.approve(&app.reviewer, pending.id).await.unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert_eq!(approved.target_id, None);
    assert!(app.widget(target).await.is_none());
}

#[tokio::test]
async fn test_rejecting_delete_keeps_target() {
    let app = TestApp::new();
    let target = app.seed_widget("kept", None).await;
    let pending = app
        .engine
        .submission()
        .submit_delete(&app.requester, "widget", target, None)
        .await
        .unwrap()
        .into_pending()
        .unwrap();

    let rejected = app.engine.reject(&app.reviewer, pending.id).await.unwrap();
    assert_eq!(rejected.status, ApprovalStatus::Rejected);
    assert_eq!(rejected.target_id, Some(target));
    assert!(app.widget(target).await.is_some());
}

#[tokio::test]
async fn test_malformed_snapshot_leaves_record_pending() {
    let app = TestApp::new();
    let drifted = insert_raw(
        &app,
        NewApproval {
            target_type: "widget".to_string(),
            target_id: None,
            action: ApprovalAction::Create,
            snapshot: Some(json!({"type": "widget", "pk": null,
                "fields": {"field1": "x", "size": null, "colour": "red"}})),
            diff: None,
            comment: None,
            requested_by: None,
        },
    )
    .await;
    let mislabelled = insert_raw(
        &app,
        NewApproval {
            target_type: "widget".to_string(),
            target_id: None,
            action: ApprovalAction::Create,
            snapshot: Some(json!({"type": "gadget", "pk": null, "fields": {"name": "g"}})),
            diff: None,
            comment: None,
            requested_by: None,
        },
    )
    .await;

    for id in [drifted, mislabelled] {
        let err = app.engine.approve(&app.reviewer, id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedSnapshot);
        let record = app.engine.query().get(id).await.unwrap();
        assert_eq!(record.status, ApprovalStatus::Pending);
        assert_eq!(record.decided_by, None);
    }
    assert_eq!(app.widget_count().await, 0);
}

#[tokio::test]
async fn test_approving_update_of_deleted_target_rolls_back() {
    let app = TestApp::new();
    let target = app.seed_widget("original", None).await;
    let update = submit_update(&app, target, "a").await;
    let delete = app
        .engine
        .submission()
        .submit_delete(&app.requester, "widget", target, None)
        .await
        .unwrap()
        .into_pending()
        .unwrap();
    app.engine.approve(&app.reviewer, delete.id).await.unwrap();

    let err = app.engine.approve(&app.reviewer, update).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let record = app.engine.query().get(update).await.unwrap();
    assert_eq!(record.status, ApprovalStatus::Pending);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_approvals_have_one_winner() {
    let app = TestApp::new();
    let pending = app
        .engine
        .submission()
        .submit_entity(&app.requester, &Widget::new("race"), None, None)
        .await
        .unwrap()
        .into_pending()
        .unwrap();

    let first = app.engine.clone();
    let second = app.engine.clone();
    let (ctx_a, ctx_b) = (app.reviewer.clone(), app.reviewer.clone());
    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.approve(&ctx_a, pending.id).await }),
        tokio::spawn(async move { second.approve(&ctx_b, pending.id).await }),
    );
    let results = [a.unwrap(), b.unwrap()];

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.kind, ErrorKind::InvalidTransition);
    assert_eq!(app.widget_count().await, 1);
}

#[tokio::test]
async fn test_decisions_need_reviewer_identity() {
    let app = TestApp::new();
    let target = app.seed_widget("original", None).await;
    let id = submit_update(&app, target, "a").await;

    let err = app
        .engine
        .approve(&ActorContext::anonymous(), id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let err = app
        .engine
        .approve(&app.reviewer, ApprovalId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_reviewer_remarks_are_appended() {
    let app = TestApp::new();
    let target = app.seed_widget("original", None).await;
    let id = app
        .engine
        .submission()
        .submit_change(
            &app.requester,
            "widget",
            Some(target),
            fields(&[("field1", "a".into())]),
            Some("typo fix".to_string()),
        )
        .await
        .unwrap()
        .into_pending()
        .unwrap()
        .id;

    let long_remark = "x".repeat(300);
    let err = app
        .engine
        .workflow()
        .reject(&app.reviewer, id, Some(&long_remark))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let record = app.engine.query().get(id).await.unwrap();
    assert_eq!(record.status, ApprovalStatus::Pending);
    assert_eq!(record.comment.as_deref(), Some("typo fix"));

    let approved = app
        .engine
        .workflow()
        .approve(&app.reviewer, id, Some("looks good"))
        .await
        .unwrap();
    assert_eq!(approved.comment.as_deref(), Some("typo fix\nlooks good"));
}
