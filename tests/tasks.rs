mod common;

use common::{context, context_with, start_stub, StubApi, ALICE, PASSWORD, SEEDED_TASKS};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use taskforge_client::auth::{LoginRequest, LogoutReason, SessionEvent, ENTRY_ROUTE};
use taskforge_client::cache::QueryKey;
use taskforge_client::models::{TaskInput, TaskStatus, TaskUpdate};
use taskforge_client::views::{Dashboard, NotificationsView, TaskFilter, TaskListView};
use taskforge_client::{AppContext, AppError};
use tempfile::TempDir;

async fn logged_in(api: &StubApi, dir: &TempDir) -> Arc<AppContext> {
    login(context(api, dir)).await
}

async fn login(ctx: Arc<AppContext>) -> Arc<AppContext> {
    ctx.login(LoginRequest {
        email: ALICE.to_string(),
        password: PASSWORD.to_string(),
    })
    .await
    .expect("Failed to log in");
    ctx
}

#[actix_rt::test]
async fn test_requires_login() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&api, &dir);

    let error = ctx.tasks().await.unwrap_err();
    assert!(error.is_unauthorized());
    assert_eq!(api.state.hits("GET /tasks"), 0);
}

#[actix_rt::test]
async fn test_task_list_is_cached() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = logged_in(&api, &dir).await;

    let first = ctx.tasks().await.unwrap();
    let second = ctx.tasks().await.unwrap();
    assert_eq!(first.len(), SEEDED_TASKS);
    assert_eq!(first, second);
    assert_eq!(api.state.hits("GET /tasks"), 1);

    ctx.refresh_tasks();
    ctx.tasks().await.unwrap();
    assert_eq!(api.state.hits("GET /tasks"), 2);
}

#[actix_rt::test]
async fn test_create_task_invalidates_list() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = logged_in(&api, &dir).await;

    ctx.tasks().await.unwrap();
    let created = ctx
        .create_task(TaskInput {
            name: "Prepare release notes".into(),
            description: "Summarise the changes since the last release".into(),
            assigned_to: Some("bob@example.com".into()),
            executed_by_self: false,
        })
        .await
        .unwrap();
    assert_eq!(created.status, TaskStatus::Pending);
    assert_eq!(created.assigned_by.as_deref(), Some(ALICE));
    assert!(!ctx.cache().contains(&QueryKey::Tasks));

    let tasks = ctx.tasks().await.unwrap();
    assert_eq!(tasks.len(), SEEDED_TASKS + 1);
    assert!(tasks.iter().any(|t| t.id == created.id));
    assert_eq!(api.state.hits("GET /tasks"), 2);
}

#[actix_rt::test]
async fn test_create_task_validation() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = logged_in(&api, &dir).await;

    let result = ctx
        .create_task(TaskInput {
            name: String::new(),
            description: String::new(),
            assigned_to: None,
            executed_by_self: true,
        })
        .await;
    assert!(matches!(result, Err(AppError::ValidationError(_))));
    assert_eq!(api.state.hits("POST /tasks"), 0);
}

#[actix_rt::test]
async fn test_update_task_overwrites_cached_entry() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = logged_in(&api, &dir).await;

    let task = ctx.task("4").await.unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    ctx.tasks().await.unwrap();

    let updated = ctx
        .update_task(
            "4",
            TaskUpdate {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Completed);
    assert_eq!(updated.name, task.name);

    // Served from the overwritten entry, not refetched
    let cached = ctx.task("4").await.unwrap();
    assert_eq!(cached, updated);
    assert_eq!(api.state.hits("GET /tasks/:id"), 1);

    // The list was invalidated and picks up the change
    let tasks = ctx.tasks().await.unwrap();
    assert_eq!(api.state.hits("GET /tasks"), 2);
    let listed = tasks.iter().find(|t| t.id == "4").unwrap();
    assert_eq!(listed.status, TaskStatus::Completed);

    let result = ctx.update_task("4", TaskUpdate::default()).await;
    assert!(matches!(result, Err(AppError::ValidationError(_))));
    assert_eq!(api.state.hits("PATCH /tasks/:id"), 1);
}

#[actix_rt::test]
async fn test_missing_task() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = logged_in(&api, &dir).await;

    match ctx.task("999").await {
        Err(AppError::NotFound(msg)) => assert_eq!(msg, "Task not found"),
        other => panic!("Expected NotFound, got {:?}", other),
    }
    // A missing task is not a reason to end the session
    assert!(ctx.session().is_authenticated());
    assert!(!ctx.cache().contains(&QueryKey::Task("999".into())));
}

#[actix_rt::test]
async fn test_task_list_view_filters_and_paginates() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = logged_in(&api, &dir).await;

    let view = TaskListView::load(&ctx, TaskFilter::default(), 5)
        .await
        .unwrap();
    assert_eq!(view.tasks().len(), 24);
    assert_eq!(view.total_pages(), 5);
    assert_eq!(view.page(5).unwrap().items.len(), 4);

    let rejected = TaskListView::load(&ctx, TaskFilter::by_status(TaskStatus::Rejected), 5)
        .await
        .unwrap();
    assert_eq!(rejected.tasks().len(), 6);
    assert!(rejected
        .tasks()
        .iter()
        .all(|task| task.status == TaskStatus::Rejected));

    // Both views were built from one fetch
    assert_eq!(api.state.hits("GET /tasks"), 1);
}

#[actix_rt::test]
async fn test_dashboard() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = logged_in(&api, &dir).await;

    let dashboard = Dashboard::load(&ctx).await.unwrap();
    assert_eq!(dashboard.user.email, ALICE);
    assert_eq!(dashboard.total, 24);
    for status in TaskStatus::ALL {
        assert_eq!(dashboard.count(status), 6);
    }
    assert_eq!(dashboard.assigned_to_me, 12);
    assert_eq!(dashboard.assigned_by_me, 24);
    assert_eq!(dashboard.executed_by_self, 4);
    assert_eq!(dashboard.completion_rate(), 0.25);
}

#[actix_rt::test]
async fn test_notifications_view() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = logged_in(&api, &dir).await;

    let view = NotificationsView::load(&ctx).await.unwrap();
    assert_eq!(view.email, ALICE);
    let ids: Vec<&str> = view.notifications.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["n3", "n2", "n1"]);
    assert_eq!(view.unread_count(), 2);

    NotificationsView::load(&ctx).await.unwrap();
    assert_eq!(api.state.hits("GET /notifications/:email"), 1);
    assert!(ctx
        .cache()
        .contains(&QueryKey::Notifications(ALICE.to_string())));
}

#[actix_rt::test]
async fn test_queries_retry_but_mutations_do_not() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::config(&api, &dir);
    config.query_retries = 2;
    let ctx = login(context_with(config)).await;
    *api.state.unavailable.lock().unwrap() = true;

    match ctx.tasks().await {
        Err(AppError::Api { status, .. }) => assert_eq!(status, 503),
        other => panic!("Expected a 503, got {:?}", other),
    }
    assert_eq!(api.state.hits("GET /tasks"), 3);

    let result = ctx
        .create_task(TaskInput {
            name: "Retry me".into(),
            description: String::new(),
            assigned_to: None,
            executed_by_self: true,
        })
        .await;
    assert!(matches!(result, Err(AppError::Api { status: 503, .. })));
    assert_eq!(api.state.hits("POST /tasks"), 1);

    let result = ctx
        .update_task(
            "1",
            TaskUpdate {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Api { status: 503, .. })));
    assert_eq!(api.state.hits("PATCH /tasks/:id"), 1);

    // Server errors are not a reason to end the session
    assert!(ctx.session().is_authenticated());
}

#[actix_rt::test]
async fn test_rejected_update_logs_out() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = logged_in(&api, &dir).await;
    let mut events = ctx.session().subscribe();
    api.state.revoke_token();

    let result = ctx
        .update_task(
            "2",
            TaskUpdate {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(result.unwrap_err().is_unauthorized());
    assert!(!ctx.session().is_authenticated());
    assert!(ctx.cache().is_empty());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::LoggedOut {
            redirect_to: ENTRY_ROUTE,
            reason: LogoutReason::Unauthorized,
        }
    );
}

#[actix_rt::test]
async fn test_dashboard_with_rejected_token_logs_out_once() {
    let api = start_stub();
    let dir = tempfile::tempdir().unwrap();
    let ctx = logged_in(&api, &dir).await;
    // Force both dashboard queries to reach the API
    ctx.cache().clear();
    let mut events = ctx.session().subscribe();
    api.state.revoke_token();

    assert!(Dashboard::load(&ctx).await.unwrap_err().is_unauthorized());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::LoggedOut {
            redirect_to: ENTRY_ROUTE,
            reason: LogoutReason::Unauthorized,
        }
    );
    assert!(events.try_recv().is_err());
}
