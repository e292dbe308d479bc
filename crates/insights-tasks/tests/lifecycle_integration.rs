//! End-to-end task lifecycle tests: submit -> run -> poll -> cleanup.
//!
//! Every test builds its own scheduler over its own store, so the tests run
//! in parallel without sharing state.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{failing, fixed, scheduler_with, wait_terminal, Inspect, Panicking, Sleeping};
use insights_tasks::store::ListTasksOptions;
use insights_tasks::{
    FailureKind, RawWorkflowSpec, StepKind, StepProcessor, TaskError, TaskStatus,
};
use serde_json::json;

// ─── Submission ─────────────────────────────────────────────────────────────

mod submission {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn submit_returns_processing_receipt_with_empty_results() {
        let scheduler = scheduler_with(vec![Arc::new(Sleeping {
            kind: StepKind::Analytics,
            delay: Duration::from_millis(200),
        })]);

        let receipt = scheduler
            .submit(RawWorkflowSpec::new("v1", ["analytics"]))
            .await
            .unwrap();
        assert_eq!(receipt.status, TaskStatus::Processing);

        let record = scheduler.status(&receipt.task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Processing);
        assert!(record.results.is_empty());
        assert!(record.completed_at.is_none());

        let view = serde_json::to_value(record.to_view()).unwrap();
        assert_eq!(view["status"], json!("processing"));
        assert!(view.get("results").is_none());
        assert!(view.get("completed_at").is_none());
    }

    #[tokio::test]
    async fn invalid_spec_is_rejected_before_storage() {
        let scheduler = scheduler_with(vec![fixed(StepKind::Analytics, json!({}))]);

        for raw in [
            RawWorkflowSpec::new("", ["analytics"]),
            RawWorkflowSpec::new("v1", Vec::<String>::new()),
            RawWorkflowSpec::new("v1", ["analytics", "translate"]),
        ] {
            let err = scheduler.submit(raw).await.unwrap_err();
            assert!(matches!(err, TaskError::InvalidSpec { .. }), "{err:?}");
        }
        assert!(scheduler.store().is_empty().await);
    }

    #[tokio::test]
    async fn unregistered_step_is_rejected_at_submission() {
        let scheduler = scheduler_with(vec![fixed(StepKind::Analytics, json!({}))]);

        let err = scheduler
            .submit(RawWorkflowSpec::new("v1", ["analytics", "critique"]))
            .await
            .unwrap_err();
        match err {
            TaskError::InvalidSpec { reason } => assert!(reason.contains("critique")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(scheduler.store().is_empty().await);
    }

    #[tokio::test]
    async fn status_of_unknown_task_is_not_found() {
        let scheduler = scheduler_with(vec![]);
        let err = scheduler.status("missing").await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound { .. }));
    }
}

// ─── Execution ──────────────────────────────────────────────────────────────

mod execution {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn single_step_score_example() {
        let scheduler = scheduler_with(vec![fixed(StepKind::Analytics, json!({"score": 42}))]);

        let receipt = scheduler
            .submit(RawWorkflowSpec::new("v1", ["analytics"]))
            .await
            .unwrap();
        let record = wait_terminal(&scheduler, &receipt.task_id).await;

        let view = serde_json::to_value(record.to_view()).unwrap();
        assert_eq!(view["status"], json!("completed"));
        assert_eq!(view["results"], json!({"analytics": {"score": 42}}));
        assert!(view.get("error").is_none());
    }

    #[tokio::test]
    async fn both_steps_succeed() {
        let scheduler = scheduler_with(vec![
            fixed(StepKind::Analytics, json!({"a": 1})),
            fixed(StepKind::Content, json!({"content": "hello"})),
        ]);

        let receipt = scheduler
            .submit(RawWorkflowSpec::new("v1", ["analytics", "content"]))
            .await
            .unwrap();
        let record = wait_terminal(&scheduler, &receipt.task_id).await;

        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.results.len(), 2);
        assert_eq!(record.results[&StepKind::Analytics], json!({"a": 1}));
        assert_eq!(record.results[&StepKind::Content], json!({"content": "hello"}));
        assert!(record.error.is_none());
        assert!(record.completed_at.unwrap() > record.created_at);
    }

    #[tokio::test]
    async fn failing_second_step_keeps_first_result() {
        let scheduler = scheduler_with(vec![
            fixed(StepKind::Analytics, json!({"a": 1})),
            failing(StepKind::Content, "model unavailable"),
        ]);

        let receipt = scheduler
            .submit(RawWorkflowSpec::new("v1", ["analytics", "content"]))
            .await
            .unwrap();
        let record = wait_terminal(&scheduler, &receipt.task_id).await;

        assert_eq!(record.status, TaskStatus::Failed);
        let error = record.error.unwrap();
        assert_eq!(error.step, StepKind::Content);
        assert_eq!(error.kind, FailureKind::StepError);
        assert_eq!(error.message, "model unavailable");
        assert!(record.results.contains_key(&StepKind::Analytics));
        assert!(!record.results.contains_key(&StepKind::Content));
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn failure_stops_later_steps() {
        let critique = Arc::new(Inspect::new(StepKind::Critique));
        let scheduler = scheduler_with(vec![
            failing(StepKind::Analytics, "no such video"),
            critique.clone(),
        ]);

        let record = scheduler
            .execute(RawWorkflowSpec::new("v1", ["analytics", "critique"]))
            .await
            .unwrap();

        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.results.is_empty());
        assert_eq!(critique.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panic_becomes_internal_fault() {
        let scheduler = scheduler_with(vec![
            fixed(StepKind::Analytics, json!({"a": 1})),
            Arc::new(Panicking(StepKind::Content)),
        ]);

        let receipt = scheduler
            .submit(RawWorkflowSpec::new("v1", ["analytics", "content"]))
            .await
            .unwrap();
        let record = wait_terminal(&scheduler, &receipt.task_id).await;

        assert_eq!(record.status, TaskStatus::Failed);
        let error = record.error.unwrap();
        assert_eq!(error.kind, FailureKind::InternalFault);
        assert_eq!(error.step, StepKind::Content);
        assert_eq!(error.message, "internal fault in content step");
        assert!(!error.message.contains("exploded"));
        assert_eq!(record.results.len(), 1);
    }

    #[tokio::test]
    async fn step_timeout_fails_the_task() {
        let scheduler = scheduler_with(vec![Arc::new(Sleeping {
            kind: StepKind::Analytics,
            delay: Duration::from_secs(5),
        })])
        .with_step_timeout(Some(Duration::from_millis(20)));

        let record = scheduler
            .execute(RawWorkflowSpec::new("v1", ["analytics"]))
            .await
            .unwrap();

        assert_eq!(record.status, TaskStatus::Failed);
        let error = record.error.unwrap();
        assert_eq!(error.kind, FailureKind::Timeout);
        assert_eq!(error.message, "analytics step timed out after 20ms");
    }

    #[tokio::test]
    async fn without_timeout_slow_step_completes() {
        let scheduler = scheduler_with(vec![Arc::new(Sleeping {
            kind: StepKind::Analytics,
            delay: Duration::from_millis(30),
        })]);

        let record = scheduler
            .execute(RawWorkflowSpec::new("v1", ["analytics"]))
            .await
            .unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.results[&StepKind::Analytics], json!({"slept_ms": 30}));
    }

    #[tokio::test]
    async fn later_steps_see_prior_results_in_order() {
        let scheduler = scheduler_with(vec![
            fixed(StepKind::Analytics, json!({"a": 1})),
            Arc::new(Inspect::new(StepKind::Content)),
            Arc::new(Inspect::new(StepKind::Critique)),
        ]);

        let record = scheduler
            .execute(RawWorkflowSpec::new("v1", ["analytics", "content", "critique"]))
            .await
            .unwrap();

        assert_eq!(record.results[&StepKind::Content]["prior"], json!(["analytics"]));
        assert_eq!(
            record.results[&StepKind::Critique]["prior"],
            json!(["analytics", "content"])
        );
        assert_eq!(record.results[&StepKind::Critique]["target"], json!("v1"));
        assert_eq!(
            record.results[&StepKind::Critique]["task_id"],
            json!(record.id.clone())
        );
    }

    #[tokio::test]
    async fn duplicate_step_reruns_and_overwrites() {
        let scheduler = scheduler_with(vec![
            Arc::new(Inspect::new(StepKind::Analytics)),
            fixed(StepKind::Content, json!({"content": "x"})),
        ]);

        let record = scheduler
            .execute(RawWorkflowSpec::new("v1", ["analytics", "content", "analytics"]))
            .await
            .unwrap();

        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.results.len(), 2);
        let analytics = &record.results[&StepKind::Analytics];
        assert_eq!(analytics["call"], json!(2));
        assert_eq!(analytics["prior"], json!(["analytics", "content"]));
        let order: Vec<_> = record.results.keys().copied().collect();
        assert_eq!(order, vec![StepKind::Analytics, StepKind::Content]);
    }

    #[tokio::test]
    async fn parameters_are_scoped_to_declared_keys() {
        let scheduler = scheduler_with(vec![
            Arc::new(Inspect::new(StepKind::Analytics)),
            Arc::new(Inspect::with_keys(StepKind::Content, &["content_type"])),
        ]);

        let raw = RawWorkflowSpec::new("v1", ["analytics", "content"])
            .with_parameter("content_type", "blog_post")
            .with_parameter("tone", "dry");
        let record = scheduler.execute(raw).await.unwrap();

        assert_eq!(
            record.results[&StepKind::Analytics]["parameters"],
            json!({"content_type": "blog_post", "tone": "dry"})
        );
        assert_eq!(
            record.results[&StepKind::Content]["parameters"],
            json!({"content_type": "blog_post"})
        );
    }
    #[tokio::test]
    async fn dropped_execute_still_finishes_the_task() {
        let scheduler = scheduler_with(vec![Arc::new(Sleeping {
            kind: StepKind::Analytics,
            delay: Duration::from_millis(200),
        })]);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            scheduler.execute(RawWorkflowSpec::new("v1", ["analytics"])),
        )
        .await;
        assert!(abandoned.is_err());

        let page = scheduler.list(ListTasksOptions::default()).await.unwrap();
        assert_eq!(page.tasks.len(), 1);
        let record = wait_terminal(&scheduler, &page.tasks[0].task_id).await;
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(
            record.results[&StepKind::Analytics],
            json!({"slept_ms": 200})
        );
    }
}

// ─── Listing and Cleanup ────────────────────────────────────────────────────

mod listing_and_cleanup {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn list_reports_completed_steps() {
        let scheduler = scheduler_with(vec![
            fixed(StepKind::Analytics, json!({})),
            failing(StepKind::Content, "nope"),
        ]);

        let ok = scheduler
            .execute(RawWorkflowSpec::new("ok", ["analytics"]))
            .await
            .unwrap();
        let bad = scheduler
            .execute(RawWorkflowSpec::new("bad", ["analytics", "content"]))
            .await
            .unwrap();

        let page = scheduler.list(ListTasksOptions::default()).await.unwrap();
        assert_eq!(page.total, 2);
        let ok_row = page.tasks.iter().find(|t| t.task_id == ok.id).unwrap();
        assert_eq!(ok_row.status, TaskStatus::Completed);
        assert_eq!(ok_row.completed_steps, 1);
        let bad_row = page.tasks.iter().find(|t| t.task_id == bad.id).unwrap();
        assert_eq!(bad_row.status, TaskStatus::Failed);
        assert_eq!(bad_row.completed_steps, 1);
    }

    #[tokio::test]
    async fn cleanup_evicts_old_finished_tasks_only() {
        let scheduler = scheduler_with(vec![
            fixed(StepKind::Analytics, json!({})),
            Arc::new(Sleeping {
                kind: StepKind::Content,
                delay: Duration::from_millis(500),
            }),
        ]);

        let done = scheduler
            .execute(RawWorkflowSpec::new("done", ["analytics"]))
            .await
            .unwrap();
        let running = scheduler
            .submit(RawWorkflowSpec::new("running", ["content"]))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let report = scheduler.cleanup(Duration::ZERO).await.unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.remaining, 1);

        let page = scheduler.list(ListTasksOptions::default()).await.unwrap();
        let ids: Vec<_> = page.tasks.iter().map(|t| t.task_id.clone()).collect();
        assert_eq!(ids, vec![running.task_id.clone()]);
        assert!(matches!(
            scheduler.status(&done.id).await,
            Err(TaskError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn cleanup_retains_young_tasks() {
        let scheduler = scheduler_with(vec![fixed(StepKind::Analytics, json!({}))]);
        scheduler
            .execute(RawWorkflowSpec::new("v1", ["analytics"]))
            .await
            .unwrap();

        let report = scheduler
            .cleanup(Duration::from_secs(24 * 3600))
            .await
            .unwrap();
        assert_eq!(report.removed, 0);
        assert_eq!(report.remaining, 1);
    }

    #[tokio::test]
    async fn runner_stops_after_its_task_is_evicted() {
        let content = Arc::new(Inspect::new(StepKind::Content));
        let analytics: Arc<dyn StepProcessor> = Arc::new(Sleeping {
            kind: StepKind::Analytics,
            delay: Duration::from_millis(50),
        });
        let scheduler = scheduler_with(vec![analytics, content.clone()]);
        let receipt = scheduler
            .submit(RawWorkflowSpec::new("v1", ["analytics", "content"]))
            .await
            .unwrap();

        assert_eq!(scheduler.store().clear().await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(scheduler.status(&receipt.task_id).await.is_err());
        assert!(scheduler.store().is_empty().await);
        assert_eq!(content.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn janitor_sweeps_periodically() {
        let scheduler = scheduler_with(vec![fixed(StepKind::Analytics, json!({}))]);
        scheduler
            .execute(RawWorkflowSpec::new("v1", ["analytics"]))
            .await
            .unwrap();

        let janitor = scheduler.spawn_janitor(Duration::from_secs(1), Duration::ZERO);
        assert_eq!(scheduler.store().len().await, 1);
        tokio::time::sleep(Duration::from_millis(1300)).await;

        assert!(scheduler.store().is_empty().await);
        janitor.abort();
    }
}
