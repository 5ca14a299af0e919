use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Instrument;

use crate::error::{StepFailure, StoreError};
use crate::store::PostStore;
use crate::telemetry::metrics::{
    REPORT_RUNS_TOTAL, REPORT_STEPS_FAILED, REPORT_STEP_DOCUMENTS, REPORT_STEP_DURATION,
};

use super::catalog::{Action, Operation, catalog};
use super::{NamedResult, Payload, ReportRun};

/// Runs the full catalog against the given store, strictly in order, one
/// operation at a time.
///
/// A constraint violation on the insert step is recorded and the remaining
/// steps still run, since they are independent of the probe. Any other
/// failure aborts the rest of the catalog. Nothing is retried.
#[tracing::instrument(name = "report run", skip(store), fields(report.steps, report.failed))]
pub async fn run_report(store: &dyn PostStore) -> ReportRun {
    let mut run = ReportRun::default();

    for op in catalog() {
        match execute(store, &op).await {
            Ok(result) => run.results.push(result),
            Err(error) => {
                let failure = StepFailure {
                    step: op.name,
                    error,
                };
                REPORT_STEPS_FAILED.add(1, &[KeyValue::new("report.step", op.name)]);

                let recoverable = matches!(failure.error, StoreError::ConstraintViolation(_))
                    && matches!(op.action, Action::Insert { .. });
                if recoverable {
                    tracing::error!(step = op.name, error = %failure.error, "step failed, continuing");
                    run.failures.push(failure);
                } else {
                    tracing::error!(step = op.name, error = %failure.error, "step failed, aborting remaining catalog");
                    run.aborted = Some(failure);
                    break;
                }
            }
        }
    }

    let failed = run.failures.len() + usize::from(run.aborted.is_some());
    let span = tracing::Span::current();
    span.record("report.steps", run.results.len());
    span.record("report.failed", failed);

    REPORT_RUNS_TOTAL.add(
        1,
        &[KeyValue::new(
            "report.outcome",
            if run.succeeded() { "ok" } else { "failed" },
        )],
    );

    run
}

async fn execute(store: &dyn PostStore, op: &Operation) -> Result<NamedResult, StoreError> {
    let span = tracing::info_span!(
        "report_step",
        otel.name = %format!("report_step {}", op.name),
        report.step = op.name,
        report.kind = op.kind.as_str(),
        report.documents = tracing::field::Empty,
    );
    let start = Instant::now();

    let payload = async {
        match &op.action {
            Action::Find { filter, opts } => store.find(filter, *opts).await.map(Payload::Documents),
            Action::Insert { post } => store.insert_one(post).await.map(Payload::InsertedId),
            Action::Update { filter, update } => store
                .update_many(filter, update)
                .await
                .map(Payload::Updated),
            Action::Delete { filter } => store
                .delete_many(filter)
                .await
                .map(|deleted| Payload::Deleted { deleted }),
            Action::Aggregate { spec } => store.aggregate(spec).await.map(Payload::Groups),
        }
    }
    .instrument(span.clone())
    .await?;

    let duration = start.elapsed();
    let step_kv = KeyValue::new("report.step", op.name);
    REPORT_STEP_DURATION.record(duration.as_secs_f64(), &[step_kv.clone()]);

    if let Some(count) = payload_size(&payload) {
        span.record("report.documents", count);
        REPORT_STEP_DOCUMENTS.record(count as f64, &[step_kv]);
    }

    tracing::info!(
        step = op.name,
        kind = op.kind.as_str(),
        duration_ms = duration.as_millis() as u64,
        "step finished"
    );

    Ok(NamedResult {
        name: op.name,
        kind: op.kind,
        payload,
    })
}

fn payload_size(payload: &Payload) -> Option<usize> {
    match payload {
        Payload::Documents(posts) => Some(posts.len()),
        Payload::Groups(rows) => Some(rows.len()),
        Payload::InsertedId(_) | Payload::Updated(_) | Payload::Deleted { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreResult;
    use crate::model::{Post, PostType};
    use crate::query::{
        Field, Filter, FindOpts, GroupKey, GroupRow, GroupSpec, Metric, UpdateSpec, Value,
    };
    use crate::report::OpKind;
    use crate::store::{MemoryStore, UpdateSummary};

    /// Store with an unreachable backend; every operation fails.
    struct DownStore;

    #[async_trait::async_trait]
    impl PostStore for DownStore {
        async fn find(&self, _filter: &Filter, _opts: FindOpts) -> StoreResult<Vec<Post>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn insert_one(&self, _post: &Post) -> StoreResult<String> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn update_many(
            &self,
            _filter: &Filter,
            _update: &UpdateSpec,
        ) -> StoreResult<UpdateSummary> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn delete_many(&self, _filter: &Filter) -> StoreResult<u64> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn aggregate(&self, _spec: &GroupSpec) -> StoreResult<Vec<GroupRow>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    /// Store whose schema validator rejects every insert; reads and the
    /// other mutations pass through to the in-memory backend.
    struct RejectingInserts {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl PostStore for RejectingInserts {
        async fn find(&self, filter: &Filter, opts: FindOpts) -> StoreResult<Vec<Post>> {
            self.inner.find(filter, opts).await
        }

        async fn insert_one(&self, _post: &Post) -> StoreResult<String> {
            Err(StoreError::ConstraintViolation(
                "document failed validation".to_string(),
            ))
        }

        async fn update_many(
            &self,
            filter: &Filter,
            update: &UpdateSpec,
        ) -> StoreResult<UpdateSummary> {
            self.inner.update_many(filter, update).await
        }

        async fn delete_many(&self, filter: &Filter) -> StoreResult<u64> {
            self.inner.delete_many(filter).await
        }

        async fn aggregate(&self, spec: &GroupSpec) -> StoreResult<Vec<GroupRow>> {
            self.inner.aggregate(spec).await
        }
    }

    fn post(post_type: PostType, interactions: i64) -> Post {
        Post {
            id: None,
            post_type,
            category: 1,
            post_month: 1,
            post_weekday: 1,
            post_hour: 0,
            paid: 0,
            lifetime_post_total_reach: 0,
            lifetime_engaged_users: 0,
            like: 0,
            comment: 0,
            share: 0,
            total_interactions: interactions,
        }
    }

    fn result<'a>(run: &'a ReportRun, name: &str) -> &'a NamedResult {
        run.results
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no result for step {name}"))
    }

    fn documents<'a>(run: &'a ReportRun, name: &str) -> &'a Vec<Post> {
        match &result(run, name).payload {
            Payload::Documents(posts) => posts,
            other => panic!("step {name} is not a document query: {other:?}"),
        }
    }

    fn groups<'a>(run: &'a ReportRun, name: &str) -> &'a Vec<crate::query::GroupRow> {
        match &result(run, name).payload {
            Payload::Groups(rows) => rows,
            other => panic!("step {name} is not an aggregation: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_collection_run() {
        let store = MemoryStore::new();
        let run = run_report(&store).await;

        assert!(run.succeeded());
        assert_eq!(run.results.len(), 13);

        // All filtered scans are empty; the sample only sees the probe.
        assert!(documents(&run, "video_high_likes").is_empty());
        assert!(documents(&run, "weekend_posts").is_empty());

        // The probe insert always succeeds and survives the purge.
        assert!(matches!(
            result(&run, "insert_probe").payload,
            Payload::InsertedId(_)
        ));
        assert!(matches!(
            result(&run, "purge_low_interaction").payload,
            Payload::Deleted { deleted: 0 }
        ));

        // The probe is a Video with 413 interactions and Paid=0.
        assert_eq!(documents(&run, "video_posts").len(), 1);
        assert!(documents(&run, "organic_high_interaction").is_empty());
        assert_eq!(documents(&run, "top_posts").len(), 1);
        assert_eq!(groups(&run, "count_by_type").len(), 1);
    }

    #[tokio::test]
    async fn test_probe_visible_to_video_filter() {
        let store = MemoryStore::new();
        let run = run_report(&store).await;

        let videos = documents(&run, "video_posts");
        assert!(
            videos
                .iter()
                .any(|p| p.post_type == PostType::Video && p.total_interactions == 413)
        );
    }

    #[tokio::test]
    async fn test_probe_round_trips_by_generated_id() {
        let store = MemoryStore::new();
        let probe = crate::report::catalog::probe_post();

        let hex = store.insert_one(&probe).await.unwrap();
        let id = mongodb::bson::oid::ObjectId::parse_str(&hex).unwrap();

        let fetched = store
            .find(
                &Filter::all().eq(Field::Id, Value::Id(id)),
                FindOpts::default(),
            )
            .await
            .unwrap();

        assert_eq!(fetched.len(), 1);
        let mut stored = fetched[0].clone();
        stored.id = None;
        assert_eq!(stored, probe);
    }

    #[tokio::test]
    async fn test_mark_photos_paid_is_idempotent() {
        let store = MemoryStore::seeded(vec![
            post(PostType::Photo, 100),
            post(PostType::Photo, 200),
        ]);

        let first = run_report(&store).await;
        match result(&first, "mark_photos_paid").payload {
            Payload::Updated(summary) => {
                assert_eq!(summary.matched, 2);
                assert_eq!(summary.modified, 2);
            }
            ref other => panic!("unexpected payload: {other:?}"),
        }

        let second = run_report(&store).await;
        match result(&second, "mark_photos_paid").payload {
            Payload::Updated(summary) => {
                assert_eq!(summary.matched, 2);
                assert_eq!(summary.modified, 0);
            }
            ref other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_type_counts_sum_to_collection_size() {
        let store = MemoryStore::seeded(vec![
            post(PostType::Photo, 100),
            post(PostType::Video, 200),
            post(PostType::Status, 300),
            post(PostType::Status, 400),
        ]);

        let run = run_report(&store).await;

        let total: i64 = groups(&run, "count_by_type")
            .iter()
            .filter_map(|row| match row.metric("count") {
                Some(Metric::Int(n)) => Some(n),
                _ => None,
            })
            .sum();
        assert_eq!(total as usize, store.document_count());
    }

    #[tokio::test]
    async fn test_avg_reach_sorted_descending() {
        let mut rich = post(PostType::Photo, 100);
        rich.lifetime_post_total_reach = 90_000;
        let mut poor = post(PostType::Status, 100);
        poor.lifetime_post_total_reach = 50;
        let store = MemoryStore::seeded(vec![rich, poor]);

        let run = run_report(&store).await;

        let rows = groups(&run, "avg_reach_by_type");
        assert!(rows.len() >= 2);
        for pair in rows.windows(2) {
            let a = pair[0].metric("avgReach").unwrap().as_f64();
            let b = pair[1].metric("avgReach").unwrap().as_f64();
            assert!(a >= b, "avg_reach_by_type not sorted descending");
        }
    }

    #[tokio::test]
    async fn test_concrete_three_document_scenario() {
        // Two Photos (5 and 800 interactions) in the collection; the probe
        // insert adds the third document.
        let store = MemoryStore::seeded(vec![
            post(PostType::Photo, 5),
            post(PostType::Photo, 800),
        ]);

        let run = run_report(&store).await;
        assert!(run.succeeded());

        match result(&run, "mark_photos_paid").payload {
            Payload::Updated(summary) => assert_eq!(summary.modified, 2),
            ref other => panic!("unexpected payload: {other:?}"),
        }
        assert!(matches!(
            result(&run, "purge_low_interaction").payload,
            Payload::Deleted { deleted: 1 }
        ));
        assert_eq!(store.document_count(), 2);

        let counts = groups(&run, "count_by_type");
        let count_for = |key: &str| {
            counts
                .iter()
                .find(|row| row.key == GroupKey::Text(key.to_string()))
                .and_then(|row| row.metric("count"))
        };
        assert_eq!(count_for("Photo"), Some(Metric::Int(1)));
        assert_eq!(count_for("Video"), Some(Metric::Int(1)));
    }

    #[tokio::test]
    async fn test_kinds_reported_per_step() {
        let store = MemoryStore::new();
        let run = run_report(&store).await;

        assert_eq!(result(&run, "sample_listing").kind, OpKind::Query);
        assert_eq!(result(&run, "insert_probe").kind, OpKind::Mutation);
        assert_eq!(result(&run, "count_by_type").kind, OpKind::Aggregation);
    }

    #[tokio::test]
    async fn test_unavailable_store_aborts_on_first_step() {
        let run = run_report(&DownStore).await;

        assert!(run.results.is_empty());
        assert!(run.failures.is_empty());

        let aborted = run.aborted.as_ref().expect("run should abort");
        assert_eq!(aborted.step, "sample_listing");
        assert!(matches!(aborted.error, StoreError::Unavailable(_)));
        assert!(!run.succeeded());
    }

    #[tokio::test]
    async fn test_rejected_insert_does_not_abort_remaining_steps() {
        let store = RejectingInserts {
            inner: MemoryStore::seeded(vec![post(PostType::Photo, 800)]),
        };

        let run = run_report(&store).await;

        // Every step besides the insert still produced a result, in order.
        assert_eq!(run.results.len(), 12);
        assert!(run.aborted.is_none());
        assert!(!run.succeeded());
        assert_eq!(result(&run, "top_posts").kind, OpKind::Query);

        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].step, "insert_probe");
        assert!(matches!(
            run.failures[0].error,
            StoreError::ConstraintViolation(_)
        ));
    }
}
