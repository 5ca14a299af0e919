use futures::stream::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::FindOptions;
use mongodb::{Client, Collection};

use crate::error::{StoreError, StoreResult};
use crate::model::Post;
use crate::query::{
    Accumulator, Cmp, Filter, FindOpts, GroupKey, GroupOrder, GroupRow, GroupSpec, Metric, Order,
    UpdateSpec, Value,
};
use crate::store::{PostStore, UpdateSummary};

/// MongoDB-backed post store over a single collection handle.
pub struct MongoStore {
    collection: Collection<Post>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> StoreResult<Self> {
        let options = mongodb::options::ClientOptions::parse(uri)
            .await
            .map_err(classify)?;
        let client = Client::with_options(options).map_err(classify)?;
        let handle = client.database(database).collection::<Post>(collection);

        tracing::info!(database, collection, "Connected to MongoDB");

        Ok(Self { collection: handle })
    }
}

#[async_trait::async_trait]
impl PostStore for MongoStore {
    #[tracing::instrument(name = "store.mongo.find", skip_all)]
    async fn find(&self, filter: &Filter, opts: FindOpts) -> StoreResult<Vec<Post>> {
        let mut options = FindOptions::default();
        options.limit = opts.limit;
        if let Some((field, order)) = opts.sort {
            let mut sort = Document::new();
            sort.insert(
                field.wire_name(),
                match order {
                    Order::Asc => 1,
                    Order::Desc => -1,
                },
            );
            options.sort = Some(sort);
        }

        let cursor = self
            .collection
            .find(filter_doc(filter))
            .with_options(options)
            .await
            .map_err(classify)?;

        cursor.try_collect().await.map_err(classify)
    }

    #[tracing::instrument(name = "store.mongo.insert_one", skip_all)]
    async fn insert_one(&self, post: &Post) -> StoreResult<String> {
        let result = self.collection.insert_one(post).await.map_err(classify)?;

        Ok(match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        })
    }

    #[tracing::instrument(name = "store.mongo.update_many", skip_all)]
    async fn update_many(
        &self,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateSummary> {
        let result = self
            .collection
            .update_many(filter_doc(filter), update_doc(update))
            .await
            .map_err(classify)?;

        Ok(UpdateSummary {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    #[tracing::instrument(name = "store.mongo.delete_many", skip_all)]
    async fn delete_many(&self, filter: &Filter) -> StoreResult<u64> {
        let result = self
            .collection
            .delete_many(filter_doc(filter))
            .await
            .map_err(classify)?;

        Ok(result.deleted_count)
    }

    #[tracing::instrument(name = "store.mongo.aggregate", skip_all)]
    async fn aggregate(&self, spec: &GroupSpec) -> StoreResult<Vec<GroupRow>> {
        let cursor = self
            .collection
            .aggregate(pipeline_docs(spec))
            .await
            .map_err(classify)?;

        let rows: Vec<Document> = cursor.try_collect().await.map_err(classify)?;
        rows.iter().map(|row| group_row(row, spec)).collect()
    }
}

fn bson_value(value: &Value) -> Bson {
    match value {
        Value::Text(s) => Bson::String((*s).to_string()),
        // The dataset stores its numerics as Int32; match that when the
        // value fits so `$set` writes the same type it reads.
        Value::Int(n) => match i32::try_from(*n) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(*n),
        },
        Value::Id(oid) => Bson::ObjectId(*oid),
    }
}

fn filter_doc(filter: &Filter) -> Document {
    let mut document = Document::new();
    for (field, cmp) in &filter.conditions {
        let condition = match cmp {
            Cmp::Eq(value) => bson_value(value),
            Cmp::Gt(n) => Bson::Document(doc! { "$gt": *n }),
            Cmp::Lt(n) => Bson::Document(doc! { "$lt": *n }),
            Cmp::In(codes) => Bson::Document(doc! { "$in": codes.clone() }),
        };
        document.insert(field.wire_name(), condition);
    }
    document
}

fn update_doc(update: &UpdateSpec) -> Document {
    let mut set = Document::new();
    for (field, value) in &update.set {
        set.insert(field.wire_name(), bson_value(value));
    }
    doc! { "$set": set }
}

fn pipeline_docs(spec: &GroupSpec) -> Vec<Document> {
    let mut group = doc! { "_id": format!("${}", spec.key.wire_name()) };
    for (name, accumulator) in &spec.metrics {
        let expr = match accumulator {
            Accumulator::Count => doc! { "$sum": 1 },
            Accumulator::Sum(field) => doc! { "$sum": format!("${}", field.wire_name()) },
            Accumulator::Avg(field) => doc! { "$avg": format!("${}", field.wire_name()) },
        };
        group.insert(*name, expr);
    }

    let mut pipeline = vec![doc! { "$group": group }];
    match spec.order {
        Some(GroupOrder::KeyAsc) => pipeline.push(doc! { "$sort": { "_id": 1 } }),
        Some(GroupOrder::MetricDesc(name)) => {
            let mut sort = Document::new();
            sort.insert(name, -1);
            pipeline.push(doc! { "$sort": sort });
        }
        None => {}
    }
    pipeline
}

fn group_row(row: &Document, spec: &GroupSpec) -> StoreResult<GroupRow> {
    let key = match row.get("_id") {
        Some(Bson::String(s)) => GroupKey::Text(s.clone()),
        Some(Bson::Int32(n)) => GroupKey::Code(i64::from(*n)),
        Some(Bson::Int64(n)) => GroupKey::Code(*n),
        Some(Bson::Double(d)) => GroupKey::Code(*d as i64),
        Some(Bson::Null) | None => GroupKey::Missing,
        Some(other) => {
            return Err(StoreError::Decode(format!(
                "unexpected group key: {other}"
            )));
        }
    };

    let mut metrics = Vec::with_capacity(spec.metrics.len());
    for (name, _) in &spec.metrics {
        let metric = match row.get(*name) {
            Some(Bson::Int32(n)) => Metric::Int(i64::from(*n)),
            Some(Bson::Int64(n)) => Metric::Int(*n),
            Some(Bson::Double(d)) => Metric::Float(*d),
            other => {
                return Err(StoreError::Decode(format!(
                    "metric '{name}' missing or non-numeric in group row: {other:?}"
                )));
            }
        };
        metrics.push((*name, metric));
    }

    Ok(GroupRow { key, metrics })
}

// BadValue, FailedToParse, TypeMismatch
const PREDICATE_ERROR_CODES: [i32; 3] = [2, 9, 14];
// DocumentValidationFailure plus the two duplicate-key codes
const CONSTRAINT_ERROR_CODES: [i32; 3] = [121, 11000, 11001];

fn classify(err: mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we))
            if CONSTRAINT_ERROR_CODES.contains(&we.code) =>
        {
            StoreError::ConstraintViolation(we.message.clone())
        }
        ErrorKind::InvalidArgument { message, .. } => StoreError::InvalidPredicate(message.clone()),
        ErrorKind::Command(ce) if PREDICATE_ERROR_CODES.contains(&ce.code) => {
            StoreError::InvalidPredicate(ce.message.clone())
        }
        ErrorKind::BsonDeserialization(e) => StoreError::Decode(e.to_string()),
        ErrorKind::BsonSerialization(e) => StoreError::Decode(e.to_string()),
        _ => StoreError::Unavailable(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Field;

    #[test]
    fn test_empty_filter_translates_to_empty_document() {
        assert_eq!(filter_doc(&Filter::all()), Document::new());
    }

    #[test]
    fn test_compound_filter_translation() {
        let filter = Filter::all()
            .eq(Field::Type, Value::Text("Video"))
            .gt(Field::Like, 1000);

        assert_eq!(
            filter_doc(&filter),
            doc! { "Type": "Video", "Like": { "$gt": 1000_i64 } }
        );
    }

    #[test]
    fn test_in_filter_translation() {
        let filter = Filter::all().is_in(Field::PostWeekday, vec![6, 7]);
        assert_eq!(
            filter_doc(&filter),
            doc! { "Post_Weekday": { "$in": [6_i64, 7_i64] } }
        );
    }

    #[test]
    fn test_update_translation_uses_set() {
        let update = UpdateSpec::set(Field::Paid, Value::Int(1));
        assert_eq!(update_doc(&update), doc! { "$set": { "Paid": 1_i32 } });
    }

    #[test]
    fn test_group_pipeline_with_metric_sort() {
        let spec = GroupSpec {
            key: Field::Type,
            metrics: vec![("avgReach", Accumulator::Avg(Field::Reach))],
            order: Some(GroupOrder::MetricDesc("avgReach")),
        };

        assert_eq!(
            pipeline_docs(&spec),
            vec![
                doc! { "$group": {
                    "_id": "$Type",
                    "avgReach": { "$avg": "$Lifetime_Post_Total_Reach" },
                }},
                doc! { "$sort": { "avgReach": -1 } },
            ]
        );
    }

    #[test]
    fn test_group_pipeline_with_key_sort() {
        let spec = GroupSpec {
            key: Field::Category,
            metrics: vec![("totalInteractions", Accumulator::Sum(Field::TotalInteractions))],
            order: Some(GroupOrder::KeyAsc),
        };

        let pipeline = pipeline_docs(&spec);
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline[1], doc! { "$sort": { "_id": 1 } });
    }

    #[test]
    fn test_group_row_parses_numeric_kinds() {
        let spec = GroupSpec {
            key: Field::Type,
            metrics: vec![("count", Accumulator::Count), ("avg", Accumulator::Avg(Field::Like))],
            order: None,
        };
        let row = group_row(&doc! { "_id": "Photo", "count": 4_i32, "avg": 2.5 }, &spec).unwrap();

        assert_eq!(row.key, GroupKey::Text("Photo".to_string()));
        assert_eq!(row.metric("count"), Some(Metric::Int(4)));
        assert_eq!(row.metric("avg"), Some(Metric::Float(2.5)));
    }

    #[test]
    fn test_group_row_null_key_is_missing() {
        let spec = GroupSpec {
            key: Field::Category,
            metrics: vec![("count", Accumulator::Count)],
            order: None,
        };
        let row = group_row(&doc! { "_id": Bson::Null, "count": 1_i64 }, &spec).unwrap();
        assert_eq!(row.key, GroupKey::Missing);
    }

    #[test]
    fn test_group_row_rejects_missing_metric() {
        let spec = GroupSpec {
            key: Field::Type,
            metrics: vec![("count", Accumulator::Count)],
            order: None,
        };
        let result = group_row(&doc! { "_id": "Photo" }, &spec);
        assert!(matches!(result, Err(StoreError::Decode(_))));
    }
}
