use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use mongodb::bson::oid::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::model::Post;
use crate::query::{
    Accumulator, Field, Filter, FindOpts, GroupKey, GroupOrder, GroupRow, GroupSpec, Metric,
    Order, UpdateSpec, Value,
};
use crate::store::{PostStore, UpdateSummary};

/// In-process post store evaluating the same typed vocabulary as the MongoDB
/// backend. Backs `STORE_BACKEND=memory` smoke runs and the report tests.
#[derive(Default)]
pub struct MemoryStore {
    posts: Mutex<Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given documents; ids are assigned where
    /// missing, as the real store would on insert.
    #[cfg(test)]
    pub fn seeded(mut posts: Vec<Post>) -> Self {
        for post in &mut posts {
            if post.id.is_none() {
                post.id = Some(ObjectId::new());
            }
        }
        Self {
            posts: Mutex::new(posts),
        }
    }

    #[cfg(test)]
    pub fn document_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Post>> {
        self.posts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl PostStore for MemoryStore {
    async fn find(&self, filter: &Filter, opts: FindOpts) -> StoreResult<Vec<Post>> {
        let posts = self.lock();
        let mut matched: Vec<Post> = posts.iter().filter(|p| filter.matches(p)).cloned().collect();
        drop(posts);

        if let Some((field, order)) = opts.sort {
            // Stable sort, so tied documents keep insertion order.
            matched.sort_by(|a, b| {
                let (ka, kb) = (int_of(field, a), int_of(field, b));
                match order {
                    Order::Asc => ka.cmp(&kb),
                    Order::Desc => kb.cmp(&ka),
                }
            });
        }
        if let Some(limit) = opts.limit {
            matched.truncate(limit.max(0) as usize);
        }
        Ok(matched)
    }

    async fn insert_one(&self, post: &Post) -> StoreResult<String> {
        let id = post.id.unwrap_or_else(ObjectId::new);
        let mut stored = post.clone();
        stored.id = Some(id);
        self.lock().push(stored);
        Ok(id.to_hex())
    }

    async fn update_many(
        &self,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateSummary> {
        let mut posts = self.lock();
        let mut summary = UpdateSummary {
            matched: 0,
            modified: 0,
        };
        for post in posts.iter_mut().filter(|p| filter.matches(p)) {
            summary.matched += 1;
            let mut changed = false;
            for (field, value) in &update.set {
                changed |= set_field(post, *field, value)?;
            }
            if changed {
                summary.modified += 1;
            }
        }
        Ok(summary)
    }

    async fn delete_many(&self, filter: &Filter) -> StoreResult<u64> {
        let mut posts = self.lock();
        let before = posts.len();
        posts.retain(|p| !filter.matches(p));
        Ok((before - posts.len()) as u64)
    }

    async fn aggregate(&self, spec: &GroupSpec) -> StoreResult<Vec<GroupRow>> {
        let posts = self.lock();

        let mut order: Vec<GroupKey> = Vec::new();
        let mut buckets: HashMap<GroupKey, Vec<Post>> = HashMap::new();
        for post in posts.iter() {
            let key = group_key(spec.key, post);
            if !buckets.contains_key(&key) {
                order.push(key.clone());
            }
            buckets.entry(key).or_default().push(post.clone());
        }
        drop(posts);

        let mut rows = Vec::with_capacity(order.len());
        for key in order {
            let members = &buckets[&key];
            let mut metrics = Vec::with_capacity(spec.metrics.len());
            for (name, accumulator) in &spec.metrics {
                let metric = match accumulator {
                    Accumulator::Count => Metric::Int(members.len() as i64),
                    Accumulator::Sum(field) => {
                        Metric::Int(members.iter().map(|p| int_of(*field, p)).sum())
                    }
                    Accumulator::Avg(field) => {
                        let sum: i64 = members.iter().map(|p| int_of(*field, p)).sum();
                        Metric::Float(sum as f64 / members.len() as f64)
                    }
                };
                metrics.push((*name, metric));
            }
            rows.push(GroupRow { key, metrics });
        }

        match spec.order {
            Some(GroupOrder::KeyAsc) => rows.sort_by(|a, b| a.key.cmp(&b.key)),
            Some(GroupOrder::MetricDesc(name)) => rows.sort_by(|a, b| {
                let (ma, mb) = (metric_or_min(a, name), metric_or_min(b, name));
                mb.total_cmp(&ma)
            }),
            None => {}
        }
        Ok(rows)
    }
}

fn int_of(field: Field, post: &Post) -> i64 {
    match field.value_of(post) {
        Some(Value::Int(n)) => n,
        _ => 0,
    }
}

fn group_key(field: Field, post: &Post) -> GroupKey {
    match field.value_of(post) {
        Some(Value::Text(s)) => GroupKey::Text(s.to_string()),
        Some(Value::Int(n)) => GroupKey::Code(n),
        Some(Value::Id(oid)) => GroupKey::Text(oid.to_hex()),
        None => GroupKey::Missing,
    }
}

fn metric_or_min(row: &GroupRow, name: &str) -> f64 {
    row.metric(name).map(Metric::as_f64).unwrap_or(f64::MIN)
}

fn set_field(post: &mut Post, field: Field, value: &Value) -> StoreResult<bool> {
    match (field, value) {
        (Field::Paid, Value::Int(n)) => replace_i32(&mut post.paid, *n),
        (Field::Category, Value::Int(n)) => replace_i32(&mut post.category, *n),
        (Field::PostWeekday, Value::Int(n)) => replace_i32(&mut post.post_weekday, *n),
        (Field::Like, Value::Int(n)) => Ok(replace_i64(&mut post.like, *n)),
        (Field::Comment, Value::Int(n)) => Ok(replace_i64(&mut post.comment, *n)),
        (Field::Share, Value::Int(n)) => Ok(replace_i64(&mut post.share, *n)),
        (Field::Reach, Value::Int(n)) => {
            Ok(replace_i64(&mut post.lifetime_post_total_reach, *n))
        }
        (Field::TotalInteractions, Value::Int(n)) => {
            Ok(replace_i64(&mut post.total_interactions, *n))
        }
        (field, value) => Err(StoreError::InvalidPredicate(format!(
            "unsupported $set target: {field:?} = {value:?}"
        ))),
    }
}

fn replace_i32(slot: &mut i32, n: i64) -> StoreResult<bool> {
    let value = i32::try_from(n).map_err(|_| {
        StoreError::InvalidPredicate(format!("value {n} out of range for 32-bit field"))
    })?;
    let changed = *slot != value;
    *slot = value;
    Ok(changed)
}

fn replace_i64(slot: &mut i64, n: i64) -> bool {
    let changed = *slot != n;
    *slot = n;
    changed
}
