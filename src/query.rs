//! Typed query vocabulary for the fixed report catalog.
//!
//! The catalog never takes user input, so predicates, updates and pipelines
//! are closed data types each store backend translates or evaluates, rather
//! than a query language.

use mongodb::bson::oid::ObjectId;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::model::Post;

/// Post fields the catalog filters, sorts or aggregates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    #[allow(dead_code)]
    Id,
    Type,
    Category,
    PostWeekday,
    Paid,
    Reach,
    Like,
    Comment,
    Share,
    TotalInteractions,
}

impl Field {
    /// Field name as stored in the collection.
    pub fn wire_name(self) -> &'static str {
        match self {
            Field::Id => "_id",
            Field::Type => "Type",
            Field::Category => "Category",
            Field::PostWeekday => "Post_Weekday",
            Field::Paid => "Paid",
            Field::Reach => "Lifetime_Post_Total_Reach",
            Field::Like => "Like",
            Field::Comment => "Comment",
            Field::Share => "Share",
            Field::TotalInteractions => "Total_Interactions",
        }
    }

    /// Value of this field on a document, `None` when the document has no id.
    pub fn value_of(self, post: &Post) -> Option<Value> {
        match self {
            Field::Id => post.id.map(Value::Id),
            Field::Type => Some(Value::Text(post.post_type.as_str())),
            Field::Category => Some(Value::Int(i64::from(post.category))),
            Field::PostWeekday => Some(Value::Int(i64::from(post.post_weekday))),
            Field::Paid => Some(Value::Int(i64::from(post.paid))),
            Field::Reach => Some(Value::Int(post.lifetime_post_total_reach)),
            Field::Like => Some(Value::Int(post.like)),
            Field::Comment => Some(Value::Int(post.comment)),
            Field::Share => Some(Value::Int(post.share)),
            Field::TotalInteractions => Some(Value::Int(post.total_interactions)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(&'static str),
    Int(i64),
    #[allow(dead_code)]
    Id(ObjectId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cmp {
    Eq(Value),
    Gt(i64),
    Lt(i64),
    In(Vec<i64>),
}

/// Conjunction of field conditions; empty matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<(Field, Cmp)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: Field, value: Value) -> Self {
        self.conditions.push((field, Cmp::Eq(value)));
        self
    }

    pub fn gt(mut self, field: Field, n: i64) -> Self {
        self.conditions.push((field, Cmp::Gt(n)));
        self
    }

    pub fn lt(mut self, field: Field, n: i64) -> Self {
        self.conditions.push((field, Cmp::Lt(n)));
        self
    }

    pub fn is_in(mut self, field: Field, codes: Vec<i64>) -> Self {
        self.conditions.push((field, Cmp::In(codes)));
        self
    }

    pub fn matches(&self, post: &Post) -> bool {
        self.conditions.iter().all(|(field, cmp)| {
            let Some(value) = field.value_of(post) else {
                return false;
            };
            match cmp {
                Cmp::Eq(want) => value == *want,
                Cmp::Gt(n) => matches!(value, Value::Int(v) if v > *n),
                Cmp::Lt(n) => matches!(value, Value::Int(v) if v < *n),
                Cmp::In(codes) => matches!(value, Value::Int(v) if codes.contains(&v)),
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FindOpts {
    pub limit: Option<i64>,
    pub sort: Option<(Field, Order)>,
}

impl FindOpts {
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn sort(mut self, field: Field, order: Order) -> Self {
        self.sort = Some((field, order));
        self
    }
}

/// `$set`-style update: assignments applied to every matched document.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    pub set: Vec<(Field, Value)>,
}

impl UpdateSpec {
    pub fn set(field: Field, value: Value) -> Self {
        Self {
            set: vec![(field, value)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Accumulator {
    Count,
    Sum(Field),
    Avg(Field),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupOrder {
    KeyAsc,
    /// Descending by the named accumulator output.
    MetricDesc(&'static str),
}

/// Single `$group` stage with optional output ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub key: Field,
    pub metrics: Vec<(&'static str, Accumulator)>,
    pub order: Option<GroupOrder>,
}

/// Group key of a result row. MongoDB buckets documents missing the key
/// field under null; that surfaces here as `Missing`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Text(String),
    Code(i64),
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metric {
    Int(i64),
    Float(f64),
}

impl Metric {
    pub fn as_f64(self) -> f64 {
        match self {
            Metric::Int(n) => n as f64,
            Metric::Float(f) => f,
        }
    }
}

/// One derived summary document out of an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: GroupKey,
    pub metrics: Vec<(&'static str, Metric)>,
}

impl GroupRow {
    pub fn metric(&self, name: &str) -> Option<Metric> {
        self.metrics
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, m)| *m)
    }
}

// Serialized in the shape the mongo shell prints group results:
// {"_id": key, "<metric>": value, ...}
impl Serialize for GroupRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.metrics.len() + 1))?;
        map.serialize_entry("_id", &self.key)?;
        for (name, metric) in &self.metrics {
            map.serialize_entry(name, metric)?;
        }
        map.end()
    }
}
