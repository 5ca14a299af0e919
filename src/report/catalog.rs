//! The fixed, ordered operation catalog the report generator executes.
//!
//! Ordering is preserved for reproducible output. The only semantic ordering
//! constraint is that `purge_low_interaction` runs after `insert_probe`, so
//! the probe document (413 interactions) is evaluated against the purge
//! predicate and survives it.

use crate::model::{Post, PostType};
use crate::query::{
    Accumulator, Field, Filter, FindOpts, GroupOrder, GroupSpec, Order, UpdateSpec, Value,
};

use super::OpKind;

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: &'static str,
    pub kind: OpKind,
    pub action: Action,
}

#[derive(Debug, Clone)]
pub enum Action {
    Find { filter: Filter, opts: FindOpts },
    Insert { post: Post },
    Update { filter: Filter, update: UpdateSpec },
    Delete { filter: Filter },
    Aggregate { spec: GroupSpec },
}

/// The document `insert_probe` writes on every run.
pub fn probe_post() -> Post {
    Post {
        id: None,
        post_type: PostType::Video,
        category: 3,
        post_month: 8,
        post_weekday: 5,
        post_hour: 18,
        paid: 0,
        lifetime_post_total_reach: 28000,
        lifetime_engaged_users: 980,
        like: 340,
        comment: 45,
        share: 28,
        total_interactions: 413,
    }
}

pub fn catalog() -> Vec<Operation> {
    vec![
        Operation {
            name: "sample_listing",
            kind: OpKind::Query,
            action: Action::Find {
                filter: Filter::all(),
                opts: FindOpts::default().limit(5),
            },
        },
        Operation {
            name: "insert_probe",
            kind: OpKind::Mutation,
            action: Action::Insert { post: probe_post() },
        },
        Operation {
            name: "video_posts",
            kind: OpKind::Query,
            action: Action::Find {
                filter: Filter::all().eq(Field::Type, Value::Text("Video")),
                opts: FindOpts::default().limit(5),
            },
        },
        Operation {
            name: "mark_photos_paid",
            kind: OpKind::Mutation,
            action: Action::Update {
                filter: Filter::all().eq(Field::Type, Value::Text("Photo")),
                update: UpdateSpec::set(Field::Paid, Value::Int(1)),
            },
        },
        Operation {
            name: "purge_low_interaction",
            kind: OpKind::Mutation,
            action: Action::Delete {
                filter: Filter::all().lt(Field::TotalInteractions, 10),
            },
        },
        Operation {
            name: "video_high_likes",
            kind: OpKind::Query,
            action: Action::Find {
                filter: Filter::all()
                    .eq(Field::Type, Value::Text("Video"))
                    .gt(Field::Like, 1000),
                opts: FindOpts::default(),
            },
        },
        Operation {
            name: "weekend_posts",
            kind: OpKind::Query,
            action: Action::Find {
                filter: Filter::all().is_in(Field::PostWeekday, vec![6, 7]),
                opts: FindOpts::default(),
            },
        },
        Operation {
            name: "organic_high_interaction",
            kind: OpKind::Query,
            action: Action::Find {
                filter: Filter::all()
                    .eq(Field::Paid, Value::Int(0))
                    .gt(Field::TotalInteractions, 500),
                opts: FindOpts::default(),
            },
        },
        Operation {
            name: "count_by_type",
            kind: OpKind::Aggregation,
            action: Action::Aggregate {
                spec: GroupSpec {
                    key: Field::Type,
                    metrics: vec![("count", Accumulator::Count)],
                    order: None,
                },
            },
        },
        Operation {
            name: "avg_reach_by_type",
            kind: OpKind::Aggregation,
            action: Action::Aggregate {
                spec: GroupSpec {
                    key: Field::Type,
                    metrics: vec![("avgReach", Accumulator::Avg(Field::Reach))],
                    order: Some(GroupOrder::MetricDesc("avgReach")),
                },
            },
        },
        Operation {
            name: "interactions_by_category",
            kind: OpKind::Aggregation,
            action: Action::Aggregate {
                spec: GroupSpec {
                    key: Field::Category,
                    metrics: vec![(
                        "totalInteractions",
                        Accumulator::Sum(Field::TotalInteractions),
                    )],
                    order: Some(GroupOrder::KeyAsc),
                },
            },
        },
        Operation {
            name: "weekday_engagement",
            kind: OpKind::Aggregation,
            action: Action::Aggregate {
                spec: GroupSpec {
                    key: Field::PostWeekday,
                    metrics: vec![
                        ("avgLikes", Accumulator::Avg(Field::Like)),
                        ("avgComments", Accumulator::Avg(Field::Comment)),
                        ("avgShares", Accumulator::Avg(Field::Share)),
                    ],
                    order: Some(GroupOrder::KeyAsc),
                },
            },
        },
        Operation {
            name: "top_posts",
            kind: OpKind::Query,
            action: Action::Find {
                filter: Filter::all(),
                opts: FindOpts::default()
                    .sort(Field::TotalInteractions, Order::Desc)
                    .limit(5),
            },
        },
    ]
}
