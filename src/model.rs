use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Publication type as it appears in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostType {
    Photo,
    Video,
    Status,
    Link,
}

impl PostType {
    pub fn as_str(self) -> &'static str {
        match self {
            PostType::Photo => "Photo",
            PostType::Video => "Video",
            PostType::Status => "Status",
            PostType::Link => "Link",
        }
    }
}

/// One social-media publication's metadata and engagement metrics.
///
/// Field names are renamed to the dataset's wire names so the same struct
/// round-trips through the collection unchanged. `Paid` is kept as the 0/1
/// integer the dataset stores, not a bool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "Type")]
    pub post_type: PostType,
    #[serde(rename = "Category")]
    pub category: i32,
    #[serde(rename = "Post_Month")]
    pub post_month: i32,
    #[serde(rename = "Post_Weekday")]
    pub post_weekday: i32,
    #[serde(rename = "Post_Hour")]
    pub post_hour: i32,
    #[serde(rename = "Paid")]
    pub paid: i32,
    #[serde(rename = "Lifetime_Post_Total_Reach")]
    pub lifetime_post_total_reach: i64,
    #[serde(rename = "Lifetime_Engaged_Users")]
    pub lifetime_engaged_users: i64,
    #[serde(rename = "Like")]
    pub like: i64,
    #[serde(rename = "Comment")]
    pub comment: i64,
    #[serde(rename = "Share")]
    pub share: i64,
    #[serde(rename = "Total_Interactions")]
    pub total_interactions: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_serializes_wire_names() {
        let post = Post {
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
        };

        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["Type"], "Video");
        assert_eq!(value["Post_Weekday"], 5);
        assert_eq!(value["Lifetime_Post_Total_Reach"], 28000);
        assert_eq!(value["Total_Interactions"], 413);
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn test_post_deserializes_without_id() {
        let post: Post = serde_json::from_str(
            r#"{"Type": "Photo", "Category": 1, "Post_Month": 12, "Post_Weekday": 7,
                "Post_Hour": 3, "Paid": 1, "Lifetime_Post_Total_Reach": 100,
                "Lifetime_Engaged_Users": 10, "Like": 5, "Comment": 2, "Share": 1,
                "Total_Interactions": 8}"#,
        )
        .unwrap();
        assert_eq!(post.id, None);
        assert_eq!(post.post_type, PostType::Photo);
        assert_eq!(post.paid, 1);
        assert_eq!(post.total_interactions, 8);
    }
}
