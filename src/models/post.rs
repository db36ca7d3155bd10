//! Blog post model
//!
//! This module provides:
//! - `BlogPost` entity written by a doctor
//! - `Category`, the closed set of topics a post belongs to
//! - `CategorizedPosts`, posts grouped into the fixed category buckets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Blog post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    /// Unique identifier
    pub id: i64,
    pub title: String,
    /// Header image path relative to the static root
    pub image: Option<String>,
    pub category: Category,
    pub summary: String,
    pub content: String,
    /// Drafts are only visible to their author
    pub is_draft: bool,
    /// Author user ID
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Post category.
///
/// The declaration order is the display order on both dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Mental Health")]
    MentalHealth,
    #[serde(rename = "Heart Disease")]
    HeartDisease,
    #[serde(rename = "Covid-19")]
    Covid19,
    #[serde(rename = "Immunization")]
    Immunization,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 4] = [
        Category::MentalHealth,
        Category::HeartDisease,
        Category::Covid19,
        Category::Immunization,
    ];

    /// Human-readable label, also the stored value
    pub fn label(&self) -> &'static str {
        match self {
            Category::MentalHealth => "Mental Health",
            Category::HeartDisease => "Heart Disease",
            Category::Covid19 => "Covid-19",
            Category::Immunization => "Immunization",
        }
    }

    /// Identifier used for HTML anchors and form values
    pub fn slug(&self) -> &'static str {
        match self {
            Category::MentalHealth => "mental-health",
            Category::HeartDisease => "heart-disease",
            Category::Covid19 => "covid-19",
            Category::Immunization => "immunization",
        }
    }

    fn position(&self) -> usize {
        match self {
            Category::MentalHealth => 0,
            Category::HeartDisease => 1,
            Category::Covid19 => 2,
            Category::Immunization => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A category string that names none of the known categories
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Accepts either the label ("Heart Disease") or the slug ("heart-disease").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label() == trimmed || c.slug() == trimmed)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Input for creating a new post
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    pub title: String,
    pub image: Option<String>,
    pub category: Category,
    pub summary: String,
    pub content: String,
    pub is_draft: bool,
    pub author_id: i64,
}

/// Posts of a single category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBucket {
    pub category: Category,
    pub slug: &'static str,
    pub posts: Vec<BlogPost>,
}

/// Posts partitioned into one bucket per category.
///
/// Every category is present, in display order, even when empty. Within a
/// bucket posts keep the order they were given in.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CategorizedPosts(Vec<CategoryBucket>);

impl CategorizedPosts {
    pub fn from_posts(posts: impl IntoIterator<Item = BlogPost>) -> Self {
        let mut buckets: Vec<CategoryBucket> = Category::ALL
            .into_iter()
            .map(|category| CategoryBucket {
                category,
                slug: category.slug(),
                posts: Vec::new(),
            })
            .collect();

        for post in posts {
            buckets[post.category.position()].posts.push(post);
        }

        Self(buckets)
    }

    /// Posts of one category
    pub fn get(&self, category: Category) -> &[BlogPost] {
        &self.0[category.position()].posts
    }

    pub fn buckets(&self) -> &[CategoryBucket] {
        &self.0
    }

    /// Number of posts across all buckets
    pub fn total(&self) -> usize {
        self.0.iter().map(|b| b.posts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn post(id: i64, category: Category) -> BlogPost {
        BlogPost {
            id,
            title: format!("Post {id}"),
            image: None,
            category,
            summary: String::new(),
            content: String::new(),
            is_draft: false,
            author_id: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_str(category.label()).unwrap(), category);
            assert_eq!(Category::from_str(category.slug()).unwrap(), category);
        }
    }

    #[test]
    fn test_unknown_category_rejected() {
        let err = Category::from_str("Oncology").unwrap_err();
        assert_eq!(err, UnknownCategory("Oncology".to_string()));
        assert_eq!(err.to_string(), "Unknown category: 'Oncology'");

        assert!(Category::from_str("heart disease").is_err());
        assert!(Category::from_str("").is_err());
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&Category::Covid19).unwrap();
        assert_eq!(json, "\"Covid-19\"");

        let parsed: Category = serde_json::from_str("\"Mental Health\"").unwrap();
        assert_eq!(parsed, Category::MentalHealth);
    }

    #[test]
    fn test_empty_input_has_all_buckets() {
        let categorized = CategorizedPosts::from_posts(Vec::new());

        let order: Vec<Category> = categorized.buckets().iter().map(|b| b.category).collect();
        assert_eq!(order, Category::ALL.to_vec());
        assert!(categorized.is_empty());
    }

    #[test]
    fn test_posts_land_in_their_bucket() {
        let categorized = CategorizedPosts::from_posts(vec![
            post(1, Category::HeartDisease),
            post(2, Category::Immunization),
            post(3, Category::HeartDisease),
        ]);

        let heart: Vec<i64> = categorized
            .get(Category::HeartDisease)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(heart, vec![1, 3]);
        assert_eq!(categorized.get(Category::Immunization).len(), 1);
        assert!(categorized.get(Category::MentalHealth).is_empty());
        assert_eq!(categorized.total(), 3);
    }

    #[test]
    fn test_categorized_serializes_as_ordered_list() {
        let categorized = CategorizedPosts::from_posts(vec![post(7, Category::Covid19)]);
        let value = serde_json::to_value(&categorized).unwrap();

        let buckets = value.as_array().unwrap();
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0]["category"], "Mental Health");
        assert_eq!(buckets[2]["slug"], "covid-19");
        assert_eq!(buckets[2]["posts"][0]["id"], 7);
    }

    fn any_category() -> impl Strategy<Value = Category> {
        prop::sample::select(Category::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn categorize_preserves_count_and_order(
            categories in prop::collection::vec(any_category(), 0..40)
        ) {
            let posts: Vec<BlogPost> = categories
                .iter()
                .enumerate()
                .map(|(i, c)| post(i as i64, *c))
                .collect();

            let categorized = CategorizedPosts::from_posts(posts.clone());

            prop_assert_eq!(categorized.total(), posts.len());
            for bucket in categorized.buckets() {
                prop_assert!(bucket.posts.iter().all(|p| p.category == bucket.category));
                let ids: Vec<i64> = bucket.posts.iter().map(|p| p.id).collect();
                let expected: Vec<i64> = posts
                    .iter()
                    .filter(|p| p.category == bucket.category)
                    .map(|p| p.id)
                    .collect();
                prop_assert_eq!(ids, expected);
            }
        }
    }
}
