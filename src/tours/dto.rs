use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::tours::model::{rfc3339_vec, Tour};

/// List query. Filter names mirror the tour fields; `sort` takes a field name
/// with an optional leading `-` for descending.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToursQuery {
    pub difficulty: Option<String>,
    pub duration: Option<i32>,
    pub max_group_size: Option<i32>,
    pub price_gte: Option<f64>,
    pub price_lte: Option<f64>,
    pub ratings_gte: Option<f64>,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_sort() -> String {
    "-createdAt".into()
}
fn default_limit() -> i64 {
    100
}
fn default_page() -> i64 {
    1
}

/// Maps a wire sort key to an ORDER BY clause. Unknown keys are rejected so
/// nothing user-controlled reaches the SQL text.
pub fn sort_clause(sort: &str) -> Option<&'static str> {
    match sort {
        "price" => Some("price ASC"),
        "-price" => Some("price DESC"),
        "ratingsAverage" => Some("ratings_average ASC"),
        "-ratingsAverage" => Some("ratings_average DESC"),
        "duration" => Some("duration ASC"),
        "-duration" => Some("duration DESC"),
        "name" => Some("name ASC"),
        "-name" => Some("name DESC"),
        "createdAt" => Some("created_at ASC"),
        "-createdAt" => Some("created_at DESC"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTourRequest {
    pub name: String,
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: String,
    pub price: f64,
    pub price_discount: Option<f64>,
    #[serde(default)]
    pub summary: String,
    pub description: String,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "rfc3339_vec::deserialize")]
    pub start_dates: Vec<OffsetDateTime>,
    #[serde(default)]
    pub secret_tour: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTourRequest {
    pub name: Option<String>,
    pub duration: Option<i32>,
    pub max_group_size: Option<i32>,
    pub difficulty: Option<String>,
    pub price: Option<f64>,
    pub price_discount: Option<f64>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "rfc3339_vec::deserialize_option")]
    pub start_dates: Option<Vec<OffsetDateTime>>,
}

#[derive(Debug, Serialize)]
pub struct TourResponse {
    pub status: &'static str,
    pub data: TourEnvelope,
}

#[derive(Debug, Serialize)]
pub struct TourEnvelope {
    pub tour: Tour,
}

#[derive(Debug, Serialize)]
pub struct ToursListResponse {
    pub status: &'static str,
    pub results: usize,
    pub data: ToursEnvelope,
}

#[derive(Debug, Serialize)]
pub struct ToursEnvelope {
    pub tours: Vec<Tour>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub status: &'static str,
    pub data: StatsEnvelope,
}

#[derive(Debug, Serialize)]
pub struct StatsEnvelope {
    pub stats: Vec<crate::tours::repo::TourStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_whitelist_rejects_unknown_keys() {
        assert_eq!(sort_clause("price"), Some("price ASC"));
        assert_eq!(sort_clause("-ratingsAverage"), Some("ratings_average DESC"));
        assert_eq!(sort_clause("price; DROP TABLE tours"), None);
        assert_eq!(sort_clause("secretTour"), None);
    }

    #[test]
    fn list_query_defaults() {
        let q: ListToursQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.sort, "-createdAt");
        assert_eq!(q.limit, 100);
        assert_eq!(q.page, 1);
        assert!(q.difficulty.is_none());
    }

    #[test]
    fn list_query_parses_camel_case_filters() {
        let q: ListToursQuery = serde_json::from_str(
            r#"{"priceGte": 100.0, "maxGroupSize": 10, "ratingsGte": 4.0}"#,
        )
        .unwrap();
        assert_eq!(q.price_gte, Some(100.0));
        assert_eq!(q.max_group_size, Some(10));
        assert_eq!(q.ratings_gte, Some(4.0));
    }
}
