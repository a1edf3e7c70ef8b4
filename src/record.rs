use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A geo-survey field project, the record replicated between the local and
/// remote stores.
///
/// `id` is assigned exclusively by the local store at creation time and is
/// reused verbatim when the record is propagated to the remote store (remote
/// mutation is an upsert-by-id, never an insert-and-reassign).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Media URL, filled in asynchronously by the upload pipeline via a
    /// repeated idempotent update.
    #[serde(default)]
    pub img: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub recorded_on: NaiveDate,
    pub user_id: i64,
}

/// Number of projects a user recorded on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProjectCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Per-day activity for a user over a trailing window, with the derived
/// total. Served entirely from the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub user_id: i64,
    pub total_count: u64,
    pub daily: Vec<DailyProjectCount>,
}

/// Owner of a project. Only the minimum needed to enforce the create
/// precondition (the referenced user must exist locally); user management
/// itself lives outside this engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    pub email: String,
}
