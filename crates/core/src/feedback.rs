//! User feedback model and the aggregation & filter engine.
//!
//! Everything here is pure: filtering and bar-chart derivation are computed
//! on demand from an immutable [`FeedbackBundle`]. Summary figures (totals,
//! average, comment count, distribution) are taken verbatim from the fetched
//! summary and never recomputed from the record list; the two are not
//! required to reconcile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConsoleError;
use crate::fetch_state::{FetchState, FetchStatus};
use crate::identity::CallerIdentity;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Minimum rendered bar height (percent) so empty buckets stay visible.
pub const DISTRIBUTION_FLOOR: f64 = 8.0;

/// Shown in place of the real error when the feedback query fails.
pub const FEEDBACK_UNAVAILABLE_MESSAGE: &str = "Feedback could not be loaded. Try again later.";

// ---------------------------------------------------------------------------
// Rating / RatingFilter
// ---------------------------------------------------------------------------

/// A rating bucket in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    /// All buckets in ascending order.
    pub const ALL: [Rating; 5] = [Rating(1), Rating(2), Rating(3), Rating(4), Rating(5)];

    pub fn new(value: u8) -> Result<Self, ConsoleError> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConsoleError::Validation(format!(
                "Rating must be between {MIN_RATING} and {MAX_RATING}, got {value}"
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Which rating bucket the feedback list is narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatingFilter {
    #[default]
    All,
    Only(Rating),
}

impl RatingFilter {
    /// Parse the UI selection index: `0` is "all", `1..=5` a bucket.
    pub fn from_index(index: u8) -> Result<Self, ConsoleError> {
        match index {
            0 => Ok(Self::All),
            n => Rating::new(n).map(Self::Only),
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Self::All => 0,
            Self::Only(rating) => rating.get(),
        }
    }

    pub fn matches(self, record: &FeedbackRecord) -> bool {
        match self {
            Self::All => true,
            Self::Only(rating) => record.user_rating == i64::from(rating.get()),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub total_feedbacks: u64,
    pub average_rating: f64,
    pub with_comments: u64,
    /// Rating bucket to count. Missing buckets mean zero.
    #[serde(default)]
    pub rating_distribution: BTreeMap<u8, u64>,
}

impl FeedbackSummary {
    pub fn count_for(&self, rating: Rating) -> u64 {
        self.rating_distribution
            .get(&rating.get())
            .copied()
            .unwrap_or(0)
    }
}

/// One rated phase of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub video_id: String,
    pub phase_index: i64,
    /// Expected in `1..=5`; out-of-range values never match a bucket filter.
    pub user_rating: i64,
    #[serde(default)]
    pub user_comment: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Seconds from the start of the video.
    pub time_start: f64,
    pub time_end: f64,
    pub video_name: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub rated_at: Option<Timestamp>,
}

impl FeedbackRecord {
    /// Who left the rating, preferring the user id over the email.
    pub fn reviewer(&self) -> CallerIdentity {
        CallerIdentity::resolve(self.user_id.as_deref(), self.user_email.as_deref())
    }

    pub fn has_comment(&self) -> bool {
        self.user_comment
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackBundle {
    pub summary: FeedbackSummary,
    #[serde(default)]
    pub feedbacks: Vec<FeedbackRecord>,
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Stable filter over the bundle's records. Order is preserved.
pub fn filter_feedback(bundle: &FeedbackBundle, filter: RatingFilter) -> Vec<&FeedbackRecord> {
    bundle
        .feedbacks
        .iter()
        .filter(|record| filter.matches(record))
        .collect()
}

/// Render key for a feedback row. No single record field is unique, so the
/// position in the unfiltered list is part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackRowKey<'a> {
    pub video_id: &'a str,
    pub phase_index: i64,
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackRow<'a> {
    pub key: FeedbackRowKey<'a>,
    pub record: &'a FeedbackRecord,
}

/// Same selection as [`filter_feedback`], with a stable row key per record.
pub fn feedback_rows(bundle: &FeedbackBundle, filter: RatingFilter) -> Vec<FeedbackRow<'_>> {
    bundle
        .feedbacks
        .iter()
        .enumerate()
        .filter(|(_, record)| filter.matches(record))
        .map(|(position, record)| FeedbackRow {
            key: FeedbackRowKey {
                video_id: &record.video_id,
                phase_index: record.phase_index,
                position,
            },
            record,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionBar {
    pub rating: Rating,
    /// The stored count, untouched by the visual floor.
    pub count: u64,
    /// Bar height in percent of the tallest bucket, at least
    /// [`DISTRIBUTION_FLOOR`].
    pub height_percent: f64,
}

/// Bar-chart heights for buckets 1..=5.
pub fn distribution_bars(summary: &FeedbackSummary) -> [DistributionBar; 5] {
    // Keys outside 1..=5 are never drawn and must not set the scale.
    let max = Rating::ALL
        .iter()
        .map(|&rating| summary.count_for(rating))
        .max()
        .unwrap_or(0)
        .max(1);

    Rating::ALL.map(|rating| {
        let count = summary.count_for(rating);
        let scaled = count as f64 * 100.0 / max as f64;
        DistributionBar {
            rating,
            count,
            height_percent: scaled.max(DISTRIBUTION_FLOOR),
        }
    })
}

// ---------------------------------------------------------------------------
// View derivation
// ---------------------------------------------------------------------------

/// What the feedback tab should show.
///
/// Failures never expose the underlying error; it is logged where the fetch
/// completes and the tab shows [`FEEDBACK_UNAVAILABLE_MESSAGE`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackView<'a> {
    Idle,
    Loading,
    Unavailable(&'static str),
    Ready(&'a FeedbackBundle),
}

impl<'a> FeedbackView<'a> {
    pub fn derive(state: &'a FetchState<FeedbackBundle>) -> Self {
        match state.status() {
            FetchStatus::Idle => Self::Idle,
            FetchStatus::Loading => Self::Loading,
            FetchStatus::Error => Self::Unavailable(FEEDBACK_UNAVAILABLE_MESSAGE),
            FetchStatus::Success => match state.data() {
                Some(bundle) => Self::Ready(bundle),
                None => Self::Loading,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
