use serde::Deserialize;

use crate::record::CourseRecord;

/// Highest rating/difficulty on the review site's scale.
const SCALE_MAX: f64 = 5.0;
/// Workload is in hours/week; damp it so it can't drown out the rest.
const WORKLOAD_DAMPING: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub rating: f64,
    /// Applied to `5 - difficulty`, so easier scores higher.
    pub difficulty: f64,
    /// Applied to `-workload / 5`.
    pub workload: f64,
    /// Applied to `ln(1 + reviews)`.
    pub num_reviews: f64,
    pub interest: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            rating: 12.0,
            difficulty: 4.0,
            workload: 4.0,
            num_reviews: 6.0,
            interest: 10.0,
        }
    }
}

/// Utility of taking `course`, using `interest` in place of the record's own.
pub fn score(course: &CourseRecord, interest: u8, w: &Weights) -> f64 {
    w.rating * course.rating
        + w.difficulty * (SCALE_MAX - course.difficulty)
        + w.workload * (-course.workload / WORKLOAD_DAMPING)
        + w.num_reviews * (1.0 + course.num_reviews).ln()
        + w.interest * f64::from(interest)
}
