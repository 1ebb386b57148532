//! Percentage to letter-grade banding.
//!
//! A scale is an ordered list of inclusive `[min, max]` bands. Lookup takes
//! the first band in supplied order that contains the percentage, so when two
//! bands share a boundary value the earlier one wins. Scales built with
//! [`GradeScale::new`] are checked up front so that overlap cannot happen.
//!
//! Integer-bounded scales (`91..=100`, `81..=90`) leave fractional gaps such as
//! `90.5`. Those resolve to the band just below the gap, which is how the
//! `>= 91` threshold ladders read.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::ScaleError;

/// Widest gap allowed between neighbouring bands of a validated scale.
const MAX_BAND_GAP: f64 = 1.0;

pub const UNGRADED: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub min: f64,
    pub max: f64,
    pub grade: String,
    pub grade_point: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GradeBand {
    pub fn new(min: f64, max: f64, grade: impl Into<String>, grade_point: f64) -> Self {
        Self {
            min,
            max,
            grade: grade.into(),
            grade_point,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Placeholder returned for an unclaimed 0%.
    pub fn ungraded() -> Self {
        Self::new(0.0, 0.0, UNGRADED, 0.0)
    }

    pub fn contains(&self, percentage: f64) -> bool {
        percentage >= self.min && percentage <= self.max
    }
}

fn by_min(a: &&GradeBand, b: &&GradeBand) -> Ordering {
    a.min.partial_cmp(&b.min).unwrap_or(Ordering::Equal)
}

/// Finds the band for `percentage` in `bands`.
pub fn band_for(percentage: f64, bands: &[GradeBand]) -> Result<GradeBand, ScaleError> {
    if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
        return Err(ScaleError::PercentageOutOfRange(percentage));
    }

    if let Some(band) = bands.iter().find(|b| b.contains(percentage)) {
        return Ok(band.clone());
    }

    let below = bands.iter().filter(|b| b.max < percentage).max_by(by_min);
    let above = bands.iter().filter(|b| b.min > percentage).min_by(by_min);
    if let (Some(below), Some(above)) = (below, above) {
        if above.min - below.max <= MAX_BAND_GAP {
            return Ok(below.clone());
        }
    }

    if percentage == 0.0 {
        return Ok(GradeBand::ungraded());
    }
    Err(ScaleError::Unmatched(percentage))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeScale {
    name: String,
    bands: Vec<GradeBand>,
}

impl GradeScale {
    /// Builds a scale that covers `[0, 100]` with no overlaps and no gap wider
    /// than one percentage point. Bands keep their supplied order.
    pub fn new(name: impl Into<String>, bands: Vec<GradeBand>) -> Result<Self, ScaleError> {
        if bands.is_empty() {
            return Err(ScaleError::Empty);
        }
        for b in &bands {
            let finite = b.min.is_finite() && b.max.is_finite();
            if !finite || b.min < 0.0 || b.max > 100.0 || b.min > b.max {
                return Err(ScaleError::InvalidBounds {
                    grade: b.grade.clone(),
                    min: b.min,
                    max: b.max,
                });
            }
        }

        let mut ordered: Vec<&GradeBand> = bands.iter().collect();
        ordered.sort_by(by_min);

        if ordered[0].min > 0.0 {
            return Err(ScaleError::Uncovered(0.0));
        }
        for pair in ordered.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if upper.min <= lower.max {
                return Err(ScaleError::Overlap {
                    lower: lower.grade.clone(),
                    upper: upper.grade.clone(),
                });
            }
            if upper.min - lower.max > MAX_BAND_GAP {
                return Err(ScaleError::Gap {
                    lower: lower.grade.clone(),
                    upper: upper.grade.clone(),
                });
            }
        }
        if ordered[ordered.len() - 1].max < 100.0 {
            return Err(ScaleError::Uncovered(100.0));
        }

        Ok(Self {
            name: name.into(),
            bands,
        })
    }

    /// CBSE 8-band scale.
    pub fn cbse() -> Self {
        Self {
            name: "cbse".to_string(),
            bands: vec![
                GradeBand::new(91.0, 100.0, "A1", 10.0),
                GradeBand::new(81.0, 90.0, "A2", 9.0),
                GradeBand::new(71.0, 80.0, "B1", 8.0),
                GradeBand::new(61.0, 70.0, "B2", 7.0),
                GradeBand::new(51.0, 60.0, "C1", 6.0),
                GradeBand::new(41.0, 50.0, "C2", 5.0),
                GradeBand::new(33.0, 40.0, "D", 4.0),
                GradeBand::new(0.0, 32.0, "E", 0.0),
            ],
        }
    }

    /// The school's own 8-band scale from the grade system settings.
    pub fn school() -> Self {
        Self {
            name: "school".to_string(),
            bands: vec![
                GradeBand::new(91.0, 100.0, "A1", 10.0).with_description("Outstanding"),
                GradeBand::new(81.0, 90.0, "A+", 9.0).with_description("Excellent"),
                GradeBand::new(71.0, 80.0, "A", 8.0).with_description("Very Good"),
                GradeBand::new(61.0, 70.0, "B+", 7.0).with_description("Good"),
                GradeBand::new(51.0, 60.0, "B", 6.0).with_description("Above Average"),
                GradeBand::new(41.0, 50.0, "C", 5.0).with_description("Average"),
                GradeBand::new(35.0, 40.0, "D", 4.0).with_description("Pass"),
                GradeBand::new(0.0, 34.0, "F", 0.0).with_description("Fail"),
            ],
        }
    }

    pub fn by_name(name: &str) -> Result<Self, ScaleError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cbse" => Ok(Self::cbse()),
            "school" => Ok(Self::school()),
            other => Err(ScaleError::UnknownScale(other.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    pub fn band_for(&self, percentage: f64) -> Result<GradeBand, ScaleError> {
        band_for(percentage, &self.bands)
    }

    /// Lowest band that still carries grade points.
    pub fn passing_band(&self) -> Option<&GradeBand> {
        self.bands
            .iter()
            .filter(|b| b.grade_point > 0.0)
            .min_by(|a, b| a.min.partial_cmp(&b.min).unwrap_or(Ordering::Equal))
    }

    pub fn is_pass(&self, percentage: f64) -> Result<bool, ScaleError> {
        Ok(self.band_for(percentage)?.grade_point > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallGrade {
    pub percentage: f64,
    pub grade: String,
    pub grade_point: f64,
    pub subject_count: usize,
}

/// Averages the subject percentages above zero and bands the result.
/// Subjects at zero are treated as not yet graded.
pub fn overall_grade(
    subject_percentages: &[f64],
    scale: &GradeScale,
) -> Result<OverallGrade, ScaleError> {
    let graded: Vec<f64> = subject_percentages
        .iter()
        .copied()
        .filter(|p| *p > 0.0)
        .collect();
    if graded.is_empty() {
        return Ok(OverallGrade {
            percentage: 0.0,
            grade: UNGRADED.to_string(),
            grade_point: 0.0,
            subject_count: 0,
        });
    }

    let percentage = graded.iter().sum::<f64>() / (graded.len() as f64);
    let band = scale.band_for(percentage)?;
    Ok(OverallGrade {
        percentage,
        grade: band.grade,
        grade_point: band.grade_point,
        subject_count: graded.len(),
    })
}
