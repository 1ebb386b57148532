use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::ValidationError;

/// Weights that sum to this value are already a percentage.
const WEIGHT_PERCENT_TOTAL: f64 = 100.0;
const WEIGHT_EPSILON: f64 = 1e-9;

/// One cell of a gradebook. `Missing` means "not yet entered", which is not
/// the same thing as an entered zero.
///
/// `Absent` scores zero and counts as complete. `Exempt` takes the cell out
/// of the student's total entirely. On the wire a mark is a number, `null`,
/// `"absent"` or `"exempt"`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "MarkWire", into = "MarkWire")]
pub enum Mark {
    #[default]
    Missing,
    Entered(f64),
    Absent,
    Exempt,
}

impl Mark {
    pub fn is_missing(&self) -> bool {
        matches!(self, Mark::Missing)
    }

    /// Entered score, if any. Absent and exempt cells carry no score.
    pub fn value(&self) -> Option<f64> {
        match self {
            Mark::Entered(v) => Some(*v),
            _ => None,
        }
    }

    /// What the cell adds to a total: the score, zero when absent, nothing
    /// when missing or exempt.
    pub fn contribution(&self) -> Option<f64> {
        match self {
            Mark::Entered(v) => Some(*v),
            Mark::Absent => Some(0.0),
            Mark::Missing | Mark::Exempt => None,
        }
    }

    pub fn counts_toward_total(&self) -> bool {
        !matches!(self, Mark::Exempt)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MarkWire {
    Score(Option<f64>),
    State(MarkState),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum MarkState {
    Absent,
    Exempt,
}

impl From<MarkWire> for Mark {
    fn from(w: MarkWire) -> Self {
        match w {
            MarkWire::Score(Some(v)) => Mark::Entered(v),
            MarkWire::Score(None) => Mark::Missing,
            MarkWire::State(MarkState::Absent) => Mark::Absent,
            MarkWire::State(MarkState::Exempt) => Mark::Exempt,
        }
    }
}

impl From<Mark> for MarkWire {
    fn from(m: Mark) -> Self {
        match m {
            Mark::Missing => MarkWire::Score(None),
            Mark::Entered(v) => MarkWire::Score(Some(v)),
            Mark::Absent => MarkWire::State(MarkState::Absent),
            Mark::Exempt => MarkWire::State(MarkState::Exempt),
        }
    }
}

impl From<Option<f64>> for Mark {
    fn from(v: Option<f64>) -> Self {
        v.map(Mark::Entered).unwrap_or(Mark::Missing)
    }
}

/// Half-up rounding to one decimal place, used for display:
/// `floor(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub name: String,
    pub max_marks: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl Assessment {
    pub fn new(id: impl Into<String>, name: impl Into<String>, max_marks: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_marks,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Configuration check for an assessment definition.
    pub fn check(&self) -> Result<(), String> {
        if !self.max_marks.is_finite() || self.max_marks <= 0.0 {
            return Err(format!("maxMarks must be > 0, got {}", self.max_marks));
        }
        if let Some(w) = self.weight {
            if !w.is_finite() || w < 0.0 {
                return Err(format!("weight must be >= 0, got {}", w));
            }
        }
        Ok(())
    }

    /// Bounds check for a value about to be stored against this assessment.
    pub fn check_mark(&self, value: f64) -> Result<(), ValidationError> {
        if !value.is_finite() || value < 0.0 || value > self.max_marks {
            return Err(ValidationError::OutOfRangeScore {
                value,
                max_marks: self.max_marks,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: f64,
    pub max_total: f64,
    pub percentage: f64,
    pub completed_count: usize,
    pub expected_count: usize,
}

impl Summary {
    pub fn missing_count(&self) -> usize {
        self.expected_count - self.completed_count
    }
}

/// Reduces one student's marks to a summary.
///
/// If any assessment carries a weight the result is weighted: each present
/// mark contributes `value / max_marks * weight`, and `max_total` is the sum
/// of every defined weight whether or not the mark is present. Otherwise raw
/// marks are summed against the sum of `max_marks`. Exempt cells are left
/// out of both sides and of `expected_count`.
pub fn aggregate<'a, I>(entries: I) -> Summary
where
    I: IntoIterator<Item = (Mark, &'a Assessment)>,
{
    let entries: Vec<(Mark, &Assessment)> = entries
        .into_iter()
        .filter(|(mark, _)| mark.counts_toward_total())
        .collect();
    let weighted = entries.iter().any(|(_, a)| a.weight.is_some());

    let mut total = 0.0_f64;
    let mut max_total = 0.0_f64;
    let mut completed_count = 0_usize;

    for (mark, a) in &entries {
        if !mark.is_missing() {
            completed_count += 1;
        }
        if weighted {
            let Some(weight) = a.weight else {
                continue;
            };
            max_total += weight;
            if let Some(v) = mark.contribution() {
                if a.max_marks > 0.0 {
                    total += (v / a.max_marks) * weight;
                }
            }
        } else {
            max_total += a.max_marks;
            if let Some(v) = mark.contribution() {
                total += v;
            }
        }
    }

    let percentage = if max_total <= 0.0 {
        0.0
    } else if weighted && (max_total - WEIGHT_PERCENT_TOTAL).abs() < WEIGHT_EPSILON {
        total
    } else {
        (total / max_total) * 100.0
    };

    Summary {
        total,
        max_total,
        percentage,
        completed_count,
        expected_count: entries.len(),
    }
}

/// Number of missing `(student, assessment)` cells across a roster.
pub fn count_missing<I, R>(roster: I) -> usize
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = Mark>,
{
    roster
        .into_iter()
        .flat_map(|marks| marks.into_iter())
        .filter(Mark::is_missing)
        .count()
}

/// Share of filled cells in a roster, as a percentage. Exempt cells are not
/// expected, so they count on neither side.
pub fn completion_rate<I, R>(roster: I) -> f64
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = Mark>,
{
    let mut cells = 0_usize;
    let mut filled = 0_usize;
    for mark in roster.into_iter().flat_map(|marks| marks.into_iter()) {
        if !mark.counts_toward_total() {
            continue;
        }
        cells += 1;
        if !mark.is_missing() {
            filled += 1;
        }
    }
    if cells == 0 {
        return 0.0;
    }
    100.0 * (filled as f64) / (cells as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStats {
    pub assessment_id: String,
    pub max_marks: f64,
    pub avg_raw: f64,
    pub avg_percent: f64,
    pub median_percent: f64,
    pub entered_count: usize,
    pub absent_count: usize,
    pub exempt_count: usize,
    pub missing_count: usize,
}

/// Class statistics for one assessment column. Averages and the median cover
/// entered scores only: an entered zero counts, absent and exempt cells are
/// tallied separately.
pub fn assessment_stats<I>(assessment: &Assessment, marks: I) -> AssessmentStats
where
    I: IntoIterator<Item = Mark>,
{
    let mut sum_raw = 0.0_f64;
    let mut entered_count = 0_usize;
    let mut absent_count = 0_usize;
    let mut exempt_count = 0_usize;
    let mut missing_count = 0_usize;
    let mut percents: Vec<f64> = Vec::new();

    for m in marks {
        match m {
            Mark::Missing => missing_count += 1,
            Mark::Absent => absent_count += 1,
            Mark::Exempt => exempt_count += 1,
            Mark::Entered(v) => {
                entered_count += 1;
                sum_raw += v;
                if assessment.max_marks > 0.0 {
                    percents.push(100.0 * v / assessment.max_marks);
                } else {
                    percents.push(0.0);
                }
            }
        }
    }

    let avg_raw = if entered_count > 0 {
        sum_raw / (entered_count as f64)
    } else {
        0.0
    };
    let avg_percent = if assessment.max_marks > 0.0 {
        100.0 * avg_raw / assessment.max_marks
    } else {
        0.0
    };

    AssessmentStats {
        assessment_id: assessment.id.clone(),
        max_marks: assessment.max_marks,
        avg_raw,
        avg_percent,
        median_percent: compute_median(&percents),
        entered_count,
        absent_count,
        exempt_count,
        missing_count,
    }
}

fn compute_median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[(n / 2) - 1] + sorted[n / 2]) / 2.0
    }
}
