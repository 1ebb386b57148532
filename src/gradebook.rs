//! One class+subject+term gradebook and its lock/publish lifecycle.
//!
//! ```text
//! Draft(unlocked) --lock--> Draft(locked) --publish--> Published
//!        ^                        |                        |
//!        +--------unlock----------+---------unlock---------+
//! ```
//!
//! `published` implies `locked`, so unlocking a published gradebook also
//! retracts publication.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::calc::{self, aggregate, Assessment, AssessmentStats, Mark, Summary};
use crate::error::GradebookError;
use crate::grading::GradeScale;

/// What `publish()` does when marks are still missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishPolicy {
    /// Publish anyway and report a warning.
    #[default]
    Warn,
    /// Refuse to publish.
    Block,
}

impl std::str::FromStr for PublishPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "block" => Ok(Self::Block),
            other => Err(format!("publish policy must be warn or block, got {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradebookMeta {
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStudent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub admission_no: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradebookState {
    pub locked: bool,
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub missing_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResult {
    pub student_id: String,
    pub name: String,
    pub admission_no: String,
    pub marks: BTreeMap<String, Mark>,
    pub summary: Summary,
    pub grade: String,
    pub grade_point: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradebookStatus {
    pub id: String,
    pub meta: GradebookMeta,
    pub state: GradebookState,
    pub unsaved_changes: bool,
    pub missing_count: usize,
    pub completion_rate: f64,
    pub scale: String,
}

#[derive(Debug, Clone)]
pub struct Gradebook {
    id: String,
    meta: GradebookMeta,
    assessments: Vec<Assessment>,
    students: Vec<RosterStudent>,
    // marks[student][assessment], same order as the two lists above.
    marks: Vec<Vec<Mark>>,
    state: GradebookState,
    dirty: bool,
    scale: GradeScale,
    policy: PublishPolicy,
}

impl Gradebook {
    /// Creates an unlocked gradebook with every mark missing.
    pub fn new(
        meta: GradebookMeta,
        assessments: Vec<Assessment>,
        students: Vec<RosterStudent>,
        scale: GradeScale,
        policy: PublishPolicy,
    ) -> Result<Self, GradebookError> {
        let mut assessment_ids = HashSet::new();
        for a in &assessments {
            a.check().map_err(|reason| GradebookError::InvalidAssessment {
                id: a.id.clone(),
                reason,
            })?;
            if !assessment_ids.insert(a.id.as_str()) {
                return Err(GradebookError::DuplicateId {
                    kind: "assessment",
                    id: a.id.clone(),
                });
            }
        }
        let mut student_ids = HashSet::new();
        for s in &students {
            if !student_ids.insert(s.id.as_str()) {
                return Err(GradebookError::DuplicateId {
                    kind: "student",
                    id: s.id.clone(),
                });
            }
        }

        let marks = vec![vec![Mark::Missing; assessments.len()]; students.len()];
        let id = Uuid::new_v4().to_string();
        tracing::debug!(
            gradebook = %id,
            students = students.len(),
            assessments = assessments.len(),
            "gradebook opened"
        );
        Ok(Self {
            id,
            meta,
            assessments,
            students,
            marks,
            state: GradebookState::default(),
            dirty: false,
            scale,
            policy,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn assessments(&self) -> &[Assessment] {
        &self.assessments
    }

    pub fn students(&self) -> &[RosterStudent] {
        &self.students
    }

    pub fn state(&self) -> GradebookState {
        self.state
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn is_visible_to_students(&self) -> bool {
        self.state.published
    }

    fn student_index(&self, student_id: &str) -> Result<usize, GradebookError> {
        self.students
            .iter()
            .position(|s| s.id == student_id)
            .ok_or_else(|| GradebookError::UnknownStudent(student_id.to_string()))
    }

    fn assessment_index(&self, assessment_id: &str) -> Result<usize, GradebookError> {
        self.assessments
            .iter()
            .position(|a| a.id == assessment_id)
            .ok_or_else(|| GradebookError::UnknownAssessment(assessment_id.to_string()))
    }

    pub fn mark(&self, student_id: &str, assessment_id: &str) -> Result<Mark, GradebookError> {
        let si = self.student_index(student_id)?;
        let ai = self.assessment_index(assessment_id)?;
        Ok(self.marks[si][ai])
    }

    /// Stores a cell. `Mark::Missing` clears it, and marking a student absent
    /// or exempt replaces any score. On rejection the previous value stays in
    /// place.
    pub fn set_score(
        &mut self,
        student_id: &str,
        assessment_id: &str,
        mark: Mark,
    ) -> Result<Mark, GradebookError> {
        if self.state.locked {
            return Err(GradebookError::Locked);
        }
        let si = self.student_index(student_id)?;
        let ai = self.assessment_index(assessment_id)?;
        if let Mark::Entered(v) = mark {
            self.assessments[ai].check_mark(v)?;
        }

        if self.marks[si][ai] != mark {
            self.marks[si][ai] = mark;
            self.dirty = true;
        }
        Ok(mark)
    }

    /// Commits pending edits. Returns whether there was anything to save.
    pub fn save(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn lock(&mut self) -> Result<(), GradebookError> {
        if self.state.locked {
            return Err(GradebookError::AlreadyLocked);
        }
        if self.dirty {
            return Err(GradebookError::UnsavedChanges);
        }
        self.state.locked = true;
        tracing::info!(gradebook = %self.id, "gradebook locked");
        Ok(())
    }

    pub fn unlock(&mut self) -> Result<(), GradebookError> {
        if !self.state.locked {
            return Err(GradebookError::NotLocked);
        }
        if self.state.published {
            self.state.published = false;
            tracing::info!(gradebook = %self.id, "publication retracted");
        }
        self.state.locked = false;
        tracing::info!(gradebook = %self.id, "gradebook unlocked");
        Ok(())
    }

    pub fn publish(&mut self) -> Result<PublishOutcome, GradebookError> {
        if self.state.published {
            return Err(GradebookError::AlreadyPublished);
        }
        if !self.state.locked {
            return Err(GradebookError::PublishRequiresLock);
        }

        let missing_count = self.count_missing();
        let warning = if missing_count > 0 {
            if self.policy == PublishPolicy::Block {
                return Err(GradebookError::MissingMarks {
                    count: missing_count,
                });
            }
            let warning = GradebookError::MissingMarks {
                count: missing_count,
            }
            .to_string();
            tracing::warn!(
                gradebook = %self.id,
                missing = missing_count,
                "publishing with missing marks"
            );
            Some(warning)
        } else {
            None
        };

        self.state.published = true;
        tracing::info!(gradebook = %self.id, "grades published");
        Ok(PublishOutcome {
            missing_count,
            warning,
        })
    }

    pub fn count_missing(&self) -> usize {
        calc::count_missing(self.marks.iter().map(|row| row.iter().copied()))
    }

    pub fn completion_rate(&self) -> f64 {
        calc::completion_rate(self.marks.iter().map(|row| row.iter().copied()))
    }

    fn result_for(&self, si: usize) -> Result<StudentResult, GradebookError> {
        let student = &self.students[si];
        let row = &self.marks[si];
        let summary = aggregate(row.iter().copied().zip(self.assessments.iter()));
        let band = self.scale.band_for(summary.percentage.clamp(0.0, 100.0))?;
        Ok(StudentResult {
            student_id: student.id.clone(),
            name: student.name.clone(),
            admission_no: student.admission_no.clone(),
            marks: self
                .assessments
                .iter()
                .zip(row.iter())
                .map(|(a, m)| (a.id.clone(), *m))
                .collect(),
            summary,
            grade: band.grade,
            grade_point: band.grade_point,
        })
    }

    pub fn student_summary(&self, student_id: &str) -> Result<StudentResult, GradebookError> {
        let si = self.student_index(student_id)?;
        self.result_for(si)
    }

    pub fn summaries(&self) -> Result<Vec<StudentResult>, GradebookError> {
        (0..self.students.len()).map(|si| self.result_for(si)).collect()
    }

    pub fn assessment_stats(&self) -> Vec<AssessmentStats> {
        self.assessments
            .iter()
            .enumerate()
            .map(|(ai, a)| calc::assessment_stats(a, self.marks.iter().map(|row| row[ai])))
            .collect()
    }

    pub fn status(&self) -> GradebookStatus {
        GradebookStatus {
            id: self.id.clone(),
            meta: self.meta.clone(),
            state: self.state,
            unsaved_changes: self.dirty,
            missing_count: self.count_missing(),
            completion_rate: self.completion_rate(),
            scale: self.scale.name().to_string(),
        }
    }
}
