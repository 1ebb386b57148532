use gradebookd::calc::{aggregate, count_missing, Assessment, Mark, Summary};
use gradebookd::grading::{band_for, GradeBand, GradeScale};

fn raw_assessments() -> Vec<Assessment> {
    vec![
        Assessment::new("q1", "Quiz 1", 20.0),
        Assessment::new("a1", "Assignment 1", 30.0),
        Assessment::new("mid", "Midterm", 50.0),
        Assessment::new("final", "Final Exam", 100.0),
    ]
}

#[test]
fn raw_totals_are_plain_sums() {
    let a = raw_assessments();
    let marks = [18.0, 28.0, 45.0, 92.0].map(Mark::Entered);
    let s = aggregate(marks.iter().copied().zip(a.iter()));
    assert_eq!(s.total, 183.0);
    assert_eq!(s.max_total, 200.0);
    assert!((s.percentage - 91.5).abs() < 1e-9);
    assert_eq!(s.completed_count, 4);
    assert_eq!(s.expected_count, 4);
}

#[test]
fn raw_missing_marks_still_count_toward_max_total() {
    let a = raw_assessments();
    let marks = [
        Mark::Entered(16.0),
        Mark::Entered(25.0),
        Mark::Entered(42.0),
        Mark::Missing,
    ];
    let s = aggregate(marks.iter().copied().zip(a.iter()));
    assert_eq!(s.total, 83.0);
    assert_eq!(s.max_total, 200.0);
    assert!((s.percentage - 41.5).abs() < 1e-9);
    assert_eq!(s.completed_count, 3);
    assert_eq!(s.expected_count, 4);
}

#[test]
fn weighted_total_is_the_weighted_sum() {
    let a: Vec<Assessment> = raw_assessments()
        .into_iter()
        .zip([10.0, 15.0, 25.0, 50.0])
        .map(|(a, w)| a.with_weight(w))
        .collect();
    let marks = [20.0, 30.0, 50.0, 100.0].map(Mark::Entered);
    let s = aggregate(marks.iter().copied().zip(a.iter()));
    assert!((s.total - 100.0).abs() < 1e-9);
    assert!((s.percentage - 100.0).abs() < 1e-9);
}

#[test]
fn empty_input_is_all_zero() {
    let s = aggregate(Vec::<(Mark, &Assessment)>::new());
    assert_eq!(s, Summary::default());
    assert_eq!(s.percentage, 0.0);
    assert_eq!(s.expected_count, 0);
}

#[test]
fn count_missing_spans_the_roster() {
    let roster = vec![
        vec![Mark::Entered(18.0), Mark::Missing, Mark::Missing],
        vec![Mark::Missing, Mark::Entered(0.0), Mark::Entered(3.0)],
    ];
    assert_eq!(count_missing(roster), 3);
}

#[test]
fn every_integer_percentage_has_exactly_one_band() {
    let scale = GradeScale::cbse();
    let mut last_gp = f64::NEG_INFINITY;
    for p in 0..=100 {
        let p = p as f64;
        let hits = scale.bands().iter().filter(|b| b.contains(p)).count();
        assert_eq!(hits, 1, "percentage {}", p);
        let band = scale.band_for(p).expect("band");
        assert!(band.grade_point >= last_gp, "grade point fell at {}", p);
        last_gp = band.grade_point;
    }
}

#[test]
fn cbse_reference_points() {
    let scale = GradeScale::cbse();
    let expect = |p: f64, grade: &str, gp: f64| {
        let b = scale.band_for(p).expect("band");
        assert_eq!((b.grade.as_str(), b.grade_point), (grade, gp), "percentage {}", p);
    };
    expect(91.0, "A1", 10.0);
    expect(90.0, "A2", 9.0);
    expect(32.0, "E", 0.0);
    expect(33.0, "D", 4.0);
}

#[test]
fn school_scale_is_gapless_too() {
    let scale = GradeScale::school();
    for p in 0..=100 {
        let hits = scale
            .bands()
            .iter()
            .filter(|b| b.contains(p as f64))
            .count();
        assert_eq!(hits, 1, "percentage {}", p);
    }
    assert_eq!(scale.band_for(34.0).expect("band").grade, "F");
    assert_eq!(scale.band_for(35.0).expect("band").grade, "D");
}

#[test]
fn shared_boundary_resolves_by_supplied_order() {
    let bands = vec![
        GradeBand::new(90.0, 100.0, "A", 4.0),
        GradeBand::new(80.0, 90.0, "B", 3.0),
        GradeBand::new(0.0, 80.0, "C", 2.0),
    ];
    assert_eq!(band_for(90.0, &bands).expect("band").grade, "A");
    assert_eq!(band_for(80.0, &bands).expect("band").grade, "B");
}
