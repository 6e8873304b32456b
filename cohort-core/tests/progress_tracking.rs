use anyhow::Result;
use cohort_core::{
    database::ports::content::CourseContentRepository,
    domain::progress::ProgressError,
};
use cohort_model::{CourseId, CourseProgress, LectureId, StudentId};

#[path = "support/mod.rs"]
mod support;
use support::{Harness, lecture_ids};

#[tokio::test]
async fn seven_of_ten_lectures_is_seventy_percent() -> Result<()> {
    let harness = Harness::new()?;
    let course = harness.publish_course(10).await?;
    let lectures = lecture_ids(&course);
    let student = StudentId::new();

    for lecture in &lectures[..7] {
        let outcome = harness
            .progress
            .mark_complete(student, course.id, *lecture)
            .await?;
        assert!(outcome.newly_completed);
    }
    let duplicate = harness
        .progress
        .mark_complete(student, course.id, lectures[3])
        .await?;
    assert!(!duplicate.newly_completed);

    let progress = harness.progress.progress(student, course.id).await?;
    assert_eq!(
        progress,
        CourseProgress {
            completed_count: 7,
            total_count: 10,
            percentage: 70,
        }
    );
    assert_eq!(duplicate.progress, progress);
    assert_eq!(harness.store.completion_count(student, course.id).await, 7);
    Ok(())
}

#[tokio::test]
async fn retired_lectures_stop_counting() -> Result<()> {
    let harness = Harness::new()?;
    let course = harness.publish_course(4).await?;
    let lectures = lecture_ids(&course);
    let student = StudentId::new();

    for lecture in &lectures {
        harness
            .progress
            .mark_complete(student, course.id, *lecture)
            .await?;
    }
    assert_eq!(
        harness.progress.progress(student, course.id).await?.percentage,
        100
    );

    assert!(harness.store.retire_lecture(course.id, lectures[0]).await?);

    let progress = harness.progress.progress(student, course.id).await?;
    assert_eq!(progress.completed_count, 3);
    assert_eq!(progress.total_count, 3);
    assert!(progress.completed_count <= progress.total_count);

    // The record itself survives; it just no longer counts.
    assert_eq!(harness.store.completion_count(student, course.id).await, 4);

    let err = harness
        .progress
        .mark_complete(student, course.id, lectures[0])
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::UnknownLecture { .. }));
    Ok(())
}

#[tokio::test]
async fn unknown_lecture_and_course_are_reported() -> Result<()> {
    let harness = Harness::new()?;
    let course = harness.publish_course(2).await?;
    let student = StudentId::new();

    let err = harness
        .progress
        .mark_complete(student, course.id, LectureId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::UnknownLecture { .. }));

    let missing = CourseId::new();
    let err = harness.progress.progress(student, missing).await.unwrap_err();
    assert!(matches!(err, ProgressError::UnknownCourse(id) if id == missing));
    Ok(())
}

#[tokio::test]
async fn empty_course_reports_zero_percent() -> Result<()> {
    let harness = Harness::new()?;
    let course = harness.publish_course(0).await?;

    let progress = harness
        .progress
        .progress(StudentId::new(), course.id)
        .await?;
    assert_eq!(progress, CourseProgress::compute(0, 0));
    assert_eq!(progress.percentage, 0);
    Ok(())
}

#[tokio::test]
async fn outline_points_at_first_incomplete_lecture() -> Result<()> {
    let harness = Harness::new()?;
    let course = harness.publish_course(5).await?;
    let lectures = lecture_ids(&course);
    let student = StudentId::new();

    for lecture in [lectures[0], lectures[1], lectures[3]] {
        harness
            .progress
            .mark_complete(student, course.id, lecture)
            .await?;
    }

    let view = harness
        .progress
        .outline_with_progress(student, course.id)
        .await?;
    assert_eq!(view.next_lecture, Some(lectures[2]));
    assert_eq!(view.progress.percentage, 60);
    assert_eq!(view.outline.total_duration_seconds(), 1500);
    assert!(view.completed.contains(&lectures[3]));
    assert!(!view.completed.contains(&lectures[4]));

    // Progress is per student.
    let other = harness
        .progress
        .progress(StudentId::new(), course.id)
        .await?;
    assert_eq!(other.completed_count, 0);
    Ok(())
}

#[tokio::test]
async fn tree_queries_follow_publication() -> Result<()> {
    let harness = Harness::new()?;
    let course = harness.publish_course(6).await?;
    let lectures = lecture_ids(&course);

    assert_eq!(harness.content.total_lecture_count(course.id).await?, 6);
    assert!(harness.content.lecture_exists(course.id, lectures[5]).await?);
    assert!(!harness.content.lecture_exists(CourseId::new(), lectures[5]).await?);
    assert_eq!(harness.content.total_lecture_count(CourseId::new()).await?, 0);
    Ok(())
}

#[tokio::test]
async fn lecture_position_names_neighbours_across_sections() -> Result<()> {
    let harness = Harness::new()?;
    let course = harness.publish_course(5).await?;
    let lectures = lecture_ids(&course);
    let student = StudentId::new();
    harness
        .progress
        .mark_complete(student, course.id, lectures[3])
        .await?;

    let view = harness
        .progress
        .outline_with_progress(student, course.id)
        .await?;

    // Sections hold three lectures, so index 2 ends the first section.
    let boundary = view.position(lectures[2]).expect("live lecture");
    assert_eq!(boundary.index, 2);
    assert_eq!(boundary.previous, Some(lectures[1]));
    assert_eq!(boundary.next, Some(lectures[3]));
    assert!(!boundary.completed);

    let first = view.position(lectures[0]).expect("live lecture");
    assert_eq!(first.previous, None);
    let last = view.position(lectures[4]).expect("live lecture");
    assert_eq!(last.next, None);
    assert!(view.position(lectures[3]).is_some_and(|p| p.completed));

    assert!(view.position(LectureId::new()).is_none());
    Ok(())
}
