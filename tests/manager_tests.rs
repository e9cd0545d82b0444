//! Write and query behavior of the university manager against a real sqlite file.

mod common;

use common::{TestDb, populate};
use university::ErrorKind;
use university::fetch::FetchStrategy;
use university::models::{
    CourseChanges, NewCourse, NewExam, NewStudent, StudentChanges, StudentProfile,
};
use university::schema;
use diesel::prelude::*;

#[test]
fn course_credit_must_be_positive() {
    let db = TestDb::new();
    let mut manager = db.manager();

    for credit in [0, -1] {
        let err = manager
            .create_course(&NewCourse::new("Zero", credit))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert!(manager.courses().unwrap().is_empty());

    let created = manager.create_course(&NewCourse::new("Compilers", 5)).unwrap();
    let stored = manager.course(created.id).unwrap().unwrap();
    assert_eq!(stored.credit, 5);
    assert_eq!(stored, created);
}

#[test]
fn database_rejects_invalid_rows_that_skip_validation() {
    let db = TestDb::new();
    let mut manager = db.manager();

    let err = diesel::insert_into(schema::courses::table)
        .values((
            schema::courses::title.eq("Sneaky"),
            schema::courses::credit.eq(0),
        ))
        .execute(manager.connection())
        .map_err(university::StoreError::from)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn student_email_is_required() {
    let db = TestDb::new();
    let mut manager = db.manager();

    let err = manager.create_student(&NewStudent::new("Nobody", "")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(manager.students().unwrap().is_empty());
}

#[test]
fn duplicate_enrollment_conflicts_and_keeps_one_row() {
    let db = TestDb::new();
    let mut manager = db.manager();

    let student = manager
        .create_student(&NewStudent::new("Dana", "dana@example.com"))
        .unwrap();
    let course = manager.create_course(&NewCourse::new("Logic", 3)).unwrap();

    manager.assign_student_to_course(student.id, course.id).unwrap();
    let err = manager
        .assign_student_to_course(student.id, course.id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.kind().status_code(), 409);

    assert_eq!(manager.enrollments().unwrap().len(), 1);
}

#[test]
fn enrolling_a_missing_student_creates_nothing() {
    let db = TestDb::new();
    let mut manager = db.manager();

    let course = manager.create_course(&NewCourse::new("Logic", 3)).unwrap();

    let err = manager.assign_student_to_course(999, course.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "student 999 not found");

    let err = manager.assign_student_to_course(1, 999).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(manager.enrollments().unwrap().is_empty());
}

#[test]
fn duplicate_teaching_assignment_conflicts() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let err = manager
        .assign_instructor_to_course(fx.turing, fx.algorithms)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = manager
        .assign_instructor_to_course(999, fx.algorithms)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(manager.course_assignments().unwrap().len(), 3);
}

#[test]
fn deleting_a_student_removes_enrollments_but_keeps_courses() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let removed = manager.delete_student(fx.alice).unwrap();
    assert_eq!(removed.name, "Alice");

    assert!(manager.student(fx.alice).unwrap().is_none());
    assert_eq!(manager.courses().unwrap().len(), 3);
    assert!(
        manager
            .enrollments()
            .unwrap()
            .iter()
            .all(|enrollment| enrollment.student_id != fx.alice)
    );
    assert!(
        manager
            .exam_results()
            .unwrap()
            .iter()
            .all(|result| result.student_id != fx.alice)
    );

    let profiles: i64 = schema::student_profiles::table
        .count()
        .get_result(manager.connection())
        .unwrap();
    assert_eq!(profiles, 0);

    let err = manager.delete_student(fx.alice).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn course_with_exams_cannot_be_deleted() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let err = manager.delete_course(fx.algorithms).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(manager.course(fx.algorithms).unwrap().is_some());

    manager.delete_exam(fx.algorithms_midterm).unwrap();
    manager.delete_exam(fx.algorithms_final).unwrap();

    manager.delete_course(fx.algorithms).unwrap();
    assert!(manager.course(fx.algorithms).unwrap().is_none());
    assert!(
        manager
            .course_assignments()
            .unwrap()
            .iter()
            .all(|assignment| assignment.course_id != fx.algorithms)
    );
    assert_eq!(manager.students_for_course(fx.databases).unwrap().len(), 2);
}

#[test]
fn deleting_a_department_detaches_its_courses_and_instructors() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    manager.delete_department(fx.science).unwrap();

    assert!(manager.courses().unwrap().iter().all(|c| c.department_id.is_none()));
    assert!(
        manager
            .instructors()
            .unwrap()
            .iter()
            .all(|i| i.department_id.is_none())
    );
    assert_eq!(manager.courses().unwrap().len(), 3);
}

#[test]
fn deleting_an_exam_removes_its_results() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    manager.delete_exam(fx.databases_final).unwrap();

    let results = manager.exam_results().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.exam_id != fx.databases_final));
}

#[test]
fn exams_need_an_existing_course() {
    let db = TestDb::new();
    let mut manager = db.manager();

    let err = manager
        .create_exam(&NewExam {
            course_id: 42,
            title: "Orphan".to_string(),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(manager.exams().unwrap().is_empty());
}

#[test]
fn updates_change_only_the_given_fields() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let updated = manager
        .update_student(
            fx.bob,
            &StudentChanges {
                email: Some("robert@example.com".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Bob");
    assert_eq!(updated.email, "robert@example.com");

    let unchanged = manager
        .update_student(fx.bob, &StudentChanges::default())
        .unwrap();
    assert_eq!(unchanged, updated);

    let err = manager
        .update_student(999, &StudentChanges::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let course = manager
        .update_course(
            fx.algorithms,
            &CourseChanges {
                department_id: Some(None),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(course.department_id, None);
    assert_eq!(course.credit, 3);

    let err = manager
        .update_course(
            fx.algorithms,
            &CourseChanges {
                credit: Some(0),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(manager.course(fx.algorithms).unwrap().unwrap().credit, 3);
}

#[test]
fn profiles_are_replaced_not_duplicated() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    manager
        .set_student_profile(&StudentProfile {
            student_id: fx.alice,
            bio: None,
            phone: Some("555-0100".to_string()),
        })
        .unwrap();

    let profiles: Vec<(Option<String>, Option<String>)> = schema::student_profiles::table
        .select((schema::student_profiles::bio, schema::student_profiles::phone))
        .load(manager.connection())
        .unwrap();
    assert_eq!(profiles, [(None, Some("555-0100".to_string()))]);

    let err = manager
        .set_student_profile(&StudentProfile {
            student_id: 999,
            bio: None,
            phone: None,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn seeded_enrollments_match_the_demonstration_data() {
    let db = TestDb::new();
    let mut manager = db.manager();
    manager.seed().unwrap();

    let titles = |courses: Vec<university::models::Course>| -> Vec<String> {
        courses.into_iter().map(|course| course.title).collect()
    };

    assert_eq!(
        titles(manager.courses_for_student(1).unwrap()),
        ["Algorithms", "Databases"]
    );
    assert_eq!(titles(manager.courses_for_student(2).unwrap()), ["Databases"]);

    let names: Vec<String> = manager
        .students_for_course(2)
        .unwrap()
        .into_iter()
        .map(|student| student.name)
        .collect();
    assert_eq!(names, ["Alice Ivanova", "Bob Petrov"]);

    let err = manager.courses_for_student(3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn filtered_root_queries() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let busy = manager
        .students_with_exam_results_over(1, FetchStrategy::Eager)
        .unwrap();
    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].student.id, fx.alice);
    assert_eq!(busy[0].exam_results.get().unwrap().len(), 3);

    let err = manager
        .students_with_exam_results_over(-1, FetchStrategy::Eager)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let quiet: Vec<i32> = manager
        .courses_without_exams()
        .unwrap()
        .into_iter()
        .map(|course| course.id)
        .collect();
    assert_eq!(quiet, [fx.networks]);

    let unassigned: Vec<i32> = manager
        .instructors_without_assignments()
        .unwrap()
        .into_iter()
        .map(|instructor| instructor.id)
        .collect();
    assert_eq!(unassigned, [fx.idle]);
}

#[test]
fn bulk_insert_stores_every_student() {
    let db = TestDb::new();
    let mut manager = db.manager();

    let stored = manager
        .insert_students(&[
            NewStudent::new("Dana", "dana@example.com"),
            NewStudent::new("Eli", "eli@example.com"),
        ])
        .unwrap();

    let names: Vec<&str> = stored.iter().map(|student| student.name.as_str()).collect();
    assert_eq!(names, ["Dana", "Eli"]);
    assert_eq!(manager.students().unwrap().len(), 2);
}

#[test]
fn bulk_insert_is_all_or_nothing() {
    use diesel::connection::SimpleConnection;

    let db = TestDb::new();
    let mut manager = db.manager();
    manager
        .create_student(&NewStudent::new("Existing", "existing@example.com"))
        .unwrap();

    // One invalid row fails the batch before anything is written.
    let err = manager
        .insert_students(&[
            NewStudent::new("Dana", "dana@example.com"),
            NewStudent::new("Nameless", ""),
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(manager.students().unwrap().len(), 1);

    // A row the store rejects mid-batch rolls back the rows before it.
    manager
        .connection()
        .batch_execute(
            "CREATE TRIGGER reject_blocked BEFORE INSERT ON students \
             WHEN NEW.email = 'blocked@example.com' \
             BEGIN SELECT RAISE(ABORT, 'blocked'); END;",
        )
        .unwrap();

    let result = manager.insert_students(&[
        NewStudent::new("Dana", "dana@example.com"),
        NewStudent::new("Eli", "eli@example.com"),
        NewStudent::new("Blocked", "blocked@example.com"),
    ]);
    assert!(result.is_err());

    let names: Vec<String> = manager
        .students()
        .unwrap()
        .into_iter()
        .map(|student| student.name)
        .collect();
    assert_eq!(names, ["Existing"]);
}
