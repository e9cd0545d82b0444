//! Attaching related rows with both fetch strategies.

mod common;

use common::{TestDb, populate};
use university::ErrorKind;
use university::fetch::{
    CourseNode, DepartmentNode, ExamNode, ExamResultNode, FetchStrategy, InstructorNode, Nav,
    RelationPath, RootNode, StudentNode,
};
use university::UniversityManager;

fn paths(raw: &[&str]) -> Vec<RelationPath> {
    raw.iter().map(|path| path.parse().unwrap()).collect()
}

fn assert_strategies_agree<N>(manager: &mut UniversityManager, raw: &[&str])
where
    N: RootNode + PartialEq + std::fmt::Debug,
{
    let includes = paths(raw);
    let eager = manager.get_all::<N>(&includes, FetchStrategy::Eager).unwrap();
    let on_demand = manager
        .get_all::<N>(&includes, FetchStrategy::OnDemand)
        .unwrap();
    assert_eq!(eager, on_demand, "paths {raw:?}");
}

#[test]
fn eager_and_on_demand_build_the_same_trees() {
    let db = TestDb::new();
    let mut manager = db.manager();
    populate(&mut manager);

    assert_strategies_agree::<StudentNode>(
        &mut manager,
        &[
            "profile",
            "enrollments.course.department",
            "enrollments.course.exams.exam_results.student",
            "exam_results[min_score=50].exam.course",
        ],
    );
    assert_strategies_agree::<CourseNode>(
        &mut manager,
        &[
            "department.instructors.office_assignment",
            "enrollments.student",
            "course_assignments.instructor",
            "exams.exam_results",
        ],
    );
    assert_strategies_agree::<InstructorNode>(
        &mut manager,
        &["department", "office_assignment", "course_assignments.course.enrollments"],
    );
    assert_strategies_agree::<DepartmentNode>(&mut manager, &["courses.exams", "instructors"]);
    assert_strategies_agree::<ExamNode>(&mut manager, &["course", "exam_results.student.profile"]);
    assert_strategies_agree::<ExamResultNode>(&mut manager, &["exam.course", "student"]);
}

#[test]
fn many_to_many_navigation_lists_courses_per_student() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let alice: StudentNode = manager
        .get_by_id(fx.alice, &paths(&["enrollments.course"]), FetchStrategy::Eager)
        .unwrap()
        .unwrap();

    let titles: Vec<&str> = alice
        .enrollments
        .get()
        .unwrap()
        .iter()
        .map(|enrollment| enrollment.course.get().unwrap().course.title.as_str())
        .collect();
    assert_eq!(titles, ["Algorithms", "Databases"]);

    // Not requested, so not loaded.
    assert_eq!(alice.profile, Nav::NotLoaded);
    assert_eq!(alice.exam_results, Nav::NotLoaded);
}

#[test]
fn missing_root_is_none() {
    let db = TestDb::new();
    let mut manager = db.manager();
    populate(&mut manager);

    let none = manager
        .get_by_id::<CourseNode>(999, &paths(&["exams"]), FetchStrategy::OnDemand)
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn optional_references_load_as_none() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let idle: InstructorNode = manager
        .get_by_id(
            fx.idle,
            &paths(&["department", "office_assignment", "course_assignments"]),
            FetchStrategy::Eager,
        )
        .unwrap()
        .unwrap();

    assert_eq!(idle.department, Nav::Loaded(None));
    assert_eq!(idle.office_assignment, Nav::Loaded(None));
    assert_eq!(idle.course_assignments, Nav::Loaded(vec![]));
}

fn scores(student: &StudentNode) -> Vec<(i32, i32)> {
    student
        .exam_results
        .get()
        .unwrap()
        .iter()
        .map(|result| (result.result.exam_id, result.result.score))
        .collect()
}

#[test]
fn filtered_fetch_matches_filtering_the_full_fetch() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let filtered_path = format!("exam_results[course={},min_score=50].exam", fx.algorithms);

    for strategy in [FetchStrategy::Eager, FetchStrategy::OnDemand] {
        let full = manager
            .get_all::<StudentNode>(&paths(&["exam_results.exam"]), strategy)
            .unwrap();
        let filtered = manager
            .get_all::<StudentNode>(&paths(&[filtered_path.as_str()]), strategy)
            .unwrap();

        assert_eq!(full.len(), filtered.len());
        for (full, filtered) in full.iter().zip(&filtered) {
            let expected: Vec<(i32, i32)> = full
                .exam_results
                .get()
                .unwrap()
                .iter()
                .filter(|result| {
                    result.exam.get().unwrap().exam.course_id == fx.algorithms
                        && result.result.score >= 50
                })
                .map(|result| (result.result.exam_id, result.result.score))
                .collect();
            assert_eq!(scores(filtered), expected);
        }
    }
}

#[test]
fn loaded_navigations_are_not_fetched_again() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let mut students = manager
        .get_all::<StudentNode>(&paths(&["exam_results[min_score=80]"]), FetchStrategy::Eager)
        .unwrap();

    manager
        .fetch_related(
            &mut students,
            &"exam_results.exam".parse().unwrap(),
            FetchStrategy::Eager,
        )
        .unwrap();

    let alice = students.iter().find(|s| s.student.id == fx.alice).unwrap();
    assert_eq!(scores(alice), [(fx.algorithms_final, 91)]);

    // The walk still continued into the loaded results.
    let results = alice.exam_results.get().unwrap();
    assert!(results.iter().all(|result| result.exam.is_loaded()));
}

#[test]
fn filtered_hop_onto_unfiltered_results_is_rejected() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let mut students = manager
        .get_all::<StudentNode>(&paths(&["exam_results"]), FetchStrategy::Eager)
        .unwrap();

    let filtered: RelationPath = format!("exam_results[course={}]", fx.databases)
        .parse()
        .unwrap();
    let err = manager
        .fetch_related(&mut students, &filtered, FetchStrategy::Eager)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // The loaded lists are left as they were.
    let alice = students.iter().find(|s| s.student.id == fx.alice).unwrap();
    assert_eq!(scores(alice).len(), 3);
    assert!(alice.exam_results_filters().is_empty());

    // Fresh nodes take the filter.
    let mut fresh = manager
        .get_all::<StudentNode>(&[], FetchStrategy::Eager)
        .unwrap();
    manager
        .fetch_related(&mut fresh, &filtered, FetchStrategy::Eager)
        .unwrap();
    let alice = fresh.iter().find(|s| s.student.id == fx.alice).unwrap();
    assert_eq!(scores(alice), [(fx.databases_final, 40)]);
}

#[test]
fn repeating_a_filtered_fetch_in_another_order_reuses_the_results() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let mut students = manager
        .get_all::<StudentNode>(
            &paths(&[format!("exam_results[course={},min_score=0]", fx.databases).as_str()]),
            FetchStrategy::Eager,
        )
        .unwrap();

    let reordered: RelationPath = format!("exam_results[min_score=0,course={}].exam", fx.databases)
        .parse()
        .unwrap();
    manager
        .fetch_related(&mut students, &reordered, FetchStrategy::OnDemand)
        .unwrap();

    let alice = students.iter().find(|s| s.student.id == fx.alice).unwrap();
    assert_eq!(scores(alice), [(fx.databases_final, 40)]);
    assert!(alice.exam_results.get().unwrap()[0].exam.is_loaded());
}

#[test]
fn filtered_results_report_their_filters_when_serialized() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let filtered: StudentNode = manager
        .get_by_id(fx.alice, &paths(&["exam_results[min_score=80]"]), FetchStrategy::Eager)
        .unwrap()
        .unwrap();
    let json = serde_json::to_value(&filtered).unwrap();
    assert_eq!(json["exam_results_filters"], serde_json::json!(["min_score=80"]));
    assert_eq!(json["exam_results"].as_array().unwrap().len(), 1);

    let unfiltered: StudentNode = manager
        .get_by_id(fx.alice, &paths(&["exam_results"]), FetchStrategy::Eager)
        .unwrap()
        .unwrap();
    let json = serde_json::to_value(&unfiltered).unwrap();
    assert!(json.get("exam_results_filters").is_none());
}

#[test]
fn students_with_exams_in_a_course_carry_only_those_results() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let eager = manager
        .students_with_exam_in_course(fx.databases, FetchStrategy::Eager)
        .unwrap();
    let on_demand = manager
        .students_with_exam_in_course(fx.databases, FetchStrategy::OnDemand)
        .unwrap();
    assert_eq!(eager, on_demand);

    let ids: Vec<i32> = eager.iter().map(|student| student.student.id).collect();
    assert_eq!(ids, [fx.alice, fx.bob]);

    for student in &eager {
        for result in student.exam_results.get().unwrap() {
            assert_eq!(result.result.exam_id, fx.databases_final);
            assert_eq!(result.exam.get().unwrap().exam.course_id, fx.databases);
        }
    }

    assert!(
        manager
            .students_with_exam_in_course(fx.networks, FetchStrategy::Eager)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn unknown_relations_are_rejected() {
    let db = TestDb::new();
    let mut manager = db.manager();
    populate(&mut manager);

    let err = manager
        .get_all::<CourseNode>(&paths(&["profile"]), FetchStrategy::Eager)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = "enrollments.mentor".parse::<RelationPath>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn fetched_trees_serialize_unloaded_slots_as_null() {
    let db = TestDb::new();
    let mut manager = db.manager();
    let fx = populate(&mut manager);

    let carol: StudentNode = manager
        .get_by_id(fx.carol, &paths(&["enrollments"]), FetchStrategy::Eager)
        .unwrap()
        .unwrap();
    let json = serde_json::to_value(&carol).unwrap();

    assert_eq!(json["name"], "Carol");
    assert!(json["profile"].is_null());
    assert_eq!(json["enrollments"][0]["course_id"], fx.networks);
    assert!(json["enrollments"][0]["course"].is_null());
}
