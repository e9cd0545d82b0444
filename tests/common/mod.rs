//! Shared fixtures: a fresh sqlite file per test and a small populated catalog.

#![allow(dead_code)]

use tempfile::TempDir;
use university::UniversityManager;
use university::models::{
    NewCourse, NewDepartment, NewExam, NewExamResult, NewInstructor, NewStudent,
    OfficeAssignment, StudentProfile,
};

pub struct TestDb {
    _dir: TempDir,
    pub url: String,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let url = dir.path().join("university.db").to_str().unwrap().to_string();
        Self { _dir: dir, url }
    }

    /// Opens a new connection with the schema in place.
    pub fn manager(&self) -> UniversityManager {
        let mut manager = UniversityManager::open(&self.url).unwrap();
        manager.create_schema().unwrap();
        manager
    }
}

/// IDs of everything [`populate`] creates.
pub struct Fixture {
    pub alice: i32,
    pub bob: i32,
    pub carol: i32,
    pub algorithms: i32,
    pub databases: i32,
    pub networks: i32,
    pub science: i32,
    pub turing: i32,
    pub codd: i32,
    pub idle: i32,
    pub algorithms_midterm: i32,
    pub algorithms_final: i32,
    pub databases_final: i32,
}

/// Three students, three courses in one department, three instructors, and a handful of
/// exams with scores.
pub fn populate(manager: &mut UniversityManager) -> Fixture {
    let science = manager
        .create_department(&NewDepartment {
            name: "Computer Science".to_string(),
        })
        .unwrap()
        .id;

    let alice = manager
        .create_student(&NewStudent::new("Alice", "alice@example.com"))
        .unwrap()
        .id;
    let bob = manager
        .create_student(&NewStudent::new("Bob", "bob@example.com"))
        .unwrap()
        .id;
    let carol = manager
        .create_student(&NewStudent::new("Carol", "carol@example.com"))
        .unwrap()
        .id;

    manager
        .set_student_profile(&StudentProfile {
            student_id: alice,
            bio: Some("Likes graphs".to_string()),
            phone: None,
        })
        .unwrap();

    let algorithms = manager
        .create_course(&NewCourse::new("Algorithms", 3).in_department(science))
        .unwrap()
        .id;
    let databases = manager
        .create_course(&NewCourse::new("Databases", 4).in_department(science))
        .unwrap()
        .id;
    let networks = manager
        .create_course(&NewCourse::new("Networks", 2))
        .unwrap()
        .id;

    for (student, course) in [
        (alice, algorithms),
        (alice, databases),
        (bob, databases),
        (carol, networks),
    ] {
        manager.assign_student_to_course(student, course).unwrap();
    }

    let turing = manager
        .create_instructor(&NewInstructor {
            name: "Turing".to_string(),
            department_id: Some(science),
        })
        .unwrap()
        .id;
    let codd = manager
        .create_instructor(&NewInstructor {
            name: "Codd".to_string(),
            department_id: Some(science),
        })
        .unwrap()
        .id;
    let idle = manager
        .create_instructor(&NewInstructor {
            name: "Idle".to_string(),
            department_id: None,
        })
        .unwrap()
        .id;

    manager
        .set_office_assignment(&OfficeAssignment {
            instructor_id: turing,
            location: "B-101".to_string(),
        })
        .unwrap();
    manager.assign_instructor_to_course(turing, algorithms).unwrap();
    manager.assign_instructor_to_course(codd, databases).unwrap();
    manager.assign_instructor_to_course(codd, algorithms).unwrap();

    let exam = |manager: &mut UniversityManager, course_id: i32, title: &str| {
        manager
            .create_exam(&NewExam {
                course_id,
                title: title.to_string(),
            })
            .unwrap()
            .id
    };
    let algorithms_midterm = exam(manager, algorithms, "Midterm");
    let algorithms_final = exam(manager, algorithms, "Final");
    let databases_final = exam(manager, databases, "Final");

    for (exam_id, student_id, score) in [
        (algorithms_midterm, alice, 72),
        (algorithms_final, alice, 91),
        (databases_final, alice, 40),
        (databases_final, bob, 85),
    ] {
        manager
            .record_exam_result(&NewExamResult {
                exam_id,
                student_id,
                score,
            })
            .unwrap();
    }

    Fixture {
        alice,
        bob,
        carol,
        algorithms,
        databases,
        networks,
        science,
        turing,
        codd,
        idle,
        algorithms_midterm,
        algorithms_final,
        databases_final,
    }
}
