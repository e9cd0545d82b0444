//! Table and JSON output for the command-line tools.

use crate::models::{Book, Course, Department, Exam, ExamResult, Instructor, Student};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_table<R: Tabled>(heading: &str, rows: Vec<R>) {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("{heading}:\n{table}");
}

#[derive(Tabled)]
struct StudentRow {
    id: i32,
    name: String,
    email: String,
    birth_date: String,
}

/// Pretty prints a list of students.
pub fn show_students(students: &[Student]) {
    let rows = students
        .iter()
        .map(|student| StudentRow {
            id: student.id,
            name: student.name.clone(),
            email: student.email.clone(),
            birth_date: or_dash(student.birth_date),
        })
        .collect();

    print_table("Students", rows);
}

#[derive(Tabled)]
struct CourseRow {
    id: i32,
    title: String,
    credit: i32,
    department: String,
}

/// Pretty prints a list of courses.
pub fn show_courses(courses: &[Course]) {
    let rows = courses
        .iter()
        .map(|course| CourseRow {
            id: course.id,
            title: course.title.clone(),
            credit: course.credit,
            department: or_dash(course.department_id),
        })
        .collect();

    print_table("Courses", rows);
}

pub fn show_departments(departments: &[Department]) {
    print_table("Departments", departments.to_vec());
}

#[derive(Tabled)]
struct InstructorRow {
    id: i32,
    name: String,
    department: String,
}

pub fn show_instructors(instructors: &[Instructor]) {
    let rows = instructors
        .iter()
        .map(|instructor| InstructorRow {
            id: instructor.id,
            name: instructor.name.clone(),
            department: or_dash(instructor.department_id),
        })
        .collect();

    print_table("Instructors", rows);
}

pub fn show_exams(exams: &[Exam]) {
    print_table("Exams", exams.to_vec());
}

pub fn show_exam_results(results: &[ExamResult]) {
    print_table("Exam results", results.to_vec());
}

pub fn show_books(books: &[Book]) {
    print_table("Books", books.to_vec());
}

/// Prints any serializable value, such as a fetched node tree, as indented JSON.
pub fn show_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
