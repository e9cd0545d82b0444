use crate::error::{Result, StoreError};
use crate::schema::{
    books, course_assignments, courses, departments, enrollments, exam_results, exams,
    instructors, office_assignments, student_profiles, students,
};
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use std::fmt;

/// The longest email address a student may have.
pub const MAX_EMAIL_LEN: usize = 100;

/// The longest name or title stored in any table.
pub const MAX_TEXT_LEN: usize = 200;

/// Names every table that rows can be looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Student,
    StudentProfile,
    Course,
    Enrollment,
    Department,
    Instructor,
    OfficeAssignment,
    CourseAssignment,
    Exam,
    ExamResult,
    Book,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Student => "student",
            EntityKind::StudentProfile => "student profile",
            EntityKind::Course => "course",
            EntityKind::Enrollment => "enrollment",
            EntityKind::Department => "department",
            EntityKind::Instructor => "instructor",
            EntityKind::OfficeAssignment => "office assignment",
            EntityKind::CourseAssignment => "course assignment",
            EntityKind::Exam => "exam",
            EntityKind::ExamResult => "exam result",
            EntityKind::Book => "book",
        };

        f.write_str(name)
    }
}

fn require_text(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::validation(format!("{field} is required")));
    }
    check_length(field, value, max)
}

fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(StoreError::validation(format!(
            "{field} must be at most {max} characters, got {len}"
        )));
    }
    Ok(())
}

fn check_credit(credit: i32) -> Result<()> {
    if credit <= 0 {
        return Err(StoreError::validation(format!(
            "credit must be greater than 0, got {credit}"
        )));
    }
    Ok(())
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Student {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Insertable, Debug, Clone, Deserialize)]
#[diesel(table_name = students)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
}

impl NewStudent {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            birth_date: None,
        }
    }

    pub fn born_on(mut self, date: NaiveDate) -> Self {
        self.birth_date = Some(date);
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_length("name", &self.name, MAX_TEXT_LEN)?;
        require_text("email", &self.email, MAX_EMAIL_LEN)
    }
}

/// A partial update of a student. `None` leaves the column untouched.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = students)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<Option<NaiveDate>>,
}

impl StudentChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.birth_date.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_length("name", name, MAX_TEXT_LEN)?;
        }
        if let Some(email) = &self.email {
            require_text("email", email, MAX_EMAIL_LEN)?;
        }
        Ok(())
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = student_profiles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StudentProfile {
    pub student_id: i32,
    pub bio: Option<String>,
    pub phone: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[diesel(table_name = departments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Department {
    pub id: i32,
    pub name: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = departments)]
pub struct NewDepartment {
    pub name: String,
}

impl NewDepartment {
    pub fn validate(&self) -> Result<()> {
        require_text("department name", &self.name, MAX_TEXT_LEN)
    }
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Course {
    pub id: i32,
    pub title: String,
    pub credit: i32,
    pub department_id: Option<i32>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = courses)]
pub struct NewCourse {
    pub title: String,
    pub credit: i32,
    pub department_id: Option<i32>,
}

impl NewCourse {
    pub fn new(title: impl Into<String>, credit: i32) -> Self {
        Self {
            title: title.into(),
            credit,
            department_id: None,
        }
    }

    pub fn in_department(mut self, department_id: i32) -> Self {
        self.department_id = Some(department_id);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title, MAX_TEXT_LEN)?;
        check_credit(self.credit)
    }
}

/// A partial update of a course. `None` leaves the column untouched.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = courses)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub credit: Option<i32>,
    pub department_id: Option<Option<i32>>,
}

impl CourseChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.credit.is_none() && self.department_id.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            require_text("title", title, MAX_TEXT_LEN)?;
        }
        if let Some(credit) = self.credit {
            check_credit(credit)?;
        }
        Ok(())
    }
}

/// One row of the student/course association.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Enrollment {
    pub student_id: i32,
    pub course_id: i32,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = instructors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Instructor {
    pub id: i32,
    pub name: String,
    pub department_id: Option<i32>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = instructors)]
pub struct NewInstructor {
    pub name: String,
    pub department_id: Option<i32>,
}

impl NewInstructor {
    pub fn validate(&self) -> Result<()> {
        require_text("instructor name", &self.name, MAX_TEXT_LEN)
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = office_assignments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OfficeAssignment {
    pub instructor_id: i32,
    pub location: String,
}

/// One row of the instructor/course association.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[diesel(table_name = course_assignments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CourseAssignment {
    pub instructor_id: i32,
    pub course_id: i32,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[diesel(table_name = exams)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Exam {
    pub id: i32,
    pub course_id: i32,
    pub title: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = exams)]
pub struct NewExam {
    pub course_id: i32,
    pub title: String,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[diesel(table_name = exam_results)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExamResult {
    pub id: i32,
    pub exam_id: i32,
    pub student_id: i32,
    pub score: i32,
}

#[derive(Insertable, Debug, Clone, Copy)]
#[diesel(table_name = exam_results)]
pub struct NewExamResult {
    pub exam_id: i32,
    pub student_id: i32,
    pub score: i32,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[diesel(table_name = books)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub year_published: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = books)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub year_published: i32,
}

impl NewBook {
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title, MAX_TEXT_LEN)?;
        require_text("author", &self.author, MAX_TEXT_LEN)
    }
}
