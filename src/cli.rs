//! This module contains the command-line interface [`Cli`] parser for managing university
//! records and the book catalog.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::fetch::FetchStrategy;

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(name = "university", version, about)]
pub struct Cli {
    /// Database file to use instead of the configured one.
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// The different record types that can be managed.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage students and their enrollments.
    #[command(subcommand)]
    Student(StudentCommand),

    /// Manage courses.
    #[command(subcommand)]
    Course(CourseCommand),

    /// Manage departments.
    #[command(subcommand)]
    Department(DepartmentCommand),

    /// Manage instructors, their offices, and their teaching assignments.
    #[command(subcommand)]
    Instructor(InstructorCommand),

    /// Manage exams and recorded scores.
    #[command(subcommand)]
    Exam(ExamCommand),

    /// Load records together with related rows and print them as JSON.
    Fetch(FetchArgs),

    /// Manage the book catalog.
    #[command(subcommand)]
    Book(BookCommand),
}

#[derive(Subcommand, Debug)]
pub enum StudentCommand {
    /// Add a new student.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Birth date as YYYY-MM-DD.
        #[arg(long)]
        birth_date: Option<NaiveDate>,
    },

    /// List every student.
    List,

    /// Show one student.
    Show { id: i32 },

    /// Change a student's fields.
    Update {
        id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        birth_date: Option<NaiveDate>,
    },

    /// Set a student's profile.
    Profile {
        id: i32,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Remove a student together with their enrollments.
    Delete { id: i32 },

    /// Enroll a student in a course.
    Enroll { student_id: i32, course_id: i32 },

    /// List the courses a student is enrolled in.
    Courses { id: i32 },

    /// List students with an exam result in the given course.
    TookExamIn { course_id: i32 },

    /// List students with more than this many exam results.
    ResultsOver { threshold: i64 },
}

#[derive(Subcommand, Debug)]
pub enum CourseCommand {
    /// Add a new course.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        credit: i32,
        #[arg(long)]
        department: Option<i32>,
    },

    /// List every course.
    List,

    /// Show one course.
    Show { id: i32 },

    /// Change a course's fields.
    Update {
        id: i32,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        credit: Option<i32>,
        #[arg(long)]
        department: Option<i32>,
        /// Detach the course from its department.
        #[arg(long, conflicts_with = "department")]
        no_department: bool,
    },

    /// Remove a course that has no exams.
    Delete { id: i32 },

    /// List the students enrolled in a course.
    Students { id: i32 },

    /// List courses that have no exams.
    WithoutExams,
}

#[derive(Subcommand, Debug)]
pub enum DepartmentCommand {
    /// Add a new department.
    Add {
        #[arg(long)]
        name: String,
    },

    /// List every department.
    List,

    /// Remove a department. Its courses and instructors are kept.
    Delete { id: i32 },
}

#[derive(Subcommand, Debug)]
pub enum InstructorCommand {
    /// Add a new instructor.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        department: Option<i32>,
    },

    /// List every instructor.
    List,

    /// Assign an instructor to teach a course.
    Assign { instructor_id: i32, course_id: i32 },

    /// Set an instructor's office.
    Office { id: i32, location: String },

    /// Remove an instructor.
    Delete { id: i32 },

    /// List instructors without any course.
    Unassigned,
}

#[derive(Subcommand, Debug)]
pub enum ExamCommand {
    /// Add an exam to a course.
    Add {
        #[arg(long)]
        course: i32,
        #[arg(long)]
        title: String,
    },

    /// List every exam.
    List,

    /// Record a student's score on an exam.
    Record {
        exam_id: i32,
        student_id: i32,
        score: i32,
    },

    /// List every recorded score.
    Results,

    /// Remove an exam and its results.
    Delete { id: i32 },
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// The kind of record to start from.
    #[arg(value_enum)]
    pub root: FetchRoot,

    /// Fetch only the record with this ID.
    #[arg(long)]
    pub id: Option<i32>,

    /// Relation paths to attach, such as `enrollments.course`.
    #[arg(long = "include", short = 'i')]
    pub includes: Vec<String>,

    #[arg(long, value_enum, default_value_t = StrategyArg::Eager)]
    pub strategy: StrategyArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRoot {
    Students,
    Courses,
    Instructors,
    Departments,
    Exams,
    ExamResults,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    /// One batched query per hop.
    Eager,
    /// One query per owning record.
    OnDemand,
}

impl From<StrategyArg> for FetchStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Eager => FetchStrategy::Eager,
            StrategyArg::OnDemand => FetchStrategy::OnDemand,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum BookCommand {
    /// Add a new book.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        year: i32,
    },

    /// List every book.
    List,

    /// Print the number of books.
    Count,

    /// List books whose author contains the given text.
    ByAuthor { fragment: String },

    /// Remove a book.
    Delete { id: i32 },
}
