use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use university::cli::{
    BookCommand, Cli, Command, CourseCommand, DepartmentCommand, ExamCommand, FetchArgs,
    FetchRoot, InstructorCommand, StudentCommand,
};
use university::config::Settings;
use university::fetch::{
    CourseNode, DepartmentNode, ExamNode, ExamResultNode, FetchStrategy, InstructorNode,
    RelationPath, RootNode, StudentNode,
};
use university::models::{
    CourseChanges, NewBook, NewCourse, NewDepartment, NewExam, NewExamResult, NewInstructor,
    NewStudent, OfficeAssignment, StudentChanges, StudentProfile,
};
use university::{LibraryManager, StoreError, UniversityManager, display, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<StoreError>() {
                Some(store_err) => {
                    eprintln!("error ({}): {store_err}", store_err.kind().status_code())
                }
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load()?;
    if let Some(database) = cli.database {
        settings.database.url = database;
    }
    logging::init(&settings.logging.level);

    let open = || university::manager_from_settings(&settings);

    match cli.command {
        Command::Student(command) => run_student(&mut open()?, command),
        Command::Course(command) => run_course(&mut open()?, command),
        Command::Department(command) => run_department(&mut open()?, command),
        Command::Instructor(command) => run_instructor(&mut open()?, command),
        Command::Exam(command) => run_exam(&mut open()?, command),
        Command::Fetch(args) => run_fetch(&mut open()?, args),
        Command::Book(command) => {
            run_book(&mut university::library_from_settings(&settings)?, command)
        }
    }
}

fn run_student(manager: &mut UniversityManager, command: StudentCommand) -> Result<()> {
    match command {
        StudentCommand::Add {
            name,
            email,
            birth_date,
        } => {
            let student = manager.create_student(&NewStudent {
                name,
                email,
                birth_date,
            })?;
            display::show_students(&[student]);
        }
        StudentCommand::List => display::show_students(&manager.students()?),
        StudentCommand::Show { id } => match manager.student(id)? {
            Some(student) => display::show_students(&[student]),
            None => println!("Student {id} not found."),
        },
        StudentCommand::Update {
            id,
            name,
            email,
            birth_date,
        } => {
            let changes = StudentChanges {
                name,
                email,
                birth_date: birth_date.map(Some),
            };
            display::show_students(&[manager.update_student(id, &changes)?]);
        }
        StudentCommand::Profile { id, bio, phone } => {
            let profile = manager.set_student_profile(&StudentProfile {
                student_id: id,
                bio,
                phone,
            })?;
            display::show_json(&profile)?;
        }
        StudentCommand::Delete { id } => {
            let student = manager.delete_student(id)?;
            println!("Removed student {} ({}).", student.id, student.name);
        }
        StudentCommand::Enroll {
            student_id,
            course_id,
        } => {
            manager.assign_student_to_course(student_id, course_id)?;
            println!("Enrolled student {student_id} in course {course_id}.");
        }
        StudentCommand::Courses { id } => display::show_courses(&manager.courses_for_student(id)?),
        StudentCommand::TookExamIn { course_id } => {
            let students = manager.students_with_exam_in_course(course_id, FetchStrategy::Eager)?;
            display::show_json(&students)?;
        }
        StudentCommand::ResultsOver { threshold } => {
            let students =
                manager.students_with_exam_results_over(threshold, FetchStrategy::Eager)?;
            display::show_json(&students)?;
        }
    }

    Ok(())
}

fn run_course(manager: &mut UniversityManager, command: CourseCommand) -> Result<()> {
    match command {
        CourseCommand::Add {
            title,
            credit,
            department,
        } => {
            let course = manager.create_course(&NewCourse {
                title,
                credit,
                department_id: department,
            })?;
            display::show_courses(&[course]);
        }
        CourseCommand::List => display::show_courses(&manager.courses()?),
        CourseCommand::Show { id } => match manager.course(id)? {
            Some(course) => display::show_courses(&[course]),
            None => println!("Course {id} not found."),
        },
        CourseCommand::Update {
            id,
            title,
            credit,
            department,
            no_department,
        } => {
            let department_id = if no_department {
                Some(None)
            } else {
                department.map(Some)
            };
            let changes = CourseChanges {
                title,
                credit,
                department_id,
            };
            display::show_courses(&[manager.update_course(id, &changes)?]);
        }
        CourseCommand::Delete { id } => {
            let course = manager.delete_course(id)?;
            println!("Removed course {} ({}).", course.id, course.title);
        }
        CourseCommand::Students { id } => display::show_students(&manager.students_for_course(id)?),
        CourseCommand::WithoutExams => display::show_courses(&manager.courses_without_exams()?),
    }

    Ok(())
}

fn run_department(manager: &mut UniversityManager, command: DepartmentCommand) -> Result<()> {
    match command {
        DepartmentCommand::Add { name } => {
            let department = manager.create_department(&NewDepartment { name })?;
            display::show_departments(&[department]);
        }
        DepartmentCommand::List => display::show_departments(&manager.departments()?),
        DepartmentCommand::Delete { id } => {
            let department = manager.delete_department(id)?;
            println!("Removed department {} ({}).", department.id, department.name);
        }
    }

    Ok(())
}

fn run_instructor(manager: &mut UniversityManager, command: InstructorCommand) -> Result<()> {
    match command {
        InstructorCommand::Add { name, department } => {
            let instructor = manager.create_instructor(&NewInstructor {
                name,
                department_id: department,
            })?;
            display::show_instructors(&[instructor]);
        }
        InstructorCommand::List => display::show_instructors(&manager.instructors()?),
        InstructorCommand::Assign {
            instructor_id,
            course_id,
        } => {
            manager.assign_instructor_to_course(instructor_id, course_id)?;
            println!("Assigned instructor {instructor_id} to course {course_id}.");
        }
        InstructorCommand::Office { id, location } => {
            let office = manager.set_office_assignment(&OfficeAssignment {
                instructor_id: id,
                location,
            })?;
            display::show_json(&office)?;
        }
        InstructorCommand::Delete { id } => {
            let instructor = manager.delete_instructor(id)?;
            println!("Removed instructor {} ({}).", instructor.id, instructor.name);
        }
        InstructorCommand::Unassigned => {
            display::show_instructors(&manager.instructors_without_assignments()?);
        }
    }

    Ok(())
}

fn run_exam(manager: &mut UniversityManager, command: ExamCommand) -> Result<()> {
    match command {
        ExamCommand::Add { course, title } => {
            let exam = manager.create_exam(&NewExam {
                course_id: course,
                title,
            })?;
            display::show_exams(&[exam]);
        }
        ExamCommand::List => display::show_exams(&manager.exams()?),
        ExamCommand::Record {
            exam_id,
            student_id,
            score,
        } => {
            let result = manager.record_exam_result(&NewExamResult {
                exam_id,
                student_id,
                score,
            })?;
            display::show_exam_results(&[result]);
        }
        ExamCommand::Results => display::show_exam_results(&manager.exam_results()?),
        ExamCommand::Delete { id } => {
            let exam = manager.delete_exam(id)?;
            println!("Removed exam {} ({}).", exam.id, exam.title);
        }
    }

    Ok(())
}

fn run_fetch(manager: &mut UniversityManager, args: FetchArgs) -> Result<()> {
    let includes = args
        .includes
        .iter()
        .map(|path| path.parse())
        .collect::<Result<Vec<RelationPath>, StoreError>>()?;
    let strategy = FetchStrategy::from(args.strategy);

    match args.root {
        FetchRoot::Students => print_fetched::<StudentNode>(manager, args.id, &includes, strategy),
        FetchRoot::Courses => print_fetched::<CourseNode>(manager, args.id, &includes, strategy),
        FetchRoot::Instructors => {
            print_fetched::<InstructorNode>(manager, args.id, &includes, strategy)
        }
        FetchRoot::Departments => {
            print_fetched::<DepartmentNode>(manager, args.id, &includes, strategy)
        }
        FetchRoot::Exams => print_fetched::<ExamNode>(manager, args.id, &includes, strategy),
        FetchRoot::ExamResults => {
            print_fetched::<ExamResultNode>(manager, args.id, &includes, strategy)
        }
    }
}

fn print_fetched<N: RootNode + serde::Serialize>(
    manager: &mut UniversityManager,
    id: Option<i32>,
    includes: &[RelationPath],
    strategy: FetchStrategy,
) -> Result<()> {
    match id {
        Some(id) => {
            let node = manager.get_by_id::<N>(id, includes, strategy)?;
            display::show_json(&node)?;
        }
        None => {
            let nodes = manager.get_all::<N>(includes, strategy)?;
            display::show_json(&nodes)?;
        }
    }

    Ok(())
}

fn run_book(library: &mut LibraryManager, command: BookCommand) -> Result<()> {
    match command {
        BookCommand::Add {
            title,
            author,
            year,
        } => {
            let book = library.add_book(&NewBook {
                title,
                author,
                year_published: year,
            })?;
            display::show_books(&[book]);
        }
        BookCommand::List => display::show_books(&library.books()?),
        BookCommand::Count => println!("{} book(s) in the catalog.", library.count_books()?),
        BookCommand::ByAuthor { fragment } => {
            display::show_books(&library.find_by_author(&fragment)?)
        }
        BookCommand::Delete { id } => {
            let book = library.delete_book(id)?;
            println!("Removed book {} ({}).", book.id, book.title);
        }
    }

    Ok(())
}
