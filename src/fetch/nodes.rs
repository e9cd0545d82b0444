use super::{fill_many, fill_one, fill_optional, load_grouped, pending};
use super::path::normalize_filters;
use super::{FetchStrategy, Hop, HopFilter, Nav, Relation};
use crate::error::{Result, StoreError};
use crate::models::{
    Course, CourseAssignment, Department, EntityKind, Enrollment, Exam, ExamResult, Instructor,
    OfficeAssignment, Student, StudentProfile,
};
use crate::schema::{
    course_assignments, courses, departments, enrollments, exam_results, exams, instructors,
    office_assignments, student_profiles, students,
};
use diesel::prelude::*;
use diesel::sqlite::{Sqlite, SqliteConnection};
use serde::Serialize;

/// An entity together with its navigation slots.
pub trait Node: Sized {
    const KIND: EntityKind;

    /// Fetches `hops[0]` for every node that has not loaded it yet, then continues with the
    /// remaining hops on the attached children.
    fn attach(
        connection: &mut SqliteConnection,
        nodes: Vec<&mut Self>,
        hops: &[Hop],
        strategy: FetchStrategy,
    ) -> Result<()>;
}

/// A node whose entity has a single integer id and can be listed directly.
pub trait RootNode: Node {
    /// Every row of the table, ordered by id, with nothing attached.
    fn load_all(connection: &mut SqliteConnection) -> QueryResult<Vec<Self>>;

    fn load_by_id(connection: &mut SqliteConnection, id: i32) -> QueryResult<Option<Self>>;
}

fn unsupported(kind: EntityKind, relation: Relation) -> StoreError {
    StoreError::validation(format!("{kind} has no relation `{relation}`"))
}

/// Fails if any already loaded result list was fetched under filters other than `requested`.
///
/// An unfiltered hop may walk into filtered results; a filtered hop may not reuse results it
/// did not select.
fn check_result_filters<'a>(
    kind: EntityKind,
    loaded: impl IntoIterator<Item = (i32, &'a [HopFilter])>,
    requested: &[HopFilter],
) -> Result<()> {
    if requested.is_empty() {
        return Ok(());
    }

    let mut wanted = requested.to_vec();
    normalize_filters(&mut wanted);

    for (id, applied) in loaded {
        let mut applied = applied.to_vec();
        normalize_filters(&mut applied);

        if applied != wanted {
            let wanted: Vec<String> = wanted.iter().map(ToString::to_string).collect();
            return Err(StoreError::validation(format!(
                "exam results of {kind} {id} are already loaded with other filters; \
                 use fresh nodes to fetch exam_results[{}]",
                wanted.join(",")
            )));
        }
    }

    Ok(())
}

/// Exam results restricted by the hop's filters. Filters become SQL conditions.
fn filtered_exam_results(filters: &[HopFilter]) -> exam_results::BoxedQuery<'static, Sqlite> {
    let mut query = exam_results::table.into_boxed();

    for filter in filters {
        query = match *filter {
            HopFilter::ExamCourse(course_id) => query.filter(
                exam_results::exam_id.eq_any(
                    exams::table
                        .filter(exams::course_id.eq(course_id))
                        .select(exams::id),
                ),
            ),
            HopFilter::MinScore(score) => query.filter(exam_results::score.ge(score)),
        };
    }

    query
}

fn students_by_id(conn: &mut SqliteConnection, ids: Vec<i32>) -> QueryResult<Vec<Student>> {
    students::table
        .filter(students::id.eq_any(ids))
        .order(students::id)
        .select(Student::as_select())
        .load(conn)
}

fn courses_by_id(conn: &mut SqliteConnection, ids: Vec<i32>) -> QueryResult<Vec<Course>> {
    courses::table
        .filter(courses::id.eq_any(ids))
        .order(courses::id)
        .select(Course::as_select())
        .load(conn)
}

fn departments_by_id(conn: &mut SqliteConnection, ids: Vec<i32>) -> QueryResult<Vec<Department>> {
    departments::table
        .filter(departments::id.eq_any(ids))
        .order(departments::id)
        .select(Department::as_select())
        .load(conn)
}

fn instructors_by_id(conn: &mut SqliteConnection, ids: Vec<i32>) -> QueryResult<Vec<Instructor>> {
    instructors::table
        .filter(instructors::id.eq_any(ids))
        .order(instructors::id)
        .select(Instructor::as_select())
        .load(conn)
}

fn exams_by_id(conn: &mut SqliteConnection, ids: Vec<i32>) -> QueryResult<Vec<Exam>> {
    exams::table
        .filter(exams::id.eq_any(ids))
        .order(exams::id)
        .select(Exam::as_select())
        .load(conn)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentNode {
    #[serde(flatten)]
    pub student: Student,
    pub profile: Nav<Option<StudentProfile>>,
    pub enrollments: Nav<Vec<EnrollmentNode>>,
    pub exam_results: Nav<Vec<ExamResultNode>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exam_results_filters: Vec<HopFilter>,
}

impl StudentNode {
    pub fn new(student: Student) -> Self {
        Self {
            student,
            profile: Nav::NotLoaded,
            enrollments: Nav::NotLoaded,
            exam_results: Nav::NotLoaded,
            exam_results_filters: Vec::new(),
        }
    }

    /// The filters `exam_results` was loaded with.
    pub fn exam_results_filters(&self) -> &[HopFilter] {
        &self.exam_results_filters
    }
}

impl Node for StudentNode {
    const KIND: EntityKind = EntityKind::Student;

    fn attach(
        connection: &mut SqliteConnection,
        nodes: Vec<&mut Self>,
        hops: &[Hop],
        strategy: FetchStrategy,
    ) -> Result<()> {
        let Some((hop, rest)) = hops.split_first() else {
            return Ok(());
        };

        match hop.relation {
            Relation::Profile => {
                let keys = pending(&nodes, |n| (!n.profile.is_loaded()).then_some(n.student.id));
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        student_profiles::table
                            .filter(student_profiles::student_id.eq_any(ids))
                            .order(student_profiles::student_id)
                            .select(StudentProfile::as_select())
                            .load(conn)
                    },
                    |profile| Some(profile.student_id),
                )?;

                for node in nodes {
                    fill_optional(&mut node.profile, &found, Some(node.student.id), |p| p);
                }
                Ok(())
            }
            Relation::Enrollments => {
                let keys = pending(&nodes, |n| {
                    (!n.enrollments.is_loaded()).then_some(n.student.id)
                });
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        enrollments::table
                            .filter(enrollments::student_id.eq_any(ids))
                            .order((enrollments::student_id, enrollments::course_id))
                            .select(Enrollment::as_select())
                            .load(conn)
                    },
                    |enrollment| Some(enrollment.student_id),
                )?;

                let mut children = Vec::new();
                for node in nodes {
                    fill_many(&mut node.enrollments, &found, node.student.id, EnrollmentNode::new);
                    children.extend(node.enrollments.get_mut().into_iter().flatten());
                }
                EnrollmentNode::attach(connection, children, rest, strategy)
            }
            Relation::ExamResults => {
                check_result_filters(
                    Self::KIND,
                    nodes
                        .iter()
                        .filter(|n| n.exam_results.is_loaded())
                        .map(|n| (n.student.id, n.exam_results_filters.as_slice())),
                    &hop.filters,
                )?;

                let keys = pending(&nodes, |n| {
                    (!n.exam_results.is_loaded()).then_some(n.student.id)
                });
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        filtered_exam_results(&hop.filters)
                            .filter(exam_results::student_id.eq_any(ids))
                            .order(exam_results::id)
                            .load::<ExamResult>(conn)
                    },
                    |result| Some(result.student_id),
                )?;

                let mut children = Vec::new();
                for node in nodes {
                    if !node.exam_results.is_loaded() {
                        node.exam_results_filters = hop.filters.clone();
                    }
                    fill_many(&mut node.exam_results, &found, node.student.id, ExamResultNode::new);
                    children.extend(node.exam_results.get_mut().into_iter().flatten());
                }
                ExamResultNode::attach(connection, children, rest, strategy)
            }
            other => Err(unsupported(Self::KIND, other)),
        }
    }
}

impl RootNode for StudentNode {
    fn load_all(connection: &mut SqliteConnection) -> QueryResult<Vec<Self>> {
        let rows = students::table
            .order(students::id)
            .select(Student::as_select())
            .load(connection)?;
        Ok(rows.into_iter().map(Self::new).collect())
    }

    fn load_by_id(connection: &mut SqliteConnection, id: i32) -> QueryResult<Option<Self>> {
        let row = students::table
            .find(id)
            .select(Student::as_select())
            .first(connection)
            .optional()?;
        Ok(row.map(Self::new))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentNode {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub student: Nav<StudentNode>,
    pub course: Nav<CourseNode>,
}

impl EnrollmentNode {
    pub fn new(enrollment: Enrollment) -> Self {
        Self {
            enrollment,
            student: Nav::NotLoaded,
            course: Nav::NotLoaded,
        }
    }
}

impl Node for EnrollmentNode {
    const KIND: EntityKind = EntityKind::Enrollment;

    fn attach(
        connection: &mut SqliteConnection,
        nodes: Vec<&mut Self>,
        hops: &[Hop],
        strategy: FetchStrategy,
    ) -> Result<()> {
        let Some((hop, rest)) = hops.split_first() else {
            return Ok(());
        };

        match hop.relation {
            Relation::Student => {
                let keys = pending(&nodes, |n| {
                    (!n.student.is_loaded()).then_some(n.enrollment.student_id)
                });
                let found =
                    load_grouped(connection, strategy, &keys, students_by_id, |s| Some(s.id))?;

                let mut children = Vec::new();
                for node in nodes {
                    let key = node.enrollment.student_id;
                    fill_one(&mut node.student, &found, key, StudentNode::new);
                    children.extend(node.student.get_mut());
                }
                StudentNode::attach(connection, children, rest, strategy)
            }
            Relation::Course => {
                let keys = pending(&nodes, |n| {
                    (!n.course.is_loaded()).then_some(n.enrollment.course_id)
                });
                let found =
                    load_grouped(connection, strategy, &keys, courses_by_id, |c| Some(c.id))?;

                let mut children = Vec::new();
                for node in nodes {
                    let key = node.enrollment.course_id;
                    fill_one(&mut node.course, &found, key, CourseNode::new);
                    children.extend(node.course.get_mut());
                }
                CourseNode::attach(connection, children, rest, strategy)
            }
            other => Err(unsupported(Self::KIND, other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseNode {
    #[serde(flatten)]
    pub course: Course,
    pub department: Nav<Option<DepartmentNode>>,
    pub enrollments: Nav<Vec<EnrollmentNode>>,
    pub course_assignments: Nav<Vec<CourseAssignmentNode>>,
    pub exams: Nav<Vec<ExamNode>>,
}

impl CourseNode {
    pub fn new(course: Course) -> Self {
        Self {
            course,
            department: Nav::NotLoaded,
            enrollments: Nav::NotLoaded,
            course_assignments: Nav::NotLoaded,
            exams: Nav::NotLoaded,
        }
    }
}

impl Node for CourseNode {
    const KIND: EntityKind = EntityKind::Course;

    fn attach(
        connection: &mut SqliteConnection,
        nodes: Vec<&mut Self>,
        hops: &[Hop],
        strategy: FetchStrategy,
    ) -> Result<()> {
        let Some((hop, rest)) = hops.split_first() else {
            return Ok(());
        };

        match hop.relation {
            Relation::Department => {
                let keys = pending(&nodes, |n| {
                    if n.department.is_loaded() {
                        None
                    } else {
                        n.course.department_id
                    }
                });
                let found =
                    load_grouped(connection, strategy, &keys, departments_by_id, |d| Some(d.id))?;

                let mut children = Vec::new();
                for node in nodes {
                    let key = node.course.department_id;
                    fill_optional(&mut node.department, &found, key, DepartmentNode::new);
                    children.extend(node.department.get_mut().and_then(Option::as_mut));
                }
                DepartmentNode::attach(connection, children, rest, strategy)
            }
            Relation::Enrollments => {
                let keys =
                    pending(&nodes, |n| (!n.enrollments.is_loaded()).then_some(n.course.id));
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        enrollments::table
                            .filter(enrollments::course_id.eq_any(ids))
                            .order((enrollments::course_id, enrollments::student_id))
                            .select(Enrollment::as_select())
                            .load(conn)
                    },
                    |enrollment| Some(enrollment.course_id),
                )?;

                let mut children = Vec::new();
                for node in nodes {
                    fill_many(&mut node.enrollments, &found, node.course.id, EnrollmentNode::new);
                    children.extend(node.enrollments.get_mut().into_iter().flatten());
                }
                EnrollmentNode::attach(connection, children, rest, strategy)
            }
            Relation::CourseAssignments => {
                let keys = pending(&nodes, |n| {
                    (!n.course_assignments.is_loaded()).then_some(n.course.id)
                });
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        course_assignments::table
                            .filter(course_assignments::course_id.eq_any(ids))
                            .order((
                                course_assignments::course_id,
                                course_assignments::instructor_id,
                            ))
                            .select(CourseAssignment::as_select())
                            .load(conn)
                    },
                    |assignment| Some(assignment.course_id),
                )?;

                let mut children = Vec::new();
                for node in nodes {
                    fill_many(
                        &mut node.course_assignments,
                        &found,
                        node.course.id,
                        CourseAssignmentNode::new,
                    );
                    children.extend(node.course_assignments.get_mut().into_iter().flatten());
                }
                CourseAssignmentNode::attach(connection, children, rest, strategy)
            }
            Relation::Exams => {
                let keys = pending(&nodes, |n| (!n.exams.is_loaded()).then_some(n.course.id));
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        exams::table
                            .filter(exams::course_id.eq_any(ids))
                            .order(exams::id)
                            .select(Exam::as_select())
                            .load(conn)
                    },
                    |exam| Some(exam.course_id),
                )?;

                let mut children = Vec::new();
                for node in nodes {
                    fill_many(&mut node.exams, &found, node.course.id, ExamNode::new);
                    children.extend(node.exams.get_mut().into_iter().flatten());
                }
                ExamNode::attach(connection, children, rest, strategy)
            }
            other => Err(unsupported(Self::KIND, other)),
        }
    }
}

impl RootNode for CourseNode {
    fn load_all(connection: &mut SqliteConnection) -> QueryResult<Vec<Self>> {
        let rows = courses::table
            .order(courses::id)
            .select(Course::as_select())
            .load(connection)?;
        Ok(rows.into_iter().map(Self::new).collect())
    }

    fn load_by_id(connection: &mut SqliteConnection, id: i32) -> QueryResult<Option<Self>> {
        let row = courses::table
            .find(id)
            .select(Course::as_select())
            .first(connection)
            .optional()?;
        Ok(row.map(Self::new))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructorNode {
    #[serde(flatten)]
    pub instructor: Instructor,
    pub department: Nav<Option<DepartmentNode>>,
    pub office_assignment: Nav<Option<OfficeAssignment>>,
    pub course_assignments: Nav<Vec<CourseAssignmentNode>>,
}

impl InstructorNode {
    pub fn new(instructor: Instructor) -> Self {
        Self {
            instructor,
            department: Nav::NotLoaded,
            office_assignment: Nav::NotLoaded,
            course_assignments: Nav::NotLoaded,
        }
    }
}

impl Node for InstructorNode {
    const KIND: EntityKind = EntityKind::Instructor;

    fn attach(
        connection: &mut SqliteConnection,
        nodes: Vec<&mut Self>,
        hops: &[Hop],
        strategy: FetchStrategy,
    ) -> Result<()> {
        let Some((hop, rest)) = hops.split_first() else {
            return Ok(());
        };

        match hop.relation {
            Relation::Department => {
                let keys = pending(&nodes, |n| {
                    if n.department.is_loaded() {
                        None
                    } else {
                        n.instructor.department_id
                    }
                });
                let found =
                    load_grouped(connection, strategy, &keys, departments_by_id, |d| Some(d.id))?;

                let mut children = Vec::new();
                for node in nodes {
                    let key = node.instructor.department_id;
                    fill_optional(&mut node.department, &found, key, DepartmentNode::new);
                    children.extend(node.department.get_mut().and_then(Option::as_mut));
                }
                DepartmentNode::attach(connection, children, rest, strategy)
            }
            Relation::OfficeAssignment => {
                let keys = pending(&nodes, |n| {
                    (!n.office_assignment.is_loaded()).then_some(n.instructor.id)
                });
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        office_assignments::table
                            .filter(office_assignments::instructor_id.eq_any(ids))
                            .order(office_assignments::instructor_id)
                            .select(OfficeAssignment::as_select())
                            .load(conn)
                    },
                    |office| Some(office.instructor_id),
                )?;

                for node in nodes {
                    let key = Some(node.instructor.id);
                    fill_optional(&mut node.office_assignment, &found, key, |o| o);
                }
                Ok(())
            }
            Relation::CourseAssignments => {
                let keys = pending(&nodes, |n| {
                    (!n.course_assignments.is_loaded()).then_some(n.instructor.id)
                });
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        course_assignments::table
                            .filter(course_assignments::instructor_id.eq_any(ids))
                            .order((
                                course_assignments::instructor_id,
                                course_assignments::course_id,
                            ))
                            .select(CourseAssignment::as_select())
                            .load(conn)
                    },
                    |assignment| Some(assignment.instructor_id),
                )?;

                let mut children = Vec::new();
                for node in nodes {
                    fill_many(
                        &mut node.course_assignments,
                        &found,
                        node.instructor.id,
                        CourseAssignmentNode::new,
                    );
                    children.extend(node.course_assignments.get_mut().into_iter().flatten());
                }
                CourseAssignmentNode::attach(connection, children, rest, strategy)
            }
            other => Err(unsupported(Self::KIND, other)),
        }
    }
}

impl RootNode for InstructorNode {
    fn load_all(connection: &mut SqliteConnection) -> QueryResult<Vec<Self>> {
        let rows = instructors::table
            .order(instructors::id)
            .select(Instructor::as_select())
            .load(connection)?;
        Ok(rows.into_iter().map(Self::new).collect())
    }

    fn load_by_id(connection: &mut SqliteConnection, id: i32) -> QueryResult<Option<Self>> {
        let row = instructors::table
            .find(id)
            .select(Instructor::as_select())
            .first(connection)
            .optional()?;
        Ok(row.map(Self::new))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseAssignmentNode {
    #[serde(flatten)]
    pub assignment: CourseAssignment,
    pub instructor: Nav<InstructorNode>,
    pub course: Nav<CourseNode>,
}

impl CourseAssignmentNode {
    pub fn new(assignment: CourseAssignment) -> Self {
        Self {
            assignment,
            instructor: Nav::NotLoaded,
            course: Nav::NotLoaded,
        }
    }
}

impl Node for CourseAssignmentNode {
    const KIND: EntityKind = EntityKind::CourseAssignment;

    fn attach(
        connection: &mut SqliteConnection,
        nodes: Vec<&mut Self>,
        hops: &[Hop],
        strategy: FetchStrategy,
    ) -> Result<()> {
        let Some((hop, rest)) = hops.split_first() else {
            return Ok(());
        };

        match hop.relation {
            Relation::Instructor => {
                let keys = pending(&nodes, |n| {
                    (!n.instructor.is_loaded()).then_some(n.assignment.instructor_id)
                });
                let found =
                    load_grouped(connection, strategy, &keys, instructors_by_id, |i| Some(i.id))?;

                let mut children = Vec::new();
                for node in nodes {
                    let key = node.assignment.instructor_id;
                    fill_one(&mut node.instructor, &found, key, InstructorNode::new);
                    children.extend(node.instructor.get_mut());
                }
                InstructorNode::attach(connection, children, rest, strategy)
            }
            Relation::Course => {
                let keys = pending(&nodes, |n| {
                    (!n.course.is_loaded()).then_some(n.assignment.course_id)
                });
                let found =
                    load_grouped(connection, strategy, &keys, courses_by_id, |c| Some(c.id))?;

                let mut children = Vec::new();
                for node in nodes {
                    let key = node.assignment.course_id;
                    fill_one(&mut node.course, &found, key, CourseNode::new);
                    children.extend(node.course.get_mut());
                }
                CourseNode::attach(connection, children, rest, strategy)
            }
            other => Err(unsupported(Self::KIND, other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentNode {
    #[serde(flatten)]
    pub department: Department,
    pub courses: Nav<Vec<CourseNode>>,
    pub instructors: Nav<Vec<InstructorNode>>,
}

impl DepartmentNode {
    pub fn new(department: Department) -> Self {
        Self {
            department,
            courses: Nav::NotLoaded,
            instructors: Nav::NotLoaded,
        }
    }
}

impl Node for DepartmentNode {
    const KIND: EntityKind = EntityKind::Department;

    fn attach(
        connection: &mut SqliteConnection,
        nodes: Vec<&mut Self>,
        hops: &[Hop],
        strategy: FetchStrategy,
    ) -> Result<()> {
        let Some((hop, rest)) = hops.split_first() else {
            return Ok(());
        };

        match hop.relation {
            Relation::Courses => {
                let keys =
                    pending(&nodes, |n| (!n.courses.is_loaded()).then_some(n.department.id));
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        courses::table
                            .filter(courses::department_id.eq_any(ids))
                            .order(courses::id)
                            .select(Course::as_select())
                            .load(conn)
                    },
                    |course| course.department_id,
                )?;

                let mut children = Vec::new();
                for node in nodes {
                    fill_many(&mut node.courses, &found, node.department.id, CourseNode::new);
                    children.extend(node.courses.get_mut().into_iter().flatten());
                }
                CourseNode::attach(connection, children, rest, strategy)
            }
            Relation::Instructors => {
                let keys = pending(&nodes, |n| {
                    (!n.instructors.is_loaded()).then_some(n.department.id)
                });
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        instructors::table
                            .filter(instructors::department_id.eq_any(ids))
                            .order(instructors::id)
                            .select(Instructor::as_select())
                            .load(conn)
                    },
                    |instructor| instructor.department_id,
                )?;

                let mut children = Vec::new();
                for node in nodes {
                    let key = node.department.id;
                    fill_many(&mut node.instructors, &found, key, InstructorNode::new);
                    children.extend(node.instructors.get_mut().into_iter().flatten());
                }
                InstructorNode::attach(connection, children, rest, strategy)
            }
            other => Err(unsupported(Self::KIND, other)),
        }
    }
}

impl RootNode for DepartmentNode {
    fn load_all(connection: &mut SqliteConnection) -> QueryResult<Vec<Self>> {
        let rows = departments::table
            .order(departments::id)
            .select(Department::as_select())
            .load(connection)?;
        Ok(rows.into_iter().map(Self::new).collect())
    }

    fn load_by_id(connection: &mut SqliteConnection, id: i32) -> QueryResult<Option<Self>> {
        let row = departments::table
            .find(id)
            .select(Department::as_select())
            .first(connection)
            .optional()?;
        Ok(row.map(Self::new))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamNode {
    #[serde(flatten)]
    pub exam: Exam,
    pub course: Nav<CourseNode>,
    pub exam_results: Nav<Vec<ExamResultNode>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exam_results_filters: Vec<HopFilter>,
}

impl ExamNode {
    pub fn new(exam: Exam) -> Self {
        Self {
            exam,
            course: Nav::NotLoaded,
            exam_results: Nav::NotLoaded,
            exam_results_filters: Vec::new(),
        }
    }

    /// The filters `exam_results` was loaded with.
    pub fn exam_results_filters(&self) -> &[HopFilter] {
        &self.exam_results_filters
    }
}

impl Node for ExamNode {
    const KIND: EntityKind = EntityKind::Exam;

    fn attach(
        connection: &mut SqliteConnection,
        nodes: Vec<&mut Self>,
        hops: &[Hop],
        strategy: FetchStrategy,
    ) -> Result<()> {
        let Some((hop, rest)) = hops.split_first() else {
            return Ok(());
        };

        match hop.relation {
            Relation::Course => {
                let keys =
                    pending(&nodes, |n| (!n.course.is_loaded()).then_some(n.exam.course_id));
                let found =
                    load_grouped(connection, strategy, &keys, courses_by_id, |c| Some(c.id))?;

                let mut children = Vec::new();
                for node in nodes {
                    let key = node.exam.course_id;
                    fill_one(&mut node.course, &found, key, CourseNode::new);
                    children.extend(node.course.get_mut());
                }
                CourseNode::attach(connection, children, rest, strategy)
            }
            Relation::ExamResults => {
                check_result_filters(
                    Self::KIND,
                    nodes
                        .iter()
                        .filter(|n| n.exam_results.is_loaded())
                        .map(|n| (n.exam.id, n.exam_results_filters.as_slice())),
                    &hop.filters,
                )?;

                let keys =
                    pending(&nodes, |n| (!n.exam_results.is_loaded()).then_some(n.exam.id));
                let found = load_grouped(
                    connection,
                    strategy,
                    &keys,
                    |conn, ids| {
                        filtered_exam_results(&hop.filters)
                            .filter(exam_results::exam_id.eq_any(ids))
                            .order(exam_results::id)
                            .load::<ExamResult>(conn)
                    },
                    |result| Some(result.exam_id),
                )?;

                let mut children = Vec::new();
                for node in nodes {
                    if !node.exam_results.is_loaded() {
                        node.exam_results_filters = hop.filters.clone();
                    }
                    fill_many(&mut node.exam_results, &found, node.exam.id, ExamResultNode::new);
                    children.extend(node.exam_results.get_mut().into_iter().flatten());
                }
                ExamResultNode::attach(connection, children, rest, strategy)
            }
            other => Err(unsupported(Self::KIND, other)),
        }
    }
}

impl RootNode for ExamNode {
    fn load_all(connection: &mut SqliteConnection) -> QueryResult<Vec<Self>> {
        let rows = exams::table
            .order(exams::id)
            .select(Exam::as_select())
            .load(connection)?;
        Ok(rows.into_iter().map(Self::new).collect())
    }

    fn load_by_id(connection: &mut SqliteConnection, id: i32) -> QueryResult<Option<Self>> {
        let row = exams::table
            .find(id)
            .select(Exam::as_select())
            .first(connection)
            .optional()?;
        Ok(row.map(Self::new))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamResultNode {
    #[serde(flatten)]
    pub result: ExamResult,
    pub exam: Nav<ExamNode>,
    pub student: Nav<StudentNode>,
}

impl ExamResultNode {
    pub fn new(result: ExamResult) -> Self {
        Self {
            result,
            exam: Nav::NotLoaded,
            student: Nav::NotLoaded,
        }
    }
}

impl Node for ExamResultNode {
    const KIND: EntityKind = EntityKind::ExamResult;

    fn attach(
        connection: &mut SqliteConnection,
        nodes: Vec<&mut Self>,
        hops: &[Hop],
        strategy: FetchStrategy,
    ) -> Result<()> {
        let Some((hop, rest)) = hops.split_first() else {
            return Ok(());
        };

        match hop.relation {
            Relation::Exam => {
                let keys =
                    pending(&nodes, |n| (!n.exam.is_loaded()).then_some(n.result.exam_id));
                let found = load_grouped(connection, strategy, &keys, exams_by_id, |e| Some(e.id))?;

                let mut children = Vec::new();
                for node in nodes {
                    let key = node.result.exam_id;
                    fill_one(&mut node.exam, &found, key, ExamNode::new);
                    children.extend(node.exam.get_mut());
                }
                ExamNode::attach(connection, children, rest, strategy)
            }
            Relation::Student => {
                let keys = pending(&nodes, |n| {
                    (!n.student.is_loaded()).then_some(n.result.student_id)
                });
                let found =
                    load_grouped(connection, strategy, &keys, students_by_id, |s| Some(s.id))?;

                let mut children = Vec::new();
                for node in nodes {
                    let key = node.result.student_id;
                    fill_one(&mut node.student, &found, key, StudentNode::new);
                    children.extend(node.student.get_mut());
                }
                StudentNode::attach(connection, children, rest, strategy)
            }
            other => Err(unsupported(Self::KIND, other)),
        }
    }
}

impl RootNode for ExamResultNode {
    fn load_all(connection: &mut SqliteConnection) -> QueryResult<Vec<Self>> {
        let rows = exam_results::table
            .order(exam_results::id)
            .select(ExamResult::as_select())
            .load(connection)?;
        Ok(rows.into_iter().map(Self::new).collect())
    }

    fn load_by_id(connection: &mut SqliteConnection, id: i32) -> QueryResult<Option<Self>> {
        let row = exam_results::table
            .find(id)
            .select(ExamResult::as_select())
            .first(connection)
            .optional()?;
        Ok(row.map(Self::new))
    }
}
