use crate::config::DatabaseSettings;
use crate::db;
use crate::error::{Result, StoreError};
use crate::fetch::{
    self, FetchStrategy, HopFilter, Node, Relation, RelationPath, RootNode, StudentNode,
};
use crate::models::{
    Course, CourseAssignment, CourseChanges, Department, EntityKind, Enrollment, Exam,
    ExamResult, Instructor, NewCourse, NewDepartment, NewExam, NewExamResult, NewInstructor,
    NewStudent, OfficeAssignment, Student, StudentChanges, StudentProfile,
};
use crate::schema::{
    course_assignments, courses, departments, enrollments, exam_results, exams, instructors,
    office_assignments, student_profiles, students,
};
use diesel::dsl::{count_star, exists};
use diesel::prelude::*;

/// The default wait for the sqlite write lock when no settings are given.
const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// The manager for creating, linking, retrieving, and removing university records.
///
/// Each manager owns one connection. Concurrent callers should each open their own manager
/// against the same database file; every read-then-write operation runs inside an immediate
/// transaction, so sqlite serializes them.
pub struct UniversityManager {
    db: SqliteConnection,
}

fn ensure(found: bool, entity: EntityKind, id: i32) -> Result<()> {
    if found {
        Ok(())
    } else {
        Err(StoreError::not_found(entity, id))
    }
}

fn student_exists(conn: &mut SqliteConnection, id: i32) -> Result<()> {
    let found = diesel::select(exists(students::table.find(id))).get_result(conn)?;
    ensure(found, EntityKind::Student, id)
}

fn course_exists(conn: &mut SqliteConnection, id: i32) -> Result<()> {
    let found = diesel::select(exists(courses::table.find(id))).get_result(conn)?;
    ensure(found, EntityKind::Course, id)
}

fn department_exists(conn: &mut SqliteConnection, id: i32) -> Result<()> {
    let found = diesel::select(exists(departments::table.find(id))).get_result(conn)?;
    ensure(found, EntityKind::Department, id)
}

fn instructor_exists(conn: &mut SqliteConnection, id: i32) -> Result<()> {
    let found = diesel::select(exists(instructors::table.find(id))).get_result(conn)?;
    ensure(found, EntityKind::Instructor, id)
}

fn exam_exists(conn: &mut SqliteConnection, id: i32) -> Result<()> {
    let found = diesel::select(exists(exams::table.find(id))).get_result(conn)?;
    ensure(found, EntityKind::Exam, id)
}

/// Logs the outcome of a write before handing it back.
fn logged<T>(op: &'static str, result: Result<T>) -> Result<T> {
    match &result {
        Ok(_) => tracing::info!(op, "write committed"),
        Err(err) => tracing::warn!(op, %err, "write rejected"),
    }
    result
}

impl UniversityManager {
    /// Connects to the database described by `settings`.
    pub fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let db = db::establish(&settings.url, settings.busy_timeout_ms)?;
        Ok(Self { db })
    }

    /// Connects to the sqlite database at `database_url` with the default lock wait.
    pub fn open(database_url: &str) -> Result<Self> {
        let db = db::establish(database_url, DEFAULT_BUSY_TIMEOUT_MS)?;
        Ok(Self { db })
    }

    /// Wraps a connection that is already configured.
    pub fn from_connection(db: SqliteConnection) -> Self {
        Self { db }
    }

    /// Creates any missing tables.
    pub fn create_schema(&mut self) -> Result<()> {
        db::create_schema(&mut self.db)
    }

    /// Writes the fixed demonstration rows, returning how many were new.
    pub fn seed(&mut self) -> Result<usize> {
        db::seed(&mut self.db)
    }

    /// The underlying connection, for queries the manager does not offer.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.db
    }

    /// Inserts a student after checking the required and length constraints.
    pub fn create_student(&mut self, new_student: &NewStudent) -> Result<Student> {
        let result = new_student.validate().and_then(|()| {
            diesel::insert_into(students::table)
                .values(new_student)
                .returning(Student::as_returning())
                .get_result(&mut self.db)
                .map_err(StoreError::from)
        });

        logged("create_student", result)
    }

    /// Inserts several students in one transaction. Either all of them are stored or none.
    pub fn insert_students(&mut self, new_students: &[NewStudent]) -> Result<Vec<Student>> {
        for student in new_students {
            student.validate()?;
        }

        let result = self.db.immediate_transaction(|conn| {
            new_students
                .iter()
                .map(|student| {
                    diesel::insert_into(students::table)
                        .values(student)
                        .returning(Student::as_returning())
                        .get_result(conn)
                        .map_err(StoreError::from)
                })
                .collect::<Result<Vec<Student>>>()
        });

        logged("insert_students", result)
    }

    /// Applies `changes` to a student. Empty changes just return the current row.
    pub fn update_student(&mut self, id: i32, changes: &StudentChanges) -> Result<Student> {
        changes.validate()?;

        let result = self.db.immediate_transaction(|conn| {
            let updated = if changes.is_empty() {
                students::table
                    .find(id)
                    .select(Student::as_select())
                    .first(conn)
                    .optional()?
            } else {
                diesel::update(students::table.find(id))
                    .set(changes)
                    .returning(Student::as_returning())
                    .get_result(conn)
                    .optional()?
            };

            updated.ok_or_else(|| StoreError::not_found(EntityKind::Student, id))
        });

        logged("update_student", result)
    }

    /// Inserts or replaces the profile of an existing student.
    pub fn set_student_profile(&mut self, profile: &StudentProfile) -> Result<StudentProfile> {
        let result = self.db.immediate_transaction(|conn| {
            student_exists(conn, profile.student_id)?;

            diesel::replace_into(student_profiles::table)
                .values(profile)
                .execute(conn)?;
            Ok(profile.clone())
        });

        logged("set_student_profile", result)
    }

    pub fn create_department(&mut self, new_department: &NewDepartment) -> Result<Department> {
        let result = new_department.validate().and_then(|()| {
            diesel::insert_into(departments::table)
                .values(new_department)
                .returning(Department::as_returning())
                .get_result(&mut self.db)
                .map_err(StoreError::from)
        });

        logged("create_department", result)
    }

    /// Inserts a course. The credit must be positive and any department must exist.
    pub fn create_course(&mut self, new_course: &NewCourse) -> Result<Course> {
        let result = new_course.validate().and_then(|()| {
            self.db.immediate_transaction(|conn| {
                if let Some(department_id) = new_course.department_id {
                    department_exists(conn, department_id)?;
                }

                let course = diesel::insert_into(courses::table)
                    .values(new_course)
                    .returning(Course::as_returning())
                    .get_result(conn)?;
                Ok(course)
            })
        });

        logged("create_course", result)
    }

    /// Applies `changes` to a course under the same rules as [`Self::create_course`].
    pub fn update_course(&mut self, id: i32, changes: &CourseChanges) -> Result<Course> {
        changes.validate()?;

        let result = self.db.immediate_transaction(|conn| {
            if let Some(Some(department_id)) = changes.department_id {
                department_exists(conn, department_id)?;
            }

            let updated = if changes.is_empty() {
                courses::table
                    .find(id)
                    .select(Course::as_select())
                    .first(conn)
                    .optional()?
            } else {
                diesel::update(courses::table.find(id))
                    .set(changes)
                    .returning(Course::as_returning())
                    .get_result(conn)
                    .optional()?
            };

            updated.ok_or_else(|| StoreError::not_found(EntityKind::Course, id))
        });

        logged("update_course", result)
    }

    pub fn create_instructor(&mut self, new_instructor: &NewInstructor) -> Result<Instructor> {
        let result = new_instructor.validate().and_then(|()| {
            self.db.immediate_transaction(|conn| {
                if let Some(department_id) = new_instructor.department_id {
                    department_exists(conn, department_id)?;
                }

                let instructor = diesel::insert_into(instructors::table)
                    .values(new_instructor)
                    .returning(Instructor::as_returning())
                    .get_result(conn)?;
                Ok(instructor)
            })
        });

        logged("create_instructor", result)
    }

    /// Inserts or replaces the office of an existing instructor.
    pub fn set_office_assignment(&mut self, office: &OfficeAssignment) -> Result<OfficeAssignment> {
        let result = self.db.immediate_transaction(|conn| {
            instructor_exists(conn, office.instructor_id)?;

            diesel::replace_into(office_assignments::table)
                .values(office)
                .execute(conn)?;
            Ok(office.clone())
        });

        logged("set_office_assignment", result)
    }

    pub fn create_exam(&mut self, new_exam: &NewExam) -> Result<Exam> {
        let result = self.db.immediate_transaction(|conn| {
            course_exists(conn, new_exam.course_id)?;

            let exam = diesel::insert_into(exams::table)
                .values(new_exam)
                .returning(Exam::as_returning())
                .get_result(conn)?;
            Ok(exam)
        });

        logged("create_exam", result)
    }

    /// Records a score. Both the exam and the student must exist.
    pub fn record_exam_result(&mut self, new_result: &NewExamResult) -> Result<ExamResult> {
        let result = self.db.immediate_transaction(|conn| {
            exam_exists(conn, new_result.exam_id)?;
            student_exists(conn, new_result.student_id)?;

            let recorded = diesel::insert_into(exam_results::table)
                .values(new_result)
                .returning(ExamResult::as_returning())
                .get_result(conn)?;
            Ok(recorded)
        });

        logged("record_exam_result", result)
    }

    /// Enrolls a student in a course.
    ///
    /// Fails with [`StoreError::NotFound`] if either side is missing and with
    /// [`StoreError::Conflict`] if the student is already enrolled. The checks and the
    /// insert share one immediate transaction, so of two concurrent calls for the same pair
    /// exactly one succeeds.
    pub fn assign_student_to_course(
        &mut self,
        student_id: i32,
        course_id: i32,
    ) -> Result<Enrollment> {
        let enrollment = Enrollment {
            student_id,
            course_id,
        };

        let result = self.db.immediate_transaction(|conn| {
            student_exists(conn, student_id)?;
            course_exists(conn, course_id)?;

            let already: bool =
                diesel::select(exists(enrollments::table.find((student_id, course_id))))
                    .get_result(conn)?;
            if already {
                return Err(StoreError::conflict(format!(
                    "student {student_id} is already enrolled in course {course_id}"
                )));
            }

            diesel::insert_into(enrollments::table)
                .values(&enrollment)
                .execute(conn)?;
            Ok(enrollment)
        });

        logged("assign_student_to_course", result)
    }

    /// Assigns an instructor to teach a course, with the same guarantees as
    /// [`Self::assign_student_to_course`].
    pub fn assign_instructor_to_course(
        &mut self,
        instructor_id: i32,
        course_id: i32,
    ) -> Result<CourseAssignment> {
        let assignment = CourseAssignment {
            instructor_id,
            course_id,
        };

        let result = self.db.immediate_transaction(|conn| {
            instructor_exists(conn, instructor_id)?;
            course_exists(conn, course_id)?;

            let already: bool = diesel::select(exists(
                course_assignments::table.find((instructor_id, course_id)),
            ))
            .get_result(conn)?;
            if already {
                return Err(StoreError::conflict(format!(
                    "instructor {instructor_id} is already assigned to course {course_id}"
                )));
            }

            diesel::insert_into(course_assignments::table)
                .values(&assignment)
                .execute(conn)?;
            Ok(assignment)
        });

        logged("assign_instructor_to_course", result)
    }

    /// Retrieves a specific student based on their ID.
    pub fn student(&mut self, id: i32) -> Result<Option<Student>> {
        let student = students::table
            .find(id)
            .select(Student::as_select())
            .first(&mut self.db)
            .optional()?;
        Ok(student)
    }

    pub fn course(&mut self, id: i32) -> Result<Option<Course>> {
        let course = courses::table
            .find(id)
            .select(Course::as_select())
            .first(&mut self.db)
            .optional()?;
        Ok(course)
    }

    pub fn department(&mut self, id: i32) -> Result<Option<Department>> {
        let department = departments::table
            .find(id)
            .select(Department::as_select())
            .first(&mut self.db)
            .optional()?;
        Ok(department)
    }

    pub fn instructor(&mut self, id: i32) -> Result<Option<Instructor>> {
        let instructor = instructors::table
            .find(id)
            .select(Instructor::as_select())
            .first(&mut self.db)
            .optional()?;
        Ok(instructor)
    }

    pub fn exam(&mut self, id: i32) -> Result<Option<Exam>> {
        let exam = exams::table
            .find(id)
            .select(Exam::as_select())
            .first(&mut self.db)
            .optional()?;
        Ok(exam)
    }

    /// Retrieves all students, ordered by ID.
    pub fn students(&mut self) -> Result<Vec<Student>> {
        let rows = students::table
            .order(students::id)
            .select(Student::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    pub fn courses(&mut self) -> Result<Vec<Course>> {
        let rows = courses::table
            .order(courses::id)
            .select(Course::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    pub fn departments(&mut self) -> Result<Vec<Department>> {
        let rows = departments::table
            .order(departments::id)
            .select(Department::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    pub fn instructors(&mut self) -> Result<Vec<Instructor>> {
        let rows = instructors::table
            .order(instructors::id)
            .select(Instructor::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    pub fn exams(&mut self) -> Result<Vec<Exam>> {
        let rows = exams::table
            .order(exams::id)
            .select(Exam::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    pub fn exam_results(&mut self) -> Result<Vec<ExamResult>> {
        let rows = exam_results::table
            .order(exam_results::id)
            .select(ExamResult::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    /// Every student/course association row.
    pub fn enrollments(&mut self) -> Result<Vec<Enrollment>> {
        let rows = enrollments::table
            .order((enrollments::student_id, enrollments::course_id))
            .select(Enrollment::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    /// Every instructor/course association row.
    pub fn course_assignments(&mut self) -> Result<Vec<CourseAssignment>> {
        let rows = course_assignments::table
            .order((course_assignments::instructor_id, course_assignments::course_id))
            .select(CourseAssignment::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    /// Loads every root of type `N` and attaches each of the `includes` paths.
    ///
    /// With no includes the navigations stay unloaded; use [`Self::fetch_related`] later.
    pub fn get_all<N: RootNode>(
        &mut self,
        includes: &[RelationPath],
        strategy: FetchStrategy,
    ) -> Result<Vec<N>> {
        for path in includes {
            path.resolve(N::KIND)?;
        }

        self.db.transaction(|conn| {
            let mut nodes = N::load_all(conn)?;
            for path in includes {
                fetch::fetch_related(conn, &mut nodes, path, strategy)?;
            }
            Ok(nodes)
        })
    }

    /// Like [`Self::get_all`] for a single root. Absence is `Ok(None)`.
    pub fn get_by_id<N: RootNode>(
        &mut self,
        id: i32,
        includes: &[RelationPath],
        strategy: FetchStrategy,
    ) -> Result<Option<N>> {
        for path in includes {
            path.resolve(N::KIND)?;
        }

        self.db.transaction(|conn| {
            let Some(node) = N::load_by_id(conn, id)? else {
                return Ok(None);
            };

            let mut nodes = [node];
            for path in includes {
                fetch::fetch_related(conn, &mut nodes, path, strategy)?;
            }

            let [node] = nodes;
            Ok(Some(node))
        })
    }

    /// Attaches `path` to nodes that were loaded earlier.
    pub fn fetch_related<N: Node>(
        &mut self,
        nodes: &mut [N],
        path: &RelationPath,
        strategy: FetchStrategy,
    ) -> Result<()> {
        fetch::fetch_related(&mut self.db, nodes, path, strategy)
    }

    /// The courses a student is enrolled in, ordered by ID.
    pub fn courses_for_student(&mut self, student_id: i32) -> Result<Vec<Course>> {
        self.db.transaction(|conn| {
            student_exists(conn, student_id)?;

            let rows = enrollments::table
                .inner_join(courses::table)
                .filter(enrollments::student_id.eq(student_id))
                .order(courses::id)
                .select(Course::as_select())
                .load(conn)?;
            Ok(rows)
        })
    }

    /// The students enrolled in a course, ordered by ID.
    pub fn students_for_course(&mut self, course_id: i32) -> Result<Vec<Student>> {
        self.db.transaction(|conn| {
            course_exists(conn, course_id)?;

            let rows = enrollments::table
                .inner_join(students::table)
                .filter(enrollments::course_id.eq(course_id))
                .order(students::id)
                .select(Student::as_select())
                .load(conn)?;
            Ok(rows)
        })
    }

    /// Students with at least one result for an exam of `course_id`. Each student comes with
    /// only those results attached, and each result with its exam.
    pub fn students_with_exam_in_course(
        &mut self,
        course_id: i32,
        strategy: FetchStrategy,
    ) -> Result<Vec<StudentNode>> {
        let path = RelationPath::new(Relation::ExamResults)
            .filtered(HopFilter::ExamCourse(course_id))
            .then(Relation::Exam);

        self.db.transaction(|conn| {
            let course_exams = exams::table
                .filter(exams::course_id.eq(course_id))
                .select(exams::id);
            let examined = exam_results::table
                .filter(exam_results::exam_id.eq_any(course_exams))
                .select(exam_results::student_id);

            let rows = students::table
                .filter(students::id.eq_any(examined))
                .order(students::id)
                .select(Student::as_select())
                .load(conn)?;

            let mut nodes: Vec<StudentNode> = rows.into_iter().map(StudentNode::new).collect();
            fetch::fetch_related(conn, &mut nodes, &path, strategy)?;
            Ok(nodes)
        })
    }

    /// Students with strictly more than `threshold` exam results, each with all of its results
    /// attached. The threshold must not be negative.
    pub fn students_with_exam_results_over(
        &mut self,
        threshold: i64,
        strategy: FetchStrategy,
    ) -> Result<Vec<StudentNode>> {
        if threshold < 0 {
            return Err(StoreError::validation(format!(
                "exam result threshold must not be negative, got {threshold}"
            )));
        }

        let path = RelationPath::new(Relation::ExamResults);

        self.db.transaction(|conn| {
            // Students without results never pass a non-negative threshold, so grouping the
            // results table is enough.
            let busy = exam_results::table
                .group_by(exam_results::student_id)
                .having(count_star().gt(threshold))
                .select(exam_results::student_id);

            let rows = students::table
                .filter(students::id.eq_any(busy))
                .order(students::id)
                .select(Student::as_select())
                .load(conn)?;

            let mut nodes: Vec<StudentNode> = rows.into_iter().map(StudentNode::new).collect();
            fetch::fetch_related(conn, &mut nodes, &path, strategy)?;
            Ok(nodes)
        })
    }

    pub fn courses_without_exams(&mut self) -> Result<Vec<Course>> {
        let rows = courses::table
            .filter(courses::id.ne_all(exams::table.select(exams::course_id)))
            .order(courses::id)
            .select(Course::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    pub fn instructors_without_assignments(&mut self) -> Result<Vec<Instructor>> {
        let teaching = course_assignments::table.select(course_assignments::instructor_id);

        let rows = instructors::table
            .filter(instructors::id.ne_all(teaching))
            .order(instructors::id)
            .select(Instructor::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    /// Removes and returns a student. Their enrollments, profile, and exam results go with
    /// them; the courses stay.
    pub fn delete_student(&mut self, id: i32) -> Result<Student> {
        let result = diesel::delete(students::table.find(id))
            .returning(Student::as_returning())
            .get_result(&mut self.db)
            .optional()
            .map_err(StoreError::from)
            .and_then(|deleted| {
                deleted.ok_or_else(|| StoreError::not_found(EntityKind::Student, id))
            });

        logged("delete_student", result)
    }

    /// Removes and returns a course along with its enrollments and instructor assignments.
    ///
    /// A course that still has exams is not removed; delete the exams first.
    pub fn delete_course(&mut self, id: i32) -> Result<Course> {
        let result = self.db.immediate_transaction(|conn| {
            course_exists(conn, id)?;

            let exam_count: i64 = exams::table
                .filter(exams::course_id.eq(id))
                .count()
                .get_result(conn)?;
            if exam_count > 0 {
                return Err(StoreError::conflict(format!(
                    "course {id} still has {exam_count} exam(s)"
                )));
            }

            let course = diesel::delete(courses::table.find(id))
                .returning(Course::as_returning())
                .get_result(conn)?;
            Ok(course)
        });

        logged("delete_course", result)
    }

    /// Removes and returns an instructor along with their office and course assignments.
    pub fn delete_instructor(&mut self, id: i32) -> Result<Instructor> {
        let result = diesel::delete(instructors::table.find(id))
            .returning(Instructor::as_returning())
            .get_result(&mut self.db)
            .optional()
            .map_err(StoreError::from)
            .and_then(|deleted| {
                deleted.ok_or_else(|| StoreError::not_found(EntityKind::Instructor, id))
            });

        logged("delete_instructor", result)
    }

    /// Removes and returns a department. Its courses and instructors are kept and detached.
    pub fn delete_department(&mut self, id: i32) -> Result<Department> {
        let result = diesel::delete(departments::table.find(id))
            .returning(Department::as_returning())
            .get_result(&mut self.db)
            .optional()
            .map_err(StoreError::from)
            .and_then(|deleted| {
                deleted.ok_or_else(|| StoreError::not_found(EntityKind::Department, id))
            });

        logged("delete_department", result)
    }

    /// Removes and returns an exam along with its results.
    pub fn delete_exam(&mut self, id: i32) -> Result<Exam> {
        let result = diesel::delete(exams::table.find(id))
            .returning(Exam::as_returning())
            .get_result(&mut self.db)
            .optional()
            .map_err(StoreError::from)
            .and_then(|deleted| {
                deleted.ok_or_else(|| StoreError::not_found(EntityKind::Exam, id))
            });

        logged("delete_exam", result)
    }
}
