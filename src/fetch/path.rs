//! Typed relation paths such as `enrollments.course.exams`.

use crate::error::{Result, StoreError};
use crate::models::EntityKind;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A navigation from one entity to related rows.
///
/// The same name can be defined on several entities (`course` exists on enrollments, course
/// assignments, and exams); [`Relation::target`] says where it leads from a given entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Profile,
    Enrollments,
    ExamResults,
    Student,
    Course,
    Department,
    CourseAssignments,
    Exams,
    OfficeAssignment,
    Instructor,
    Courses,
    Instructors,
    Exam,
}

const ALL_RELATIONS: [Relation; 13] = [
    Relation::Profile,
    Relation::Enrollments,
    Relation::ExamResults,
    Relation::Student,
    Relation::Course,
    Relation::Department,
    Relation::CourseAssignments,
    Relation::Exams,
    Relation::OfficeAssignment,
    Relation::Instructor,
    Relation::Courses,
    Relation::Instructors,
    Relation::Exam,
];

impl Relation {
    pub fn name(self) -> &'static str {
        match self {
            Relation::Profile => "profile",
            Relation::Enrollments => "enrollments",
            Relation::ExamResults => "exam_results",
            Relation::Student => "student",
            Relation::Course => "course",
            Relation::Department => "department",
            Relation::CourseAssignments => "course_assignments",
            Relation::Exams => "exams",
            Relation::OfficeAssignment => "office_assignment",
            Relation::Instructor => "instructor",
            Relation::Courses => "courses",
            Relation::Instructors => "instructors",
            Relation::Exam => "exam",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_RELATIONS.into_iter().find(|relation| relation.name() == name)
    }

    /// The entity reached by following this relation from `from`, or `None` when `from`
    /// does not define it.
    pub fn target(self, from: EntityKind) -> Option<EntityKind> {
        use EntityKind as E;
        use Relation as R;

        let to = match (from, self) {
            (E::Student, R::Profile) => E::StudentProfile,
            (E::Student, R::Enrollments) => E::Enrollment,
            (E::Student, R::ExamResults) => E::ExamResult,

            (E::Enrollment, R::Student) => E::Student,
            (E::Enrollment, R::Course) => E::Course,

            (E::Course, R::Department) => E::Department,
            (E::Course, R::Enrollments) => E::Enrollment,
            (E::Course, R::CourseAssignments) => E::CourseAssignment,
            (E::Course, R::Exams) => E::Exam,

            (E::Instructor, R::Department) => E::Department,
            (E::Instructor, R::OfficeAssignment) => E::OfficeAssignment,
            (E::Instructor, R::CourseAssignments) => E::CourseAssignment,

            (E::CourseAssignment, R::Instructor) => E::Instructor,
            (E::CourseAssignment, R::Course) => E::Course,

            (E::Department, R::Courses) => E::Course,
            (E::Department, R::Instructors) => E::Instructor,

            (E::Exam, R::Course) => E::Course,
            (E::Exam, R::ExamResults) => E::ExamResult,

            (E::ExamResult, R::Exam) => E::Exam,
            (E::ExamResult, R::Student) => E::Student,

            _ => return None,
        };

        Some(to)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A restriction evaluated by the database while fetching an `exam_results` hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HopFilter {
    /// Only results whose exam belongs to this course.
    ExamCourse(i32),
    /// Only results scoring at least this much.
    MinScore(i32),
}

impl fmt::Display for HopFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HopFilter::ExamCourse(course) => write!(f, "course={course}"),
            HopFilter::MinScore(score) => write!(f, "min_score={score}"),
        }
    }
}

impl Serialize for HopFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Puts filters in a canonical order so equal filter sets compare equal.
pub(crate) fn normalize_filters(filters: &mut Vec<HopFilter>) {
    filters.sort_unstable();
    filters.dedup();
}

impl FromStr for HopFilter {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| StoreError::validation(format!("filter `{s}` must be key=value")))?;

        let value: i32 = value.trim().parse().map_err(|_| {
            StoreError::validation(format!("filter `{s}` needs an integer value"))
        })?;

        match key.trim() {
            "course" => Ok(HopFilter::ExamCourse(value)),
            "min_score" => Ok(HopFilter::MinScore(value)),
            other => Err(StoreError::validation(format!("unknown filter `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub relation: Relation,
    pub filters: Vec<HopFilter>,
}

/// One or more relation hops walked from a root entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationPath {
    hops: Vec<Hop>,
}

impl RelationPath {
    pub fn new(relation: Relation) -> Self {
        Self {
            hops: vec![Hop {
                relation,
                filters: Vec::new(),
            }],
        }
    }

    /// Appends another hop.
    pub fn then(mut self, relation: Relation) -> Self {
        self.hops.push(Hop {
            relation,
            filters: Vec::new(),
        });
        self
    }

    /// Restricts the most recently added hop.
    pub fn filtered(mut self, filter: HopFilter) -> Self {
        if let Some(last) = self.hops.last_mut() {
            last.filters.push(filter);
            normalize_filters(&mut last.filters);
        }
        self
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Checks every hop against the relationship graph starting at `root` and returns the
    /// entity the path ends at.
    pub fn resolve(&self, root: EntityKind) -> Result<EntityKind> {
        let mut at = root;

        for hop in &self.hops {
            let next = hop.relation.target(at).ok_or_else(|| {
                StoreError::validation(format!("{at} has no relation `{}`", hop.relation))
            })?;

            if !hop.filters.is_empty() && next != EntityKind::ExamResult {
                return Err(StoreError::validation(format!(
                    "relation `{}` does not accept filters",
                    hop.relation
                )));
            }

            at = next;
        }

        Ok(at)
    }
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, hop) in self.hops.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(hop.relation.name())?;

            if !hop.filters.is_empty() {
                let filters: Vec<String> = hop.filters.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", filters.join(","))?;
            }
        }
        Ok(())
    }
}

impl FromStr for RelationPath {
    type Err = StoreError;

    /// Parses `exam_results[course=2,min_score=50].exam` style paths.
    fn from_str(s: &str) -> Result<Self> {
        let mut hops = Vec::new();

        for segment in s.split('.') {
            let segment = segment.trim();

            let (name, filters) = match segment.split_once('[') {
                Some((name, rest)) => {
                    let inner = rest.strip_suffix(']').ok_or_else(|| {
                        StoreError::validation(format!("unclosed filter in `{segment}`"))
                    })?;
                    let mut filters = inner
                        .split(',')
                        .map(str::parse)
                        .collect::<Result<Vec<HopFilter>>>()?;
                    normalize_filters(&mut filters);
                    (name, filters)
                }
                None => (segment, Vec::new()),
            };

            let relation = Relation::from_name(name)
                .ok_or_else(|| StoreError::validation(format!("unknown relation `{name}`")))?;

            hops.push(Hop { relation, filters });
        }

        Ok(Self { hops })
    }
}
