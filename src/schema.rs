// Kept in sync by hand with `schema.sql`.

diesel::table! {
    books (id) {
        id -> Integer,
        title -> Text,
        author -> Text,
        year_published -> Integer,
    }
}

diesel::table! {
    course_assignments (instructor_id, course_id) {
        instructor_id -> Integer,
        course_id -> Integer,
    }
}

diesel::table! {
    courses (id) {
        id -> Integer,
        title -> Text,
        credit -> Integer,
        department_id -> Nullable<Integer>,
    }
}

diesel::table! {
    departments (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    enrollments (student_id, course_id) {
        student_id -> Integer,
        course_id -> Integer,
    }
}

diesel::table! {
    exam_results (id) {
        id -> Integer,
        exam_id -> Integer,
        student_id -> Integer,
        score -> Integer,
    }
}

diesel::table! {
    exams (id) {
        id -> Integer,
        course_id -> Integer,
        title -> Text,
    }
}

diesel::table! {
    instructors (id) {
        id -> Integer,
        name -> Text,
        department_id -> Nullable<Integer>,
    }
}

diesel::table! {
    office_assignments (instructor_id) {
        instructor_id -> Integer,
        location -> Text,
    }
}

diesel::table! {
    student_profiles (student_id) {
        student_id -> Integer,
        bio -> Nullable<Text>,
        phone -> Nullable<Text>,
    }
}

diesel::table! {
    students (id) {
        id -> Integer,
        name -> Text,
        email -> Text,
        birth_date -> Nullable<Date>,
    }
}

diesel::joinable!(course_assignments -> courses (course_id));
diesel::joinable!(course_assignments -> instructors (instructor_id));
diesel::joinable!(courses -> departments (department_id));
diesel::joinable!(enrollments -> courses (course_id));
diesel::joinable!(enrollments -> students (student_id));
diesel::joinable!(exam_results -> exams (exam_id));
diesel::joinable!(exam_results -> students (student_id));
diesel::joinable!(exams -> courses (course_id));
diesel::joinable!(instructors -> departments (department_id));
diesel::joinable!(office_assignments -> instructors (instructor_id));
diesel::joinable!(student_profiles -> students (student_id));

diesel::allow_tables_to_appear_in_same_query!(
    books,
    course_assignments,
    courses,
    departments,
    enrollments,
    exam_results,
    exams,
    instructors,
    office_assignments,
    student_profiles,
    students,
);
