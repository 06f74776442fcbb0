//! Academic catalogue: departments, years, semesters, courses and
//! course assignments.

mod repository;
mod service;
mod types;

pub use repository::{
    AcademicYearRepository, CourseAssignmentRepository, CourseRepository, DepartmentRepository,
    SemesterRepository,
};
pub use service::{AcademicService, AssignmentResult};
pub use types::{
    AcademicYear, Course, CourseAssignment, Department, NewCourse, Semester, SemesterType,
};
