//! Repositories for the academic catalogue.

use sqlx::SqliteConnection;

use super::types::{
    AcademicYear, Course, CourseAssignment, Department, NewCourse, Semester, SemesterType,
};
use crate::db::DbPool;
use crate::{ArchiveError, Result};

/// Repository for departments.
pub struct DepartmentRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> DepartmentRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a department.
    pub async fn create(&self, name: &str, shortcut: Option<&str>) -> Result<Department> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO departments (name, shortcut) VALUES (?, ?) RETURNING id")
                .bind(name)
                .bind(shortcut)
                .fetch_one(self.pool)
                .await?;
        self.get_by_id(id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound("department".to_string()))
    }

    /// Get a department by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Department>> {
        let department = sqlx::query_as::<_, Department>(
            "SELECT id, name, shortcut, created_at FROM departments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(department)
    }

    /// Delete a department inside a caller-owned transaction.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Repository for academic years.
pub struct AcademicYearRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AcademicYearRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create an academic year from a `YYYY-YYYY` code.
    pub async fn create(&self, year_code: &str) -> Result<AcademicYear> {
        let (start_year, end_year) = parse_year_code(year_code)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO academic_years (year_code, start_year, end_year) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(year_code)
        .bind(start_year)
        .bind(end_year)
        .fetch_one(self.pool)
        .await?;
        self.get_by_id(id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound("academic year".to_string()))
    }

    /// Get an academic year by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<AcademicYear>> {
        let year = sqlx::query_as::<_, AcademicYear>(
            "SELECT id, year_code, start_year, end_year, is_active, created_at
             FROM academic_years WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(year)
    }
}

/// Split `2024-2025` into its two years; the second must follow the first.
fn parse_year_code(code: &str) -> Result<(i64, i64)> {
    let invalid = || ArchiveError::Validation(format!("invalid academic year code: {code}"));
    let (start, end) = code.split_once('-').ok_or_else(invalid)?;
    let start: i64 = start.trim().parse().map_err(|_| invalid())?;
    let end: i64 = end.trim().parse().map_err(|_| invalid())?;
    if end != start + 1 {
        return Err(invalid());
    }
    Ok((start, end))
}

/// Repository for semesters.
pub struct SemesterRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SemesterRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a semester in an academic year.
    pub async fn create(&self, academic_year_id: i64, semester_type: SemesterType) -> Result<Semester> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO semesters (academic_year_id, semester_type) VALUES (?, ?) RETURNING id",
        )
        .bind(academic_year_id)
        .bind(semester_type.as_str())
        .fetch_one(self.pool)
        .await?;
        self.get_by_id(id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound("semester".to_string()))
    }

    /// Get a semester by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Semester>> {
        let semester = sqlx::query_as::<_, Semester>(
            "SELECT id, academic_year_id, semester_type, start_date, end_date
             FROM semesters WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(semester)
    }
}

const COURSE_COLUMNS: &str =
    "id, course_code, course_name, department_id, level, is_active, created_at";

/// Repository for courses.
pub struct CourseRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> CourseRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a course.
    pub async fn create(&self, course: &NewCourse) -> Result<Course> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO courses (course_code, course_name, department_id, level)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&course.course_code)
        .bind(&course.course_name)
        .bind(course.department_id)
        .bind(&course.level)
        .fetch_one(self.pool)
        .await?;
        self.get_by_id(id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound("course".to_string()))
    }

    /// Get a course by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Course>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?");
        let course = sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(course)
    }

    /// List the courses of a department.
    pub async fn list_by_department(&self, department_id: i64) -> Result<Vec<Course>> {
        let sql = format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE department_id = ? ORDER BY course_code"
        );
        let courses = sqlx::query_as::<_, Course>(&sql)
            .bind(department_id)
            .fetch_all(self.pool)
            .await?;
        Ok(courses)
    }

    /// Delete a course inside a caller-owned transaction.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

const ASSIGNMENT_COLUMNS: &str = "id, semester_id, course_id, professor_id, created_at";

/// Repository for course assignments.
pub struct CourseAssignmentRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> CourseAssignmentRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create an assignment, or return the existing one for the same triple.
    pub async fn create_or_get(
        &self,
        semester_id: i64,
        course_id: i64,
        professor_id: i64,
    ) -> Result<CourseAssignment> {
        sqlx::query(
            "INSERT INTO course_assignments (semester_id, course_id, professor_id)
             VALUES (?, ?, ?)
             ON CONFLICT (semester_id, course_id, professor_id) DO NOTHING",
        )
        .bind(semester_id)
        .bind(course_id)
        .bind(professor_id)
        .execute(self.pool)
        .await?;

        self.find(semester_id, course_id, professor_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound("course assignment".to_string()))
    }

    /// Find the assignment for an exact (semester, course, professor) triple.
    pub async fn find(
        &self,
        semester_id: i64,
        course_id: i64,
        professor_id: i64,
    ) -> Result<Option<CourseAssignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM course_assignments
             WHERE semester_id = ? AND course_id = ? AND professor_id = ?"
        );
        let assignment = sqlx::query_as::<_, CourseAssignment>(&sql)
            .bind(semester_id)
            .bind(course_id)
            .bind(professor_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(assignment)
    }

    /// List every assignment, oldest first.
    pub async fn list_all(&self) -> Result<Vec<CourseAssignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM course_assignments ORDER BY id");
        let assignments = sqlx::query_as::<_, CourseAssignment>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(assignments)
    }

    /// Assignments taught by a professor or attached to a course.
    pub async fn list_by_professor_or_course(
        &self,
        professor_id: Option<i64>,
        course_id: Option<i64>,
    ) -> Result<Vec<CourseAssignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM course_assignments
             WHERE professor_id = ? OR course_id = ? ORDER BY id"
        );
        let assignments = sqlx::query_as::<_, CourseAssignment>(&sql)
            .bind(professor_id)
            .bind(course_id)
            .fetch_all(self.pool)
            .await?;
        Ok(assignments)
    }

    /// Delete an assignment inside a caller-owned transaction.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM course_assignments WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, Role, UserRepository};
    use crate::Database;

    #[test]
    fn test_parse_year_code() {
        assert_eq!(parse_year_code("2024-2025").unwrap(), (2024, 2025));
        assert!(parse_year_code("2024").is_err());
        assert!(parse_year_code("2024-2026").is_err());
        assert!(parse_year_code("abcd-efgh").is_err());
    }

    #[tokio::test]
    async fn test_catalogue_round_trip() {
        let db = Database::open_in_memory().await.unwrap();
        let pool = db.pool();

        let dept = DepartmentRepository::new(pool)
            .create("Mathematics", Some("MATH"))
            .await
            .unwrap();
        let year = AcademicYearRepository::new(pool).create("2025-2026").await.unwrap();
        let semester = SemesterRepository::new(pool)
            .create(year.id, SemesterType::First)
            .await
            .unwrap();
        let course = CourseRepository::new(pool)
            .create(&NewCourse::new("MATH201", "Linear Algebra", dept.id).with_level("2"))
            .await
            .unwrap();

        assert_eq!(year.start_year, 2025);
        assert_eq!(semester.semester_type, SemesterType::First);
        assert_eq!(course.course_code, "MATH201");
        assert_eq!(
            CourseRepository::new(pool)
                .list_by_department(dept.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_assignment_create_or_get_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        let pool = db.pool();

        let dept = DepartmentRepository::new(pool).create("CS", None).await.unwrap();
        let year = AcademicYearRepository::new(pool).create("2024-2025").await.unwrap();
        let semester = SemesterRepository::new(pool)
            .create(year.id, SemesterType::Second)
            .await
            .unwrap();
        let course = CourseRepository::new(pool)
            .create(&NewCourse::new("CS101", "Intro", dept.id))
            .await
            .unwrap();
        let prof = UserRepository::new(pool)
            .create(&NewUser::new("p@uni.edu", "P", "P", Role::Professor).with_department(dept.id))
            .await
            .unwrap();

        let repo = CourseAssignmentRepository::new(pool);
        let first = repo.create_or_get(semester.id, course.id, prof.id).await.unwrap();
        let second = repo.create_or_get(semester.id, course.id, prof.id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
        assert_eq!(
            repo.list_by_professor_or_course(Some(prof.id), None)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
