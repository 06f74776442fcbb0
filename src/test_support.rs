//! Shared fixtures for unit tests.

use tempfile::TempDir;

use crate::academic::{
    AcademicYear, AcademicYearRepository, Course, CourseAssignment, CourseAssignmentRepository,
    CourseRepository, DepartmentRepository, NewCourse, Semester, SemesterRepository, SemesterType,
};
use crate::db::{DbPool, NewUser, Role, User, UserRepository};
use crate::file::{FileStorage, Folder, FolderProvisioner, Principal};
use crate::Database;

/// In-memory database plus a temporary storage root, seeded with one
/// department, academic year `2024-2025` and its first semester.
pub(crate) struct Fixture {
    db: Database,
    storage: FileStorage,
    _temp: TempDir,
    pub department_id: i64,
    pub year: AcademicYear,
    pub semester: Semester,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::open_in_memory().await.unwrap();
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path().join("uploads")).unwrap();

        let pool = db.pool();
        let department = DepartmentRepository::new(pool)
            .create("Computer Science", Some("CS"))
            .await
            .unwrap();
        let year = AcademicYearRepository::new(pool).create("2024-2025").await.unwrap();
        let semester = SemesterRepository::new(pool)
            .create(year.id, SemesterType::First)
            .await
            .unwrap();

        Self {
            db,
            storage,
            _temp: temp,
            department_id: department.id,
            year,
            semester,
        }
    }

    pub fn pool(&self) -> &DbPool {
        self.db.pool()
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    pub fn provisioner(&self) -> FolderProvisioner<'_> {
        FolderProvisioner::new(self.pool(), &self.storage)
    }

    pub async fn department(&self, name: &str) -> i64 {
        DepartmentRepository::new(self.pool())
            .create(name, None)
            .await
            .unwrap()
            .id
    }

    /// Professor in the seeded department.
    pub async fn professor(&self, external_id: &str, first_name: &str) -> User {
        self.professor_in(self.department_id, external_id, first_name).await
    }

    pub async fn professor_in(&self, department_id: i64, external_id: &str, first_name: &str) -> User {
        UserRepository::new(self.pool())
            .create(
                &NewUser::new(
                    format!("{}@uni.edu", external_id.to_lowercase()),
                    first_name,
                    "Tester",
                    Role::Professor,
                )
                .with_department(department_id)
                .with_professor_id(external_id),
            )
            .await
            .unwrap()
    }

    /// Non-professor account.
    pub async fn user(&self, email: &str, role: Role, department_id: Option<i64>) -> User {
        let mut new_user = NewUser::new(email, "Staff", "Member", role);
        if let Some(id) = department_id {
            new_user = new_user.with_department(id);
        }
        UserRepository::new(self.pool()).create(&new_user).await.unwrap()
    }

    /// Course in the seeded department.
    pub async fn course(&self, code: &str, name: &str) -> Course {
        CourseRepository::new(self.pool())
            .create(&NewCourse::new(code, name, self.department_id))
            .await
            .unwrap()
    }

    pub async fn assign(&self, professor: &User, course: &Course) -> CourseAssignment {
        CourseAssignmentRepository::new(self.pool())
            .create_or_get(self.semester.id, course.id, professor.id)
            .await
            .unwrap()
    }

    /// Course folder plus its four subfolders, course folder first.
    pub async fn provision_course(&self, professor: &User, course: &Course) -> Vec<Folder> {
        self.provisioner()
            .create_course_folder_structure(professor.id, course.id, self.year.id, self.semester.id)
            .await
            .unwrap()
    }

    pub fn principal(user: &User) -> Principal {
        Principal::new(user.id, user.role, user.department_id)
    }
}
