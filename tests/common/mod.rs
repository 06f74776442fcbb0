//! Shared helpers for the HTTP integration tests.
//!
//! Every test gets an in-memory database, a temporary storage root and a
//! router wired exactly as the server wires it. Tokens are minted locally
//! with the same secret the router verifies with.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use tempfile::TempDir;

use course_archive::academic::{
    AcademicService, AcademicYear, AcademicYearRepository, Course, CourseRepository,
    DepartmentRepository, NewCourse, Semester, SemesterRepository, SemesterType,
};
use course_archive::config::StorageConfig;
use course_archive::file::{FileStorage, Folder, UploadLimits};
use course_archive::web::{create_router, AppState, JwtClaims, JwtState};
use course_archive::{Database, NewUser, Role, User, UserRepository};

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// Router under test plus direct access to its stores.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub storage: FileStorage,
    _temp: TempDir,
    pub department_id: i64,
    pub year: AcademicYear,
    pub semester: Semester,
}

impl TestApp {
    /// App seeded with the "Computer Science" department and the first
    /// semester of 2024-2025.
    pub async fn new() -> Self {
        Self::with_storage_config(StorageConfig::default()).await
    }

    pub async fn with_storage_config(config: StorageConfig) -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let temp = TempDir::new().expect("Failed to create temp dir");
        let storage =
            FileStorage::new(temp.path().join("uploads")).expect("Failed to create storage");

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

        let app_state = Arc::new(AppState::new(
            db.clone(),
            storage.clone(),
            UploadLimits::from_config(&config),
        ));
        let jwt_state = Arc::new(JwtState::new(JWT_SECRET));
        let router = create_router(app_state, jwt_state, &[]);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            db,
            storage,
            _temp: temp,
            department_id: department.id,
            year,
            semester,
        }
    }

    pub async fn department(&self, name: &str) -> i64 {
        DepartmentRepository::new(self.db.pool())
            .create(name, None)
            .await
            .unwrap()
            .id
    }

    /// Professor in the seeded department.
    pub async fn professor(&self, external_id: &str, first_name: &str) -> User {
        self.professor_in(self.department_id, external_id, first_name)
            .await
    }

    pub async fn professor_in(&self, department_id: i64, external_id: &str, first_name: &str) -> User {
        UserRepository::new(self.db.pool())
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

    pub async fn staff(&self, email: &str, role: Role, department_id: Option<i64>) -> User {
        let mut new_user = NewUser::new(email, "Staff", "Member", role);
        if let Some(id) = department_id {
            new_user = new_user.with_department(id);
        }
        UserRepository::new(self.db.pool())
            .create(&new_user)
            .await
            .unwrap()
    }

    pub async fn course(&self, code: &str, name: &str) -> Course {
        CourseRepository::new(self.db.pool())
            .create(&NewCourse::new(code, name, self.department_id))
            .await
            .unwrap()
    }

    /// Assign and provision; returns the course folder first, then the
    /// subfolders in the order Syllabus, Exams, Course Notes, Assignments.
    pub async fn assign(&self, professor: &User, course: &Course) -> Vec<Folder> {
        AcademicService::new(self.db.pool(), &self.storage)
            .assign_course(professor.id, course.id, self.semester.id)
            .await
            .unwrap()
            .folders
    }
}

/// Signed bearer token for a user, valid for an hour.
pub fn token_for(user: &User) -> String {
    let claims = JwtClaims {
        sub: user.id,
        role: format!("ROLE_{}", user.role.as_str().to_uppercase()),
        department_id: user.department_id,
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// `Authorization` header value for a user.
pub fn bearer(user: &User) -> String {
    format!("Bearer {}", token_for(user))
}
