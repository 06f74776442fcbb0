//! Database schema and migrations.
//!
//! Migrations are applied sequentially when the database is opened. Foreign
//! keys are enforced but never cascade: dependent rows are removed in an
//! explicit order by the cascade deleter so that disk content can be
//! cleaned up alongside.

/// Database migrations.
///
/// Each entry is a SQL script; the `schema_version` table records which
/// ones have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: organisation and people
    r#"
CREATE TABLE departments (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    shortcut    TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    email           TEXT NOT NULL UNIQUE,
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    role            TEXT NOT NULL,            -- 'admin', 'deanship', 'hod', 'professor'
    department_id   INTEGER REFERENCES departments(id),
    professor_id    TEXT UNIQUE,              -- external id embedded in folder paths
    is_active       INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_users_department ON users(department_id);
CREATE INDEX idx_users_role ON users(role);

CREATE TABLE refresh_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    token       TEXT NOT NULL UNIQUE,
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    revoked_at  TEXT
);

CREATE INDEX idx_refresh_tokens_user ON refresh_tokens(user_id);
"#,
    // v2: academic calendar and catalogue
    r#"
CREATE TABLE academic_years (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    year_code   TEXT NOT NULL UNIQUE,        -- e.g. '2024-2025'
    start_year  INTEGER NOT NULL,
    end_year    INTEGER NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE semesters (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    academic_year_id    INTEGER NOT NULL REFERENCES academic_years(id),
    semester_type       TEXT NOT NULL,       -- 'FIRST', 'SECOND', 'SUMMER'
    start_date          TEXT,
    end_date            TEXT,
    UNIQUE (academic_year_id, semester_type)
);

CREATE TABLE courses (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    course_code     TEXT NOT NULL UNIQUE,
    course_name     TEXT NOT NULL,
    department_id   INTEGER NOT NULL REFERENCES departments(id),
    level           TEXT,
    is_active       INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_courses_department ON courses(department_id);

CREATE TABLE course_assignments (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    semester_id     INTEGER NOT NULL REFERENCES semesters(id),
    course_id       INTEGER NOT NULL REFERENCES courses(id),
    professor_id    INTEGER NOT NULL REFERENCES users(id),
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (semester_id, course_id, professor_id)
);

CREATE INDEX idx_course_assignments_professor ON course_assignments(professor_id);
CREATE INDEX idx_course_assignments_course ON course_assignments(course_id);

CREATE TABLE document_requirements (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    course_id           INTEGER NOT NULL REFERENCES courses(id),
    document_type       TEXT NOT NULL,       -- 'SYLLABUS', 'EXAM', 'COURSE_NOTES', 'ASSIGNMENT'
    allowed_extensions  TEXT NOT NULL,       -- comma separated, lowercase
    max_file_count      INTEGER NOT NULL,
    max_total_size_mb   INTEGER NOT NULL,
    deadline            TEXT,
    is_required         INTEGER NOT NULL DEFAULT 1,
    UNIQUE (course_id, document_type)
);
"#,
    // v3: folder tree and submissions
    r#"
CREATE TABLE folders (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    path                TEXT NOT NULL,
    name                TEXT NOT NULL,
    folder_type         TEXT NOT NULL,       -- 'PROFESSOR_ROOT', 'COURSE', 'SUBFOLDER'
    owner_id            INTEGER REFERENCES users(id),
    academic_year_id    INTEGER NOT NULL REFERENCES academic_years(id),
    semester_id         INTEGER NOT NULL REFERENCES semesters(id),
    course_id           INTEGER REFERENCES courses(id),
    created_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX idx_folders_path ON folders(path);
CREATE INDEX idx_folders_owner ON folders(owner_id);
CREATE INDEX idx_folders_scope ON folders(academic_year_id, semester_id);

CREATE TABLE document_submissions (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    course_assignment_id    INTEGER NOT NULL REFERENCES course_assignments(id),
    document_type           TEXT NOT NULL,
    professor_id            INTEGER NOT NULL REFERENCES users(id),
    status                  TEXT NOT NULL DEFAULT 'NOT_UPLOADED',
    file_count              INTEGER NOT NULL DEFAULT 0,
    total_file_size         INTEGER NOT NULL DEFAULT 0,
    notes                   TEXT,
    submitted_at            TEXT,
    created_at              TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at              TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (course_assignment_id, document_type)
);

CREATE INDEX idx_submissions_professor ON document_submissions(professor_id);

CREATE TABLE uploaded_files (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    submission_id       INTEGER NOT NULL REFERENCES document_submissions(id),
    folder_id           INTEGER NOT NULL REFERENCES folders(id),
    file_url            TEXT NOT NULL,
    original_filename   TEXT NOT NULL,
    stored_filename     TEXT NOT NULL,
    file_size           INTEGER NOT NULL,
    mime_type           TEXT NOT NULL,
    file_order          INTEGER NOT NULL DEFAULT 0,
    notes               TEXT,
    uploader_id         INTEGER NOT NULL REFERENCES users(id),
    created_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_uploaded_files_submission ON uploaded_files(submission_id);
CREATE INDEX idx_uploaded_files_folder ON uploaded_files(folder_id);
CREATE INDEX idx_uploaded_files_uploader ON uploaded_files(uploader_id);
"#,
];
