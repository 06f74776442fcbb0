//! Request DTOs for Web API.

use serde::Deserialize;

/// Query of `GET /file-explorer/root`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootQuery {
    pub academic_year_id: i64,
    pub semester_id: i64,
}

/// Query carrying a folder path.
#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

/// Body of `POST /admin/course-assignments`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignCourseRequest {
    pub professor_id: i64,
    pub course_id: i64,
    pub semester_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_query_uses_camel_case() {
        let q: RootQuery =
            serde_json::from_str(r#"{"academicYearId":1,"semesterId":2}"#).unwrap();
        assert_eq!(q.academic_year_id, 1);
        assert_eq!(q.semester_id, 2);
    }

    #[test]
    fn test_assign_course_request() {
        let r: AssignCourseRequest =
            serde_json::from_str(r#"{"professorId":4,"courseId":5,"semesterId":6}"#).unwrap();
        assert_eq!((r.professor_id, r.course_id, r.semester_id), (4, 5, 6));
    }
}
