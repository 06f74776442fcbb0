//! Canonical folder paths.
//!
//! A folder path is the single key shared by the metadata store and the
//! disk mirror:
//!
//! ```text
//! <yearCode>/<semester>/<professorExternalId>/<courseCode - courseName>/<subfolder>
//! ```
//!
//! Segments are joined with `/`, never start or end with it, and are
//! sanitized so that no segment can introduce a separator or a reserved
//! filesystem character. Parentage is derived from strict prefixes.

use serde::Serialize;

use crate::academic::SemesterType;

/// Path separator.
pub const SEPARATOR: char = '/';

/// Characters that may not appear inside a path segment.
const RESERVED: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replace reserved and control characters with `_` and trim whitespace.
///
/// Never returns an empty string, so a sanitized segment always occupies
/// exactly one level of the tree.
pub fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .trim()
        .chars()
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    match cleaned.as_str() {
        "" => "_".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}

/// Display segment of a course folder: `CODE - Name`.
pub fn course_segment(course_code: &str, course_name: &str) -> String {
    format!("{} - {}", course_code.trim(), course_name.trim())
}

/// Build a canonical path.
///
/// `course` is the course segment (see [`course_segment`]); `subfolder` is
/// one of the standard subfolder names. Segments that are `None` are
/// omitted, so the same function yields professor-root, course and
/// subfolder paths.
///
/// ```
/// use course_archive::academic::SemesterType;
/// use course_archive::file::path::build_path;
///
/// let p = build_path("2024-2025", SemesterType::First, "PROF007", Some("CS101 - Intro"), None);
/// assert_eq!(p, "2024-2025/first/PROF007/CS101 - Intro");
/// ```
pub fn build_path(
    year_code: &str,
    semester: SemesterType,
    professor_external_id: &str,
    course: Option<&str>,
    subfolder: Option<&str>,
) -> String {
    let mut segments = vec![
        sanitize_segment(year_code),
        semester.path_segment().to_string(),
        sanitize_segment(professor_external_id),
    ];
    if let Some(course) = course {
        segments.push(sanitize_segment(course));
        if let Some(subfolder) = subfolder {
            segments.push(sanitize_segment(subfolder));
        }
    }
    segments.join("/")
}

/// Append one child segment to an existing canonical path.
pub fn join(parent: &str, child: &str) -> String {
    let parent = normalize(parent);
    let child = sanitize_segment(child);
    if parent.is_empty() {
        child
    } else {
        format!("{parent}/{child}")
    }
}

/// Trim surrounding separators and collapse empty segments.
pub fn normalize(path: &str) -> String {
    path.split(SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Number of segments in a path.
pub fn depth(path: &str) -> usize {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).count()
}

/// Parent path, or `None` for a single-segment path.
pub fn parent(path: &str) -> Option<&str> {
    let path = path.trim_matches(SEPARATOR);
    path.rfind(SEPARATOR).map(|idx| &path[..idx])
}

/// Last segment of a path.
pub fn last_segment(path: &str) -> &str {
    let path = path.trim_matches(SEPARATOR);
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Whether `prefix` is a strict ancestor of `path`.
///
/// Compares whole segments, so `a/b` is not a prefix of `a/bc`.
pub fn is_strict_prefix(prefix: &str, path: &str) -> bool {
    let prefix = prefix.trim_matches(SEPARATOR);
    let path = path.trim_matches(SEPARATOR);
    !prefix.is_empty()
        && path.len() > prefix.len()
        && path.starts_with(prefix)
        && path.as_bytes()[prefix.len()] == b'/'
}

/// One entry in a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    /// Segment label.
    pub label: String,
    /// Full path up to and including this segment.
    pub path: String,
}

/// Decompose a path into its ordered prefixes. No access check.
///
/// An empty path yields an empty trail.
pub fn breadcrumbs(path: &str) -> Vec<Breadcrumb> {
    let mut trail = Vec::new();
    let mut current = String::new();
    for segment in path.split(SEPARATOR).map(str::trim).filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push(SEPARATOR);
        }
        current.push_str(segment);
        trail.push(Breadcrumb {
            label: segment.to_string(),
            path: current.clone(),
        });
    }
    trail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_course_path() {
        let p = build_path(
            "2024-2025",
            SemesterType::First,
            "PROF007",
            Some(&course_segment("CS101", "Intro")),
            None,
        );
        assert_eq!(p, "2024-2025/first/PROF007/CS101 - Intro");
    }

    #[test]
    fn test_build_path_is_deterministic() {
        let a = build_path("2025-2026", SemesterType::Summer, "P1", Some("X - Y"), Some("Exams"));
        let _ = build_path("2025-2026", SemesterType::First, "P2", None, None);
        let b = build_path("2025-2026", SemesterType::Summer, "P1", Some("X - Y"), Some("Exams"));
        assert_eq!(a, b);
        assert_eq!(a, "2025-2026/summer/P1/X - Y/Exams");
    }

    #[test]
    fn test_build_root_path() {
        assert_eq!(
            build_path("2024-2025", SemesterType::Second, "PROF010", None, None),
            "2024-2025/second/PROF010"
        );
    }

    #[test]
    fn test_subfolder_requires_course() {
        assert_eq!(
            build_path("2024-2025", SemesterType::First, "P", None, Some("Exams")),
            "2024-2025/first/P"
        );
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("CS/101: Intro?"), "CS_101_ Intro_");
        assert_eq!(sanitize_segment("a\\b*c\"d<e>f|g"), "a_b_c_d_e_f_g");
        assert_eq!(sanitize_segment("  spaced  "), "spaced");
        assert_eq!(sanitize_segment(""), "_");
        assert_eq!(sanitize_segment(".."), "__");
        assert_eq!(sanitize_segment("tab\there"), "tab_here");
    }

    #[test]
    fn test_course_name_with_slash_stays_one_segment() {
        let p = build_path(
            "2024-2025",
            SemesterType::First,
            "P",
            Some(&course_segment("EE200", "Signals/Systems")),
            None,
        );
        assert_eq!(depth(&p), 4);
        assert_eq!(last_segment(&p), "EE200 - Signals_Systems");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a//b/c/"), "a/b/c");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("///"), "");
    }

    #[test]
    fn test_depth_parent_last_segment() {
        let p = "2024-2025/first/P/C - N/Exams";
        assert_eq!(depth(p), 5);
        assert_eq!(parent(p), Some("2024-2025/first/P/C - N"));
        assert_eq!(parent("2024-2025"), None);
        assert_eq!(last_segment(p), "Exams");
        assert_eq!(depth(""), 0);
    }

    #[test]
    fn test_is_strict_prefix() {
        assert!(is_strict_prefix("a/b", "a/b/c"));
        assert!(!is_strict_prefix("a/b", "a/b"));
        assert!(!is_strict_prefix("a/b", "a/bc"));
        assert!(!is_strict_prefix("", "a"));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("a/b", "Course Notes"), "a/b/Course Notes");
        assert_eq!(join("", "x"), "x");
    }

    #[test]
    fn test_breadcrumbs() {
        let trail = breadcrumbs("2024-2025/first/PROF007");
        assert_eq!(
            trail,
            vec![
                Breadcrumb {
                    label: "2024-2025".to_string(),
                    path: "2024-2025".to_string()
                },
                Breadcrumb {
                    label: "first".to_string(),
                    path: "2024-2025/first".to_string()
                },
                Breadcrumb {
                    label: "PROF007".to_string(),
                    path: "2024-2025/first/PROF007".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_breadcrumbs_empty_and_noisy() {
        assert!(breadcrumbs("").is_empty());
        assert!(breadcrumbs("/").is_empty());
        assert_eq!(breadcrumbs("/a//b/").len(), 2);
    }
}
