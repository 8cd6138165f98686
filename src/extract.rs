//! Request path extraction from access-log lines.
//!
//! Only one pattern is recognised: the path sits between `"GET ` and the
//! following ` HTTP/`. Everything else on the line is ignored.

const START_MARKER: &str = "\"GET ";
const END_MARKER: &str = " HTTP/";

/// Returns the request path of a replayable GET line, or `None`.
///
/// The start marker may sit anywhere on the line, including position 0. The
/// end marker is searched for after the start marker, and an empty path is
/// not replayable.
pub fn extract_path(line: &str) -> Option<&str> {
    let start = line.find(START_MARKER)? + START_MARKER.len();
    let end = start + line[start..].find(END_MARKER)?;
    let path = &line[start..end];
    (!path.is_empty()).then_some(path)
}

/// Substrings that exclude a request path from replay.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<String>,
}

impl FilterSet {
    pub fn new<I, S>(filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filters: filters
                .into_iter()
                .map(Into::into)
                .filter(|f: &String| !f.is_empty())
                .collect(),
        }
    }

    /// A filter matches wherever it occurs in the path, including index 0.
    pub fn excludes(&self, path: &str) -> bool {
        self.filters.iter().any(|f| path.contains(f.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDecision<'a> {
    /// The line carries a path that should be requested.
    Replay(&'a str),
    /// The path matched a filter.
    Filtered(&'a str),
    /// No GET request could be found on the line.
    Skipped,
}

/// Runs extraction and filtering for one line.
pub fn classify<'a>(line: &'a str, filters: &FilterSet) -> LineDecision<'a> {
    match extract_path(line) {
        Some(path) if filters.excludes(path) => LineDecision::Filtered(path),
        Some(path) => LineDecision::Replay(path),
        None => LineDecision::Skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMBINED: &str = r#"10.0.0.1 - - [10/Oct/2023:13:55:36 +0000] "GET /products/42?ref=home HTTP/1.1" 200 2326 "-" "Mozilla/5.0""#;

    #[test]
    fn extracts_path_from_combined_log_line() {
        assert_eq!(extract_path(COMBINED), Some("/products/42?ref=home"));
    }

    #[test]
    fn extraction_is_stable() {
        assert_eq!(extract_path(COMBINED), extract_path(COMBINED));
        assert_eq!(extract_path("garbage"), extract_path("garbage"));
    }

    #[test]
    fn start_marker_at_line_start_is_accepted() {
        assert_eq!(extract_path(r#""GET /x HTTP/1.1""#), Some("/x"));
    }

    #[test]
    fn missing_markers_yield_nothing() {
        assert_eq!(extract_path(r#"1.2.3.4 "POST /form HTTP/1.1" 200"#), None);
        assert_eq!(extract_path(r#"1.2.3.4 "GET /form" 200"#), None);
        assert_eq!(extract_path(""), None);
    }

    #[test]
    fn end_marker_before_start_marker_is_ignored() {
        let line = r#"proxy HTTP/1.0 said "GET /later HTTP/2.0" 200"#;
        assert_eq!(extract_path(line), Some("/later"));

        let reversed = r#"x HTTP/1.1 then "GET /never"#;
        assert_eq!(extract_path(reversed), None);
    }

    #[test]
    fn empty_path_is_not_replayable() {
        assert_eq!(extract_path(r#"x "GET  HTTP/1.1" 200"#), None);
    }

    #[test]
    fn filters_match_anywhere_in_path() {
        let filters = FilterSet::new(["/admin", ".png"]);
        assert!(filters.excludes("/admin/panel"));
        assert!(filters.excludes("/static/logo.png"));
        assert!(filters.excludes("/en/admin"));
        assert!(!filters.excludes("/products"));
    }

    #[test]
    fn empty_filters_are_dropped() {
        let filters = FilterSet::new(["", "/a"]);
        assert_eq!(filters.len(), 1);
        assert!(!filters.excludes("/b"));
        assert!(FilterSet::new([""]).is_empty());
    }

    #[test]
    fn classify_covers_all_outcomes() {
        let filters = FilterSet::new(["/admin"]);
        assert_eq!(
            classify(r#"a "GET /admin/panel HTTP/1.1""#, &filters),
            LineDecision::Filtered("/admin/panel")
        );
        assert_eq!(
            classify(r#"a "GET /x HTTP/1.1""#, &filters),
            LineDecision::Replay("/x")
        );
        assert_eq!(classify("not a request", &filters), LineDecision::Skipped);
    }
}
