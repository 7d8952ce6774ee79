use crate::error::PathMapError;

/// Maps paths under `source_root` to the same relative position under
/// `dest_root`. The source prefix is replaced once, structurally: segment
/// boundaries are respected and later occurrences are left alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathMapping {
    source_root: String,
    dest_root: String,
}

impl PathMapping {
    pub fn new(source_root: &str, dest_root: &str) -> Self {
        Self { source_root: trim_slashes(source_root), dest_root: trim_slashes(dest_root) }
    }

    pub fn map(&self, path: &str) -> Result<String, PathMapError> {
        let path = trim_slashes(path);
        let rest = if self.source_root.is_empty() {
            Some(path.as_str())
        } else if path == self.source_root {
            Some("")
        } else {
            path.strip_prefix(&self.source_root).and_then(|r| r.strip_prefix('/'))
        };
        match rest {
            Some("") => Ok(self.dest_root.clone()),
            Some(r) => Ok(join(&self.dest_root, r)),
            None => Err(PathMapError::OutsideSource {
                path,
                root: self.source_root.clone(),
            }),
        }
    }
}

/// Join two repository paths with a single `/`; an empty side is dropped.
pub fn join(a: &str, b: &str) -> String {
    let (a, b) = (a.trim_end_matches('/'), b.trim_start_matches('/'));
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a}/{b}"),
    }
}

fn trim_slashes(p: &str) -> String {
    p.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_destination_under_source() {
        let m = PathMapping::new("A", "A/Target");
        assert_eq!(m.map("A/B/c.txt").unwrap(), "A/Target/B/c.txt");
        let m = PathMapping::new("A", "A/October_2025");
        assert_eq!(m.map("A/B/x.txt").unwrap(), "A/October_2025/B/x.txt");
    }

    #[test]
    fn only_the_leading_segment_is_replaced() {
        let m = PathMapping::new("reports", "October_2025/reports");
        assert_eq!(
            m.map("reports/q3/reports/summary.md").unwrap(),
            "October_2025/reports/q3/reports/summary.md"
        );
    }

    #[test]
    fn source_root_maps_to_dest_root() {
        let m = PathMapping::new("docs/", "out");
        assert_eq!(m.map("docs").unwrap(), "out");
    }

    #[test]
    fn empty_source_is_repository_root() {
        let m = PathMapping::new("", "October_2025");
        assert_eq!(m.map("README.md").unwrap(), "October_2025/README.md");
        assert_eq!(m.map("a/b.txt").unwrap(), "October_2025/a/b.txt");
    }

    #[test]
    fn prefix_must_end_on_a_segment_boundary() {
        let m = PathMapping::new("rep", "x");
        assert_eq!(
            m.map("reports/a.md"),
            Err(PathMapError::OutsideSource { path: "reports/a.md".into(), root: "rep".into() })
        );
    }

    #[test]
    fn join_handles_empty_sides() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a/", ""), "a");
        assert_eq!(join("a/", "/b"), "a/b");
    }
}
