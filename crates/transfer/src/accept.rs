/// MIME acceptance filter over `type/*` wildcard or exact patterns.
///
/// An empty pattern list accepts everything.
#[derive(Debug, Clone, Default)]
pub struct TypeFilter {
    patterns: Vec<String>,
}

impl TypeFilter {
    /// Builds a filter from MIME patterns like `image/*` or `video/mp4`.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `content_type` matches any pattern.
    pub fn matches(&self, content_type: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns.iter().any(|pattern| {
            if let Some(base) = pattern.strip_suffix("/*") {
                content_type
                    .strip_prefix(base)
                    .is_some_and(|rest| rest.starts_with('/'))
            } else {
                content_type == pattern
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_base_type() {
        let filter = TypeFilter::new(["image/*"]);
        assert!(filter.matches("image/png"));
        assert!(filter.matches("image/jpeg"));
        assert!(!filter.matches("video/mp4"));
    }

    #[test]
    fn exact_pattern_matches_exactly() {
        let filter = TypeFilter::new(["video/mp4"]);
        assert!(filter.matches("video/mp4"));
        assert!(!filter.matches("video/webm"));
    }

    #[test]
    fn mixed_patterns() {
        let filter = TypeFilter::new(["image/*", "application/pdf"]);
        assert!(filter.matches("image/gif"));
        assert!(filter.matches("application/pdf"));
        assert!(!filter.matches("application/zip"));
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = TypeFilter::default();
        assert!(filter.matches("anything/at-all"));
        assert!(filter.matches(""));
    }

    #[test]
    fn wildcard_requires_full_base_type() {
        // `image/*` must not match `imagex/png` or a bare `image`.
        let filter = TypeFilter::new(["image/*"]);
        assert!(!filter.matches("imagex/png"));
        assert!(!filter.matches("image"));
    }

    #[test]
    fn unknown_content_type_rejected_by_nonempty_filter() {
        let filter = TypeFilter::new(["image/*"]);
        assert!(!filter.matches(""));
    }
}
