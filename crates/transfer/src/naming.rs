/// Derives a URL/filesystem-safe destination name from a filename.
///
/// Strips the extension, lowercases, and collapses every run of
/// non-alphanumeric characters into a single `-`.
pub fn default_slug(filename: &str) -> String {
    let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);

    let mut slug = String::with_capacity(stem.len());
    let mut pending_dash = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_dashes() {
        assert_eq!(default_slug("My Holiday Photo.JPG"), "my-holiday-photo");
    }

    #[test]
    fn collapses_symbol_runs() {
        assert_eq!(default_slug("a__b -- c.png"), "a-b-c");
    }

    #[test]
    fn strips_only_last_extension() {
        assert_eq!(default_slug("archive.tar.gz"), "archive-tar");
    }

    #[test]
    fn no_extension() {
        assert_eq!(default_slug("README"), "readme");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(default_slug("--cover--.png"), "cover");
    }

    #[test]
    fn non_ascii_becomes_separator() {
        assert_eq!(default_slug("café menu.pdf"), "caf-menu");
    }
}
