//! Paths that bypass tenant routing entirely (API routes, build assets,
//! favicon, PWA manifest and icons).

/// Prefixes skipped by default.
pub const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &[
    "/api",
    "/_next",
    "/_static",
    "/_vercel",
    "/favicon.ico",
    "/manifest.json",
    "/manifest.webmanifest",
    "/icons",
    "/sw.js",
];

/// Ordered set of path prefixes checked before any tenant lookup.
///
/// Prefixes match on segment boundaries: `/api` excludes `/api` and
/// `/api/orders` but not `/apiary`. With `exclude_file_assets`, a single
/// top-level `name.ext` segment (`/logo.png`, `/robots.txt`) is excluded as
/// well; deeper paths such as `/store/products/sku-v1.2` are never treated as
/// assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionList {
    prefixes: Vec<String>,
    exclude_file_assets: bool,
}

impl ExclusionList {
    pub fn new<I, S>(prefixes: I, exclude_file_assets: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for prefix in prefixes {
            let prefix = prefix.as_ref().trim();
            if prefix.is_empty() {
                continue;
            }
            let prefix = if prefix.starts_with('/') {
                prefix.to_string()
            } else {
                format!("/{}", prefix)
            };
            if !normalized.contains(&prefix) {
                normalized.push(prefix);
            }
        }

        Self {
            prefixes: normalized,
            exclude_file_assets,
        }
    }

    /// Nothing excluded.
    pub fn none() -> Self {
        Self::new(Vec::<String>::new(), false)
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn excludes_file_assets(&self) -> bool {
        self.exclude_file_assets
    }

    /// Returns the rule that excludes `path`, if any.
    pub fn matching_rule<'a>(&'a self, path: &str) -> Option<&'a str> {
        if let Some(prefix) = self.prefixes.iter().find(|p| prefix_matches(p, path)) {
            return Some(prefix.as_str());
        }
        if self.exclude_file_assets && is_file_asset(path) {
            return Some("<file asset>");
        }
        None
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.matching_rule(path).is_some()
    }
}

impl Default for ExclusionList {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_PREFIXES.iter().copied(), true)
    }
}

/// Prefix matching respecting segment boundaries.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if path == prefix {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => prefix.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// Path is exactly one segment shaped like `name.ext` (`[\w-]+\.\w+`).
fn is_file_asset(path: &str) -> bool {
    let Some(segment) = path.strip_prefix('/') else {
        return false;
    };
    if segment.contains('/') {
        return false;
    }
    match segment.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && !ext.is_empty()
                && stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list_excludes_platform_paths() {
        let list = ExclusionList::default();
        assert!(list.is_excluded("/api/anything"));
        assert!(list.is_excluded("/api"));
        assert!(list.is_excluded("/_next/static/x.js"));
        assert!(list.is_excluded("/favicon.ico"));
        assert!(list.is_excluded("/manifest.json"));
        assert!(list.is_excluded("/icons/icon-192.png"));
    }

    #[test]
    fn storefront_paths_are_not_excluded() {
        let list = ExclusionList::default();
        assert!(!list.is_excluded("/"));
        assert!(!list.is_excluded("/products/42"));
        assert!(!list.is_excluded("/store/products/123"));
        assert!(!list.is_excluded("/apiary"));
    }

    #[test]
    fn file_asset_rule_is_optional() {
        let with = ExclusionList::new(["/api"], true);
        let without = ExclusionList::new(["/api"], false);

        assert_eq!(with.matching_rule("/logo.png"), Some("<file asset>"));
        assert!(with.is_excluded("/robots.txt"));
        assert!(!without.is_excluded("/logo.png"));
        assert!(!with.is_excluded("/products/v1.2-beta/"));
        assert!(!with.is_excluded("/.well-known"));
    }

    #[test]
    fn nested_dotted_segments_are_not_assets() {
        let list = ExclusionList::default();
        assert!(!list.is_excluded("/store/products/sku-v1.2"));
        assert!(!list.is_excluded("/products/shirt.blue"));
        assert!(!list.is_excluded("/images/logo.png"));
    }

    #[test]
    fn first_matching_prefix_wins() {
        let list = ExclusionList::new(["/api", "/api/internal"], false);
        assert_eq!(list.matching_rule("/api/internal/x"), Some("/api"));
    }

    #[test]
    fn prefixes_are_normalized_and_deduplicated() {
        let list = ExclusionList::new(["api", " /api ", "", "/assets/"], false);
        assert_eq!(list.prefixes(), &["/api".to_string(), "/assets/".to_string()]);
        assert!(list.is_excluded("/assets/app.css"));
    }

    #[test]
    fn empty_list_excludes_nothing() {
        assert!(!ExclusionList::none().is_excluded("/api/x"));
    }
}
