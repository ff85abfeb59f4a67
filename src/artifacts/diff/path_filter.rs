use std::collections::HashMap;
use std::hash::Hash;

/// Restricts a tree comparison to a set of paths
///
/// A filter path names a file or a whole directory. The filter descends with
/// the comparison, one tree level per `subfilter` call, so subtrees outside
/// the filter are never loaded.
#[derive(Debug, Clone)]
pub struct PathFilter {
    path_trie: Trie<String>,
    root_path: String,
}

impl PathFilter {
    /// A filter that lets every path through
    pub fn everything() -> Self {
        Self {
            path_trie: Trie::with_matching(true),
            root_path: String::new(),
        }
    }

    /// Filter on repository paths (`src/main.rs`, `docs`); no paths means no
    /// restriction
    pub fn new<S: AsRef<str>>(paths: &[S]) -> Self {
        let components_of = |path: &str| {
            path.split('/')
                .filter(|component| !component.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        if paths.is_empty() {
            return Self::everything();
        }

        let mut trie = Trie::new();
        for path in paths {
            trie.insert(&components_of(path.as_ref()));
        }

        Self {
            path_trie: trie,
            root_path: String::new(),
        }
    }

    /// Path of the tree this filter applies to, relative to the root
    pub fn path(&self) -> &str {
        &self.root_path
    }

    /// Whether the entry `name` at this level is (or may contain) a selected path
    pub fn matches(&self, name: &str) -> bool {
        self.path_trie.contains_single(&name.to_string())
    }

    /// Keep the `(name, entry)` pairs whose name matches; names that are not
    /// UTF-8 are matched by their lossy decoding
    pub fn filter_matching_entries<'e, Name, Entry>(
        &self,
        entries: impl Iterator<Item = (&'e Name, &'e Entry)>,
    ) -> impl Iterator<Item = (&'e Name, &'e Entry)>
    where
        Name: AsRef<[u8]> + ?Sized + 'e,
        Entry: 'e,
    {
        entries.filter(move |(name, _)| self.matches(&String::from_utf8_lossy(name.as_ref())))
    }

    /// The filter for the subtree `name`
    pub fn subfilter(&self, name: &str) -> Self {
        Self {
            path_trie: if self.path_trie.is_matching {
                self.path_trie.clone()
            } else {
                self.path_trie
                    .children
                    .get(name)
                    .cloned()
                    .unwrap_or_else(Trie::new)
            },
            root_path: if self.root_path.is_empty() {
                name.to_string()
            } else {
                format!("{}/{name}", self.root_path)
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trie<T: Hash + Eq + Clone> {
    is_matching: bool,
    children: HashMap<T, Trie<T>>,
}

impl<T: Hash + Eq + Clone> Trie<T> {
    pub fn new() -> Self {
        Trie {
            is_matching: false,
            children: HashMap::new(),
        }
    }

    pub fn with_matching(is_matching: bool) -> Self {
        Trie {
            is_matching,
            children: HashMap::new(),
        }
    }

    pub fn insert(&mut self, path: &[T]) {
        let mut node = self;
        for part in path {
            node = node.children.entry(part.clone()).or_insert_with(Trie::new);
        }
        node.is_matching = true;
    }

    pub fn contains(&self, path: &[T]) -> bool {
        let mut node = self;
        for part in path {
            match node.children.get(part) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.is_matching
    }

    pub fn contains_single(&self, path_part: &T) -> bool {
        if self.is_matching {
            return true;
        }

        self.children.contains_key(path_part)
    }
}

impl<T: Hash + Eq + Clone> Default for Trie<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ========== Trie Tests ==========

    #[test]
    fn trie_insert_and_contains_single_path() {
        let mut trie = Trie::new();
        let path = vec!["src", "main", "rs"];
        trie.insert(&path);

        assert!(trie.contains(&path));
    }

    #[test]
    fn trie_does_not_match_partial_path() {
        let mut trie = Trie::new();
        trie.insert(&["src", "main", "rs"]);

        assert!(!trie.contains(&["src"]));
        assert!(!trie.contains(&["src", "main"]));
        assert!(!trie.contains(&["docs", "README", "md"]));
    }

    #[test]
    fn trie_handles_shared_prefixes() {
        let mut trie = Trie::new();
        trie.insert(&["src", "utils", "helper", "rs"]);
        trie.insert(&["src", "utils", "config", "rs"]);
        trie.insert(&["src", "main", "rs"]);

        assert!(trie.contains(&["src", "utils", "helper", "rs"]));
        assert!(trie.contains(&["src", "utils", "config", "rs"]));
        assert!(trie.contains(&["src", "main", "rs"]));
        assert!(!trie.contains(&["src", "utils"]));
    }

    #[test]
    fn trie_contains_single_checks_children() {
        let mut trie = Trie::new();
        trie.insert(&["src", "main"]);

        assert!(trie.contains_single(&"src"));
        assert!(!trie.contains_single(&"docs"));
        assert!(Trie::<&str>::with_matching(true).contains_single(&"anything"));
    }

    #[test]
    fn trie_empty_path_marks_root() {
        let mut trie = Trie::new();
        let empty_path: Vec<&str> = vec![];
        trie.insert(&empty_path);

        assert!(trie.is_matching);
        assert!(trie.contains(&empty_path));
    }

    // ========== PathFilter Tests ==========

    fn names<'a>(filter: &PathFilter, candidates: &[&'a str]) -> Vec<&'a str> {
        candidates
            .iter()
            .copied()
            .filter(|name| filter.matches(name))
            .collect()
    }

    #[test]
    fn no_paths_lets_everything_through() {
        let filter = PathFilter::new::<&str>(&[]);
        assert_eq!(names(&filter, &["src", "docs"]), vec!["src", "docs"]);
        assert_eq!(names(&filter.subfilter("src"), &["a.rs"]), vec!["a.rs"]);
    }

    #[test]
    fn matches_only_entries_on_the_way_to_a_selected_file() {
        let filter = PathFilter::new(&["src/main.rs", "tests/test.rs"]);
        assert_eq!(names(&filter, &["src", "docs", "tests"]), vec!["src", "tests"]);

        let src = filter.subfilter("src");
        assert_eq!(src.path(), "src");
        assert_eq!(names(&src, &["main.rs", "lib.rs"]), vec!["main.rs"]);
    }

    #[test]
    fn selected_directory_matches_everything_below_it() {
        let filter = PathFilter::new(&["src"]);
        let nested = filter.subfilter("src").subfilter("utils");

        assert_eq!(nested.path(), "src/utils");
        assert_eq!(
            names(&nested, &["main.rs", "lib.rs", "mod.rs"]),
            vec!["main.rs", "lib.rs", "mod.rs"]
        );
    }

    #[test]
    fn entries_outside_the_filter_are_dropped() {
        let filter = PathFilter::new(&["a/b/c/d.txt"]);
        let docs = filter.subfilter("docs");
        assert!(names(&docs, &["README.md", "guide.md"]).is_empty());

        let c = filter.subfilter("a").subfilter("b").subfilter("c");
        assert_eq!(c.path(), "a/b/c");
        assert_eq!(names(&c, &["d.txt", "other.txt"]), vec!["d.txt"]);
    }

    #[test]
    fn entry_iterators_are_filtered_by_name() {
        let filter = PathFilter::new(&["src/utils"]);
        let src = "src".to_string();
        let docs = "docs".to_string();
        let entries = vec![(&src, &1), (&docs, &2)];

        let filtered: Vec<_> = filter
            .filter_matching_entries(entries.into_iter())
            .collect();

        assert_eq!(filtered, vec![(&src, &1)]);
    }
}
