//! Query categories recognized by the decomposer and by dynamic workflows.
//!
//! The set is closed: a query fragment is either computation, lookup, or
//! unclassified. Alphabetic keywords only match on word boundaries, so
//! "mathematics" does not count as "math"; symbol keywords match anywhere.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::descriptor::AgentRole;

/// A recognized query category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Arithmetic and formula evaluation
    Computation,
    /// Searching for information
    Lookup,
}

const COMPUTATION_KEYWORDS: &[&str] = &[
    "calculate",
    "compute",
    "math",
    "sqrt",
    "sin",
    "cos",
    "pi",
    "equation",
    "formula",
    "+",
    "*",
    "/",
    "^",
];

const LOOKUP_KEYWORDS: &[&str] = &[
    "search",
    "find",
    "what is",
    "who is",
    "where is",
    "how to",
    "latest",
    "news",
    "information",
    "lookup",
    "look up",
];

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 2] = [Category::Computation, Category::Lookup];

    /// Keyword table of this category.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Category::Computation => COMPUTATION_KEYWORDS,
            Category::Lookup => LOOKUP_KEYWORDS,
        }
    }

    /// Role of the agents that should handle this category.
    pub fn preferred_role(self) -> AgentRole {
        match self {
            Category::Computation => AgentRole::Computation,
            Category::Lookup => AgentRole::Information,
        }
    }

    /// Byte offsets in `text_lower` of every keyword hit, sorted.
    fn hits(self, text_lower: &str) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .keywords()
            .iter()
            .flat_map(|kw| keyword_positions(text_lower, kw))
            .collect();
        positions.sort_unstable();
        positions
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Computation => f.write_str("computation"),
            Category::Lookup => f.write_str("lookup"),
        }
    }
}

fn keyword_positions<'a>(text: &'a str, keyword: &'a str) -> impl Iterator<Item = usize> + 'a {
    let alphabetic = keyword.chars().any(char::is_alphabetic);
    text.match_indices(keyword).filter_map(move |(pos, _)| {
        if !alphabetic {
            return Some(pos);
        }
        let before_ok = text[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = text[pos + keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        (before_ok && after_ok).then_some(pos)
    })
}

/// Categories occurring anywhere in `text`, in declaration order.
pub fn detect(text: &str) -> Vec<Category> {
    let lower = text.to_lowercase();
    Category::ALL
        .into_iter()
        .filter(|c| !c.hits(&lower).is_empty())
        .collect()
}

/// The dominant category of `text`.
///
/// The category with the most keyword hits wins; on a tie, the one whose
/// first hit comes earliest.
pub fn classify(text: &str) -> Option<Category> {
    let lower = text.to_lowercase();
    Category::ALL
        .into_iter()
        .filter_map(|c| {
            let hits = c.hits(&lower);
            hits.first().map(|first| (c, hits.len(), *first))
        })
        .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
        .map(|(c, _, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_computation() {
        assert_eq!(classify("Calculate pi * 2"), Some(Category::Computation));
        assert_eq!(classify("what's 3 ^ 4"), Some(Category::Computation));
    }

    #[test]
    fn test_classify_lookup() {
        assert_eq!(
            classify("search for mathematics"),
            Some(Category::Lookup),
            "'math' inside 'mathematics' must not count"
        );
        assert_eq!(classify("Who is Ada Lovelace?"), Some(Category::Lookup));
    }

    #[test]
    fn test_classify_unrecognized() {
        assert_eq!(classify("Hello, are you working?"), None);
        assert_eq!(classify(""), None);
        assert_eq!(classify("using singletons"), None);
    }

    #[test]
    fn test_classify_prefers_more_hits() {
        assert_eq!(
            classify("find the sqrt of pi / 2"),
            Some(Category::Computation)
        );
    }

    #[test]
    fn test_classify_tie_prefers_earliest() {
        assert_eq!(classify("search then calculate"), Some(Category::Lookup));
        assert_eq!(classify("calculate then search"), Some(Category::Computation));
    }

    #[test]
    fn test_detect_both() {
        assert_eq!(
            detect("Calculate pi * 2 and search for mathematics"),
            vec![Category::Computation, Category::Lookup]
        );
        assert!(detect("hello there").is_empty());
    }

    #[test]
    fn test_preferred_roles() {
        assert_eq!(Category::Computation.preferred_role(), AgentRole::Computation);
        assert_eq!(Category::Lookup.preferred_role(), AgentRole::Information);
    }
}
