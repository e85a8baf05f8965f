//! Minimal glob matcher for cache key patterns. Supports `*` (any run of
//! characters, including none) anywhere in the pattern; every other
//! character matches literally. Sufficient for the project's
//! colon-namespaced keys (`solve:*`, `solve:*:<hash>`).

pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();
    match_from(&pattern, &candidate)
}

fn match_from(pattern: &[char], candidate: &[char]) -> bool {
    match pattern.first() {
        None => candidate.is_empty(),
        Some('*') => {
            // Either the star consumes zero characters, or one more.
            match_from(&pattern[1..], candidate)
                || (!candidate.is_empty() && match_from(pattern, &candidate[1..]))
        }
        Some(c) => candidate.first() == Some(c) && match_from(&pattern[1..], &candidate[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_requires_exact_match() {
        assert!(glob_match("solve:dinic", "solve:dinic"));
        assert!(!glob_match("solve:dinic", "solve:bfs"));
    }

    #[test]
    fn trailing_star_matches_any_suffix() {
        assert!(glob_match("solve:*", "solve:dinic:abc123"));
        assert!(glob_match("solve:*", "solve:"));
    }

    #[test]
    fn star_in_the_middle_matches_the_gap() {
        assert!(glob_match("solve:*:abc123", "solve:dinic:abc123"));
        assert!(!glob_match("solve:*:abc123", "solve:dinic:def456"));
    }

    #[test]
    fn empty_pattern_matches_only_empty_candidate() {
        assert!(glob_match("", ""));
        assert!(!glob_match("", "x"));
    }
}
