//! Query corpus loading and sampling.
//!
//! The corpus is a plain text file: one query per line, blank lines and
//! `#` comment lines skipped. Loaded once per run; the rest of the crate
//! treats it as an opaque read-only sequence to sample from.

use std::path::Path;

use rand::seq::SliceRandom;

use crate::error::{Result, SearchError};

/// Load the corpus from `path`. A missing file or an effectively empty one
/// is an error - there is nothing to search for.
pub fn load(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| SearchError::Corpus {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let queries: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if queries.is_empty() {
        return Err(SearchError::Corpus {
            path: path.display().to_string(),
            reason: "no usable queries (empty or all comments)".to_string(),
        });
    }
    Ok(queries)
}

/// Pick `count` queries: without replacement while the corpus suffices,
/// with replacement beyond that. `count == 0` picks nothing.
pub fn pick(corpus: &[String], count: usize) -> Vec<String> {
    if count == 0 || corpus.is_empty() {
        return Vec::new();
    }

    let mut rng = rand::thread_rng();
    if count <= corpus.len() {
        corpus
            .choose_multiple(&mut rng, count)
            .cloned()
            .collect()
    } else {
        (0..count)
            .filter_map(|_| corpus.choose(&mut rng).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn corpus(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("autosearch-test-{name}-{}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_skips_blank_and_comment_lines() {
        let path = write_temp("corpus", "cats\n\n# a comment\n  dogs  \n#another\nbirds\n");
        let loaded = load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, corpus(&["cats", "dogs", "birds"]));
    }

    #[test]
    fn load_rejects_comment_only_file() {
        let path = write_temp("empty", "# one\n# two\n\n");
        let err = load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, SearchError::Corpus { .. }));
    }

    #[test]
    fn load_rejects_missing_file() {
        let err = load(Path::new("/definitely/not/here/query.txt")).unwrap_err();
        assert!(matches!(err, SearchError::Corpus { .. }));
    }

    #[test]
    fn pick_within_corpus_size_is_distinct() {
        let corpus = corpus(&["cats", "dogs", "birds", "fish"]);
        for _ in 0..50 {
            let chosen = pick(&corpus, 3);
            assert_eq!(chosen.len(), 3);
            let distinct: HashSet<_> = chosen.iter().collect();
            assert_eq!(distinct.len(), 3, "sampling must be without replacement");
            assert!(chosen.iter().all(|q| corpus.contains(q)));
        }
    }

    #[test]
    fn pick_beyond_corpus_size_repeats_from_corpus() {
        let corpus = corpus(&["cats", "dogs"]);
        let chosen = pick(&corpus, 9);
        assert_eq!(chosen.len(), 9);
        assert!(chosen.iter().all(|q| corpus.contains(q)));
    }

    #[test]
    fn pick_zero_is_empty() {
        assert!(pick(&corpus(&["cats"]), 0).is_empty());
    }
}
