//! Fuzzy string matching for entity resolution.

/// Best score at or below which the first candidate is used instead.
pub const FALLBACK_THRESHOLD: f64 = 0.3;

/// Score assigned when one string contains the other.
pub const CONTAINMENT_SCORE: f64 = 0.9;

/// Levenshtein edit distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Case-insensitive similarity in `[0, 1]`.
///
/// Equal strings score 1.0 and containment scores 0.9, so the empty string
/// scores 0.9 against anything else. Otherwise the score is
/// `(len(longer) - distance) / len(longer)`. Symmetric in its arguments.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    if a == b {
        return 1.0;
    }

    let (longer, shorter) = if a.chars().count() >= b.chars().count() {
        (&a, &b)
    } else {
        (&b, &a)
    };

    if longer.contains(shorter.as_str()) {
        return CONTAINMENT_SCORE;
    }

    let len = longer.chars().count() as f64;
    (len - levenshtein(longer, shorter) as f64) / len
}

/// Selected candidate and how it was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch<'a> {
    pub candidate: &'a str,
    /// Best score seen across all candidates.
    pub score: f64,
    /// The best score was too low and the first candidate was taken instead.
    pub fallback: bool,
}

/// Pick the candidate most similar to `query`.
///
/// Ties go to the earlier candidate. When the best score is at or below
/// `FALLBACK_THRESHOLD` the first candidate is returned regardless.
/// `None` only when there are no candidates.
pub fn best_match<'a>(query: &str, candidates: &[&'a str]) -> Option<FuzzyMatch<'a>> {
    let (&first, rest) = candidates.split_first()?;

    let mut best = first;
    let mut best_score = similarity(query, first);
    for &candidate in rest {
        let score = similarity(query, candidate);
        if score > best_score {
            best = candidate;
            best_score = score;
        }
    }

    if best_score <= FALLBACK_THRESHOLD {
        return Some(FuzzyMatch {
            candidate: first,
            score: best_score,
            fallback: true,
        });
    }

    Some(FuzzyMatch {
        candidate: best,
        score: best_score,
        fallback: false,
    })
}
