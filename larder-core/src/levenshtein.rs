//! Levenshtein edit distance and normalized similarity.
//!
//! Both the classification cascade and the recipe matcher score candidate
//! names with [`similarity`], so the two agree on what "close enough" means.

/// Compute the Levenshtein edit distance between two strings.
///
/// Operates on Unicode scalar values and is case-sensitive. Insertions,
/// deletions and substitutions all cost 1.
pub fn distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    // Full (m+1) x (n+1) table.
    let mut table = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in table.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in table[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            table[i][j] = if a_chars[i - 1] == b_chars[j - 1] {
                table[i - 1][j - 1]
            } else {
                1 + table[i - 1][j - 1]
                    .min(table[i][j - 1])
                    .min(table[i - 1][j])
            };
        }
    }

    table[m][n]
}

/// Normalized similarity in `[0, 1]`, where 1.0 means identical.
///
/// Computed as `(len(longer) - distance) / len(longer)`. Two empty strings
/// are considered identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    // Ties keep the original order.
    let (longer, shorter, longer_len) = if b_len > a_len {
        (b, a, b_len)
    } else {
        (a, b, a_len)
    };

    if longer_len == 0 {
        return 1.0;
    }

    let dist = distance(longer, shorter);
    (longer_len - dist) as f64 / longer_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identity() {
        for s in ["", "a", "tomato", "gurken", "crème fraîche"] {
            assert_eq!(distance(s, s), 0);
        }
    }

    #[test]
    fn test_distance_symmetric() {
        let pairs = [
            ("kitten", "sitting"),
            ("tomato", "tomatto"),
            ("", "onion"),
            ("cebolla", "onion"),
        ];
        for (a, b) in pairs {
            assert_eq!(distance(a, b), distance(b, a), "{a} vs {b}");
        }
    }

    #[test]
    fn test_distance_known_values() {
        assert_eq!(distance("kitten", "sitting"), 3);
        assert_eq!(distance("", "salt"), 4);
        assert_eq!(distance("salt", ""), 4);
        assert_eq!(distance("tomato", "tomate"), 1);
        assert_eq!(distance("flaw", "lawn"), 2);
    }

    #[test]
    fn test_distance_case_sensitive() {
        assert_eq!(distance("Tomato", "tomato"), 1);
    }

    #[test]
    fn test_distance_counts_chars_not_bytes() {
        // "ä" is two bytes in UTF-8 but one edit.
        assert_eq!(distance("kase", "käse"), 1);
        assert_eq!(distance("", "käse"), 4);
    }

    #[test]
    fn test_similarity_empty() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("", "abc"), 0.0);
    }

    #[test]
    fn test_similarity_values() {
        assert!((similarity("tomatto", "tomato") - 6.0 / 7.0).abs() < 1e-9);
        assert!((similarity("tomato", "tomate") - 5.0 / 6.0).abs() < 1e-9);
        assert_eq!(similarity("salt", "salt"), 1.0);
    }

    #[test]
    fn test_similarity_in_range_and_symmetric() {
        let words = ["", "a", "onion", "cebolla", "tomate", "tomato", "xyzzyqux"];
        for a in words {
            for b in words {
                let s = similarity(a, b);
                assert!((0.0..=1.0).contains(&s), "{a} vs {b} = {s}");
                assert_eq!(s, similarity(b, a));
            }
        }
    }
}
