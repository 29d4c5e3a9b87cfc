/// Edit distance between `a` and `b` when it is at most `max`.
///
/// With `transpositions`, swapping two adjacent characters costs one edit
/// (optimal string alignment distance). Rows are abandoned as soon as every
/// cell exceeds `max`.
pub fn bounded_distance(a: &[char], b: &[char], max: u32, transpositions: bool) -> Option<u32> {
    let max = max as usize;
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    let n = b.len();
    let mut before: Vec<usize> = vec![0; n + 1];
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for j in 1..=n {
            let cost = usize::from(ca != b[j - 1]);
            let mut d = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            if transpositions && i > 0 && j > 1 && ca == b[j - 2] && a[i - 1] == b[j - 1] {
                d = d.min(before[j - 2] + 1);
            }
            curr[j] = d;
            row_min = row_min.min(d);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut before, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[n];
    (distance <= max).then_some(distance as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(a: &str, b: &str, max: u32, transpositions: bool) -> Option<u32> {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        bounded_distance(&a, &b, max, transpositions)
    }

    #[test]
    fn test_basic_edits() {
        assert_eq!(dist("kitten", "kitten", 2, true), Some(0));
        assert_eq!(dist("kitten", "sitten", 2, true), Some(1));
        assert_eq!(dist("kitten", "kittens", 2, true), Some(1));
        assert_eq!(dist("kitten", "sitting", 2, true), None);
        assert_eq!(dist("kitten", "sitting", 3, true), Some(3));
        assert_eq!(dist("", "ab", 2, false), Some(2));
    }

    #[test]
    fn test_transpositions() {
        assert_eq!(dist("abcd", "abdc", 2, true), Some(1));
        assert_eq!(dist("abcd", "abdc", 2, false), Some(2));
        assert_eq!(dist("abcd", "abdc", 1, false), None);
    }

    #[test]
    fn test_length_gap_short_circuits() {
        assert_eq!(dist("a", "abcd", 2, true), None);
    }
}
