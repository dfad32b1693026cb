//! Reflected binary Gray codes.

/// Smallest `k` such that `2^k >= n`.
///
/// # Panics
///
/// Panics if `n == 0`.
pub fn ceil_log2(n: usize) -> usize {
    assert!(n > 0, "ceil_log2 of zero");
    let mut k = 0;
    while (1usize << k) < n {
        k += 1;
    }
    k
}

/// The reflected binary Gray code with the given digit count.
///
/// Row `i` is the code of integer `i`, most significant digit first. Rows of
/// consecutive integers differ in exactly one digit, and the first digit of
/// row `i` is 1 iff `i >= 2^(digits-1)`.
pub fn reflected_gray_codes(digits: usize) -> Vec<Vec<u8>> {
    let rows = 1usize << digits;
    (0..rows)
        .map(|i| {
            let g = i ^ (i >> 1);
            (0..digits)
                .rev()
                .map(|j| ((g >> j) & 1) as u8)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(4), 2);
        assert_eq!(ceil_log2(6), 3);
        assert_eq!(ceil_log2(8), 3);
    }

    #[test]
    fn test_adjacent_rows_differ_by_one_bit() {
        for digits in 1..=4 {
            let codes = reflected_gray_codes(digits);
            assert_eq!(codes.len(), 1 << digits);
            for i in 1..codes.len() {
                let flips = codes[i]
                    .iter()
                    .zip(&codes[i - 1])
                    .filter(|(a, b)| a != b)
                    .count();
                assert_eq!(flips, 1, "rows {} and {} differ in {} bits", i - 1, i, flips);
            }
        }
    }

    #[test]
    fn test_first_digit_is_sign_bit() {
        let codes = reflected_gray_codes(3);
        for (i, row) in codes.iter().enumerate() {
            assert_eq!(row[0], u8::from(i >= 4));
        }
    }

    #[test]
    fn test_three_digit_table() {
        let codes = reflected_gray_codes(2);
        assert_eq!(codes, vec![vec![0, 0], vec![0, 1], vec![1, 1], vec![1, 0]]);
    }
}
