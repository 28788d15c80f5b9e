///////////////////
// Vector macros //
///////////////////

/// Assertion that all slices/vectors have the same length.
///
/// Panics with the list of lengths otherwise. Used in the numeric kernels where
/// a length mismatch is a programming error rather than bad user input.
#[macro_export]
macro_rules! assert_same_len {
    ($($vec:expr),+ $(,)?) => {
        {
            let lengths: Vec<usize> = vec![$($vec.len()),+];
            let first_len = lengths[0];

            if !lengths.iter().all(|&len| len == first_len) {
                panic!(
                    "Vectors have different lengths: {:?}",
                    lengths
                );
            }
        }
    };
}

#[cfg(test)]
mod test_macros {
    #[test]
    fn test_same_len_passes() {
        let a = vec![1.0, 2.0];
        let b = [3.0, 4.0];
        assert_same_len!(a, b);
    }

    #[test]
    #[should_panic(expected = "Vectors have different lengths")]
    fn test_same_len_panics() {
        let a = vec![1.0, 2.0];
        let b = vec![3.0];
        assert_same_len!(a, b);
    }
}
