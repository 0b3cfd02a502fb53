/// Only passes items that satisfy the predicate.
pub fn filter<T>(mut predicate: impl FnMut(&T) -> bool) -> impl FnMut(&T) -> Option<T>
where
    T: Copy,
{
    move |item| {
        if predicate(item) { Some(*item) } else { None }
    }
}

#[cfg(test)]
mod filter_tests {
    use super::*;
    use crate::sample::RawSample;

    #[test]
    fn test_filter_logic() {
        let mut pipe = filter(|s: &RawSample| s.timestamp_ms >= 0);

        let good = RawSample::new(0.0, 0.0, 9.8, 20);
        let bad = RawSample::new(0.0, 0.0, 9.8, -5);
        assert_eq!(pipe(&good), Some(good));
        assert_eq!(pipe(&bad), None);
    }
}
