/// Treat zero, negative-zero and non-finite values as "no value".
///
/// Attribute sources report missing data as 0 or NaN often enough that the
/// aggregation formulas skip both.
pub fn meaningful(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x != 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meaningful_filters_missing() {
        assert_eq!(meaningful(Some(2.0)), Some(2.0));
        assert_eq!(meaningful(Some(-0.0)), None);
        assert_eq!(meaningful(Some(f64::NAN)), None);
        assert_eq!(meaningful(Some(f64::INFINITY)), None);
        assert_eq!(meaningful(None), None);
    }
}
