//! Downsampling factor for a point budget

/// Smallest factor `d >= 1` such that `ceil(n / d) <= m`
///
/// This is `ceil(n / m)`, and 1 whenever `n <= m`. A zero `n` needs no
/// reduction and returns 1; a zero `m` cannot be met, so every point gets
/// its own bucket and `n` is returned.
///
/// # Example
///
/// ```rust
/// use kuba_rollup::query::divisor::agg_every;
///
/// assert_eq!(agg_every(80, 80), 1);
/// assert_eq!(agg_every(81, 80), 2);
/// assert_eq!(agg_every(161, 80), 3);
/// ```
pub fn agg_every(n: u32, m: u32) -> u32 {
    if n == 0 {
        return 1;
    }
    if m == 0 {
        return n;
    }
    n.div_ceil(m)
}
