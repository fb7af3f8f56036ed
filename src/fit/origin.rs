/// Evenly index-spaced origins tried in addition to the last sample.
pub const ORIGIN_STEPS: usize = 16;

/// Sample indices tried as the fit origin, in scan order: the last sample,
/// then `floor(n * k / ORIGIN_STEPS)` for `k` in `0..ORIGIN_STEPS`.
///
/// Repeated indices are dropped; the first occurrence keeps its place, so the
/// scan order (and with it the tie-break) is unchanged.
pub fn candidate_indices(n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(ORIGIN_STEPS + 1);
    out.push(n - 1);
    for step in 0..ORIGIN_STEPS {
        let index = n * step / ORIGIN_STEPS;
        if !out.contains(&index) {
            out.push(index);
        }
    }
    out
}
