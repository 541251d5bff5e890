use std::ops::RangeInclusive;

/// Number of page buttons the listing shows at once.
pub const PAGE_WINDOW: u32 = 5;

/// The run of page numbers to offer around `current`. Stays inside
/// `1..=total` and keeps `current` as close to the middle as the edges allow.
pub fn page_window(current: u32, total: u32, max: u32) -> RangeInclusive<u32> {
    let total = total.max(1);
    let max = max.max(1);
    let current = current.clamp(1, total);

    if total <= max {
        return 1..=total;
    }

    let before = max / 2;
    let after = max.div_ceil(2) - 1;

    if current <= before {
        1..=max
    } else if current + after >= total {
        (total - max + 1)..=total
    } else {
        (current - before)..=(current + after)
    }
}
