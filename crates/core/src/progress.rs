//! Segment-based progress policy.
//!
//! Progress is an integer percentage. Intermediate values are rounded from
//! the fraction of finished segments and capped at
//! [`PROGRESS_CAP_BEFORE_COMPLETE`]; only the completion transition may
//! write [`PROGRESS_COMPLETE`].

/// Progress written together with the `completed` transition.
pub const PROGRESS_COMPLETE: u8 = 100;

/// Highest value an unfinished job may report.
pub const PROGRESS_CAP_BEFORE_COMPLETE: u8 = 99;

/// Progress after `finished_segments` of `total_segments` are done.
///
/// Rounds half up and never returns 100, even when every segment is done;
/// the caller reports 100 only once the job has actually completed.
pub fn segment_progress(finished_segments: u32, total_segments: u32) -> u8 {
    if total_segments == 0 {
        return 0;
    }
    let finished = u64::from(finished_segments.min(total_segments));
    let total = u64::from(total_segments);
    let rounded = (finished * 200 + total) / (2 * total);
    rounded.min(u64::from(PROGRESS_CAP_BEFORE_COMPLETE)) as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_segments_report_quarters() {
        let values: Vec<u8> = (1..4).map(|done| segment_progress(done, 4)).collect();
        assert_eq!(values, vec![25, 50, 75]);
    }

    #[test]
    fn all_segments_done_still_capped() {
        assert_eq!(segment_progress(4, 4), PROGRESS_CAP_BEFORE_COMPLETE);
        assert_eq!(segment_progress(1, 1), PROGRESS_CAP_BEFORE_COMPLETE);
    }

    #[test]
    fn rounding_never_reaches_100_early() {
        // 199/200 = 99.5 would round to 100.
        assert_eq!(segment_progress(199, 200), 99);
    }

    #[test]
    fn rounds_half_up() {
        // 1/8 = 12.5 -> 13, 1/3 = 33.3 -> 33, 2/3 = 66.7 -> 67
        assert_eq!(segment_progress(1, 8), 13);
        assert_eq!(segment_progress(1, 3), 33);
        assert_eq!(segment_progress(2, 3), 67);
    }

    #[test]
    fn default_twelve_segments_are_non_decreasing() {
        let values: Vec<u8> = (1..=12).map(|done| segment_progress(done, 12)).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(values[0], 8);
        assert_eq!(values[5], 50);
    }

    #[test]
    fn zero_total_is_zero() {
        assert_eq!(segment_progress(0, 0), 0);
    }
}
