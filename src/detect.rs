//! Per-pixel luminance-delta motion detection.
//!
//! Detection compares the two most recent sampled frames over a configured
//! sub-rectangle: a pixel counts as changed when its absolute luminance delta
//! exceeds `threshold`, and motion is present when the number of changed
//! pixels exceeds `sensitivity`. Both comparisons are strict.
//!
//! Pure functions of their inputs; no hidden state. Region bounds are
//! validated at startup, not here.

use crate::frame::{Frame, Region};

/// Count region pixels whose luminance delta exceeds `threshold`.
pub fn changed_pixels(previous: &Frame, current: &Frame, region: Region, threshold: u8) -> u32 {
    let mut changed = 0u32;
    for y in region.start_y..region.end_y {
        for x in region.start_x..region.end_x {
            let diff = previous.luma(x, y).abs_diff(current.luma(x, y));
            if diff > threshold {
                changed += 1;
            }
        }
    }
    changed
}

/// Decide whether motion is present between two frames.
///
/// Returns true iff strictly more than `sensitivity` region pixels changed
/// by strictly more than `threshold`.
pub fn detect_motion(
    previous: &Frame,
    current: &Frame,
    region: Region,
    threshold: u8,
    sensitivity: u32,
) -> bool {
    changed_pixels(previous, current, region, threshold) > sensitivity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn flat(width: u32, height: u32, value: u8) -> Frame {
        Frame::from_luma(width, height, vec![value; (width * height) as usize]).unwrap()
    }

    /// Flat frame with a rectangular block raised to `value`.
    fn with_block(
        width: u32,
        height: u32,
        base: u8,
        block: (u32, u32, u32, u32),
        value: u8,
    ) -> Frame {
        let (bx, by, bw, bh) = block;
        let mut luma = vec![base; (width * height) as usize];
        for y in by..by + bh {
            for x in bx..bx + bw {
                luma[(y * width + x) as usize] = value;
            }
        }
        Frame::from_luma(width, height, luma).unwrap()
    }

    #[test]
    fn deltas_at_or_below_threshold_are_quiet() {
        let prev = flat(96, 72, 100);
        let curr = flat(96, 72, 120); // delta 20 everywhere
        let region = Region::full(96, 72);
        assert!(!detect_motion(&prev, &curr, region, 20, 0));
    }

    #[test]
    fn sensitivity_is_a_strict_bound() {
        let prev = flat(96, 72, 100);
        // Exactly 25 pixels change by more than the threshold.
        let curr = with_block(96, 72, 100, (0, 0, 5, 5), 180);
        let region = Region::full(96, 72);
        assert_eq!(changed_pixels(&prev, &curr, region, 15), 25);
        assert!(!detect_motion(&prev, &curr, region, 15, 25));
        assert!(detect_motion(&prev, &curr, region, 15, 24));
    }

    #[test]
    fn changes_outside_the_region_are_ignored() {
        let prev = flat(96, 72, 50);
        // Large change entirely above the region's top edge.
        let curr = with_block(96, 72, 50, (0, 0, 96, 24), 250);
        let region = Region {
            start_x: 0,
            start_y: 24,
            end_x: 80,
            end_y: 71,
        };
        assert_eq!(changed_pixels(&prev, &curr, region, 15), 0);
        assert!(!detect_motion(&prev, &curr, region, 15, 0));
    }

    #[test]
    fn twenty_six_changed_pixels_trip_sensitivity_twenty_five() {
        let prev = flat(96, 72, 100);
        // 26 region pixels differ by 30 with threshold 20.
        let curr = with_block(96, 72, 100, (10, 30, 26, 1), 130);
        let region = Region {
            start_x: 0,
            start_y: 24,
            end_x: 80,
            end_y: 71,
        };
        assert_eq!(changed_pixels(&prev, &curr, region, 20), 26);
        assert!(detect_motion(&prev, &curr, region, 20, 25));
    }

    #[test]
    fn detection_is_deterministic() {
        let prev = flat(32, 32, 10);
        let curr = with_block(32, 32, 10, (4, 4, 8, 8), 200);
        let region = Region::full(32, 32);
        let first = detect_motion(&prev, &curr, region, 40, 10);
        for _ in 0..3 {
            assert_eq!(detect_motion(&prev, &curr, region, 40, 10), first);
        }
    }
}
