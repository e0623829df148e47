use super::*;
use crate::foundation::math::{float_to_unorm, unorm_to_float};

const MODES: [DitherMode; 5] = [
    DitherMode::Fast,
    DitherMode::Good,
    DitherMode::Best,
    DitherMode::OrderedBayer8,
    DitherMode::OrderedBlueNoise64,
];

#[test]
fn representable_values_survive_quantization() {
    for mode in MODES {
        for depth in 1..=8u32 {
            let max = (1u32 << depth) - 1;
            for k in 0..=max {
                let v = unorm_to_float(k, depth);
                for (x, y) in [(0, 0), (3, 5), (7, 7), (63, 1), (-1, 200)] {
                    let d = dither(mode, v, x, y, depth);
                    assert_eq!(float_to_unorm(d, depth), k, "{mode:?} depth {depth} k {k}");
                }
            }
        }
    }
}

#[test]
fn scale_is_zero_for_lossless_depths() {
    assert_eq!(dither_scale(0), 0.0);
    assert_eq!(dither_scale(32), 0.0);
    assert_eq!(dither_scale(8), 1.0 / 256.0);
    assert_eq!(dither(DitherMode::Fast, 0.3, 1, 1, 0), 0.3);
}

#[test]
fn factors_stay_inside_the_unit_interval() {
    for mode in MODES {
        for y in 0..64 {
            for x in 0..64 {
                let f = mode.factor(x, y);
                assert!(f > 0.0 && f < 1.0, "{mode:?} ({x}, {y}) = {f}");
            }
        }
    }
    assert_eq!(DitherMode::None.factor(3, 4), 0.0);
}

#[test]
fn patterns_tile() {
    assert_eq!(DitherMode::Fast.factor(1, 2), DitherMode::Fast.factor(9, 10));
    assert_eq!(
        DitherMode::Good.factor(5, 6),
        DitherMode::Good.factor(5 + 64, 6 + 128)
    );
}

#[test]
fn bayer_covers_every_level_once() {
    let mut seen = [false; 64];
    for y in 0..8 {
        for x in 0..8 {
            let level = ((DitherMode::Fast.factor(x, y) - 1.0 / 128.0) * 64.0).round() as usize;
            assert!(!seen[level]);
            seen[level] = true;
        }
    }
}

#[test]
fn blue_noise_is_a_permutation() {
    let mut ranks: Vec<u16> = blue_noise_table().to_vec();
    ranks.sort_unstable();
    assert!(ranks.iter().enumerate().all(|(i, &r)| usize::from(r) == i));
}

#[test]
fn rows_skip_full_precision_formats() {
    let mut row = vec![Argb::new(0.5, 0.3, 0.2, 0.1); 4];
    let before = row.clone();
    dither_row(
        DitherMode::Fast,
        (0, 0),
        PixelFormat::RGBA_FLOAT,
        0,
        0,
        &mut row,
    );
    assert_eq!(row, before);

    dither_row(DitherMode::Fast, (2, 3), PixelFormat::R5G6B5, 1, 1, &mut row);
    let d = DitherMode::Fast.factor(3, 4);
    assert_eq!(row[0].r, 0.3 + (d - 0.3) / 32.0);
    assert_eq!(row[0].g, 0.2 + (d - 0.2) / 64.0);
    assert_eq!(row[0].a, 0.5);
}

#[test]
fn modes_deserialize_kebab_case() {
    let m: DitherMode = serde_json::from_str("\"ordered-blue-noise64\"").unwrap();
    assert_eq!(m, DitherMode::OrderedBlueNoise64);
}
