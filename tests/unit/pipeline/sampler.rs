use super::*;
use crate::filter::{Kernel, separable_params};
use crate::foundation::fixed::Transform;
use crate::format::PixelFormat;
use crate::image::Repeat;

const R: u32 = 0xffff_0000;
const G: u32 = 0xff00_ff00;
const B: u32 = 0xff00_00ff;
const W: u32 = 0xffff_ffff;

fn quad() -> Image<'static> {
    let mut image = Image::new_owned(PixelFormat::A8R8G8B8, 2, 2).unwrap();
    image.set_pixel(0, 0, R).unwrap();
    image.set_pixel(1, 0, G).unwrap();
    image.set_pixel(0, 1, B).unwrap();
    image.set_pixel(1, 1, W).unwrap();
    image
}

fn ramp(values: &[u32]) -> Image<'static> {
    let mut image = Image::new_owned(PixelFormat::A8R8G8B8, values.len() as u32, 1).unwrap();
    for (x, &v) in values.iter().enumerate() {
        image.set_pixel(x as u32, 0, 0xff00_0000 | v).unwrap();
    }
    image
}

fn center(x: i32, y: i32) -> (Fixed, Fixed) {
    (int_to_fixed(x) + FIXED_HALF, int_to_fixed(y) + FIXED_HALF)
}

#[test]
fn nearest_hits_corner_pixels() {
    let image = quad();
    for (x, y, want) in [(0, 0, R), (1, 0, G), (0, 1, B), (1, 1, W)] {
        let (fx, fy) = center(x, y);
        assert_eq!(sample_point(&image, fx, fy), want);
    }
}

#[test]
fn bilinear_center_averages_the_quad() {
    let mut image = quad();
    image.set_filter(FilterKind::Bilinear, &[]).unwrap();
    assert_eq!(sample_point(&image, FIXED_ONE, FIXED_ONE), 0xff7f_7f7f);
    assert_eq!(
        sample_point_wide(&image, FIXED_ONE, FIXED_ONE),
        Argb::new(1.0, 0.5, 0.5, 0.5)
    );
}

#[test]
fn bilinear_at_pixel_centers_is_exact() {
    let mut image = quad();
    image.set_repeat(Repeat::Pad);
    image.set_filter(FilterKind::Bilinear, &[]).unwrap();
    let (x, y) = center(1, 0);
    assert_eq!(sample_point(&image, x, y), G);
}

#[test]
fn bilinear_edges_fade_without_repeat() {
    let mut image = quad();
    image.set_filter(FilterKind::Bilinear, &[]).unwrap();
    // half a pixel left of the image: half of R, half transparent
    let p = sample_point(&image, 0, FIXED_HALF);
    assert_eq!(alpha(p), 0x7f);
    assert_eq!(red(p), 0x7f);
}

#[test]
fn scaled_rows_step_through_the_source() {
    let mut image = ramp(&[0, 1, 2, 3]);
    image.set_transform(Some(Transform::scale(2.0, 1.0)));
    let line = sample_row(&image, 0, 0, 3, Precision::Narrow).unwrap();
    assert_eq!(
        line,
        Scanline::Narrow(vec![0xff00_0000, 0xff00_0002, 0])
    );
}

#[test]
fn reflected_taps_mirror_at_the_edge() {
    let mut image = ramp(&[10, 20, 30, 40]);
    image.set_repeat(Repeat::Reflect);
    image.set_transform(Some(Transform::translate(-1.0, 0.0)));
    let line = sample_row(&image, 0, 0, 2, Precision::Narrow).unwrap();
    assert_eq!(line, Scanline::Narrow(vec![0xff00_000a, 0xff00_000a]));
}

#[test]
fn projective_zero_w_is_transparent() {
    let image = {
        let mut image = ramp(&[0xff; 4]);
        let mut t = Transform::IDENTITY;
        t.matrix[2][2] = 0;
        image.set_transform(Some(t));
        image
    };
    let line = sample_row(&image, 0, 0, 4, Precision::Wide).unwrap();
    assert_eq!(line, Scanline::Wide(vec![Argb::TRANSPARENT; 4]));
}

#[test]
fn projective_divide_recovers_affine_samples() {
    let mut image = ramp(&[5, 6, 7, 8]);
    // every homogeneous coordinate doubled: same points as the identity
    let mut t = Transform::scale(2.0, 2.0);
    t.matrix[2][2] = 2 * FIXED_ONE;
    image.set_transform(Some(t));
    let line = sample_row(&image, 0, 0, 4, Precision::Narrow).unwrap();
    assert_eq!(
        line,
        Scanline::Narrow(vec![0xff00_0005, 0xff00_0006, 0xff00_0007, 0xff00_0008])
    );
}

#[test]
fn convolution_weights_neighbours() {
    let mut image = ramp(&[0, 100, 200]);
    let q = FIXED_ONE / 4;
    image
        .set_filter(
            FilterKind::Convolution,
            &[int_to_fixed(3), int_to_fixed(1), q, 2 * q, q],
        )
        .unwrap();
    let (x, y) = center(1, 0);
    assert_eq!(sample_point(&image, x, y), 0xff00_0064);
    // the right tap falls off the image
    let (x, y) = center(2, 0);
    assert_eq!(sample_point(&image, x, y), 0xbf00_007d);
}

#[test]
fn separable_box_matches_nearest() {
    let mut image = ramp(&[1, 2, 3, 4]);
    let params = separable_params(Kernel::Box, 1.0, 1.0, 0, 0).unwrap();
    image
        .set_filter(FilterKind::SeparableConvolution, &params)
        .unwrap();
    let line = sample_row(&image, 0, 0, 4, Precision::Narrow).unwrap();
    assert_eq!(
        line,
        Scanline::Narrow(vec![0xff00_0001, 0xff00_0002, 0xff00_0003, 0xff00_0004])
    );
}

#[test]
fn narrow_bilinear_weights_use_seven_bits() {
    assert_eq!(bilinear_weight(0), 0);
    assert_eq!(bilinear_weight(FIXED_HALF), 128);
    assert_eq!(bilinear_weight(0xffff), 254);
    assert_eq!(bilinear_weight(0x1ff), 0);
}
