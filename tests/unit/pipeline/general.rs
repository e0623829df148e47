use super::*;
use crate::format::PixelFormat;
use crate::operator::Operator;
use crate::pipeline::dither::DitherMode;

fn info<'i>(
    op: Operator,
    src: &'i Image<'i>,
    mask: Option<&'i Image<'i>>,
    dest: &Image<'_>,
) -> CompositeInfo<'i> {
    CompositeInfo {
        op,
        src,
        mask,
        src_flags: src.flags(),
        mask_flags: mask.map_or(Flags::IS_OPAQUE | Flags::NO_ALPHA_MAP, Image::flags),
        dest_flags: dest.flags(),
        src_x: 0,
        src_y: 0,
        mask_x: 0,
        mask_y: 0,
        dest_x: 0,
        dest_y: 0,
        width: dest.width() as i32,
        height: dest.height() as i32,
    }
}

fn image(format: PixelFormat, fill: u32) -> Image<'static> {
    let mut image = Image::new_owned(format, 3, 2).unwrap();
    image.fill(fill).unwrap();
    image
}

#[test]
fn narrow_when_everything_is_8_bit() {
    let src = image(PixelFormat::A8R8G8B8, 0);
    let dest = image(PixelFormat::R5G6B5, 0);
    assert_eq!(precision_for(&info(Operator::Over, &src, None, &dest)), Precision::Narrow);
    assert_eq!(
        precision_for(&info(Operator::Multiply, &src, None, &dest)),
        Precision::Narrow
    );
}

#[test]
fn wide_images_force_float() {
    let narrow = image(PixelFormat::A8R8G8B8, 0);
    let wide = image(PixelFormat::A2R10G10B10, 0);
    assert_eq!(precision_for(&info(Operator::Over, &narrow, None, &wide)), Precision::Wide);
    assert_eq!(precision_for(&info(Operator::Over, &wide, None, &narrow)), Precision::Wide);
    assert_eq!(
        precision_for(&info(Operator::Over, &narrow, Some(&wide), &narrow)),
        Precision::Wide
    );
}

#[test]
fn dithered_destinations_force_float() {
    let src = image(PixelFormat::A8R8G8B8, 0);
    let mut dest = image(PixelFormat::R5G6B5, 0);
    dest.set_dither(DitherMode::OrderedBayer8);
    assert_eq!(precision_for(&info(Operator::Src, &src, None, &dest)), Precision::Wide);
}

#[test]
fn float_only_operators_force_float() {
    let src = image(PixelFormat::A8R8G8B8, 0);
    let dest = image(PixelFormat::A8R8G8B8, 0);
    for op in [Operator::HslHue, Operator::SoftLight, Operator::DisjointOver] {
        assert_eq!(precision_for(&info(op, &src, None, &dest)), Precision::Wide, "{op:?}");
    }
}

#[test]
fn narrow_over() {
    let src = image(PixelFormat::A8R8G8B8, 0x8000_0080);
    let mut dest = image(PixelFormat::A8R8G8B8, 0xffff_ffff);
    let req = info(Operator::Over, &src, None, &dest);
    composite_general(&req, &mut dest).unwrap();
    for y in 0..2 {
        for x in 0..3 {
            assert_eq!(dest.pixel(x, y), Some(0xff7f_7fff));
        }
    }
}

#[test]
fn unified_mask_scales_the_source() {
    let src = Image::solid(0xffff_0000);
    let mask = image(PixelFormat::A8, 0x8000_0000);
    let mut dest = image(PixelFormat::A8R8G8B8, 0);
    let req = info(Operator::Over, &src, Some(&mask), &dest);
    composite_general(&req, &mut dest).unwrap();
    assert_eq!(dest.pixel(2, 1), Some(0x8080_0000));
}

#[test]
fn wide_destination_round_trips_opaque_colors() {
    let src = image(PixelFormat::A8R8G8B8, 0xff00_ff00);
    let mut dest = image(PixelFormat::A2R10G10B10, 0);
    let req = info(Operator::Over, &src, None, &dest);
    composite_general(&req, &mut dest).unwrap();
    assert_eq!(dest.pixel(0, 0), Some(0xff00_ff00));
    let wide = dest.pixel_wide(1, 1).unwrap();
    assert_eq!((wide.a, wide.r, wide.g, wide.b), (1.0, 0.0, 1.0, 0.0));
}

#[test]
fn sub_rectangles_leave_the_rest_untouched() {
    let src = image(PixelFormat::A8R8G8B8, 0xff11_2233);
    let mut dest = image(PixelFormat::A8R8G8B8, 0);
    let mut req = info(Operator::Src, &src, None, &dest);
    req.dest_x = 1;
    req.width = 1;
    req.height = 1;
    composite_general(&req, &mut dest).unwrap();
    assert_eq!(dest.pixel(1, 0), Some(0xff11_2233));
    assert_eq!(dest.pixel(0, 0), Some(0));
    assert_eq!(dest.pixel(2, 0), Some(0));
    assert_eq!(dest.pixel(1, 1), Some(0));
}
