use super::*;
use crate::format::PixelFormat;

fn ramp(width: u32) -> Image<'static> {
    let mut image = Image::new_owned(PixelFormat::A8R8G8B8, width, 1).unwrap();
    for x in 0..width {
        image.set_pixel(x, 0, 0xff00_0000 | x).unwrap();
    }
    image
}

#[test]
fn repeat_coord_at_minus_one() {
    assert_eq!(repeat_coord(Repeat::None, -1, 4), None);
    assert_eq!(repeat_coord(Repeat::Pad, -1, 4), Some(0));
    assert_eq!(repeat_coord(Repeat::Reflect, -1, 4), Some(0));
    assert_eq!(repeat_coord(Repeat::Normal, -1, 4), Some(3));
}

#[test]
fn repeat_coord_far_out() {
    assert_eq!(repeat_coord(Repeat::Normal, 9, 4), Some(1));
    assert_eq!(repeat_coord(Repeat::Reflect, 5, 4), Some(2));
    assert_eq!(repeat_coord(Repeat::Reflect, -6, 4), Some(2));
    assert_eq!(repeat_coord(Repeat::Pad, 100, 4), Some(3));
    assert_eq!(repeat_coord(Repeat::None, 4, 4), None);
}

#[test]
fn fetch_fills_outside_with_transparent() {
    let image = ramp(4);
    let Scanline::Narrow(row) = fetch(&image, -2, 0, 8, Precision::Narrow).unwrap() else {
        panic!("narrow fetch returned a wide row");
    };
    assert_eq!(
        row,
        [0, 0, 0xff00_0000, 0xff00_0001, 0xff00_0002, 0xff00_0003, 0, 0]
    );
    let below = fetch(&image, 0, 1, 4, Precision::Narrow).unwrap();
    assert_eq!(below, Scanline::Narrow(vec![0; 4]));
}

#[test]
fn fetch_wraps_and_reflects() {
    let mut image = ramp(3);
    image.set_repeat(Repeat::Normal);
    let line = fetch(&image, -1, 0, 4, Precision::Narrow).unwrap();
    assert_eq!(
        line,
        Scanline::Narrow(vec![0xff00_0002, 0xff00_0000, 0xff00_0001, 0xff00_0002])
    );
    image.set_repeat(Repeat::Reflect);
    let line = fetch(&image, 2, 0, 3, Precision::Narrow).unwrap();
    assert_eq!(
        line,
        Scanline::Narrow(vec![0xff00_0002, 0xff00_0002, 0xff00_0001])
    );
}

#[test]
fn wide_fetch_matches_narrow() {
    let image = ramp(4);
    let line = fetch(&image, 0, 0, 4, Precision::Wide).unwrap();
    assert_eq!(line.precision(), Precision::Wide);
    let Scanline::Wide(px) = line else {
        panic!("wide fetch returned a narrow row");
    };
    assert_eq!(px[3], Argb::expand(0xff00_0003));
}

#[test]
fn alpha_map_overrides_alpha_on_fetch() {
    let mut image = ramp(4);
    let mut map = Image::new_owned(PixelFormat::A8, 2, 1).unwrap();
    map.fill(0x4000_0000).unwrap();
    image.set_alpha_map(Some(map), 1, 0).unwrap();

    let mut out = [0u32; 4];
    fetch_dest(&image, 0, 0, &mut out).unwrap();
    assert_eq!(out, [0x0000_0000, 0x4000_0001, 0x4000_0002, 0x0000_0003]);
}

#[test]
fn store_writes_alpha_into_the_map() {
    let mut image = Image::new_owned(PixelFormat::X8R8G8B8, 3, 1).unwrap();
    let map = Image::new_owned(PixelFormat::A8, 3, 1).unwrap();
    image.set_alpha_map(Some(map), 0, 0).unwrap();

    store_narrow(&mut image, 0, 0, &[0x8011_2233, 0xff44_5566, 0]).unwrap();
    assert_eq!(image.pixel(1, 0), Some(0xff44_5566));
    let map = image.alpha_map().unwrap().image();
    assert_eq!(map.pixel(0, 0), Some(0x8000_0000));
    assert_eq!(map.pixel(2, 0), Some(0));
}

#[test]
fn store_rejects_spans_outside_the_image() {
    let mut image = ramp(4);
    assert!(store_narrow(&mut image, 2, 0, &[0; 3]).is_err());
    assert!(store_narrow(&mut image, -1, 0, &[0; 1]).is_err());
    let mut out = [0u32; 2];
    assert!(fetch_dest(&image, 0, 1, &mut out).is_err());
}

#[test]
fn wide_store_dithers_into_narrow_formats() {
    let mut image = Image::new_owned(PixelFormat::R5G6B5, 4, 1).unwrap();
    image.set_dither(crate::pipeline::dither::DitherMode::OrderedBayer8);
    let v = 16.0 / 31.0;
    let mut line = Scanline::Wide(vec![Argb::new(1.0, v, 0.0, 1.0); 4]);
    store(&mut image, 0, 0, &mut line).unwrap();
    for x in 0..4 {
        assert_eq!(image.pixel(x, 0), Some(0xff84_00ff));
    }
}

#[test]
fn transparent_rows_are_zeroed() {
    let line = Scanline::transparent(Precision::Wide, 3).unwrap();
    assert_eq!(line.len(), 3);
    assert!(!line.is_empty());
    assert_eq!(line, Scanline::Wide(vec![Argb::TRANSPARENT; 3]));
}
