use super::*;
use crate::composite::{Extents, analyze_extent};
use crate::pipeline::dispatch::{CompositeKernel, Engine, GeneralEngine};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn premultiplied(rng: &mut StdRng) -> u32 {
    let a: u8 = match rng.gen_range(0..4) {
        0 => 0,
        1 => 255,
        _ => rng.r#gen(),
    };
    let [r, g, b] = [0; 3].map(|_: u8| u32::from(rng.gen_range(0..=a)));
    (u32::from(a) << 24) | (r << 16) | (g << 8) | b
}

fn random_image(rng: &mut StdRng, format: PixelFormat, w: u32, h: u32) -> Image<'static> {
    let mut image = Image::new_owned(format, w, h).unwrap();
    for y in 0..h {
        for x in 0..w {
            let p = premultiplied(rng);
            image.set_pixel(x, y, p).unwrap();
        }
    }
    image
}

fn seeded(seed: u64, format: PixelFormat, w: u32, h: u32) -> impl Fn() -> Image<'static> + Copy {
    move || random_image(&mut StdRng::seed_from_u64(seed), format, w, h)
}

fn flags_over(image: &Image<'_>, w: i32, h: i32) -> Flags {
    let mut flags = image.flags();
    let extents = Extents { x1: 0, y1: 0, x2: w, y2: h };
    assert!(analyze_extent(image, &extents, &mut flags));
    flags
}

/// Runs the request through the selected fast path and the general engine and compares.
fn check(
    expect: &str,
    op: Operator,
    src: &Image<'_>,
    mask: Option<&Image<'_>>,
    make_dest: impl Fn() -> Image<'static>,
) {
    let mut fast = make_dest();
    let mut general = make_dest();
    let (w, h) = (fast.width() as i32, fast.height() as i32);
    let info = CompositeInfo {
        op,
        src,
        mask,
        src_flags: flags_over(src, w, h),
        mask_flags: mask.map_or(Flags::IS_OPAQUE | Flags::NO_ALPHA_MAP, |m| flags_over(m, w, h)),
        dest_flags: fast.flags(),
        src_x: 0,
        src_y: 0,
        mask_x: 0,
        mask_y: 0,
        dest_x: 0,
        dest_y: 0,
        width: w,
        height: h,
    };
    let engine = Engine::default();
    let selection = engine.select(&info, &fast);
    assert_eq!(selection.name, expect);
    selection.kernel.run(&info, &mut fast).unwrap();
    GeneralEngine.run(&info, &mut general).unwrap();
    for y in 0..h as u32 {
        for x in 0..w as u32 {
            assert_eq!(fast.pixel(x, y), general.pixel(x, y), "{expect} at ({x}, {y})");
        }
    }
}

#[test]
fn table_starts_with_clear() {
    let table = table();
    assert_eq!(table[0].name, "clear");
    assert!(table.iter().all(|fp| fp.dest_flags.contains(Flags::STD_DEST)));
}

#[test]
fn copies_match_the_general_engine() {
    let mut rng = StdRng::seed_from_u64(1);
    let src = random_image(&mut rng, PixelFormat::A8R8G8B8, 7, 5);
    let seed = rng.r#gen::<u64>();
    let dest = |format| seeded(seed, format, 7, 5);
    check("clear", Operator::Clear, &src, None, dest(PixelFormat::A8R8G8B8));
    check("src_copy", Operator::Src, &src, None, dest(PixelFormat::A8R8G8B8));
    check("src_x888", Operator::Src, &src, None, dest(PixelFormat::X8R8G8B8));

    let opaque = random_image(&mut rng, PixelFormat::X8R8G8B8, 7, 5);
    check("src_x888_8888", Operator::Src, &opaque, None, dest(PixelFormat::A8R8G8B8));

    let solid = Image::solid(0x8040_2010);
    check("solid_fill", Operator::Src, &solid, None, dest(PixelFormat::R5G6B5));
    check("solid_fill", Operator::Src, &solid, None, dest(PixelFormat::A8));
}

#[test]
fn over_matches_the_general_engine() {
    let mut rng = StdRng::seed_from_u64(2);
    let src = random_image(&mut rng, PixelFormat::A8R8G8B8, 9, 4);
    for format in [PixelFormat::A8R8G8B8, PixelFormat::X8R8G8B8, PixelFormat::R5G6B5] {
        let seed = rng.r#gen::<u64>();
        let dest = seeded(seed, format, 9, 4);
        check("over_8888", Operator::Over, &src, None, dest);
    }

    let bgr = random_image(&mut rng, PixelFormat::A8B8G8R8, 9, 4);
    let seed = rng.r#gen::<u64>();
    check("over_8888", Operator::Over, &bgr, None, seeded(seed, PixelFormat::B5G6R5, 9, 4));
}

#[test]
fn masked_solids_match_the_general_engine() {
    let mut rng = StdRng::seed_from_u64(3);
    let solid = Image::solid(premultiplied(&mut rng));
    let a8 = random_image(&mut rng, PixelFormat::A8, 6, 6);
    let mut ca = Image::new_owned(PixelFormat::A8R8G8B8, 6, 6).unwrap();
    for y in 0..6 {
        for x in 0..6 {
            ca.set_pixel(x, y, rng.r#gen()).unwrap();
        }
    }
    ca.set_component_alpha(true);

    for format in [PixelFormat::A8R8G8B8, PixelFormat::R5G6B5] {
        let seed = rng.r#gen::<u64>();
        let dest = seeded(seed, format, 6, 6);
        check("over_n_8", Operator::Over, &solid, Some(&a8), dest);
        check("over_n_8888_ca", Operator::Over, &solid, Some(&ca), dest);
    }
}

#[test]
fn alpha_only_paths_match_the_general_engine() {
    let mut rng = StdRng::seed_from_u64(4);
    let src = random_image(&mut rng, PixelFormat::A8, 11, 3);
    let mask = random_image(&mut rng, PixelFormat::A8, 11, 3);
    let solid = Image::solid(0x9000_0000);
    let seed = rng.r#gen::<u64>();
    let dest = seeded(seed, PixelFormat::A8, 11, 3);

    check("add_8_8", Operator::Add, &src, None, dest);
    check("add_n_8_8", Operator::Add, &solid, Some(&mask), dest);
    check("in_8_8", Operator::In, &src, None, dest);
    check("in_n_8_8", Operator::In, &solid, Some(&mask), dest);

    let argb = random_image(&mut rng, PixelFormat::A8R8G8B8, 11, 3);
    check("add_8888", Operator::Add, &argb, None, seeded(seed, PixelFormat::A8R8G8B8, 11, 3));
}

#[test]
fn scaled_sources_match_the_general_engine() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut src = random_image(&mut rng, PixelFormat::A8R8G8B8, 16, 12);
    src.set_transform(Some(Transform::scale(2.0, 1.5)));
    let seed = rng.r#gen::<u64>();
    let dest = seeded(seed, PixelFormat::A8R8G8B8, 8, 8);
    check("nearest_scaled_src", Operator::Src, &src, None, dest);
    check("nearest_scaled_over", Operator::Over, &src, None, dest);

    // Mirrored: a negative scale with the translation that brings it back on the image.
    let mut mirrored = random_image(&mut rng, PixelFormat::A8R8G8B8, 8, 8);
    mirrored.set_transform(Some(Transform::from_matrix([
        [-FIXED_ONE, 0, int_to_fixed(8)],
        [0, FIXED_ONE, 0],
        [0, 0, FIXED_ONE],
    ])));
    check("nearest_scaled_src", Operator::Src, &mirrored, None, dest);
}

#[test]
fn quarter_turns_match_the_general_engine() {
    let mut rng = StdRng::seed_from_u64(6);
    let seed = rng.r#gen::<u64>();
    let dest = seeded(seed, PixelFormat::X8R8G8B8, 5, 5);
    for (a, b, tx, ty) in [(-FIXED_ONE, FIXED_ONE, 5, 0), (FIXED_ONE, -FIXED_ONE, 0, 5)] {
        let mut src = random_image(&mut rng, PixelFormat::X8R8G8B8, 5, 5);
        src.set_transform(Some(Transform::from_matrix([
            [0, a, int_to_fixed(tx)],
            [b, 0, int_to_fixed(ty)],
            [0, 0, FIXED_ONE],
        ])));
        check("rotate_src", Operator::Src, &src, None, dest);
    }
}

#[test]
fn uncovered_sources_are_not_taken() {
    let mut rng = StdRng::seed_from_u64(7);
    let src = random_image(&mut rng, PixelFormat::A8R8G8B8, 3, 3);
    check("general", Operator::Over, &src, None, || {
        Image::new_owned(PixelFormat::A8R8G8B8, 5, 5).unwrap()
    });
}

#[test]
fn masked_kernels_reject_a_missing_mask() {
    let solid = Image::solid(0xff80_4020);
    for name in ["over_n_8", "over_n_8888_ca", "add_n_8_8", "in_n_8_8"] {
        let fp = table().into_iter().find(|fp| fp.name == name).unwrap();
        let format = match fp.dest {
            FormatMatch::Exact(format) => format,
            _ => PixelFormat::A8R8G8B8,
        };
        let mut dest = Image::new_owned(format, 3, 2).unwrap();
        dest.set_pixel(1, 1, 0xff00_0000).unwrap();
        let before = dest.pixel(1, 1);
        let info = CompositeInfo {
            op: fp.op,
            src: &solid,
            mask: None,
            src_flags: solid.flags(),
            mask_flags: Flags::IS_OPAQUE | Flags::NO_ALPHA_MAP,
            dest_flags: dest.flags(),
            src_x: 0,
            src_y: 0,
            mask_x: 0,
            mask_y: 0,
            dest_x: 0,
            dest_y: 0,
            width: 3,
            height: 2,
        };
        let err = (fp.kernel)(&info, &mut dest).unwrap_err();
        assert!(err.to_string().contains("requires a mask"), "{name}: {err}");
        assert_eq!(dest.pixel(1, 1), before, "{name}");
    }
}
