use super::*;

fn run(op: Operator, d: u32, s: u32, mask: Option<u32>, ca: bool) -> u32 {
    let entry = lookup(op).unwrap();
    let mut dest = [d];
    let mask_row = mask.map(|m| [m]);
    combine_row(entry, ca, &mut dest, &[s], mask_row.as_ref().map(|m| &m[..]));
    dest[0]
}

#[test]
fn every_core_operator_has_a_narrow_combiner() {
    for &op in Operator::PORTER_DUFF.iter().chain(Operator::SEPARABLE_BLEND) {
        let entry = lookup(op).unwrap_or_else(|| panic!("{op:?} missing"));
        assert_eq!(entry.op, op);
        assert_eq!(entry.component_alpha.is_none(), op == Operator::Dst);
    }
    assert!(lookup(Operator::HslHue).is_none());
    assert!(lookup(Operator::DisjointOver).is_none());
    assert!(lookup(Operator::SoftLight).is_none());
}

#[test]
fn porter_duff_basics() {
    let d = 0x8040_2010;
    let opaque = 0xff11_2233;
    assert_eq!(run(Operator::Clear, d, opaque, None, false), 0);
    assert_eq!(run(Operator::Src, d, opaque, None, false), opaque);
    assert_eq!(run(Operator::Dst, d, opaque, None, false), d);
    assert_eq!(run(Operator::Over, d, opaque, None, false), opaque);
    assert_eq!(run(Operator::Over, d, 0, None, false), d);
    assert_eq!(run(Operator::OverReverse, 0xff00_0000, opaque, None, false), 0xff00_0000);
    assert_eq!(run(Operator::In, 0, opaque, None, false), 0);
    assert_eq!(run(Operator::Out, 0xff00_0000, opaque, None, false), 0);
    assert_eq!(run(Operator::Xor, 0xff00_0000, opaque, None, false), 0);
    assert_eq!(run(Operator::Atop, 0xff00_0000, opaque, None, false), opaque);
}

#[test]
fn over_keeps_color_within_alpha() {
    let pixels = [0u32, 0x0101_0101, 0x8080_0000, 0x7f40_7f00, 0xffff_ffff, 0x4020_1000];
    for &s in &pixels {
        for &d in &pixels {
            for m in [None, Some(0x8000_0000), Some(0x3300_0000)] {
                let out = run(Operator::Over, d, s, m, false);
                let a = alpha(out);
                assert!(red(out) <= a && green(out) <= a && blue(out) <= a, "{s:#x} over {d:#x}");
            }
        }
    }
}

#[test]
fn add_saturates_instead_of_wrapping() {
    assert_eq!(run(Operator::Add, 0xffff_ffff, 0xffff_ffff, None, false), 0xffff_ffff);
    assert_eq!(run(Operator::Add, 0x8080_8080, 0x8001_0203, None, false), 0xff81_8283);
}

#[test]
fn unified_mask_scales_source() {
    assert_eq!(run(Operator::Src, 0, 0xffff_ffff, Some(0x80ff_ffff), false), 0x8080_8080);
    assert_eq!(run(Operator::Over, 0x1234_5678, 0xffff_ffff, Some(0x00ff_ffff), false), 0x1234_5678);
}

#[test]
fn component_mask_splits_channels() {
    let s = 0xffff_ffff;
    let m = 0x00ff_0080;
    assert_eq!(run(Operator::Src, 0, s, Some(m), true), 0x00ff_0080);
    // unified reading of the same mask is its alpha: transparent
    assert_eq!(run(Operator::Src, 0, s, Some(m), false), 0);
    let over = run(Operator::Over, 0xff00_0000, 0xff00_ff00, Some(0xffff_0000), true);
    assert_eq!(over, 0xff00_0000);
}

#[test]
fn dst_ignores_component_masks() {
    assert_eq!(run(Operator::Dst, 0x1122_3344, 0xffff_ffff, Some(0xff00_ff00), true), 0x1122_3344);
}

#[test]
fn saturate_fills_remaining_coverage() {
    let out = run(Operator::Saturate, 0x8000_0000, 0xffff_0000, None, false);
    assert_eq!(alpha(out), 0xff);
    assert_eq!(red(out), 0x7f);
    assert_eq!(run(Operator::Saturate, 0x1000_0000, 0x4040_0000, None, false), 0x5040_0000);
}

#[test]
fn blend_identities_on_opaque_pixels() {
    let d = 0xff40_80c0;
    assert_eq!(run(Operator::Multiply, d, 0xffff_ffff, None, false), d);
    assert_eq!(run(Operator::Screen, d, 0xff00_0000, None, false), d);
    assert_eq!(run(Operator::Darken, d, 0xffff_ffff, None, false), d);
    assert_eq!(run(Operator::Lighten, d, 0xff00_0000, None, false), d);
    assert_eq!(run(Operator::Difference, d, 0xff00_0000, None, false), d);
    assert_eq!(run(Operator::Difference, d, d, None, false), 0xff00_0000);
    assert_eq!(run(Operator::Exclusion, d, 0xff00_0000, None, false), d);
}

#[test]
fn overlay_and_hard_light_mirror_each_other() {
    let a = 0xff30_c080;
    let b = 0xffa0_2060;
    assert_eq!(
        run(Operator::Overlay, a, b, None, false),
        run(Operator::HardLight, b, a, None, false)
    );
}

#[test]
fn blends_over_transparent_dest_copy_source() {
    let s = 0x8040_2000;
    for &op in Operator::SEPARABLE_BLEND {
        assert_eq!(run(op, 0, s, None, false), s, "{op:?}");
    }
}
