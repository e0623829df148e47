use super::*;

fn close(a: Argb, b: Argb) -> bool {
    let eps = 1e-5;
    (a.a - b.a).abs() < eps
        && (a.r - b.r).abs() < eps
        && (a.g - b.g).abs() < eps
        && (a.b - b.b).abs() < eps
}

fn run(op: Operator, d: Argb, s: Argb, mask: Option<Argb>, ca: bool) -> Argb {
    let combiner = lookup_float(op);
    let mut dest = [d];
    let mask_row = mask.map(|m| [m]);
    combine_row_float(&combiner, ca, &mut dest, &[s], mask_row.as_ref().map(|m| &m[..]));
    dest[0]
}

const OPAQUE_RED: Argb = Argb::new(1.0, 1.0, 0.0, 0.0);
const HALF_BLUE: Argb = Argb::new(0.5, 0.0, 0.0, 0.5);

#[test]
fn every_operator_has_a_float_combiner() {
    for &op in Operator::ALL {
        assert_eq!(lookup_float(op).op(), op);
    }
    assert!(!lookup_float(Operator::HslColor).has_component_alpha());
    assert!(lookup_float(Operator::SoftLight).has_component_alpha());
}

#[test]
fn porter_duff_matches_the_8_bit_results() {
    assert!(close(run(Operator::Over, HALF_BLUE, OPAQUE_RED, None, false), OPAQUE_RED));
    assert!(close(
        run(Operator::Over, OPAQUE_RED, HALF_BLUE, None, false),
        Argb::new(1.0, 0.5, 0.0, 0.5)
    ));
    assert!(close(run(Operator::Clear, HALF_BLUE, OPAQUE_RED, None, false), Argb::TRANSPARENT));
    assert!(close(run(Operator::Dst, HALF_BLUE, OPAQUE_RED, None, false), HALF_BLUE));
    assert!(close(
        run(Operator::Add, OPAQUE_RED, OPAQUE_RED, None, false),
        OPAQUE_RED
    ));
}

#[test]
fn disjoint_over_adds_non_overlapping_coverage() {
    let s = Argb::new(0.25, 0.25, 0.0, 0.0);
    let out = run(Operator::DisjointOver, HALF_BLUE, s, None, false);
    assert!(close(out, Argb::new(0.75, 0.25, 0.0, 0.5)));
}

#[test]
fn conjoint_over_hides_fully_overlapped_dest() {
    let s = Argb::new(0.5, 0.5, 0.0, 0.0);
    let out = run(Operator::ConjointOver, HALF_BLUE, s, None, false);
    assert!(close(out, s));
}

#[test]
fn disjoint_factors_treat_zero_alpha_as_one() {
    let out = run(Operator::DisjointOver, Argb::TRANSPARENT, HALF_BLUE, None, false);
    assert!(close(out, HALF_BLUE));
    let out = run(Operator::DisjointIn, HALF_BLUE, Argb::TRANSPARENT, None, false);
    assert!(close(out, Argb::TRANSPARENT));
}

#[test]
fn saturate_scales_source_into_remaining_room() {
    let out = run(Operator::Saturate, HALF_BLUE, OPAQUE_RED, None, false);
    assert!(close(out, Argb::new(1.0, 0.5, 0.0, 0.5)));
}

#[test]
fn unified_mask_scales_source() {
    let out = run(Operator::Src, Argb::TRANSPARENT, OPAQUE_RED, Some(HALF_BLUE), false);
    assert!(close(out, Argb::new(0.5, 0.5, 0.0, 0.0)));
}

#[test]
fn component_mask_scales_each_channel() {
    let white = Argb::new(1.0, 1.0, 1.0, 1.0);
    let mask = Argb::new(1.0, 1.0, 0.0, 0.25);
    let out = run(Operator::Src, Argb::TRANSPARENT, white, Some(mask), true);
    assert!(close(out, mask));

    let out = run(Operator::Over, white, Argb::new(1.0, 0.0, 0.0, 0.0), Some(mask), true);
    assert!(close(out, Argb::new(1.0, 0.0, 1.0, 0.75)));
}

#[test]
fn hsl_modes_ignore_component_masks() {
    let mask = Argb::new(0.5, 1.0, 0.0, 0.0);
    let grey = Argb::new(1.0, 0.4, 0.4, 0.4);
    let unified = run(Operator::HslLuminosity, grey, OPAQUE_RED, Some(mask), false);
    let ca = run(Operator::HslLuminosity, grey, OPAQUE_RED, Some(mask), true);
    assert_eq!(unified, ca);
}

#[test]
fn separable_identities() {
    let d = Argb::new(1.0, 0.25, 0.5, 0.75);
    let white = Argb::new(1.0, 1.0, 1.0, 1.0);
    let black = Argb::new(1.0, 0.0, 0.0, 0.0);
    assert!(close(run(Operator::Multiply, d, white, None, false), d));
    assert!(close(run(Operator::Screen, d, black, None, false), d));
    assert!(close(run(Operator::ColorDodge, black, d, None, false), black));
    assert!(close(run(Operator::ColorBurn, white, d, None, false), white));
    assert!(close(run(Operator::Difference, d, d, None, false), black));
}

#[test]
fn soft_light_over_transparent_dest_is_source() {
    let out = run(Operator::SoftLight, Argb::TRANSPARENT, HALF_BLUE, None, false);
    assert!(close(out, HALF_BLUE));
}

#[test]
fn hue_onto_grey_keeps_the_grey() {
    let grey = Argb::new(1.0, 0.4, 0.4, 0.4);
    let out = run(Operator::HslHue, grey, OPAQUE_RED, None, false);
    assert!(close(out, grey), "{out:?}");
}

#[test]
fn luminosity_takes_source_brightness() {
    let grey = Argb::new(1.0, 0.4, 0.4, 0.4);
    let bright = Argb::new(1.0, 0.8, 0.8, 0.8);
    let out = run(Operator::HslLuminosity, grey, bright, None, false);
    assert!(close(out, bright), "{out:?}");
}

#[test]
fn clip_preserves_luminosity() {
    let c = Rgb {
        r: 1.4,
        g: 0.2,
        b: -0.1,
    };
    let clipped = c.clip(1.0);
    assert!((clipped.lum() - c.lum()).abs() < 1e-5);
    assert!(clipped.max() <= 1.0 + 1e-6);
    assert!(clipped.min() >= -1e-6);
}

#[test]
fn with_sat_orders_channels() {
    let c = Rgb {
        r: 0.2,
        g: 0.8,
        b: 0.5,
    }
    .with_sat(0.3);
    assert_eq!(c.g, 0.3);
    assert_eq!(c.r, 0.0);
    assert!((c.b - 0.15).abs() < 1e-6);
}
