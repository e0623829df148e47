//! Wide (float) combiners for every operator.
//!
//! Porter-Duff style operators are expressed as a pair of blend factors applied to source
//! and destination; blend modes follow the premultiplied separable form
//! `(1 - sa) d + (1 - da) s + B(s, d)` and the non-separable HSL modes.

use crate::foundation::math::Argb;
use crate::operator::Operator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Factor {
    Zero,
    One,
    SrcAlpha,
    DestAlpha,
    InvSa,
    InvDa,
    SaOverDa,
    DaOverSa,
    InvSaOverDa,
    InvDaOverSa,
    OneMinusSaOverDa,
    OneMinusDaOverSa,
    OneMinusInvDaOverSa,
    OneMinusInvSaOverDa,
}

#[inline]
fn is_zero(f: f32) -> bool {
    -f32::MIN_POSITIVE < f && f < f32::MIN_POSITIVE
}

#[inline]
fn clamp01(f: f32) -> f32 {
    f.clamp(0.0, 1.0)
}

fn factor(kind: Factor, sa: f32, da: f32) -> f32 {
    use Factor::*;
    match kind {
        Zero => 0.0,
        One => 1.0,
        SrcAlpha => sa,
        DestAlpha => da,
        InvSa => 1.0 - sa,
        InvDa => 1.0 - da,
        SaOverDa if is_zero(da) => 1.0,
        SaOverDa => clamp01(sa / da),
        DaOverSa if is_zero(sa) => 1.0,
        DaOverSa => clamp01(da / sa),
        InvSaOverDa if is_zero(da) => 1.0,
        InvSaOverDa => clamp01((1.0 - sa) / da),
        InvDaOverSa if is_zero(sa) => 1.0,
        InvDaOverSa => clamp01((1.0 - da) / sa),
        OneMinusSaOverDa if is_zero(da) => 0.0,
        OneMinusSaOverDa => clamp01(1.0 - sa / da),
        OneMinusDaOverSa if is_zero(sa) => 0.0,
        OneMinusDaOverSa => clamp01(1.0 - da / sa),
        OneMinusInvDaOverSa if is_zero(sa) => 0.0,
        OneMinusInvDaOverSa => clamp01(1.0 - (1.0 - da) / sa),
        OneMinusInvSaOverDa if is_zero(da) => 0.0,
        OneMinusInvSaOverDa => clamp01(1.0 - (1.0 - sa) / da),
    }
}

type BlendFn = fn(sa: f32, s: f32, da: f32, d: f32) -> f32;
type HslFn = fn(dest: Rgb, da: f32, src: Rgb, sa: f32) -> Rgb;

#[derive(Clone, Copy)]
enum Kind {
    PorterDuff(Factor, Factor),
    Separable(BlendFn),
    Hsl(HslFn),
}

/// A wide combiner: how `op` mixes one source and destination pixel.
#[derive(Clone, Copy)]
pub struct FloatCombiner {
    op: Operator,
    kind: Kind,
}

impl std::fmt::Debug for FloatCombiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloatCombiner").field("op", &self.op).finish()
    }
}

impl FloatCombiner {
    pub fn op(&self) -> Operator {
        self.op
    }

    /// HSL modes are defined for unified alpha only.
    pub fn has_component_alpha(&self) -> bool {
        !matches!(self.kind, Kind::Hsl(_))
    }
}

/// The wide combiner for `op`. Every operator has one.
pub fn lookup_float(op: Operator) -> FloatCombiner {
    use Factor::*;
    use Operator as O;
    let kind = match op {
        O::Clear | O::DisjointClear | O::ConjointClear => Kind::PorterDuff(Zero, Zero),
        O::Src | O::DisjointSrc | O::ConjointSrc => Kind::PorterDuff(One, Zero),
        O::Dst | O::DisjointDst | O::ConjointDst => Kind::PorterDuff(Zero, One),
        O::Over => Kind::PorterDuff(One, InvSa),
        O::OverReverse => Kind::PorterDuff(InvDa, One),
        O::In => Kind::PorterDuff(DestAlpha, Zero),
        O::InReverse => Kind::PorterDuff(Zero, SrcAlpha),
        O::Out => Kind::PorterDuff(InvDa, Zero),
        O::OutReverse => Kind::PorterDuff(Zero, InvSa),
        O::Atop => Kind::PorterDuff(DestAlpha, InvSa),
        O::AtopReverse => Kind::PorterDuff(InvDa, SrcAlpha),
        O::Xor => Kind::PorterDuff(InvDa, InvSa),
        O::Add => Kind::PorterDuff(One, One),
        O::Saturate => Kind::PorterDuff(InvDaOverSa, One),

        O::DisjointOver => Kind::PorterDuff(One, InvSaOverDa),
        O::DisjointOverReverse => Kind::PorterDuff(InvDaOverSa, One),
        O::DisjointIn => Kind::PorterDuff(OneMinusInvDaOverSa, Zero),
        O::DisjointInReverse => Kind::PorterDuff(Zero, OneMinusInvSaOverDa),
        O::DisjointOut => Kind::PorterDuff(InvDaOverSa, Zero),
        O::DisjointOutReverse => Kind::PorterDuff(Zero, InvSaOverDa),
        O::DisjointAtop => Kind::PorterDuff(OneMinusInvDaOverSa, InvSaOverDa),
        O::DisjointAtopReverse => Kind::PorterDuff(InvDaOverSa, OneMinusInvSaOverDa),
        O::DisjointXor => Kind::PorterDuff(InvDaOverSa, InvSaOverDa),

        O::ConjointOver => Kind::PorterDuff(One, OneMinusSaOverDa),
        O::ConjointOverReverse => Kind::PorterDuff(OneMinusDaOverSa, One),
        O::ConjointIn => Kind::PorterDuff(DaOverSa, Zero),
        O::ConjointInReverse => Kind::PorterDuff(Zero, SaOverDa),
        O::ConjointOut => Kind::PorterDuff(OneMinusDaOverSa, Zero),
        O::ConjointOutReverse => Kind::PorterDuff(Zero, OneMinusSaOverDa),
        O::ConjointAtop => Kind::PorterDuff(DaOverSa, OneMinusSaOverDa),
        O::ConjointAtopReverse => Kind::PorterDuff(OneMinusDaOverSa, SaOverDa),
        O::ConjointXor => Kind::PorterDuff(OneMinusDaOverSa, OneMinusSaOverDa),

        O::Multiply => Kind::Separable(blend_multiply),
        O::Screen => Kind::Separable(blend_screen),
        O::Overlay => Kind::Separable(blend_overlay),
        O::Darken => Kind::Separable(blend_darken),
        O::Lighten => Kind::Separable(blend_lighten),
        O::ColorDodge => Kind::Separable(blend_color_dodge),
        O::ColorBurn => Kind::Separable(blend_color_burn),
        O::HardLight => Kind::Separable(blend_hard_light),
        O::SoftLight => Kind::Separable(blend_soft_light),
        O::Difference => Kind::Separable(blend_difference),
        O::Exclusion => Kind::Separable(blend_exclusion),

        O::HslHue => Kind::Hsl(blend_hsl_hue),
        O::HslSaturation => Kind::Hsl(blend_hsl_saturation),
        O::HslColor => Kind::Hsl(blend_hsl_color),
        O::HslLuminosity => Kind::Hsl(blend_hsl_luminosity),
    };
    FloatCombiner { op, kind }
}

/// Combines one wide row in place.
///
/// With `component_alpha` the mask's color channels scale the matching source channels;
/// otherwise (and always for HSL modes) only the mask alpha is used.
pub fn combine_row_float(
    combiner: &FloatCombiner,
    component_alpha: bool,
    dest: &mut [Argb],
    src: &[Argb],
    mask: Option<&[Argb]>,
) {
    let component_alpha = component_alpha && combiner.has_component_alpha();
    for (i, d) in dest.iter_mut().enumerate() {
        let s = src[i];
        // (source, per-channel source alpha)
        let (s, m) = match mask {
            None => (s, Argb::new(s.a, s.a, s.a, s.a)),
            Some(mask) if component_alpha => {
                let m = mask[i];
                (
                    Argb::new(m.a * s.a, s.r * m.r, s.g * m.g, s.b * m.b),
                    Argb::new(m.a * s.a, m.r * s.a, m.g * s.a, m.b * s.a),
                )
            }
            Some(mask) => {
                let s = s.scale(mask[i].a);
                (s, Argb::new(s.a, s.a, s.a, s.a))
            }
        };
        *d = combine_pixel(combiner.kind, s, m, *d);
    }
}

fn combine_pixel(kind: Kind, s: Argb, m: Argb, d: Argb) -> Argb {
    match kind {
        Kind::PorterDuff(fa, fb) => {
            let ch = |sa: f32, sc: f32, dc: f32| {
                (sc * factor(fa, sa, d.a) + dc * factor(fb, sa, d.a)).min(1.0)
            };
            Argb::new(ch(m.a, s.a, d.a), ch(m.r, s.r, d.r), ch(m.g, s.g, d.g), ch(m.b, s.b, d.b))
        }
        Kind::Separable(blend) => {
            let ch = |sa: f32, sc: f32, dc: f32| {
                (1.0 - sa) * dc + (1.0 - d.a) * sc + blend(sa, sc, d.a, dc)
            };
            Argb::new(
                d.a + m.a - d.a * m.a,
                ch(m.r, s.r, d.r),
                ch(m.g, s.g, d.g),
                ch(m.b, s.b, d.b),
            )
        }
        Kind::Hsl(blend) => {
            let (sa, da) = (s.a, d.a);
            let sc = Rgb::of(s);
            let dc = Rgb::of(d);
            let rc = blend(dc, da, sc, sa);
            Argb::new(
                sa + da - sa * da,
                (1.0 - sa) * dc.r + (1.0 - da) * sc.r + rc.r,
                (1.0 - sa) * dc.g + (1.0 - da) * sc.g + rc.g,
                (1.0 - sa) * dc.b + (1.0 - da) * sc.b + rc.b,
            )
        }
    }
}

fn blend_multiply(_sa: f32, s: f32, _da: f32, d: f32) -> f32 {
    d * s
}

fn blend_screen(sa: f32, s: f32, da: f32, d: f32) -> f32 {
    d * sa + s * da - s * d
}

fn blend_overlay(sa: f32, s: f32, da: f32, d: f32) -> f32 {
    if 2.0 * d < da {
        2.0 * s * d
    } else {
        sa * da - 2.0 * (da - d) * (sa - s)
    }
}

fn blend_darken(sa: f32, s: f32, da: f32, d: f32) -> f32 {
    (s * da).min(d * sa)
}

fn blend_lighten(sa: f32, s: f32, da: f32, d: f32) -> f32 {
    (s * da).max(d * sa)
}

fn blend_color_dodge(sa: f32, s: f32, da: f32, d: f32) -> f32 {
    if is_zero(d) {
        0.0
    } else if d * sa >= sa * da - s * da || is_zero(sa - s) {
        sa * da
    } else {
        sa * sa * d / (sa - s)
    }
}

fn blend_color_burn(sa: f32, s: f32, da: f32, d: f32) -> f32 {
    if d >= da {
        sa * da
    } else if sa * (da - d) >= s * da || is_zero(s) {
        0.0
    } else {
        sa * (da - sa * (da - d) / s)
    }
}

fn blend_hard_light(sa: f32, s: f32, da: f32, d: f32) -> f32 {
    if 2.0 * s < sa {
        2.0 * s * d
    } else {
        sa * da - 2.0 * (da - d) * (sa - s)
    }
}

fn blend_soft_light(sa: f32, s: f32, da: f32, d: f32) -> f32 {
    if is_zero(da) {
        return d * sa;
    }
    if 2.0 * s <= sa {
        d * sa - d * (da - d) * (sa - 2.0 * s) / da
    } else if 4.0 * d <= da {
        d * sa + (2.0 * s - sa) * d * ((16.0 * d / da - 12.0) * d / da + 3.0)
    } else {
        d * sa + ((d * da).sqrt() - d) * (2.0 * s - sa)
    }
}

fn blend_difference(sa: f32, s: f32, da: f32, d: f32) -> f32 {
    (s * da - d * sa).abs()
}

fn blend_exclusion(sa: f32, s: f32, da: f32, d: f32) -> f32 {
    s * da + d * sa - 2.0 * d * s
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Rgb {
    r: f32,
    g: f32,
    b: f32,
}

impl Rgb {
    fn of(p: Argb) -> Self {
        Self {
            r: p.r,
            g: p.g,
            b: p.b,
        }
    }

    fn scale(self, k: f32) -> Self {
        Self {
            r: self.r * k,
            g: self.g * k,
            b: self.b * k,
        }
    }

    fn min(self) -> f32 {
        self.r.min(self.g).min(self.b)
    }

    fn max(self) -> f32 {
        self.r.max(self.g).max(self.b)
    }

    fn lum(self) -> f32 {
        self.r * 0.3 + self.g * 0.59 + self.b * 0.11
    }

    fn sat(self) -> f32 {
        self.max() - self.min()
    }

    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            r: f(self.r),
            g: f(self.g),
            b: f(self.b),
        }
    }

    /// Pulls out-of-gamut channels back into `0..=a` while preserving luminosity.
    fn clip(self, a: f32) -> Self {
        let l = self.lum();
        let n = self.min();
        let x = self.max();
        let mut c = self;
        if n < 0.0 {
            let t = l - n;
            c = if is_zero(t) {
                Self {
                    r: 0.0,
                    g: 0.0,
                    b: 0.0,
                }
            } else {
                c.map(|v| l + (v - l) * l / t)
            };
        }
        if x > a {
            let t = x - l;
            c = if is_zero(t) {
                Self { r: a, g: a, b: a }
            } else {
                c.map(|v| l + (v - l) * (a - l) / t)
            };
        }
        c
    }

    fn with_lum(self, a: f32, l: f32) -> Self {
        let d = l - self.lum();
        self.map(|v| v + d).clip(a)
    }

    fn with_sat(self, sat: f32) -> Self {
        let mut ch = [self.r, self.g, self.b];
        let mut idx = [0usize, 1, 2];
        idx.sort_by(|&i, &j| ch[i].total_cmp(&ch[j]));
        let [min, mid, max] = idx;
        let t = ch[max] - ch[min];
        if is_zero(t) {
            ch[mid] = 0.0;
            ch[max] = 0.0;
        } else {
            ch[mid] = (ch[mid] - ch[min]) * sat / t;
            ch[max] = sat;
        }
        ch[min] = 0.0;
        Self {
            r: ch[0],
            g: ch[1],
            b: ch[2],
        }
    }
}

fn blend_hsl_hue(dest: Rgb, da: f32, src: Rgb, sa: f32) -> Rgb {
    src.scale(da)
        .with_sat(dest.sat() * sa)
        .with_lum(sa * da, dest.lum() * sa)
}

fn blend_hsl_saturation(dest: Rgb, da: f32, src: Rgb, sa: f32) -> Rgb {
    dest.scale(sa)
        .with_sat(src.sat() * da)
        .with_lum(sa * da, dest.lum() * sa)
}

fn blend_hsl_color(dest: Rgb, da: f32, src: Rgb, sa: f32) -> Rgb {
    src.scale(da).with_lum(sa * da, dest.lum() * sa)
}

fn blend_hsl_luminosity(dest: Rgb, da: f32, src: Rgb, sa: f32) -> Rgb {
    dest.scale(sa).with_lum(sa * da, src.lum() * da)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/combine_float.rs"]
mod tests;
