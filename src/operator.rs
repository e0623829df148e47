//! Compositing operators.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::error::PixError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operator {
    Clear,
    Src,
    Dst,
    Over,
    OverReverse,
    In,
    InReverse,
    Out,
    OutReverse,
    Atop,
    AtopReverse,
    Xor,
    Add,
    Saturate,

    DisjointClear,
    DisjointSrc,
    DisjointDst,
    DisjointOver,
    DisjointOverReverse,
    DisjointIn,
    DisjointInReverse,
    DisjointOut,
    DisjointOutReverse,
    DisjointAtop,
    DisjointAtopReverse,
    DisjointXor,

    ConjointClear,
    ConjointSrc,
    ConjointDst,
    ConjointOver,
    ConjointOverReverse,
    ConjointIn,
    ConjointInReverse,
    ConjointOut,
    ConjointOutReverse,
    ConjointAtop,
    ConjointAtopReverse,
    ConjointXor,

    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    HslHue,
    HslSaturation,
    HslColor,
    HslLuminosity,
}

impl Operator {
    pub const ALL: &'static [Operator] = &[
        Self::Clear,
        Self::Src,
        Self::Dst,
        Self::Over,
        Self::OverReverse,
        Self::In,
        Self::InReverse,
        Self::Out,
        Self::OutReverse,
        Self::Atop,
        Self::AtopReverse,
        Self::Xor,
        Self::Add,
        Self::Saturate,
        Self::DisjointClear,
        Self::DisjointSrc,
        Self::DisjointDst,
        Self::DisjointOver,
        Self::DisjointOverReverse,
        Self::DisjointIn,
        Self::DisjointInReverse,
        Self::DisjointOut,
        Self::DisjointOutReverse,
        Self::DisjointAtop,
        Self::DisjointAtopReverse,
        Self::DisjointXor,
        Self::ConjointClear,
        Self::ConjointSrc,
        Self::ConjointDst,
        Self::ConjointOver,
        Self::ConjointOverReverse,
        Self::ConjointIn,
        Self::ConjointInReverse,
        Self::ConjointOut,
        Self::ConjointOutReverse,
        Self::ConjointAtop,
        Self::ConjointAtopReverse,
        Self::ConjointXor,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::Darken,
        Self::Lighten,
        Self::ColorDodge,
        Self::ColorBurn,
        Self::HardLight,
        Self::SoftLight,
        Self::Difference,
        Self::Exclusion,
        Self::HslHue,
        Self::HslSaturation,
        Self::HslColor,
        Self::HslLuminosity,
    ];

    /// The 13 Porter-Duff operators.
    pub const PORTER_DUFF: &'static [Operator] = &[
        Self::Clear,
        Self::Src,
        Self::Dst,
        Self::Over,
        Self::OverReverse,
        Self::In,
        Self::InReverse,
        Self::Out,
        Self::OutReverse,
        Self::Atop,
        Self::AtopReverse,
        Self::Xor,
        Self::Add,
    ];

    /// Separable blend modes with an exact 8-bit formulation.
    pub const SEPARABLE_BLEND: &'static [Operator] = &[
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::Darken,
        Self::Lighten,
        Self::HardLight,
        Self::Difference,
        Self::Exclusion,
    ];

    pub fn is_disjoint(self) -> bool {
        matches!(
            self,
            Self::DisjointClear
                | Self::DisjointSrc
                | Self::DisjointDst
                | Self::DisjointOver
                | Self::DisjointOverReverse
                | Self::DisjointIn
                | Self::DisjointInReverse
                | Self::DisjointOut
                | Self::DisjointOutReverse
                | Self::DisjointAtop
                | Self::DisjointAtopReverse
                | Self::DisjointXor
        )
    }

    pub fn is_conjoint(self) -> bool {
        matches!(
            self,
            Self::ConjointClear
                | Self::ConjointSrc
                | Self::ConjointDst
                | Self::ConjointOver
                | Self::ConjointOverReverse
                | Self::ConjointIn
                | Self::ConjointInReverse
                | Self::ConjointOut
                | Self::ConjointOutReverse
                | Self::ConjointAtop
                | Self::ConjointAtopReverse
                | Self::ConjointXor
        )
    }

    pub fn is_hsl(self) -> bool {
        matches!(
            self,
            Self::HslHue | Self::HslSaturation | Self::HslColor | Self::HslLuminosity
        )
    }

    /// Kebab-case name, identical to the serde spelling.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Src => "src",
            Self::Dst => "dst",
            Self::Over => "over",
            Self::OverReverse => "over-reverse",
            Self::In => "in",
            Self::InReverse => "in-reverse",
            Self::Out => "out",
            Self::OutReverse => "out-reverse",
            Self::Atop => "atop",
            Self::AtopReverse => "atop-reverse",
            Self::Xor => "xor",
            Self::Add => "add",
            Self::Saturate => "saturate",
            Self::DisjointClear => "disjoint-clear",
            Self::DisjointSrc => "disjoint-src",
            Self::DisjointDst => "disjoint-dst",
            Self::DisjointOver => "disjoint-over",
            Self::DisjointOverReverse => "disjoint-over-reverse",
            Self::DisjointIn => "disjoint-in",
            Self::DisjointInReverse => "disjoint-in-reverse",
            Self::DisjointOut => "disjoint-out",
            Self::DisjointOutReverse => "disjoint-out-reverse",
            Self::DisjointAtop => "disjoint-atop",
            Self::DisjointAtopReverse => "disjoint-atop-reverse",
            Self::DisjointXor => "disjoint-xor",
            Self::ConjointClear => "conjoint-clear",
            Self::ConjointSrc => "conjoint-src",
            Self::ConjointDst => "conjoint-dst",
            Self::ConjointOver => "conjoint-over",
            Self::ConjointOverReverse => "conjoint-over-reverse",
            Self::ConjointIn => "conjoint-in",
            Self::ConjointInReverse => "conjoint-in-reverse",
            Self::ConjointOut => "conjoint-out",
            Self::ConjointOutReverse => "conjoint-out-reverse",
            Self::ConjointAtop => "conjoint-atop",
            Self::ConjointAtopReverse => "conjoint-atop-reverse",
            Self::ConjointXor => "conjoint-xor",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Overlay => "overlay",
            Self::Darken => "darken",
            Self::Lighten => "lighten",
            Self::ColorDodge => "color-dodge",
            Self::ColorBurn => "color-burn",
            Self::HardLight => "hard-light",
            Self::SoftLight => "soft-light",
            Self::Difference => "difference",
            Self::Exclusion => "exclusion",
            Self::HslHue => "hsl-hue",
            Self::HslSaturation => "hsl-saturation",
            Self::HslColor => "hsl-color",
            Self::HslLuminosity => "hsl-luminosity",
        }
    }
}

impl FromStr for Operator {
    type Err = PixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        let same = |name: &str| {
            name.len() == key.len()
                && name.bytes().zip(key.bytes()).all(|(n, k)| {
                    n == k.to_ascii_lowercase() || (n == b'-' && k == b'_')
                })
        };
        Self::ALL
            .iter()
            .copied()
            .find(|op| same(op.name()))
            .ok_or_else(|| PixError::configuration(format!("unknown operator: {s}")))
    }
}

#[cfg(test)]
#[path = "../tests/unit/operator.rs"]
mod tests;
