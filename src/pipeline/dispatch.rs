//! Fast-path selection.
//!
//! An [`Implementation`] is an ordered list of [`FastPath`] entries. A request is matched
//! against each entry in turn; the first entry whose operator, formats and required flags all
//! match wins, and the general engine runs when nothing does.

use std::sync::OnceLock;

use crate::foundation::error::PixResult;
use crate::format::PixelFormat;
use crate::image::{Flags, Image};
use crate::operator::Operator;
use crate::pipeline::{fast_path, general};

/// One composite request after region clipping and operator reduction.
///
/// Coordinates are already translated for the clipped rectangle; `width` and `height` are
/// positive.
#[derive(Clone, Copy, Debug)]
pub struct CompositeInfo<'i> {
    pub op: Operator,
    pub src: &'i Image<'i>,
    /// `None` when there is no mask or the mask is known to be opaque.
    pub mask: Option<&'i Image<'i>>,
    pub src_flags: Flags,
    pub mask_flags: Flags,
    pub dest_flags: Flags,
    pub src_x: i32,
    pub src_y: i32,
    pub mask_x: i32,
    pub mask_y: i32,
    pub dest_x: i32,
    pub dest_y: i32,
    pub width: i32,
    pub height: i32,
}

/// Something that can composite a request into a destination.
pub trait CompositeKernel: Send + Sync {
    fn run(&self, info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()>;
}

pub type KernelFn = fn(&CompositeInfo<'_>, &mut Image<'_>) -> PixResult<()>;

impl CompositeKernel for KernelFn {
    fn run(&self, info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
        self(info, dest)
    }
}

/// The reference engine: sample, combine and store row by row.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeneralEngine;

impl CompositeKernel for GeneralEngine {
    fn run(&self, info: &CompositeInfo<'_>, dest: &mut Image<'_>) -> PixResult<()> {
        general::composite_general(info, dest)
    }
}

/// Which images a fast-path slot accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatMatch {
    /// Any image, or no image at all.
    Any,
    /// No mask (or an opaque one that was dropped).
    Null,
    /// A 1x1 repeating image.
    Solid,
    Exact(PixelFormat),
}

impl FormatMatch {
    fn matches(self, image: Option<&Image<'_>>) -> bool {
        match (self, image) {
            (Self::Any, _) => true,
            (Self::Null, None) => true,
            (Self::Solid, Some(image)) => image.flags().contains(Flags::SOLID),
            (Self::Exact(format), Some(image)) => image.format() == format,
            _ => false,
        }
    }
}

/// One dispatch-table row.
#[derive(Clone, Copy)]
pub struct FastPath {
    pub name: &'static str,
    pub op: Operator,
    pub src: FormatMatch,
    pub src_flags: Flags,
    pub mask: FormatMatch,
    pub mask_flags: Flags,
    pub dest: FormatMatch,
    pub dest_flags: Flags,
    pub kernel: KernelFn,
}

impl std::fmt::Debug for FastPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastPath")
            .field("name", &self.name)
            .field("op", &self.op)
            .finish()
    }
}

impl FastPath {
    /// Whether this entry accepts the request. Pure and total.
    pub fn matches(&self, info: &CompositeInfo<'_>, dest: &Image<'_>) -> bool {
        self.op == info.op
            && self.src.matches(Some(info.src))
            && info.src_flags.contains(self.src_flags)
            && self.mask.matches(info.mask)
            && info.mask_flags.contains(self.mask_flags)
            && self.dest.matches(Some(dest))
            && info.dest_flags.contains(self.dest_flags)
    }
}

/// An ordered fast-path table.
#[derive(Debug)]
pub struct Implementation {
    fast_paths: Vec<FastPath>,
}

impl Implementation {
    pub fn new(fast_paths: Vec<FastPath>) -> Self {
        Self { fast_paths }
    }

    pub fn fast_paths(&self) -> &[FastPath] {
        &self.fast_paths
    }
}

/// The portable kernel set, built once per process.
pub fn implementation() -> &'static Implementation {
    static IMPLEMENTATION: OnceLock<Implementation> = OnceLock::new();
    IMPLEMENTATION.get_or_init(|| Implementation::new(fast_path::table()))
}

/// Engine configuration.
///
/// `disabled` names fast paths to skip; the name `fast` disables every fast path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOpts {
    pub fast_paths: bool,
    pub disabled: Vec<String>,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            fast_paths: true,
            disabled: Vec::new(),
        }
    }
}

impl EngineOpts {
    /// Environment variable holding a comma or space separated list of disabled paths.
    pub const DISABLE_ENV: &'static str = "PIXMIX_DISABLE";

    pub fn from_env() -> Self {
        std::env::var(Self::DISABLE_ENV)
            .map(|v| Self::default().with_disabled(parse_disabled(&v)))
            .unwrap_or_default()
    }

    pub fn with_fast_paths(mut self, enabled: bool) -> Self {
        self.fast_paths = enabled;
        self
    }

    pub fn with_disabled<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if name == "fast" {
                self.fast_paths = false;
            } else {
                self.disabled.push(name);
            }
        }
        self
    }
}

fn parse_disabled(v: &str) -> Vec<String> {
    v.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// The kernel a request resolved to.
#[derive(Clone, Copy)]
pub struct Selection<'e> {
    /// Fast-path name, or `"general"`.
    pub name: &'static str,
    pub kernel: &'e dyn CompositeKernel,
}

impl std::fmt::Debug for Selection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection").field("name", &self.name).finish()
    }
}

static GENERAL: GeneralEngine = GeneralEngine;

/// A configured view over the process-wide implementation.
#[derive(Clone, Debug)]
pub struct Engine {
    opts: EngineOpts,
    implementation: &'static Implementation,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOpts::default())
    }
}

impl Engine {
    pub fn new(opts: EngineOpts) -> Self {
        Self {
            opts,
            implementation: implementation(),
        }
    }

    /// The engine [`composite`](crate::composite) uses, configured from the environment once.
    pub fn global() -> &'static Engine {
        static ENGINE: OnceLock<Engine> = OnceLock::new();
        ENGINE.get_or_init(|| {
            let opts = EngineOpts::from_env();
            if opts != EngineOpts::default() {
                tracing::debug!(?opts, "engine options from environment");
            }
            Engine::new(opts)
        })
    }

    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    /// First enabled fast path accepting the request, else the general engine.
    pub fn select(&self, info: &CompositeInfo<'_>, dest: &Image<'_>) -> Selection<'_> {
        if self.opts.fast_paths {
            let hit = self
                .implementation
                .fast_paths()
                .iter()
                .filter(|fp| !self.opts.disabled.iter().any(|d| d == fp.name))
                .find(|fp| fp.matches(info, dest));
            if let Some(fp) = hit {
                return Selection {
                    name: fp.name,
                    kernel: &fp.kernel,
                };
            }
        }
        Selection {
            name: "general",
            kernel: &GENERAL,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/dispatch.rs"]
mod tests;
