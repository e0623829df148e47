use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use pixmix::{DitherMode, FilterKind, Image, Kernel, Operator, PixelFormat, Repeat, Transform};

#[derive(Parser, Debug)]
#[command(name = "pixmix", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a PNG onto another PNG (or onto a transparent canvas).
    Composite(CompositeArgs),
    /// Write a PNG filled with one color.
    Fill(FillArgs),
    /// Run a JSON job describing a canvas and a stack of layers.
    Job(JobArgs),
}

#[derive(Parser, Debug)]
struct CompositeArgs {
    /// Source PNG.
    #[arg(long)]
    src: PathBuf,

    /// Optional mask PNG; its alpha channel is used unless `--component-alpha` is set.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Use every mask channel separately.
    #[arg(long)]
    component_alpha: bool,

    /// Destination PNG. Without it the canvas is transparent and sized by `--width/--height`
    /// or by the source.
    #[arg(long)]
    dst: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Operator name, e.g. `over`, `add`, `multiply`, `disjoint-xor`.
    #[arg(long, default_value = "over")]
    op: Operator,

    #[arg(long, value_enum, default_value_t = FilterChoice::Nearest)]
    filter: FilterChoice,

    #[arg(long, value_enum, default_value_t = RepeatChoice::None)]
    repeat: RepeatChoice,

    /// Source pixels per destination pixel.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Rotation of the sampling grid, in degrees.
    #[arg(long, default_value_t = 0.0)]
    rotate: f64,

    /// Destination placement.
    #[arg(long, default_value_t = 0)]
    x: i32,

    #[arg(long, default_value_t = 0)]
    y: i32,

    /// Storage format of the working canvas, e.g. `r5g6b5` or `a2r10g10b10`.
    #[arg(long, default_value = "a8r8g8b8")]
    format: PixelFormat,

    #[arg(long, value_enum, default_value_t = DitherChoice::None)]
    dither: DitherChoice,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct FillArgs {
    #[arg(long)]
    width: u32,

    #[arg(long)]
    height: u32,

    /// Straight-alpha color as `rrggbb` or `rrggbbaa` (leading `#` optional).
    #[arg(long)]
    color: String,

    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct JobArgs {
    /// Input job JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path (overrides the job's `out`).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FilterChoice {
    Nearest,
    Bilinear,
    Box,
    Linear,
    Gaussian,
    Lanczos3,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RepeatChoice {
    None,
    Normal,
    Pad,
    Reflect,
}

impl From<RepeatChoice> for Repeat {
    fn from(r: RepeatChoice) -> Self {
        match r {
            RepeatChoice::None => Repeat::None,
            RepeatChoice::Normal => Repeat::Normal,
            RepeatChoice::Pad => Repeat::Pad,
            RepeatChoice::Reflect => Repeat::Reflect,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DitherChoice {
    None,
    Bayer8,
    BlueNoise64,
}

impl From<DitherChoice> for DitherMode {
    fn from(d: DitherChoice) -> Self {
        match d {
            DitherChoice::None => DitherMode::None,
            DitherChoice::Bayer8 => DitherMode::OrderedBayer8,
            DitherChoice::BlueNoise64 => DitherMode::OrderedBlueNoise64,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Composite(args) => cmd_composite(args),
        Command::Fill(args) => cmd_fill(args),
        Command::Job(args) => cmd_job(args),
    }
}

/// Decodes a PNG into a premultiplied `a8r8g8b8` image.
fn load_png(path: &Path) -> anyhow::Result<Image<'static>> {
    let rgba = image::open(path)
        .with_context(|| format!("open png '{}'", path.display()))?
        .to_rgba8();
    let mut out = Image::new_owned(PixelFormat::A8R8G8B8, rgba.width(), rgba.height())
        .with_context(|| format!("allocate image for '{}'", path.display()))?;
    for (x, y, px) in rgba.enumerate_pixels() {
        out.set_pixel(x, y, premultiply(px.0))?;
    }
    Ok(out)
}

fn save_png(image: &Image<'_>, path: &Path) -> anyhow::Result<()> {
    let (w, h) = (image.width(), image.height());
    let mut data = Vec::with_capacity(w as usize * h as usize * 4);
    for y in 0..h {
        for x in 0..w {
            data.extend(unpremultiply(image.pixel(x, y).unwrap_or(0)));
        }
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        path,
        &data,
        w,
        h,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn premultiply([r, g, b, a]: [u8; 4]) -> u32 {
    pixmix::pack_argb(
        u32::from(a),
        u32::from(pixmix::multiply_channel(r, a)),
        u32::from(pixmix::multiply_channel(g, a)),
        u32::from(pixmix::multiply_channel(b, a)),
    )
}

fn unpremultiply(argb: u32) -> [u8; 4] {
    let a = pixmix::alpha(argb) as u8;
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let c = |v: u32| pixmix::divide_channel(v as u8, a);
    [c(pixmix::red(argb)), c(pixmix::green(argb)), c(pixmix::blue(argb)), a]
}

fn parse_color(s: &str) -> anyhow::Result<u32> {
    let hex = s.trim().trim_start_matches('#');
    let v = u32::from_str_radix(hex, 16).with_context(|| format!("parse color '{s}'"))?;
    let rgba = match hex.len() {
        6 => (v << 8) | 0xff,
        8 => v,
        _ => anyhow::bail!("color '{s}' must be rrggbb or rrggbbaa"),
    };
    Ok(premultiply(rgba.to_be_bytes()))
}

/// Copies `image` into a fresh canvas of `format`.
fn convert(image: &Image<'_>, format: PixelFormat) -> anyhow::Result<Image<'static>> {
    let mut out = Image::new_owned(format, image.width(), image.height())?;
    pixmix::composite(
        Operator::Src,
        image,
        None,
        &mut out,
        (0, 0),
        (0, 0),
        (0, 0),
        image.width(),
        image.height(),
    )?;
    Ok(out)
}

/// Sets up sampling on `src`: filter, transform and repeat.
fn configure_source(
    src: &mut Image<'_>,
    filter: FilterChoice,
    affine: kurbo::Affine,
    scale: f64,
    repeat: Repeat,
) -> anyhow::Result<()> {
    src.set_repeat(repeat);
    src.set_transform(Some(Transform::from_affine(affine)));
    let kernel = match filter {
        FilterChoice::Nearest => return Ok(src.set_filter(FilterKind::Nearest, &[])?),
        FilterChoice::Bilinear => return Ok(src.set_filter(FilterKind::Bilinear, &[])?),
        FilterChoice::Box => Kernel::Box,
        FilterChoice::Linear => Kernel::Linear,
        FilterChoice::Gaussian => Kernel::Gaussian,
        FilterChoice::Lanczos3 => Kernel::Lanczos3,
    };
    let params = pixmix::separable_params(kernel, scale, scale, 4, 4)?;
    src.set_filter(FilterKind::SeparableConvolution, &params)?;
    Ok(())
}

fn cmd_composite(args: CompositeArgs) -> anyhow::Result<()> {
    let mut src = load_png(&args.src)?;
    let mask = match &args.mask {
        Some(path) => {
            let mut mask = load_png(path)?;
            mask.set_component_alpha(args.component_alpha);
            Some(mask)
        }
        None => None,
    };

    let mut canvas = match &args.dst {
        Some(path) => convert(&load_png(path)?, args.format)?,
        None => Image::new_owned(
            args.format,
            args.width.unwrap_or(src.width()),
            args.height.unwrap_or(src.height()),
        )?,
    };
    canvas.set_dither(args.dither.into());

    let affine = kurbo::Affine::rotate(args.rotate.to_radians()) * kurbo::Affine::scale(args.scale);
    configure_source(&mut src, args.filter, affine, args.scale, args.repeat.into())?;

    let (w, h) = (canvas.width(), canvas.height());
    pixmix::composite(
        args.op,
        &src,
        mask.as_ref(),
        &mut canvas,
        (-args.x, -args.y),
        (-args.x, -args.y),
        (0, 0),
        w,
        h,
    )
    .with_context(|| format!("composite {}", args.op.name()))?;

    save_png(&canvas, &args.out)
}

fn cmd_fill(args: FillArgs) -> anyhow::Result<()> {
    let color = parse_color(&args.color)?;
    let mut canvas = Image::new_owned(PixelFormat::A8R8G8B8, args.width, args.height)?;
    let solid = Image::solid(color);
    pixmix::composite(
        Operator::Src,
        &solid,
        None,
        &mut canvas,
        (0, 0),
        (0, 0),
        (0, 0),
        args.width,
        args.height,
    )?;
    save_png(&canvas, &args.out)
}

/// A canvas and the layers composited onto it in order.
#[derive(Debug, Deserialize)]
struct Job {
    width: u32,
    height: u32,
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    dither: DitherMode,
    #[serde(default)]
    out: Option<PathBuf>,
    #[serde(default)]
    layers: Vec<Layer>,
}

#[derive(Debug, Deserialize)]
struct Layer {
    /// PNG path, relative to the job file.
    #[serde(default)]
    src: Option<PathBuf>,
    /// Solid color used when `src` is absent.
    #[serde(default)]
    color: Option<String>,
    #[serde(default = "default_op")]
    op: Operator,
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    /// Unset keeps the source default: `none` for PNGs, `normal` for solid colors.
    #[serde(default)]
    repeat: Option<Repeat>,
    #[serde(default)]
    filter: FilterKind,
    /// Destination-to-source affine, `[a, b, c, d, e, f]`.
    #[serde(default)]
    transform: Option<kurbo::Affine>,
}

fn default_op() -> Operator {
    Operator::Over
}

fn cmd_job(args: JobArgs) -> anyhow::Result<()> {
    let f = File::open(&args.in_path)
        .with_context(|| format!("open job '{}'", args.in_path.display()))?;
    let job: Job =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse job JSON")?;
    let root = args.in_path.parent().unwrap_or_else(|| Path::new("."));

    let format = match &job.format {
        Some(name) => name.parse::<PixelFormat>()?,
        None => PixelFormat::A8R8G8B8,
    };
    let mut canvas = Image::new_owned(format, job.width, job.height)?;
    canvas.set_dither(job.dither);
    if let Some(bg) = &job.background {
        canvas.fill(parse_color(bg)?)?;
    }

    for (i, layer) in job.layers.iter().enumerate() {
        let mut src = match (&layer.src, &layer.color) {
            (Some(path), _) => load_png(&root.join(path))?,
            (None, Some(color)) => Image::solid(parse_color(color)?),
            (None, None) => anyhow::bail!("layer {i} needs either `src` or `color`"),
        };
        if let Some(repeat) = layer.repeat {
            src.set_repeat(repeat);
        }
        if layer.filter != FilterKind::Nearest {
            src.set_filter(layer.filter, &[])
                .with_context(|| format!("layer {i} filter"))?;
        }
        if let Some(affine) = layer.transform {
            src.set_transform(Some(Transform::from_affine(affine)));
        }
        let w = layer.width.unwrap_or(job.width);
        let h = layer.height.unwrap_or(job.height);
        pixmix::composite(
            layer.op,
            &src,
            None,
            &mut canvas,
            (0, 0),
            (0, 0),
            (layer.x, layer.y),
            w,
            h,
        )
        .with_context(|| format!("composite layer {i} ({})", layer.op.name()))?;
    }

    let out = args
        .out
        .or(job.out)
        .context("job has no `out` and none was given")?;
    save_png(&canvas, &out)
}
