// ============================================================================
// easel CLI — headless layer compositing via command-line arguments
// ============================================================================
//
// Usage examples:
//   easel -i photo.png -o out.png                      (format conversion)
//   easel -i base.png overlay.png -o out.png --opacity 0.5 --blend multiply
//   easel -i "shots/*.png" -o stack.jpg --background 202020
//   easel -i a.png b.png --width 800 --height 600 -o canvas.png
//
// Inputs stack as layers bottom to top over the background canvas; the
// flattened composite is written to the output path.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use image::Rgba;

use crate::blend::BlendMode;
use crate::document::Document;
use crate::error::{EaselError, Result};
use crate::io;
use crate::layer::Layer;
use crate::{log_err, log_info, log_warn};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// easel headless layer compositor.
///
/// Stack images as layers and write the flattened composite — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "easel",
    about = "easel headless layer compositor",
    long_about = "Stack image files as layers over a background canvas and write the\n\
                  flattened composite. Supports PNG, JPEG, WEBP, BMP, TGA, and TIFF.\n\n\
                  Example:\n  \
                  easel -i base.png overlay.png -o out.png --opacity 0.5 --blend multiply"
)]
pub struct CliArgs {
    /// Input file(s), stacked as layers bottom to top.
    /// Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. The format is inferred from the extension,
    /// defaulting to png.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Canvas width. Defaults to the first input image's width.
    #[arg(long, value_name = "PIXELS")]
    pub width: Option<u32>,

    /// Canvas height. Defaults to the first input image's height.
    #[arg(long, value_name = "PIXELS")]
    pub height: Option<u32>,

    /// Background color as 6 or 8 hex digits (RGB or RGBA).
    #[arg(long, default_value = "ffffff", value_name = "HEX")]
    pub background: String,

    /// Opacity applied to every layer above the first (0.0-1.0).
    #[arg(long, default_value_t = 1.0, value_name = "0-1")]
    pub opacity: f32,

    /// Blend mode applied to every layer above the first: normal, multiply,
    /// screen, overlay, soft-light, hard-light, color-dodge, color-burn,
    /// darken, lighten, difference, exclusion.
    #[arg(long, default_value = "normal", value_name = "MODE")]
    pub blend: String,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the compositor and return an OS exit code.
/// `0` = success, `1` = any failure.
pub fn run(args: CliArgs) -> ExitCode {
    crate::logger::set_verbose(args.verbose);
    if args.verbose && let Some(path) = crate::logger::log_path() {
        println!("session log: {}", path.display());
    }
    match run_inner(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            log_err!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_inner(args: &CliArgs) -> Result<()> {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        return Err(EaselError::NoInputs);
    }

    let blend = BlendMode::from_name(&args.blend)
        .ok_or_else(|| EaselError::UnknownBlendMode(args.blend.clone()))?;
    let background = parse_color(&args.background)?;
    let opacity = args.opacity.clamp(0.0, 1.0);

    let start = Instant::now();
    let mut document: Option<Document> = None;

    for (idx, path) in inputs.iter().enumerate() {
        let file_start = Instant::now();
        let img = io::load_image(path)?;
        log_info!(
            "loaded [{}/{}] {} ({}x{}, {:.0}ms)",
            idx + 1,
            inputs.len(),
            path.display(),
            img.width(),
            img.height(),
            file_start.elapsed().as_secs_f64() * 1000.0
        );

        let doc = document.get_or_insert_with(|| {
            let w = args.width.unwrap_or(img.width());
            let h = args.height.unwrap_or(img.height());
            Document::new(w, h, background)
        });

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Layer")
            .to_string();
        let mut layer = Layer::from_image(name, img);
        if idx > 0 {
            layer.set_opacity(opacity);
            layer.blend_mode = blend;
        }
        doc.add_layer(layer);
    }

    // inputs is non-empty, so the document exists by now
    let Some(document) = document else {
        return Err(EaselError::NoInputs);
    };
    let composite = document.render();
    io::save_image(&args.output, &composite)?;
    log_info!(
        "wrote {} ({}x{}, {} layers, {:.0}ms total)",
        args.output.display(),
        composite.width(),
        composite.height(),
        document.layer_count(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    if args.verbose {
        println!("→ {}", args.output.display());
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into concrete file paths,
/// preserving argument order.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for pattern in patterns {
        let has_glob = pattern.contains(['*', '?', '[']);
        if has_glob {
            match glob::glob(pattern) {
                Ok(paths) => {
                    let before = out.len();
                    for path in paths.flatten() {
                        if path.is_file() {
                            out.push(path);
                        }
                    }
                    if out.len() == before {
                        log_warn!("pattern '{}' matched no files", pattern);
                    }
                }
                Err(e) => log_warn!("bad glob pattern '{}': {}", pattern, e),
            }
        } else {
            let path = Path::new(pattern);
            if path.is_file() {
                out.push(path.to_path_buf());
            } else {
                log_warn!("input '{}' is not a file, skipping", pattern);
            }
        }
    }
    out
}

/// Parse a 6-digit RGB or 8-digit RGBA hex color, with or without a leading
/// `#`.
fn parse_color(s: &str) -> Result<Rgba<u8>> {
    let hex = s.trim_start_matches('#');
    let invalid = || EaselError::InvalidColor(s.to_string());
    // hex.get, not hex[..]: multi-byte input would panic on a slice boundary
    let byte = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .ok_or_else(invalid)
    };
    match hex.len() {
        6 => Ok(Rgba([byte(0..2)?, byte(2..4)?, byte(4..6)?, 255])),
        8 => Ok(Rgba([byte(0..2)?, byte(2..4)?, byte(4..6)?, byte(6..8)?])),
        _ => Err(invalid()),
    }
}
