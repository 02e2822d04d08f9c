//! Command-line viewer: decode images, print a summary line per file and
//! optionally render each one to PNG through the display mapper.
//!
//! ```text
//! dipview [-b|--bioformats] [--config FILE] [--range R] [--colormap M] [--render DIR] FILE...
//! ```
//!
//! Exit status is 0 when every file decodes, 1 when any file fails and 2 for
//! usage errors.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use pydip_rust::display::{image_display, ColorMap, DisplayParams};
use pydip_rust::io::{save_raster_png, DecoderRegistry};
use pydip_rust::{DipError, Image};

#[derive(Debug, Default, PartialEq)]
struct Options {
    bioformats: bool,
    config: Option<PathBuf>,
    range: Option<String>,
    color_map: Option<String>,
    render: Option<PathBuf>,
    files: Vec<PathBuf>,
}

fn usage() -> String {
    "Usage: dipview [-b|--bioformats] [--config FILE] [--range R] [--colormap M] [--render DIR] FILE...".to_string()
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Options, String> {
    let mut options = Options::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().ok_or_else(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "-b" | "--bioformats" => options.bioformats = true,
            "--config" => options.config = Some(PathBuf::from(value("--config")?)),
            "--range" => options.range = Some(value("--range")?),
            "--colormap" => options.color_map = Some(value("--colormap")?),
            "--render" => options.render = Some(PathBuf::from(value("--render")?)),
            flag if flag.starts_with('-') && flag.len() > 1 => return Err(format!("unknown option {flag}")),
            file => options.files.push(PathBuf::from(file)),
        }
    }
    if options.files.is_empty() {
        return Err("no input files".to_string());
    }
    Ok(options)
}

/// Display parameters from the config file, with flags taking precedence.
fn load_params(options: &Options) -> Result<DisplayParams, String> {
    let mut params = match &options.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
            DisplayParams::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => DisplayParams::default(),
    };
    if let Some(range) = &options.range {
        params.range = range.parse().map_err(|e: DipError| e.to_string())?;
    }
    if let Some(name) = &options.color_map {
        params.color_map = Some(name.parse::<ColorMap>().map_err(|e| e.to_string())?);
    }
    Ok(params)
}

fn summary(path: &Path, image: &Image) -> String {
    let sizes: Vec<String> = image.sizes().iter().map(usize::to_string).collect();
    let mut line = format!(
        "{}: {} {}, {} tensor element(s)",
        path.display(),
        sizes.join("x"),
        image.data_type(),
        image.tensor_elements()
    );
    if !image.color_space().is_empty() {
        line.push_str(&format!(", {}", image.color_space()));
    }
    line
}

fn view(registry: &DecoderRegistry, path: &Path, options: &Options, params: &DisplayParams) -> pydip_rust::Result<String> {
    let image = registry.decode(path, options.bioformats)?;
    let mut line = summary(path, &image);
    if let Some(dir) = &options.render {
        fs::create_dir_all(dir).map_err(|e| DipError::Encode {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "image".into());
        let target = dir.join(format!("{stem}.png"));
        let raster = image_display(&image, params)?.apply_color_map(params.effective_color_map());
        save_raster_png(&raster, &target)?;
        line.push_str(&format!(" -> {}", target.display()));
    }
    Ok(line)
}

fn run(options: &Options) -> Result<usize, String> {
    let params = load_params(options)?;
    let registry = DecoderRegistry::new();
    if options.bioformats && !registry.capabilities().bioformats {
        log::warn!("Bio-Formats bridge is not available; forced decoding will fail");
    }
    let mut failures = 0;
    for path in &options.files {
        match view(&registry, path, options, &params) {
            Ok(line) => println!("{line}"),
            Err(err) => {
                eprintln!("Error: {err}");
                failures += 1;
            }
        }
    }
    Ok(failures)
}

fn main() {
    env_logger::init();
    let options = match parse_args(env::args().skip(1)) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Error: {err}\n{}", usage());
            process::exit(2);
        }
    };
    match run(&options) {
        Ok(0) => {}
        Ok(_) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pydip_rust::RangeMode;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let options = parse_args(args(&["-b", "--range", "percentile", "a.tif", "b.png"])).unwrap();
        assert!(options.bioformats);
        assert_eq!(options.range.as_deref(), Some("percentile"));
        assert_eq!(options.files, vec![PathBuf::from("a.tif"), PathBuf::from("b.png")]);

        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["--range"])).is_err());
        assert!(parse_args(args(&["--zoom", "2", "a.png"])).is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let options = parse_args(args(&["--range", "0,4095", "--colormap", "gray", "a.png"])).unwrap();
        let params = load_params(&options).unwrap();
        assert_eq!(params.range, RangeMode::Manual { lower: 0.0, upper: 4095.0 });
        assert_eq!(params.color_map, Some(ColorMap::Grey));

        let options = parse_args(args(&["--colormap", "jet", "a.png"])).unwrap();
        assert!(load_params(&options).is_err());
    }

    #[test]
    fn test_missing_file_is_counted() {
        let options = parse_args(args(&["does/not/exist.png"])).unwrap();
        assert_eq!(run(&options), Ok(1));
    }
}
