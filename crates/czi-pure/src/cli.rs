//! Command-line configuration shared by the `czi2raw` and `czinfo` binaries.
//!
//! Every option can also be set through an environment variable with the
//! `CZI_` prefix:
//!
//! - `CZI_INPUT` - container path
//! - `CZI_SUFFIX` - keep only groups whose name ends with this string
//! - `CZI_OUTPUT` - output path prefix, or `-` for standard output
//! - `CZI_MODE` - `volume` (default) or `plane-stream`
//! - `CZI_TILE_AXIS` - axis merged into one image (default: M)
//! - `CZI_NO_META` - skip the `_meta.txt` sidecar
//! - `CZI_LIST` - list groups without writing pixels
//! - `CZI_VERBOSE` - debug logging

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use crate::compositor::CompositeMode;
use crate::dimension::AxisKey;
use crate::extract::ExtractOptions;

/// Output value selecting standard output instead of files.
pub const STDOUT_SENTINEL: &str = "-";

/// Default tile axis, as typed on the command line.
pub const DEFAULT_TILE_AXIS: &str = "M";

/// Log filter used unless `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "czi_pure=info";

/// Log filter used with `--verbose`.
pub const VERBOSE_LOG_FILTER: &str = "czi_pure=debug";

/// Compositing mode as spelled on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeArg {
    /// Place every tile into one volume per group.
    #[default]
    Volume,
    /// Write each full-plane sub-block as it is read.
    PlaneStream,
}

impl From<ModeArg> for CompositeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Volume => CompositeMode::Volume,
            ModeArg::PlaneStream => CompositeMode::PlaneStream,
        }
    }
}

/// Where reconstructed groups go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// `<prefix><name>_data.raw` files.
    Files(PathBuf),
    Stdout,
}

/// Reconstruct every image in a CZI container as raw pixel dumps.
#[derive(Parser, Debug, Clone)]
#[command(name = "czi2raw")]
#[command(author, version, about, long_about = None)]
pub struct ExtractArgs {
    /// Container to read; `.czi` is appended if the path does not open.
    #[arg(env = "CZI_INPUT")]
    pub input: PathBuf,

    /// Keep only groups whose generated name ends with this string.
    #[arg(short, long, env = "CZI_SUFFIX")]
    pub suffix: Option<String>,

    /// Output path prefix, or `-` to stream raw bytes to standard output.
    ///
    /// Defaults to the input path without its extension.
    #[arg(short, long, env = "CZI_OUTPUT")]
    pub output: Option<String>,

    /// Compositing mode.
    #[arg(long, value_enum, default_value_t = ModeArg::Volume, env = "CZI_MODE")]
    pub mode: ModeArg,

    /// Axis whose values are tiles of one image rather than separate images.
    #[arg(long, default_value = DEFAULT_TILE_AXIS, env = "CZI_TILE_AXIS")]
    pub tile_axis: AxisKey,

    /// Do not write the `_meta.txt` size sidecar.
    #[arg(long, env = "CZI_NO_META")]
    pub no_meta: bool,

    /// Print group names and sizes without reading pixel data.
    #[arg(long, env = "CZI_LIST")]
    pub list: bool,

    /// Enable debug logging.
    #[arg(short, long, env = "CZI_VERBOSE")]
    pub verbose: bool,
}

impl ExtractArgs {
    pub fn options(&self) -> ExtractOptions {
        ExtractOptions {
            mode: self.mode.into(),
            suffix: self.suffix.clone(),
            tile_axis: self.tile_axis,
        }
    }

    pub fn destination(&self) -> Destination {
        match self.output.as_deref() {
            Some(STDOUT_SENTINEL) => Destination::Stdout,
            Some(prefix) => Destination::Files(PathBuf::from(prefix)),
            None => Destination::Files(default_prefix(&self.input)),
        }
    }
}

/// Print the header, axes and groups of a CZI container.
#[derive(Parser, Debug, Clone)]
#[command(name = "czinfo")]
#[command(author, version, about, long_about = None)]
pub struct InfoArgs {
    /// Container to read; `.czi` is appended if the path does not open.
    #[arg(env = "CZI_INPUT")]
    pub input: PathBuf,

    /// Also list every group name.
    #[arg(short, long)]
    pub groups: bool,

    /// Axis whose values are tiles of one image rather than separate images.
    #[arg(long, default_value = DEFAULT_TILE_AXIS, env = "CZI_TILE_AXIS")]
    pub tile_axis: AxisKey,

    /// Enable debug logging.
    #[arg(short, long, env = "CZI_VERBOSE")]
    pub verbose: bool,
}

/// The input path with its extension removed.
pub fn default_prefix(input: &Path) -> PathBuf {
    input.with_extension("")
}

/// Install a stderr `tracing` subscriber. `RUST_LOG` overrides the level.
pub fn init_logging(verbose: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_defaults() {
        let args = ExtractArgs::try_parse_from(["czi2raw", "scan.czi"]).unwrap();
        assert_eq!(args.mode, ModeArg::Volume);
        assert_eq!(args.tile_axis, AxisKey::M);
        assert!(!args.no_meta);
        assert_eq!(
            args.destination(),
            Destination::Files(PathBuf::from("scan"))
        );
        assert_eq!(args.options(), ExtractOptions::default());
    }

    #[test]
    fn extract_all_options() {
        let args = ExtractArgs::try_parse_from([
            "czi2raw",
            "in",
            "-s",
            "C0",
            "-o",
            "-",
            "--mode",
            "plane-stream",
            "--tile-axis",
            "S",
            "--no-meta",
            "--list",
        ])
        .unwrap();
        assert_eq!(args.destination(), Destination::Stdout);
        let options = args.options();
        assert_eq!(options.mode, CompositeMode::PlaneStream);
        assert_eq!(options.suffix.as_deref(), Some("C0"));
        assert_eq!(options.tile_axis, "S".parse().unwrap());
        assert!(args.no_meta);
        assert!(args.list);
    }

    #[test]
    fn explicit_prefix() {
        let args = ExtractArgs::try_parse_from(["czi2raw", "a.czi", "-o", "out/run1"]).unwrap();
        assert_eq!(
            args.destination(),
            Destination::Files(PathBuf::from("out/run1"))
        );
    }

    #[test]
    fn bad_tile_axis_rejected() {
        assert!(ExtractArgs::try_parse_from(["czi2raw", "a", "--tile-axis", "MM"]).is_err());
    }

    #[test]
    fn missing_input_rejected() {
        assert!(InfoArgs::try_parse_from(["czinfo"]).is_err());
    }

    #[test]
    fn default_prefix_strips_extension() {
        assert_eq!(default_prefix(Path::new("dir/a.czi")), PathBuf::from("dir/a"));
        assert_eq!(default_prefix(Path::new("plain")), PathBuf::from("plain"));
    }
}
