use clap::{Parser, ValueEnum};
use gazex_core::EyeAvailability;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gazex",
    version,
    about = "Runs a recording session against a simulated eye tracker"
)]
pub struct Args {
    /// Subject identifier; names the trace file. Defaults to day+time.
    #[arg(long)]
    pub subject: Option<String>,

    /// Directory the trace is transferred into.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// JSON session config; command-line values override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Trace converter program.
    #[arg(long)]
    pub converter: Option<String>,

    /// TrueType font for operator messages.
    #[arg(long, default_value = "fonts/DejaVuSans.ttf")]
    pub font: PathBuf,

    /// Write every presented frame as PNG into this directory.
    #[arg(long)]
    pub frames_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    #[arg(long, default_value_t = 1024)]
    pub height: u32,

    /// Display refresh ticks spent tracking the gaze cursor per block.
    #[arg(long, default_value_t = 300)]
    pub track_ticks: u32,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulated hardware generation.
    #[arg(long, default_value_t = 3)]
    pub generation: u32,

    /// Simulated version string.
    #[arg(long, default_value = "EYELINK CL 4.56")]
    pub version_string: String,

    #[arg(long, value_enum, default_value_t = EyeArg::Right)]
    pub eye: EyeArg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EyeArg {
    Left,
    Right,
    Both,
}

impl From<EyeArg> for EyeAvailability {
    fn from(eye: EyeArg) -> Self {
        match eye {
            EyeArg::Left => EyeAvailability::Left,
            EyeArg::Right => EyeAvailability::Right,
            EyeArg::Both => EyeAvailability::Binocular,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::parse_from(["gazex"]);
        assert_eq!((args.width, args.height), (1280, 1024));
        assert_eq!(args.eye, EyeArg::Right);
        assert!(args.subject.is_none());
    }

    #[test]
    fn eye_maps_to_availability() {
        let args = Args::parse_from(["gazex", "--eye", "both", "--subject", "s01"]);
        assert_eq!(EyeAvailability::from(args.eye), EyeAvailability::Binocular);
        assert_eq!(args.subject.as_deref(), Some("s01"));
    }
}
