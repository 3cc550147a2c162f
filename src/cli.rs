use clap::Parser;
use std::path::PathBuf;

// Build version with backend info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Codec:  image 0.25 (PNG, JPEG, TIFF, TGA, EXR, HDR)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Load a numbered image sequence and resolve frames by index, percent or time
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Folder of frames (sorted by name). Ignored when --prefix is given
    #[arg(value_name = "FOLDER")]
    pub folder: Option<PathBuf>,

    /// Pattern mode: file name prefix, e.g. "renders/shot."
    #[arg(long = "prefix", value_name = "PREFIX", requires = "end")]
    pub prefix: Option<String>,

    /// Pattern mode: file extension without dot
    #[arg(long = "ext", value_name = "EXT", default_value = "png")]
    pub ext: String,

    /// Pattern mode: first frame number
    #[arg(long = "start", value_name = "N", default_value_t = 0, allow_hyphen_values = true)]
    pub start: i64,

    /// Pattern mode: last frame number (inclusive)
    #[arg(long = "end", value_name = "N", allow_hyphen_values = true)]
    pub end: Option<i64>,

    /// Pattern mode: zero-pad frame numbers to this many digits (0 = no padding)
    #[arg(long = "digits", value_name = "N", default_value_t = 0)]
    pub digits: usize,

    /// Playback rate for --time lookups (overrides settings)
    #[arg(long = "fps", value_name = "FPS")]
    pub fps: Option<f64>,

    /// Folder mode: keep at most N frames (overrides settings)
    #[arg(long = "max-frames", value_name = "N")]
    pub max_frames: Option<usize>,

    /// Folder mode: only files with this extension (overrides settings)
    #[arg(long = "filter-ext", value_name = "EXT")]
    pub filter_ext: Option<String>,

    /// Folder mode: scan and decode on a background thread
    #[arg(short = 't', long = "threaded")]
    pub threaded: bool,

    /// Show this frame index (wraps past the end)
    #[arg(long = "frame", value_name = "N", allow_hyphen_values = true)]
    pub frame: Option<i64>,

    /// Resolve frame at percent (0..1, wraps outside); repeatable
    #[arg(long = "percent", value_name = "P", allow_hyphen_values = true)]
    pub percents: Vec<f64>,

    /// Resolve frame at time in seconds; repeatable
    #[arg(long = "time", value_name = "SEC", allow_hyphen_values = true)]
    pub times: Vec<f64>,

    /// Write the last resolved frame to an image file
    #[arg(short = 'd', long = "dump", value_name = "FILE")]
    pub dump: Option<PathBuf>,

    /// Settings JSON (default: seqtex.json in the config dir)
    #[arg(short = 's', long = "settings", value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Enable debug logging to file (default: seqtex.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Pattern {
        prefix: String,
        ext: String,
        start: i64,
        end: i64,
        digits: usize,
    },
    Folder(PathBuf),
}

impl Args {
    /// Pattern mode wins over a folder argument
    pub fn source(&self) -> Option<Source> {
        match (&self.prefix, self.end) {
            (Some(prefix), Some(end)) => Some(Source::Pattern {
                prefix: prefix.clone(),
                ext: self.ext.clone(),
                start: self.start,
                end,
                digits: self.digits,
            }),
            _ => self.folder.clone().map(Source::Folder),
        }
    }
}
