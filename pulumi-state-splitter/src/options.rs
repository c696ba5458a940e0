use std::path::PathBuf;

use clap::{ColorChoice, Parser};

#[derive(Parser, Debug, Clone)]
pub struct Options {
    /// The Pulumi `file://` backend directory
    #[arg(short = 'd', long, global = true, default_value = ".", value_parser = existing_dir)]
    pub backend_directory: PathBuf,

    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,
}

impl Options {
    pub fn use_color(&self) -> bool {
        use std::io::IsTerminal as _;
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stderr().is_terminal(),
        }
    }
}

fn existing_dir(s: &str) -> Result<PathBuf, String> {
    let path = std::fs::canonicalize(s).map_err(|e| format!("{}: {}", s, e))?;
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("{} is not a directory", s))
    }
}
