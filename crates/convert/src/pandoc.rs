//! Pandoc-backed converter
//!
//! Shells out to `pandoc` for the actual Markdown to PDF rendering.
//! The output convention is the input path with its extension replaced
//! by `.pdf`, unless an explicit output path is configured.

use crate::{ConvertError, Converter};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Converter that invokes the pandoc binary
pub struct PandocConverter {
    /// Program name or path (default: "pandoc")
    program: String,

    /// Extra arguments appended before input/output
    extra_args: Vec<String>,

    /// Fixed output path; when None, derived from the input path
    output: Option<PathBuf>,
}

impl PandocConverter {
    /// Create a converter using `pandoc` from PATH
    pub fn new() -> Self {
        Self {
            program: "pandoc".to_string(),
            extra_args: vec![],
            output: None,
        }
    }

    /// Use a specific program name or path instead of `pandoc`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Append extra command-line arguments to every invocation
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }

    /// Write output to a fixed path instead of deriving it from the input
    pub fn with_output(mut self, output: PathBuf) -> Self {
        self.output = Some(output);
        self
    }

    /// Output path for a given input, per the converter's convention
    pub fn output_path(&self, input: &Path) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => input.with_extension("pdf"),
        }
    }

    /// Probe the toolchain by running `<program> --version`
    ///
    /// Used by the CLI to fail early with a clear message instead of
    /// surfacing the failure on the first conversion.
    pub async fn check_available(&self) -> Result<(), ConvertError> {
        let result = Command::new(&self.program)
            .arg("--version")
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(ConvertError::ToolFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ConvertError::MissingTool(self.program.clone()))
            }
            Err(e) => Err(ConvertError::Io(e)),
        }
    }
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Converter for PandocConverter {
    async fn convert(&self, input: &Path) -> Result<PathBuf, ConvertError> {
        if !input.is_file() {
            return Err(ConvertError::InputNotFound(input.to_path_buf()));
        }

        let output = self.output_path(input);

        debug!("running {} {} -o {}", self.program, input.display(), output.display());

        let result = Command::new(&self.program)
            .args(&self.extra_args)
            .arg(input)
            .arg("-o")
            .arg(&output)
            .output()
            .await;

        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConvertError::MissingTool(self.program.clone()));
            }
            Err(e) => return Err(ConvertError::Io(e)),
        };

        if !out.status.success() {
            return Err(ConvertError::ToolFailed {
                status: out.status.code(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            });
        }

        Ok(output)
    }
}
