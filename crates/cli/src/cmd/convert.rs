//! One-shot conversion of a single Markdown file

use anyhow::{bail, Context, Result};
use convert::{Converter, PandocConverter};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

pub async fn run(file: &Path, output: Option<PathBuf>) -> Result<()> {
    let is_markdown = file
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("md"))
        .unwrap_or(false);
    if !is_markdown {
        bail!("{} is not a Markdown file", file.display());
    }

    let mut converter = PandocConverter::new();
    if let Some(output) = output {
        converter = converter.with_output(output);
    }

    converter
        .check_available()
        .await
        .context("conversion toolchain is not available")?;

    println!("Converting {}...", file.display());

    match converter.convert(file).await {
        Ok(output) => {
            println!("{} Converted to {}", "✓".green(), output.display());
            Ok(())
        }
        Err(e) => bail!("error during conversion: {e}"),
    }
}
