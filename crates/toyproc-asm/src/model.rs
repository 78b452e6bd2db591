use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use toyproc::{Program, Word};

/// Assembled program on disk: the machine it targets, its cells and the
/// source map for debuggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub machine: String,
    #[serde(flatten)]
    pub program: Program,
}

impl Image {
    pub fn cells(&self) -> &[Word] {
        &self.program.bytes
    }
}

pub fn load_image(path: &Path) -> Result<Image> {
    let text = std::fs::read_to_string(path)?;
    let img: Image = serde_json::from_str(&text)?;
    anyhow::ensure!(!img.machine.is_empty(), "image does not name a machine");
    Ok(img)
}

pub fn save_image(path: &Path, img: &Image) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(img)?)?;
    Ok(())
}
