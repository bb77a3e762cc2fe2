// src/transform/assets.rs

use anyhow::Result;

use super::{SourceFile, Transform};

/// Copies files unchanged. Contents are never decoded, so binary assets
/// pass through byte for byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetCopy;

impl Transform for AssetCopy {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn apply(&self, file: SourceFile) -> Result<SourceFile> {
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_contents_pass_through() {
        let bytes = vec![0u8, 159, 146, 150, 255];
        let out = AssetCopy.apply(SourceFile::new("img/logo.png", bytes.clone())).unwrap();
        assert_eq!(out.contents, bytes);
        assert_eq!(out.relative, std::path::PathBuf::from("img/logo.png"));
    }
}
