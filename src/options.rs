//! Render configuration

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::RendererResult;
use crate::types::Size;

/// Settings for one render pass
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Portrait page size in points; landscape pages swap it
    pub page_size: Size,
    /// Directory the document was loaded from (relative image paths)
    pub document_dir: Option<PathBuf>,
    /// Extra directories searched for image files, in order
    pub asset_paths: Vec<PathBuf>,
    pub default_font_size: f64,
    /// Longest provider message shown inside an error box
    pub error_message_chars: usize,
    pub compress_streams: bool,
    pub svg_dpi: f32,
    /// Written to the /Creator entry
    pub creator: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page_size: Size::a4(),
            document_dir: None,
            asset_paths: Vec::new(),
            default_font_size: 12.0,
            error_message_chars: 60,
            compress_streams: true,
            svg_dpi: 150.0,
            creator: concat!("template_pdf_renderer ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RenderOptions {
    pub fn from_json(json: &str) -> RendererResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn with_document_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.document_dir = Some(dir.into());
        self
    }

    pub fn with_asset_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_paths.push(dir.into());
        self
    }

    pub fn with_error_message_chars(mut self, chars: usize) -> Self {
        self.error_message_chars = chars;
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress_streams = compress;
        self
    }

    /// Directories a relative image path is tried against, in order
    pub fn search_dirs(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = Vec::new();
        if let Some(dir) = &self.document_dir {
            dirs.push(dir.as_path());
        }
        dirs.extend(self.asset_paths.iter().map(PathBuf::as_path));
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_partial_json() {
        let options = RenderOptions::from_json(r#"{"asset_paths": ["/srv/assets"], "compress_streams": false}"#).unwrap();
        assert_eq!(options.page_size, Size::a4());
        assert_eq!(options.error_message_chars, 60);
        assert!(!options.compress_streams);
        assert_eq!(options.asset_paths, vec![PathBuf::from("/srv/assets")]);
    }

    #[test]
    fn search_dirs_put_document_dir_first() {
        let options = RenderOptions::default()
            .with_asset_path("/b")
            .with_document_dir("/a");
        assert_eq!(options.search_dirs(), vec![Path::new("/a"), Path::new("/b")]);
    }
}
