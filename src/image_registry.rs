//! Image registry for managing image XObjects and page resources
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::debug;
use pdf_writer::{Name, Pdf, Ref};

use crate::error::RendererResult;
use crate::image_utils::{add_image_to_pdf, load_image, load_image_from_bytes};
use crate::renderer::RefAllocator;

/// An image already written to the PDF
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub id: Ref,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

pub struct ImageRegistry {
    // path or content key → embedded image
    images: HashMap<String, EmbeddedImage>,
    used_on_page: BTreeMap<String, Ref>,
    svg_dpi: f32,
}

impl ImageRegistry {
    pub fn new(svg_dpi: f32) -> Self {
        Self {
            images: HashMap::new(),
            used_on_page: BTreeMap::new(),
            svg_dpi,
        }
    }

    pub fn get(&self, key: &str) -> Option<&EmbeddedImage> {
        self.images.get(key)
    }

    /// Get or create an Image XObject from a file path
    pub fn get_or_create_from_path(
        &mut self,
        pdf: &mut Pdf,
        refs: &mut RefAllocator,
        path: &Path,
    ) -> RendererResult<EmbeddedImage> {
        let key = format!("file:{}", path.display());
        if let Some(image) = self.images.get(&key) {
            let image = image.clone();
            self.mark_used(&image);
            return Ok(image);
        }
        let raster = load_image(path, self.svg_dpi)?;
        self.insert(pdf, refs, key, &raster)
    }

    /// Get or create an Image XObject from in-memory bytes.
    /// `key` identifies the content; callers that must not share pass a unique key.
    pub fn get_or_create_from_bytes(
        &mut self,
        pdf: &mut Pdf,
        refs: &mut RefAllocator,
        key: &str,
        data: &[u8],
        mime_type: Option<&str>,
    ) -> RendererResult<EmbeddedImage> {
        if let Some(image) = self.images.get(key) {
            debug!("ImageRegistry: reusing cached stream {} as {}", key, image.name);
            let image = image.clone();
            self.mark_used(&image);
            return Ok(image);
        }
        let raster = load_image_from_bytes(data, mime_type, self.svg_dpi)?;
        self.insert(pdf, refs, key.to_string(), &raster)
    }

    fn insert(
        &mut self,
        pdf: &mut Pdf,
        refs: &mut RefAllocator,
        key: String,
        raster: &crate::image_utils::RasterImage,
    ) -> RendererResult<EmbeddedImage> {
        let image_id = refs.next();
        add_image_to_pdf(pdf, refs, raster, image_id)?;
        let image = EmbeddedImage {
            id: image_id,
            name: format!("Im{}", image_id.get()),
            width: raster.width,
            height: raster.height,
        };
        self.images.insert(key, image.clone());
        self.mark_used(&image);
        Ok(image)
    }

    fn mark_used(&mut self, image: &EmbeddedImage) {
        self.used_on_page.insert(image.name.clone(), image.id);
    }

    pub fn begin_page(&mut self) {
        self.used_on_page.clear();
    }

    /// Write the images used on the current page into its Resources
    pub fn write_resources(&self, resources: &mut pdf_writer::writers::Resources<'_>) {
        if self.used_on_page.is_empty() {
            return;
        }
        let mut dict = resources.x_objects();
        for (name, id) in &self.used_on_page {
            dict.pair(Name(name.as_bytes()), *id);
        }
    }
}
