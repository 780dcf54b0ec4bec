//! 兜底扫描模块
//!
//! 结构化解析没有得到任何图片时，直接在解压目录中收集足够大的图片文件，
//! 按完整路径的字典序编号。不做去重，也不处理封面。

use crate::config::ConvertConfig;
use crate::error::Result;
use crate::pages::output::OutputSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

const METADATA_DIR: &str = "META-INF";

/// 兜底图片扫描器
#[derive(Debug)]
pub struct FallbackDiscoverer<'a> {
    config: &'a ConvertConfig,
}

impl<'a> FallbackDiscoverer<'a> {
    pub fn new(config: &'a ConvertConfig) -> Self {
        Self { config }
    }

    /// 收集`root`下的图片并编号为1..N
    pub fn discover(&self, root: &Path) -> Result<OutputSet> {
        let mut images: Vec<PathBuf> = Vec::new();

        let walker = WalkDir::new(root)
            .max_depth(self.config.fallback_depth)
            .into_iter()
            .filter_entry(|entry| !is_metadata_dir(entry));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || !self.is_raster_image(entry.path()) {
                continue;
            }

            let size = entry.metadata()?.len();
            if size < self.config.min_image_bytes {
                debug!(path = %entry.path().display(), size, "图片过小，视为装饰素材");
                continue;
            }
            images.push(entry.into_path());
        }

        images.sort();

        let mut output = OutputSet::new();
        for path in images {
            output.push_page(path, None);
        }

        info!(root = %root.display(), count = output.len(), "兜底扫描完成");
        Ok(output)
    }

    fn is_raster_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.config.is_image_extension(ext))
    }
}

fn is_metadata_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().eq_ignore_ascii_case(METADATA_DIR)
}
