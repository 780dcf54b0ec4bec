//! 页面解析流水线
//!
//! 从解压后的EPUB目录得到有序的输出图片集合：优先按OPF脊柱解析，
//! 脊柱中没有得到任何图片（或者根本没有可用的OPF）时改用兜底扫描。

pub mod cover;
pub mod fallback;
pub mod output;
pub mod resolver;
pub mod sequencer;

pub use cover::{CoverCandidate, CoverProvenance, CoverResolver};
pub use fallback::FallbackDiscoverer;
pub use output::{sanitize_label, OutputSet, ResolvedImage};
pub use resolver::PathResolver;
pub use sequencer::PageSequencer;

use crate::config::ConvertConfig;
use crate::epub::ncx::NavigationMap;
use crate::epub::reader::{EpubTree, PackageDocument};
use crate::error::{ConvertError, Result};
use std::path::Path;
use tracing::{info, warn};

/// 输出图片的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    /// 按脊柱解析
    Spine,
    /// 兜底扫描
    Fallback,
}

/// 一个EPUB的页面解析结果
#[derive(Debug)]
pub struct Resolution {
    /// 成功解析的OPF，兜底扫描时也可能存在（用于元数据）
    pub package: Option<PackageDocument>,
    pub navigation: NavigationMap,
    pub pages: OutputSet,
    pub source: PageSource,
}

/// 解析解压目录中的全部页面
///
/// # 返回值
/// * `NoImagesResolved` - 脊柱和兜底扫描都没有得到任何图片
pub fn resolve_pages(root: &Path, config: &ConvertConfig) -> Result<Resolution> {
    let tree = EpubTree::open(root, config);

    let package = match tree.read_package() {
        Ok(package) => Some(package),
        Err(e) => {
            warn!(root = %root.display(), "{}，改用兜底扫描", e);
            None
        }
    };
    let navigation = tree.read_navigation(package.as_ref());

    if let Some(package) = &package {
        match resolve_from_spine(&tree, package, &navigation, config) {
            Ok(pages) => {
                info!(pages = pages.page_count(), cover = pages.cover().is_some(), "按脊柱解析完成");
                return Ok(Resolution {
                    package: Some(package.clone()),
                    navigation,
                    pages,
                    source: PageSource::Spine,
                });
            }
            Err(ConvertError::NoImagesResolved) => {
                warn!("脊柱中没有解析到任何图片，改用兜底扫描");
            }
            Err(e) => return Err(e),
        }
    }

    let pages = FallbackDiscoverer::new(config).discover(root)?;
    if pages.is_empty() {
        return Err(ConvertError::NoImagesResolved);
    }

    Ok(Resolution {
        package,
        navigation,
        pages,
        source: PageSource::Fallback,
    })
}

/// 按脊柱解析，包括封面定位和去重
fn resolve_from_spine(
    tree: &EpubTree,
    package: &PackageDocument,
    navigation: &NavigationMap,
    config: &ConvertConfig,
) -> Result<OutputSet> {
    let resolver = PathResolver::new(tree.root(), &package.content_dir, config.search_depth);
    let mut output = OutputSet::new();

    if let Some(cover) = CoverResolver::new(tree, package, &resolver, config).resolve() {
        output.stage_cover(cover.path);
    }

    let count = PageSequencer::new(tree, package, navigation, &resolver, config).sequence(&mut output);
    if count == 0 {
        return Err(ConvertError::NoImagesResolved);
    }
    Ok(output)
}
