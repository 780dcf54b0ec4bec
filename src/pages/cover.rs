//! 封面解析模块
//!
//! 按以下顺序寻找封面图片，第一个在磁盘上存在的候选生效：
//! 1. `<meta name="cover" content="ID">`指向的清单项（ID不在清单中时把content当作路径）
//! 2. 带有`cover-image`属性的清单项
//! 3. guide中`type="cover"`的引用：指向图片时直接使用，指向页面时取页面中的第一张图片

use crate::config::ConvertConfig;
use crate::epub::images::ImageExtractor;
use crate::epub::reader::{EpubTree, PackageDocument};
use crate::pages::resolver::PathResolver;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 封面的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverProvenance {
    /// 来自清单（meta cover或cover-image属性）
    ManifestCover,
    /// 来自guide引用
    GuideCover,
}

/// 封面候选
#[derive(Debug, Clone, PartialEq)]
pub struct CoverCandidate {
    pub path: PathBuf,
    pub provenance: CoverProvenance,
}

/// 封面解析器
pub struct CoverResolver<'a> {
    tree: &'a EpubTree,
    package: &'a PackageDocument,
    resolver: &'a PathResolver,
    config: &'a ConvertConfig,
}

impl<'a> CoverResolver<'a> {
    pub fn new(
        tree: &'a EpubTree,
        package: &'a PackageDocument,
        resolver: &'a PathResolver,
        config: &'a ConvertConfig,
    ) -> Self {
        Self {
            tree,
            package,
            resolver,
            config,
        }
    }

    /// 解析封面，找不到时返回None
    pub fn resolve(&self) -> Option<CoverCandidate> {
        let candidate = self
            .from_meta_cover()
            .or_else(|| self.from_cover_image_property())
            .or_else(|| self.from_guide());

        match &candidate {
            Some(cover) => debug!(
                path = %cover.path.display(),
                provenance = ?cover.provenance,
                "找到封面"
            ),
            None => debug!("没有找到封面"),
        }
        candidate
    }

    fn from_meta_cover(&self) -> Option<CoverCandidate> {
        let opf = &self.package.opf;
        let cover_id = opf.metadata.cover_id()?;
        let href = opf
            .manifest_item(cover_id)
            .map_or(cover_id, |item| item.href.as_str());

        self.image_from_target(href)
            .map(|path| Self::candidate(path, CoverProvenance::ManifestCover))
    }

    fn from_cover_image_property(&self) -> Option<CoverCandidate> {
        let item = self.package.opf.cover_image_item()?;
        self.image_from_target(&item.href)
            .map(|path| Self::candidate(path, CoverProvenance::ManifestCover))
    }

    fn from_guide(&self) -> Option<CoverCandidate> {
        let reference = self.package.opf.guide_cover()?;
        self.image_from_target(reference.path())
            .map(|path| Self::candidate(path, CoverProvenance::GuideCover))
    }

    fn candidate(path: PathBuf, provenance: CoverProvenance) -> CoverCandidate {
        CoverCandidate { path, provenance }
    }

    /// 把相对于OPF的href解析为图片：本身是图片则直接返回，否则视为页面取其中第一张可解析的图片
    fn image_from_target(&self, href: &str) -> Option<PathBuf> {
        let Some(target) = self.package.resolve_href(self.tree.root(), href) else {
            warn!(href, "封面路径越出解压目录，已忽略");
            return None;
        };
        if !target.is_file() {
            debug!(href, "封面候选不存在");
            return None;
        }
        if !self.resolver.is_inside_root(&target) {
            warn!(href, "封面文件指向解压目录之外，已忽略");
            return None;
        }

        if self.is_image(&target) {
            return Some(target);
        }

        let markup = match self.tree.read_text(&target) {
            Ok(markup) => markup,
            Err(e) => {
                warn!(path = %target.display(), "无法读取封面页面: {}", e);
                return None;
            }
        };
        let page_dir = target.parent().unwrap_or(self.tree.root());

        ImageExtractor::new(&markup)
            .iter()
            .find_map(|reference| self.resolver.resolve(page_dir, &reference).ok())
    }

    fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.config.is_image_extension(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn resolve_cover(root: &Path, opf: &str) -> Option<CoverCandidate> {
        write(root, "OEBPS/content.opf", opf.as_bytes());
        let config = ConvertConfig::default();
        let tree = EpubTree::open(root, &config);
        let package = tree.read_package().unwrap();
        let resolver = PathResolver::new(root, &package.content_dir, config.search_depth);
        CoverResolver::new(&tree, &package, &resolver, &config).resolve()
    }

    #[test]
    fn test_meta_cover() {
        let dir = TempDir::new().unwrap();
        let cover = write(dir.path(), "OEBPS/images/cover.jpg", b"cover");
        let opf = r#"<package><metadata><meta name="cover" content="cov"/></metadata>
<manifest><item id="cov" href="images/cover.jpg" media-type="image/jpeg"/></manifest><spine/></package>"#;

        assert_eq!(
            resolve_cover(dir.path(), opf),
            Some(CoverCandidate { path: cover, provenance: CoverProvenance::ManifestCover })
        );
    }

    #[test]
    fn test_meta_cover_content_used_as_path() {
        let dir = TempDir::new().unwrap();
        let cover = write(dir.path(), "OEBPS/front.png", b"cover");
        let opf = r#"<package><metadata><meta name="cover" content="front.png"/></metadata><manifest/><spine/></package>"#;

        assert_eq!(resolve_cover(dir.path(), opf).map(|c| c.path), Some(cover));
    }

    #[test]
    fn test_cover_image_property() {
        let dir = TempDir::new().unwrap();
        let cover = write(dir.path(), "OEBPS/c.jpg", b"cover");
        let opf = r#"<package version="3.0"><metadata/>
<manifest><item id="c" href="c.jpg" media-type="image/jpeg" properties="cover-image"/></manifest><spine/></package>"#;

        assert_eq!(
            resolve_cover(dir.path(), opf),
            Some(CoverCandidate { path: cover, provenance: CoverProvenance::ManifestCover })
        );
    }

    #[test]
    fn test_guide_cover_page() {
        let dir = TempDir::new().unwrap();
        let cover = write(dir.path(), "OEBPS/images/front.jpg", b"cover");
        write(
            dir.path(),
            "OEBPS/Text/cover.xhtml",
            br#"<html><body><svg><image xlink:href="../images/front.jpg"/></svg></body></html>"#,
        );
        let opf = r#"<package><metadata/><manifest/><spine/>
<guide><reference type="cover" href="Text/cover.xhtml#top" title="Cover"/></guide></package>"#;

        assert_eq!(
            resolve_cover(dir.path(), opf),
            Some(CoverCandidate { path: cover, provenance: CoverProvenance::GuideCover })
        );
    }

    #[test]
    fn test_missing_meta_cover_falls_through_to_guide() {
        let dir = TempDir::new().unwrap();
        let cover = write(dir.path(), "OEBPS/g.jpg", b"cover");
        let opf = r#"<package><metadata><meta name="cover" content="gone"/></metadata>
<manifest><item id="gone" href="nope.jpg" media-type="image/jpeg"/></manifest><spine/>
<guide><reference type="cover" href="g.jpg"/></guide></package>"#;

        assert_eq!(
            resolve_cover(dir.path(), opf).map(|c| c.provenance),
            Some(CoverProvenance::GuideCover)
        );
        assert_eq!(resolve_cover(dir.path(), opf).map(|c| c.path), Some(cover));
    }

    #[test]
    fn test_cover_outside_root_is_ignored() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("book");
        write(dir.path(), "stolen.jpg", b"cover");
        let opf = r#"<package><metadata><meta name="cover" content="../../stolen.jpg"/></metadata>
<manifest/><spine/><guide><reference type="cover" href="../../stolen.jpg"/></guide></package>"#;

        assert_eq!(resolve_cover(&root, opf), None);
    }

    #[test]
    fn test_no_cover() {
        let dir = TempDir::new().unwrap();
        let opf = r#"<package><metadata/><manifest/><spine/></package>"#;
        assert_eq!(resolve_cover(dir.path(), opf), None);
    }
}
