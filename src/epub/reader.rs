//! 解压目录读取模块
//!
//! 面向已经解压到磁盘上的EPUB目录树，负责定位并解析OPF包文件和NCX导航文件，
//! 以及读取内容文档。

use crate::config::ConvertConfig;
use crate::epub::locator;
use crate::epub::ncx::{NavigationMap, Ncx};
use crate::epub::opf::Opf;
use crate::epub::paths;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXPECTED_MIMETYPE: &str = "application/epub+zip";

/// 解压后的EPUB目录树
#[derive(Debug, Clone)]
pub struct EpubTree {
    root: PathBuf,
    search_depth: usize,
}

/// 已解析的OPF包文件及其位置
#[derive(Debug, Clone)]
pub struct PackageDocument {
    /// OPF文件路径
    pub path: PathBuf,
    /// OPF所在目录，清单中的href相对于此目录
    pub content_dir: PathBuf,
    pub opf: Opf,
}

impl PackageDocument {
    /// 将相对于OPF的href解析为绝对路径，越出`root`时返回None
    pub fn resolve_href(&self, root: &Path, href: &str) -> Option<PathBuf> {
        paths::join_href(&self.content_dir, root, href)
    }
}

impl EpubTree {
    /// 打开解压目录
    ///
    /// mimetype文件缺失或内容不符只记录警告，不影响后续处理。
    pub fn open<P: AsRef<Path>>(root: P, config: &ConvertConfig) -> Self {
        let tree = Self {
            root: root.as_ref().to_path_buf(),
            search_depth: config.search_depth,
        };
        tree.check_mimetype();
        tree
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_mimetype(&self) {
        match fs::read_to_string(self.root.join("mimetype")) {
            Ok(content) if content.trim() == EXPECTED_MIMETYPE => {
                debug!("mimetype校验通过");
            }
            Ok(content) => {
                warn!(found = content.trim(), "mimetype内容不是{}", EXPECTED_MIMETYPE);
            }
            Err(_) => warn!(root = %self.root.display(), "缺少mimetype文件"),
        }
    }

    /// 定位并解析OPF包文件
    ///
    /// # 返回值
    /// * `ManifestNotFound` - 所有定位策略都失败
    /// * `ManifestParse` - OPF不是合法的XML
    pub fn read_package(&self) -> Result<PackageDocument> {
        let path = locator::locate_package(&self.root, self.search_depth)?;
        let opf = Opf::parse_xml(&self.read_text(&path)?)?;
        let content_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        debug!(
            path = %path.display(),
            manifest = opf.manifest.len(),
            spine = opf.spine.len(),
            "OPF解析完成"
        );

        Ok(PackageDocument {
            path,
            content_dir,
            opf,
        })
    }

    /// 读取NCX导航映射
    ///
    /// 优先使用清单中声明的NCX，其次按扩展名定位。找不到或解析失败时返回空映射。
    pub fn read_navigation(&self, package: Option<&PackageDocument>) -> NavigationMap {
        let declared = package.and_then(|package| {
            let item = package.opf.ncx_item()?;
            let path = package.resolve_href(&self.root, &item.href)?;
            path.is_file().then_some(path)
        });

        let Some(ncx_path) =
            declared.or_else(|| locator::locate_navigation(&self.root, self.search_depth))
        else {
            debug!("没有找到NCX导航文件");
            return NavigationMap::empty();
        };

        let parsed = self
            .read_text(&ncx_path)
            .and_then(|content| Ncx::parse_xml(&content));

        match parsed {
            Ok(ncx) => {
                let ncx_dir = ncx_path.parent().unwrap_or(&self.root);
                NavigationMap::from_ncx(&ncx, ncx_dir, &self.root)
            }
            Err(e) => {
                warn!(path = %ncx_path.display(), "{}，忽略导航标签", e);
                NavigationMap::empty()
            }
        }
    }

    /// 读取文本文件，非法的UTF-8字节会被替换
    pub fn read_text(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
