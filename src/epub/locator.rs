//! 包文件定位模块
//!
//! 在解压后的EPUB目录树中查找OPF包文件和NCX导航文件。
//! 查找过程由一组有序的策略组成，依次尝试，第一个成功的结果生效：
//! 1. 读取`META-INF/container.xml`中声明的rootfile
//! 2. 探测一组约定俗成的子目录
//! 3. 有限深度的递归搜索

use crate::epub::container::Container;
use crate::epub::paths;
use crate::error::{ConvertError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// 约定俗成的内容目录，空字符串表示解压根目录
const CONVENTIONAL_DIRS: [&str; 5] = ["", "OEBPS", "OPS", "EPUB", "content"];

/// 单个定位策略
type Strategy = fn(&Locator, &Path) -> Option<PathBuf>;

/// 按扩展名定位包内文件
#[derive(Debug, Clone)]
pub struct Locator {
    /// 目标扩展名（不含点）
    extension: &'static str,
    /// 递归搜索时优先选择的文件名
    preferred_names: &'static [&'static str],
    /// 递归搜索的最大深度
    max_depth: usize,
}

impl Locator {
    /// OPF包文件定位器
    pub fn package(max_depth: usize) -> Self {
        Self {
            extension: "opf",
            preferred_names: &["content.opf", "package.opf"],
            max_depth,
        }
    }

    /// NCX导航文件定位器
    pub fn navigation(max_depth: usize) -> Self {
        Self {
            extension: "ncx",
            preferred_names: &["toc.ncx"],
            max_depth,
        }
    }

    const STRATEGIES: [(&'static str, Strategy); 3] = [
        ("container.xml", Self::from_container),
        ("conventional-dirs", Self::from_conventional_dirs),
        ("recursive-search", Self::from_recursive_search),
    ];

    /// 依次执行所有策略
    pub fn locate(&self, root: &Path) -> Option<PathBuf> {
        Self::STRATEGIES.iter().find_map(|(name, strategy)| {
            let found = strategy(self, root);
            if let Some(path) = &found {
                debug!(strategy = *name, path = %path.display(), "找到.{}文件", self.extension);
            }
            found
        })
    }

    fn from_container(&self, root: &Path) -> Option<PathBuf> {
        let content = fs::read_to_string(root.join("META-INF").join("container.xml")).ok()?;
        let container = Container::parse_xml(&content).ok()?;
        let full_path = container.find_rootfile(self.extension)?;
        let candidate = paths::join_href(root, root, full_path)?;
        candidate.is_file().then_some(candidate)
    }

    fn from_conventional_dirs(&self, root: &Path) -> Option<PathBuf> {
        CONVENTIONAL_DIRS.iter().find_map(|dir| {
            let dir = if dir.is_empty() { root.to_path_buf() } else { root.join(dir) };
            let mut matches: Vec<PathBuf> = fs::read_dir(&dir)
                .ok()?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && self.has_extension(path))
                .collect();
            matches.sort();
            matches.into_iter().next()
        })
    }

    fn from_recursive_search(&self, root: &Path) -> Option<PathBuf> {
        let mut matches: Vec<PathBuf> = WalkDir::new(root)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && self.has_extension(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        matches.sort();

        let preferred = matches.iter().position(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| {
                    self.preferred_names
                        .iter()
                        .any(|preferred| name.eq_ignore_ascii_case(preferred))
                })
        });

        match preferred {
            Some(index) => Some(matches.swap_remove(index)),
            None => matches.into_iter().next(),
        }
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension))
    }
}

/// 定位OPF包文件，找不到时返回`ManifestNotFound`
pub fn locate_package(root: &Path, max_depth: usize) -> Result<PathBuf> {
    Locator::package(max_depth)
        .locate(root)
        .ok_or_else(|| ConvertError::ManifestNotFound(root.to_path_buf()))
}

/// 定位NCX导航文件，找不到不算错误
pub fn locate_navigation(root: &Path, max_depth: usize) -> Option<PathBuf> {
    Locator::navigation(max_depth).locate(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"<package/>").unwrap();
    }

    #[test]
    fn test_container_declared_rootfile_wins() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "OEBPS/other.opf");
        touch(dir.path(), "data/book.opf");
        fs::create_dir_all(dir.path().join("META-INF")).unwrap();
        fs::write(
            dir.path().join("META-INF/container.xml"),
            r#"<container><rootfiles><rootfile full-path="data/book.opf" media-type="application/oebps-package+xml"/></rootfiles></container>"#,
        )
        .unwrap();

        let found = locate_package(dir.path(), 5).unwrap();
        assert_eq!(found, dir.path().join("data/book.opf"));
    }

    #[test]
    fn test_container_pointing_to_missing_file_falls_through() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "OPS/package.opf");
        fs::create_dir_all(dir.path().join("META-INF")).unwrap();
        fs::write(
            dir.path().join("META-INF/container.xml"),
            r#"<container><rootfiles><rootfile full-path="missing.opf"/></rootfiles></container>"#,
        )
        .unwrap();

        let found = locate_package(dir.path(), 5).unwrap();
        assert_eq!(found, dir.path().join("OPS/package.opf"));
    }

    #[test]
    fn test_container_path_outside_root_is_ignored() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("book");
        touch(dir.path(), "evil.opf");
        touch(&root, "OPS/package.opf");
        fs::create_dir_all(root.join("META-INF")).unwrap();
        fs::write(
            root.join("META-INF/container.xml"),
            r#"<container><rootfiles><rootfile full-path="../evil.opf"/></rootfiles></container>"#,
        )
        .unwrap();

        let found = locate_package(&root, 5).unwrap();
        assert_eq!(found, root.join("OPS/package.opf"));
    }

    #[test]
    fn test_recursive_search_prefers_known_names() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/b/aaa.opf");
        touch(dir.path(), "z/content.opf");

        let found = locate_package(dir.path(), 5).unwrap();
        assert_eq!(found, dir.path().join("z/content.opf"));
    }

    #[test]
    fn test_recursive_search_respects_depth() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/b/c/d/e/f/deep.opf");

        assert!(matches!(
            locate_package(dir.path(), 3),
            Err(ConvertError::ManifestNotFound(_))
        ));
    }

    #[test]
    fn test_locate_navigation_is_optional() {
        let dir = TempDir::new().unwrap();
        assert!(locate_navigation(dir.path(), 5).is_none());

        touch(dir.path(), "OEBPS/toc.ncx");
        assert_eq!(
            locate_navigation(dir.path(), 5),
            Some(dir.path().join("OEBPS/toc.ncx"))
        );
    }
}
