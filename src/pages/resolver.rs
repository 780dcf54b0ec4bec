//! 图片路径解析模块
//!
//! 把页面中的图片引用映射到磁盘上的实际文件。很多漫画EPUB的引用并不规范，
//! 所以除了按页面目录解析之外，还会依次尝试一组常见位置，最后按文件名搜索。
//! 所有结果都限制在解压根目录之内，包括符号链接的实际指向。

use crate::epub::images::ImageReference;
use crate::epub::paths;
use crate::error::{ConvertError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// 图片路径解析器
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    /// 解析符号链接后的根目录
    real_root: PathBuf,
    content_dir: PathBuf,
    search_depth: usize,
}

impl PathResolver {
    /// # 参数
    /// * `root` - 解压根目录
    /// * `content_dir` - OPF所在目录
    /// * `search_depth` - 按文件名搜索时的最大深度
    pub fn new(root: &Path, content_dir: &Path, search_depth: usize) -> Self {
        Self {
            root: root.to_path_buf(),
            real_root: fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf()),
            content_dir: content_dir.to_path_buf(),
            search_depth,
        }
    }

    /// 解析页面中的一个图片引用
    ///
    /// # 参数
    /// * `page_dir` - 引用所在页面的目录
    /// * `reference` - 原始引用
    ///
    /// # 返回值
    /// * `ImageNotFound` - 内联数据、远程地址、越出根目录或所有候选位置都不存在
    pub fn resolve(&self, page_dir: &Path, reference: &ImageReference) -> Result<PathBuf> {
        let not_found = || ConvertError::ImageNotFound {
            reference: reference.to_string(),
            page: page_dir.to_path_buf(),
        };

        let raw = reference.as_str();
        if paths::is_external(raw) || paths::decode_href(raw).is_empty() {
            return Err(not_found());
        }

        let found = self
            .candidates(page_dir, raw)
            .into_iter()
            .find(|candidate| candidate.is_file() && self.is_inside_root(candidate))
            .or_else(|| self.search_by_name(raw));

        match found {
            Some(path) => Ok(path),
            None => Err(not_found()),
        }
    }

    fn candidates(&self, page_dir: &Path, raw: &str) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = [page_dir, self.content_dir.as_path()]
            .into_iter()
            .filter_map(|base| paths::join_href(base, &self.root, raw))
            .collect();

        if let Some(name) = paths::basename(raw) {
            candidates.push(self.root.join("OEBPS").join("images").join(&name));
            candidates.push(self.root.join("images").join(&name));
            candidates.push(self.root.join(&name));
        }
        candidates
    }

    /// 判断文件解析符号链接后是否仍在解压根目录之内
    pub fn is_inside_root(&self, path: &Path) -> bool {
        fs::canonicalize(path).is_ok_and(|real| real.starts_with(&self.real_root))
    }

    fn search_by_name(&self, raw: &str) -> Option<PathBuf> {
        let name = paths::basename(raw)?;
        let found = WalkDir::new(&self.root)
            .max_depth(self.search_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| {
                entry.file_type().is_file()
                    && entry.file_name().to_string_lossy() == name
                    && self.is_inside_root(entry.path())
            })
            .map(|entry| entry.into_path());

        if let Some(path) = &found {
            debug!(reference = raw, path = %path.display(), "按文件名搜索找到图片");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"img").unwrap();
        path
    }

    fn resolver(root: &Path) -> PathResolver {
        PathResolver::new(root, &root.join("OEBPS"), 5)
    }

    #[test]
    fn test_relative_to_page_dir() {
        let dir = TempDir::new().unwrap();
        let expected = touch(dir.path(), "OEBPS/images/page%01.jpg");
        let page_dir = dir.path().join("OEBPS/Text");

        let found = resolver(dir.path())
            .resolve(&page_dir, &ImageReference::new("../images/page%2501.jpg#frag"))
            .unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_relative_to_content_dir() {
        let dir = TempDir::new().unwrap();
        let expected = touch(dir.path(), "OEBPS/img/a.png");
        let page_dir = dir.path().join("OEBPS/Text");

        let found = resolver(dir.path())
            .resolve(&page_dir, &ImageReference::new("img/a.png"))
            .unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_conventional_locations_by_basename() {
        let dir = TempDir::new().unwrap();
        let expected = touch(dir.path(), "images/b.jpg");
        let page_dir = dir.path().join("OEBPS/Text");

        let found = resolver(dir.path())
            .resolve(&page_dir, &ImageReference::new("../../wrong/place/b.jpg"))
            .unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_recursive_search_by_name() {
        let dir = TempDir::new().unwrap();
        let expected = touch(dir.path(), "deep/nested/c.webp");
        let page_dir = dir.path().join("OEBPS/Text");

        let found = resolver(dir.path())
            .resolve(&page_dir, &ImageReference::new("c.webp"))
            .unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_unresolvable_references() {
        let dir = TempDir::new().unwrap();
        let page_dir = dir.path().join("OEBPS/Text");
        let resolver = resolver(dir.path());

        for raw in ["missing.jpg", "data:image/png;base64,AAAA", "https://example.com/a.jpg", "#only"] {
            assert!(matches!(
                resolver.resolve(&page_dir, &ImageReference::new(raw)),
                Err(ConvertError::ImageNotFound { .. })
            ));
        }
    }

    #[test]
    fn test_references_outside_root_are_rejected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("book");
        touch(dir.path(), "outside.jpg");
        touch(&root, "OEBPS/Text/p1.xhtml");
        let page_dir = root.join("OEBPS/Text");
        let resolver = resolver(&root);

        for raw in ["../../../outside.jpg", "/../outside.jpg", "..%2F..%2F..%2Foutside.jpg"] {
            assert!(matches!(
                resolver.resolve(&page_dir, &ImageReference::new(raw)),
                Err(ConvertError::ImageNotFound { .. })
            ));
        }
        assert!(matches!(
            resolver.resolve(&root, &ImageReference::new("../outside.jpg")),
            Err(ConvertError::ImageNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_leaving_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("book");
        let outside = touch(dir.path(), "secret.jpg");
        fs::create_dir_all(root.join("OEBPS/images")).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("OEBPS/images/link.jpg")).unwrap();
        let page_dir = root.join("OEBPS/Text");

        assert!(matches!(
            resolver(&root).resolve(&page_dir, &ImageReference::new("../images/link.jpg")),
            Err(ConvertError::ImageNotFound { .. })
        ));
    }
}
