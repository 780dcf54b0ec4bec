//! 导航映射
//!
//! 把NCX中的导航点整理为“内容文件 → 显示标签”的映射，供页面命名使用。

use crate::epub::ncx::Ncx;
use crate::epub::paths;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 内容文件到显示标签的映射
///
/// key为规范化后的绝对路径（去掉片段），同一路径出现多次时以最后一个为准。
#[derive(Debug, Clone, Default)]
pub struct NavigationMap {
    labels: HashMap<PathBuf, String>,
    doc_title: Option<String>,
}

impl NavigationMap {
    /// 空映射，没有NCX或NCX解析失败时使用
    pub fn empty() -> Self {
        Self::default()
    }

    /// 从NCX构建映射
    ///
    /// # 参数
    /// * `ncx` - 解析后的NCX
    /// * `ncx_dir` - NCX文件所在目录，导航点的src相对于此目录
    /// * `root` - 解压根目录，用于解析以`/`开头的src
    pub fn from_ncx(ncx: &Ncx, ncx_dir: &Path, root: &Path) -> Self {
        let mut labels = HashMap::new();
        for entry in &ncx.entries {
            if let Some(path) = paths::join_href(ncx_dir, root, &entry.src) {
                labels.insert(path, entry.label.clone());
            }
        }

        Self {
            labels,
            doc_title: ncx.doc_title.clone(),
        }
    }

    /// 查找内容文件的显示标签
    pub fn label_for(&self, content_path: &Path) -> Option<&str> {
        self.labels
            .get(&paths::normalize(content_path))
            .map(String::as_str)
    }

    /// NCX的docTitle
    pub fn doc_title(&self) -> Option<&str> {
        self.doc_title.as_deref()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
