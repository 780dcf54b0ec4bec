//! 导览模块
//!
//! EPUB2的`<guide>`段落，列出封面、目录等特殊页面。

/// guide中的一条reference
#[derive(Debug, Clone, PartialEq)]
pub struct GuideReference {
    /// 引用类型(如cover、toc、text)
    pub kind: String,
    /// 目标路径(相对于OPF文件，可能带有#片段)
    pub href: String,
    pub title: Option<String>,
}

impl GuideReference {
    pub fn is_cover(&self) -> bool {
        self.kind.eq_ignore_ascii_case("cover")
    }

    /// 去掉片段标识后的路径
    pub fn path(&self) -> &str {
        self.href.split('#').next().unwrap_or_default()
    }
}
