//! 包内路径处理
//!
//! OPF、NCX和XHTML中的href都是URL形式：可能带片段、查询串以及百分号编码。
//! 这里把它们转换为可以直接拼接到文件系统路径上的形式。

use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};

/// 去掉片段和查询串并进行百分号解码
pub fn decode_href(href: &str) -> String {
    let end = href.find(['#', '?']).unwrap_or(href.len());
    percent_decode_str(href[..end].trim())
        .decode_utf8_lossy()
        .into_owned()
}

/// 是否为无法在本地解析的引用(内联数据或远程地址)
pub fn is_external(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    ["data:", "http:", "https:", "ftp:", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// 纯词法地规范化路径，折叠`.`和`..`，不访问文件系统
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// 将href解析到给定目录下，href以`/`开头时视为相对于`root`
///
/// 结果落在`root`之外（`..`越界或绝对路径）时返回None。
pub fn join_href(base_dir: &Path, root: &Path, href: &str) -> Option<PathBuf> {
    let decoded = decode_href(href);
    let joined = match decoded.strip_prefix('/') {
        Some(rooted) => normalize(&root.join(rooted)),
        None => normalize(&base_dir.join(decoded)),
    };
    joined.starts_with(normalize(root)).then_some(joined)
}

/// href的文件名部分
pub fn basename(href: &str) -> Option<String> {
    let decoded = decode_href(href);
    decoded
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
}
