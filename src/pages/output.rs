//! 输出集合模块
//!
//! 记录最终写入CBZ的图片：序号、标签以及在压缩包中的文件名。

use crate::error::Result;
use once_cell::unsync::OnceCell;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// 封面在输出中的固定标签
pub const COVER_LABEL: &str = "Cover";

/// 计算文件内容的SHA-256，返回十六进制字符串
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// 标签部分的最大字节数
pub const MAX_LABEL_BYTES: usize = 200;

/// 常见文件系统对单个文件名的字节数上限
const MAX_NAME_BYTES: usize = 255;

/// 将标签整理为可以安全用作文件名的形式
///
/// 路径分隔符、Windows保留字符和控制字符替换为`_`，首尾空白去掉，
/// 超过[`MAX_LABEL_BYTES`]时在字符边界处截断；整理后为空时使用序号。
pub fn sanitize_label(label: &str, sequence: u32) -> String {
    sanitize_label_within(label, sequence, MAX_LABEL_BYTES)
}

fn sanitize_label_within(label: &str, sequence: u32, max_bytes: usize) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = truncate_on_char_boundary(cleaned.trim(), max_bytes).trim_end();

    if cleaned.is_empty() {
        sequence.to_string()
    } else {
        cleaned.to_string()
    }
}

fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// 一张已经定位到磁盘文件的图片
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    /// 图片的绝对路径
    pub path: PathBuf,
    /// 序号，封面为0，正文从1开始
    pub sequence: u32,
    /// 显示标签（未经文件名整理）
    pub label: String,
    /// 带点的扩展名，保持磁盘上的大小写；没有扩展名时为空串
    pub extension: String,
    hash: OnceCell<String>,
}

impl ResolvedImage {
    pub fn new(path: PathBuf, sequence: u32, label: impl Into<String>) -> Self {
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        Self {
            path,
            sequence,
            label: label.into(),
            extension,
            hash: OnceCell::new(),
        }
    }

    /// 内容哈希，第一次调用时计算并缓存
    pub fn content_hash(&self) -> Result<&str> {
        self.hash
            .get_or_try_init(|| file_sha256(&self.path))
            .map(String::as_str)
    }

    /// 在压缩包中的文件名，形如`001 - Chapter 1.jpg`
    ///
    /// 整个文件名不超过255字节，超长的标签会被截断。
    pub fn destination_name(&self) -> String {
        let prefix = format!("{:03} - ", self.sequence);
        let budget = MAX_NAME_BYTES
            .saturating_sub(prefix.len() + self.extension.len())
            .min(MAX_LABEL_BYTES);
        format!(
            "{}{}{}",
            prefix,
            sanitize_label_within(&self.label, self.sequence, budget),
            self.extension
        )
    }

    pub fn is_cover(&self) -> bool {
        self.sequence == 0
    }
}

/// 按序号排列的输出图片
///
/// 序号严格递增：有封面时从0开始，否则从1开始，中间没有空缺。
#[derive(Debug, Clone, Default)]
pub struct OutputSet {
    images: Vec<ResolvedImage>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 放入封面，只能在放入任何页面之前调用
    ///
    /// # 返回值
    /// * `false` - 集合非空，封面被忽略
    pub fn stage_cover(&mut self, path: PathBuf) -> bool {
        if !self.images.is_empty() {
            return false;
        }
        self.images.push(ResolvedImage::new(path, 0, COVER_LABEL));
        true
    }

    /// 下一个可用的序号
    pub fn next_sequence(&self) -> u32 {
        self.images.last().map_or(1, |image| image.sequence + 1)
    }

    /// 以下一个序号追加页面，没有标签时使用序号作为标签
    pub fn push_page(&mut self, path: PathBuf, label: Option<&str>) -> &ResolvedImage {
        let sequence = self.next_sequence();
        let label = label.map_or_else(|| sequence.to_string(), str::to_string);
        self.images.push(ResolvedImage::new(path, sequence, label));
        &self.images[self.images.len() - 1]
    }

    pub fn cover(&self) -> Option<&ResolvedImage> {
        self.images.first().filter(|image| image.is_cover())
    }

    /// 不含封面的页面数
    pub fn page_count(&self) -> usize {
        self.images.iter().filter(|image| !image.is_cover()).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedImage> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl<'a> IntoIterator for &'a OutputSet {
    type Item = &'a ResolvedImage;
    type IntoIter = std::slice::Iter<'a, ResolvedImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}
