//! 图片引用提取模块
//!
//! 从XHTML页面中按文档顺序提取图片地址。识别两种写法：
//! - `<img src="...">`
//! - SVG包装的 `<image xlink:href="...">` 或 `<image href="...">`
//!
//! 底层是一个宽松的标签扫描器，只负责“给出指定元素的指定属性值”，
//! 不构建文档树，遇到不闭合的标签、无引号属性等HTML写法也能继续工作。

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fmt;

/// 扫描规则：元素名及其需要读取的属性名（均为本地名，不区分大小写）
#[derive(Debug, Clone, Copy)]
pub struct ElementRule {
    pub element: &'static str,
    pub attributes: &'static [&'static str],
}

/// 图片元素的扫描规则
pub const IMAGE_RULES: [ElementRule; 2] = [
    ElementRule {
        element: "img",
        attributes: &["src"],
    },
    ElementRule {
        element: "image",
        attributes: &["href"],
    },
];

/// 宽松的标签扫描器
///
/// 一次从左到右扫描，每个匹配的元素最多产出一个值（按规则中属性的顺序取第一个非空值）。
/// 遇到无法恢复的语法错误时结束迭代。
pub struct ElementScanner<'a> {
    reader: Reader<&'a [u8]>,
    rules: &'a [ElementRule],
    finished: bool,
}

impl<'a> ElementScanner<'a> {
    pub fn new(markup: &'a str, rules: &'a [ElementRule]) -> Self {
        let mut reader = Reader::from_str(markup);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        Self {
            reader,
            rules,
            finished: false,
        }
    }

    fn match_element(&self, e: &BytesStart) -> Option<String> {
        let name = e.local_name();
        let name = String::from_utf8_lossy(name.as_ref());
        let rule = self
            .rules
            .iter()
            .find(|rule| name.eq_ignore_ascii_case(rule.element))?;

        rule.attributes.iter().find_map(|wanted| {
            e.html_attributes().flatten().find_map(|attr| {
                let key = attr.key.local_name();
                if !String::from_utf8_lossy(key.as_ref()).eq_ignore_ascii_case(wanted) {
                    return None;
                }
                let value = match attr.unescape_value() {
                    Ok(value) => value.trim().to_string(),
                    Err(_) => String::from_utf8_lossy(&attr.value).trim().to_string(),
                };
                (!value.is_empty()).then_some(value)
            })
        })
    }
}

impl Iterator for ElementScanner<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.finished {
            match self.reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if let Some(value) = self.match_element(&e) {
                        return Some(value);
                    }
                }
                Ok(Event::Eof) => self.finished = true,
                Err(err) => {
                    tracing::debug!(position = self.reader.buffer_position(), "标签扫描提前结束: {}", err);
                    self.finished = true;
                }
                Ok(_) => {}
            }
        }
        None
    }
}

/// 扫描`markup`中符合`rules`的元素，按文档顺序产出属性值
pub fn scan_elements<'a>(markup: &'a str, rules: &'a [ElementRule]) -> ElementScanner<'a> {
    ElementScanner::new(markup, rules)
}

/// 页面中的一个图片引用，相对于页面自身所在目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 图片引用提取器
///
/// 每次调用[`ImageExtractor::iter`]都会从头开始一次新的惰性扫描。
#[derive(Debug, Clone, Copy)]
pub struct ImageExtractor<'a> {
    markup: &'a str,
}

impl<'a> ImageExtractor<'a> {
    pub fn new(markup: &'a str) -> Self {
        Self { markup }
    }

    pub fn iter(&self) -> ImageReferences<'a> {
        ImageReferences {
            scanner: scan_elements(self.markup, &IMAGE_RULES),
        }
    }
}

impl<'a> IntoIterator for &ImageExtractor<'a> {
    type Item = ImageReference;
    type IntoIter = ImageReferences<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 按文档顺序产出图片引用的迭代器
pub struct ImageReferences<'a> {
    scanner: ElementScanner<'a>,
}

impl Iterator for ImageReferences<'_> {
    type Item = ImageReference;

    fn next(&mut self) -> Option<ImageReference> {
        self.scanner.next().map(ImageReference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(markup: &str) -> Vec<String> {
        ImageExtractor::new(markup)
            .iter()
            .map(|r| r.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_img_and_svg_in_document_order() {
        let markup = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:xlink="http://www.w3.org/1999/xlink">
<body>
  <svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 800 1200">
    <image width="800" height="1200" xlink:href="../images/first.jpg"/>
  </svg>
  <img src="../images/second.jpg" alt="p2"/>
  <svg:image href="../images/third.png"></svg:image>
</body>
</html>"#;
        assert_eq!(
            extract(markup),
            vec!["../images/first.jpg", "../images/second.jpg", "../images/third.png"]
        );
    }

    #[test]
    fn test_tolerates_html_fragments() {
        let markup = r#"<div><p>text<br><IMG SRC=page1.jpg alt><p>&nbsp;</div></span><img src="page2.jpg">"#;
        assert_eq!(extract(markup), vec!["page1.jpg", "page2.jpg"]);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let extractor = ImageExtractor::new(r#"<img src="a.jpg"/><img src="b.jpg"/>"#);
        let first: Vec<_> = extractor.iter().collect();
        let second: Vec<_> = (&extractor).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_skips_elements_without_value() {
        assert_eq!(extract(r#"<img alt="x"/><img src=""/><img src="ok.jpg"/>"#), vec!["ok.jpg"]);
    }

    #[test]
    fn test_no_images() {
        assert!(extract("<html><body><p>no images</p></body></html>").is_empty());
        assert!(extract("").is_empty());
    }
}
