//! NCX解析器模块
//!
//! 提供NCX（Navigation Control file for XML）文件的XML解析功能。
//! 只关心每个导航点的内容路径和标签文本。

use crate::error::{ConvertError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// 一个完整的导航点：内容路径及其标签
#[derive(Debug, Clone, PartialEq)]
pub struct NavEntry {
    /// content元素的src属性，相对于NCX文件
    pub src: String,
    /// navLabel/text的文本
    pub label: String,
}

/// NCX文件解析结果
#[derive(Debug, Clone, Default)]
pub struct Ncx {
    /// 文档标题
    pub doc_title: Option<String>,
    /// 按文档顺序排列的导航点（包括嵌套的子导航点）
    pub entries: Vec<NavEntry>,
}

/// 正在解析的导航点
#[derive(Debug, Default)]
struct PendingNavPoint {
    /// 在entries中预留的位置，保证父导航点排在子导航点之前
    slot: usize,
    src: Option<String>,
    label: Option<String>,
}

impl Ncx {
    /// 解析NCX文件内容
    ///
    /// 缺少标签或路径的导航点会被静默跳过，只有XML格式错误才会返回`NavigationParse`。
    pub fn parse_xml(xml_content: &str) -> Result<Ncx> {
        Self::parse_events(xml_content).map_err(ConvertError::into_navigation_error)
    }

    fn parse_events(xml_content: &str) -> Result<Ncx> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut doc_title = None;
        let mut slots: Vec<Option<NavEntry>> = Vec::new();
        let mut stack: Vec<PendingNavPoint> = Vec::new();

        let mut in_doc_title = false;
        let mut in_nav_label = false;
        let mut text_content = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    match e.local_name().as_ref() {
                        b"docTitle" => in_doc_title = true,
                        b"navPoint" => {
                            slots.push(None);
                            stack.push(PendingNavPoint {
                                slot: slots.len() - 1,
                                ..Default::default()
                            });
                        }
                        b"navLabel" => in_nav_label = true,
                        b"content" => Self::read_content_src(e, &mut stack)?,
                        _ => {}
                    }
                    text_content.clear();
                }
                Event::Empty(ref e) => {
                    if e.local_name().as_ref() == b"content" {
                        Self::read_content_src(e, &mut stack)?;
                    }
                }
                Event::Text(e) => {
                    text_content.push_str(&e.unescape()?);
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"text" if in_doc_title => {
                        doc_title = Some(text_content.trim().to_string()).filter(|t| !t.is_empty());
                    }
                    b"text" if in_nav_label => {
                        // 只记录离当前导航点最近的navLabel
                        if let Some(point) = stack.last_mut() {
                            if point.label.is_none() {
                                let label = text_content.trim();
                                if !label.is_empty() {
                                    point.label = Some(label.to_string());
                                }
                            }
                        }
                    }
                    b"docTitle" => in_doc_title = false,
                    b"navLabel" => in_nav_label = false,
                    b"navPoint" => {
                        if let Some(point) = stack.pop() {
                            if let (Some(src), Some(label)) = (point.src, point.label) {
                                slots[point.slot] = Some(NavEntry { src, label });
                            }
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Ncx {
            doc_title,
            entries: slots.into_iter().flatten().collect(),
        })
    }

    fn read_content_src(e: &BytesStart, stack: &mut [PendingNavPoint]) -> Result<()> {
        let Some(point) = stack.last_mut() else {
            return Ok(());
        };
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| ConvertError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            if attr.key.local_name().as_ref() == b"src" {
                let src = attr.unescape_value()?.trim().to_string();
                if !src.is_empty() && point.src.is_none() {
                    point.src = Some(src);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:1234"/></head>
  <docTitle><text>Berserk Vol. 5</text></docTitle>
  <navMap>
    <navPoint id="n1" playOrder="1">
      <navLabel><text>Chapter 1</text></navLabel>
      <content src="Text/p1.xhtml#start"/>
      <navPoint id="n1-1" playOrder="2">
        <navLabel><text>Scene &amp; Setting</text></navLabel>
        <content src="Text/p2.xhtml"/>
      </navPoint>
    </navPoint>
    <navPoint id="broken" playOrder="3">
      <content src="Text/p3.xhtml"/>
    </navPoint>
    <navPoint id="n4" playOrder="4">
      <navLabel><text>Chapter 2</text></navLabel>
      <content src="Text/p4.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

    #[test]
    fn test_parse_nested_nav_points() {
        let ncx = Ncx::parse_xml(NCX).unwrap();
        assert_eq!(ncx.doc_title.as_deref(), Some("Berserk Vol. 5"));
        assert_eq!(
            ncx.entries,
            vec![
                NavEntry { src: "Text/p1.xhtml#start".into(), label: "Chapter 1".into() },
                NavEntry { src: "Text/p2.xhtml".into(), label: "Scene & Setting".into() },
                NavEntry { src: "Text/p4.xhtml".into(), label: "Chapter 2".into() },
            ]
        );
    }

    #[test]
    fn test_empty_nav_map() {
        let ncx = Ncx::parse_xml("<ncx><navMap/></ncx>").unwrap();
        assert!(ncx.entries.is_empty());
        assert_eq!(ncx.doc_title, None);
    }

    #[test]
    fn test_malformed_ncx_is_navigation_error() {
        let result = Ncx::parse_xml("<ncx><navMap><navPoint></navMap></ncx>");
        assert!(matches!(result, Err(ConvertError::NavigationParse(_))));
    }
}
