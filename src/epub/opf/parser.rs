//! OPF解析器模块
//!
//! 提供OPF（Open Packaging Format）文件的XML解析功能。只读取漫画转换需要的部分：
//! 元数据、清单、脊柱以及guide。

use crate::epub::opf::{
    guide::GuideReference,
    manifest::ManifestItem,
    metadata::Metadata,
    spine::{PageProgression, SpineItem},
};
use crate::error::{ConvertError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// OPF文件解析结果
#[derive(Debug, Clone, Default)]
pub struct Opf {
    /// EPUB版本
    pub version: String,
    /// 元数据
    pub metadata: Metadata,
    /// 清单项(id → 清单项)
    pub manifest: HashMap<String, ManifestItem>,
    /// 脊柱(阅读顺序)
    pub spine: Vec<SpineItem>,
    /// 脊柱的toc属性，指向NCX清单项
    pub spine_toc: Option<String>,
    /// 脊柱的翻页方向
    pub page_progression: Option<PageProgression>,
    /// guide中的引用
    pub guide: Vec<GuideReference>,
}

/// 当前所处的OPF段落
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Metadata,
    Manifest,
    Spine,
    Guide,
}

/// metadata段落中尚未闭合的元素
#[derive(Debug)]
struct OpenElement {
    name: String,
    attributes: HashMap<String, String>,
    text: String,
}

impl Opf {
    /// 解析OPF文件内容
    ///
    /// # 参数
    /// * `xml_content` - OPF文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Opf>` - XML格式错误时返回`ManifestParse`
    pub fn parse_xml(xml_content: &str) -> Result<Opf> {
        Self::parse_events(xml_content).map_err(ConvertError::into_manifest_error)
    }

    fn parse_events(xml_content: &str) -> Result<Opf> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut opf = Opf::default();
        let mut section = Section::None;
        let mut open: Option<OpenElement> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let name = local_name(e);
                    match (section, name.as_str()) {
                        (_, "package") => {
                            opf.version = collect_attributes(e)?
                                .remove("version")
                                .unwrap_or_default();
                        }
                        (_, "metadata") => section = Section::Metadata,
                        (_, "manifest") => section = Section::Manifest,
                        (_, "spine") => {
                            section = Section::Spine;
                            opf.read_spine_attributes(e)?;
                        }
                        (_, "guide") => section = Section::Guide,
                        (Section::Metadata, _) => {
                            open = Some(OpenElement {
                                name,
                                attributes: collect_attributes(e)?,
                                text: String::new(),
                            });
                        }
                        _ => opf.handle_item(section, &name, e)?,
                    }
                }
                Event::Empty(ref e) => {
                    let name = local_name(e);
                    match (section, name.as_str()) {
                        (_, "spine") => opf.read_spine_attributes(e)?,
                        (Section::Metadata, "meta") => {
                            let attributes = collect_attributes(e)?;
                            opf.handle_meta(&attributes, None);
                        }
                        _ => opf.handle_item(section, &name, e)?,
                    }
                }
                Event::Text(e) => {
                    if let Some(element) = open.as_mut() {
                        element.text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(element) = open.as_mut() {
                        element.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::End(ref e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    match name.as_str() {
                        "metadata" | "manifest" | "spine" | "guide" => section = Section::None,
                        _ if section == Section::Metadata => {
                            if let Some(element) = open.take() {
                                opf.finish_metadata_element(element);
                            }
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(opf)
    }

    /// 处理清单、脊柱、guide段落中的条目
    fn handle_item(&mut self, section: Section, name: &str, e: &BytesStart) -> Result<()> {
        match (section, name) {
            (Section::Manifest, "item") => {
                let mut attributes = collect_attributes(e)?;
                let id = attributes.remove("id").unwrap_or_default();
                let href = attributes.remove("href").unwrap_or_default();
                if id.is_empty() || href.is_empty() {
                    return Ok(());
                }
                let mut item = ManifestItem::new(
                    id.clone(),
                    href,
                    attributes.remove("media-type").unwrap_or_default(),
                );
                item.properties = attributes.remove("properties");
                self.manifest.insert(id, item);
            }
            (Section::Spine, "itemref") => {
                let attributes = collect_attributes(e)?;
                if let Some(idref) = attributes.get("idref").filter(|idref| !idref.is_empty()) {
                    let mut item = SpineItem::new(idref.clone());
                    item.linear = attributes.get("linear").is_none_or(|linear| linear != "no");
                    self.spine.push(item);
                }
            }
            (Section::Guide, "reference") => {
                let mut attributes = collect_attributes(e)?;
                if let (Some(kind), Some(href)) = (attributes.remove("type"), attributes.remove("href")) {
                    self.guide.push(GuideReference {
                        kind,
                        href,
                        title: attributes.remove("title"),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn read_spine_attributes(&mut self, e: &BytesStart) -> Result<()> {
        let attributes = collect_attributes(e)?;
        self.spine_toc = attributes.get("toc").cloned();
        self.page_progression = attributes
            .get("page-progression-direction")
            .and_then(|value| PageProgression::parse(value));
        Ok(())
    }

    /// 处理meta标签；`text`为非空标签的文本内容
    fn handle_meta(&mut self, attributes: &HashMap<String, String>, text: Option<&str>) {
        let content = attributes
            .get("content")
            .map(String::as_str)
            .or(text)
            .map(str::trim)
            .unwrap_or_default();
        if content.is_empty() {
            return;
        }

        if let Some(name) = attributes.get("name") {
            self.metadata.add_named_meta(name.clone(), content.to_string());
        }

        if let (Some(refines), Some(property)) = (attributes.get("refines"), attributes.get("property")) {
            self.metadata.add_refines(
                refines.trim_start_matches('#').to_string(),
                property.clone(),
                content.to_string(),
            );
        }
    }

    /// 元数据元素闭合时写入Metadata
    ///
    /// 注意：使用local_name会忽略命名空间前缀，`<dc:title>`会被记为`title`
    fn finish_metadata_element(&mut self, element: OpenElement) {
        if element.name == "meta" {
            self.handle_meta(&element.attributes, Some(&element.text));
            return;
        }

        let value = element.text.trim();
        if !value.is_empty() {
            self.metadata
                .add_dublin_core(element.name, value.to_string(), element.attributes);
        }
    }

    /// 根据ID获取清单项
    pub fn manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.get(id)
    }

    /// 按阅读顺序返回脊柱项及其清单项，找不到清单项的为None
    pub fn spine_items(&self) -> impl Iterator<Item = (&SpineItem, Option<&ManifestItem>)> {
        self.spine
            .iter()
            .map(|item| (item, self.manifest.get(&item.idref)))
    }

    /// 带有cover-image属性的清单项，多个时取ID最小的一个
    pub fn cover_image_item(&self) -> Option<&ManifestItem> {
        self.manifest
            .values()
            .filter(|item| item.is_cover_image())
            .min_by(|a, b| a.id.cmp(&b.id))
    }

    /// guide中type为cover的引用
    pub fn guide_cover(&self) -> Option<&GuideReference> {
        self.guide.iter().find(|reference| reference.is_cover())
    }

    /// NCX清单项：优先使用spine的toc属性，其次按媒体类型查找
    pub fn ncx_item(&self) -> Option<&ManifestItem> {
        self.spine_toc
            .as_deref()
            .and_then(|toc| self.manifest.get(toc))
            .or_else(|| {
                self.manifest
                    .values()
                    .filter(|item| item.is_ncx())
                    .min_by(|a, b| a.id.cmp(&b.id))
            })
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

/// 收集元素的全部属性，key为去掉前缀的本地名
fn collect_attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attributes = HashMap::new();
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| ConvertError::Xml(quick_xml::Error::InvalidAttr(err)))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        attributes.insert(key, value);
    }
    Ok(attributes)
}
