//! ComicInfo.xml生成模块
//!
//! 把OPF中的元数据映射为漫画阅读器通用的ComicInfo格式。所有字段都是尽力而为，
//! 缺失的字段直接省略。

pub mod title;

pub use title::{parse_series_number, SeriesInfo};

use crate::config::ConvertConfig;
use crate::epub::ncx::NavigationMap;
use crate::epub::opf::{CreatorRole, Opf, PageProgression};
use crate::error::{ConvertError, Result};
use crate::pages::OutputSet;
use serde::{Serialize, Serializer};

/// ComicInfo.xml在压缩包中的文件名
pub const COMIC_INFO_FILE: &str = "ComicInfo.xml";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
const XMLNS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XMLNS_XSD: &str = "http://www.w3.org/2001/XMLSchema";

/// 阅读方向标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Manga {
    #[default]
    Unknown,
    No,
    Yes,
    YesAndRightToLeft,
}

impl Manga {
    pub fn as_str(&self) -> &'static str {
        match self {
            Manga::Unknown => "Unknown",
            Manga::No => "No",
            Manga::Yes => "Yes",
            Manga::YesAndRightToLeft => "YesAndRightToLeft",
        }
    }

    /// 翻页方向优先，其次在标题和主题中匹配关键词
    fn detect(opf: &Opf, title: Option<&str>, keywords: &[String]) -> Self {
        match opf.page_progression {
            Some(PageProgression::Rtl) => return Manga::YesAndRightToLeft,
            Some(PageProgression::Ltr) => return Manga::No,
            None => {}
        }

        let subjects = opf.metadata.subjects();
        let matches_keyword = title
            .into_iter()
            .chain(subjects.iter().map(String::as_str))
            .map(str::to_lowercase)
            .any(|text| {
                keywords
                    .iter()
                    .any(|keyword| text.contains(&keyword.to_lowercase()))
            });

        if matches_keyword {
            Manga::Yes
        } else {
            Manga::Unknown
        }
    }
}

impl Serialize for Manga {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 页面信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageInfo {
    #[serde(rename = "@Image")]
    pub image: usize,
    #[serde(rename = "@Type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pages {
    #[serde(rename = "Page")]
    pub page: Vec<PageInfo>,
}

/// ComicInfo.xml的内容
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename = "ComicInfo", rename_all = "PascalCase")]
pub struct ComicInfo {
    #[serde(rename = "@xmlns:xsi")]
    xmlns_xsi: &'static str,
    #[serde(rename = "@xmlns:xsd")]
    xmlns_xsd: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penciller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(rename = "LanguageISO", skip_serializing_if = "Option::is_none")]
    pub language_iso: Option<String>,
    pub page_count: usize,
    pub manga: Manga,
    pub pages: Pages,
}

impl Default for ComicInfo {
    fn default() -> Self {
        Self {
            xmlns_xsi: XMLNS_XSI,
            xmlns_xsd: XMLNS_XSD,
            title: None,
            series: None,
            number: None,
            summary: None,
            year: None,
            month: None,
            day: None,
            writer: None,
            penciller: None,
            publisher: None,
            genre: None,
            language_iso: None,
            page_count: 0,
            manga: Manga::Unknown,
            pages: Pages::default(),
        }
    }
}

fn join_non_empty(values: Vec<String>) -> Option<String> {
    let values: Vec<String> = values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    (!values.is_empty()).then(|| values.join(", "))
}

impl ComicInfo {
    /// 根据OPF元数据和输出图片构建ComicInfo
    ///
    /// # 参数
    /// * `opf` - 解析后的OPF，没有时只填写页面信息
    /// * `navigation` - NCX导航映射，OPF没有标题时使用其docTitle
    /// * `pages` - 最终输出的图片
    /// * `config` - 提供漫画关键词
    pub fn from_package(
        opf: Option<&Opf>,
        navigation: &NavigationMap,
        pages: &OutputSet,
        config: &ConvertConfig,
    ) -> Self {
        let mut info = ComicInfo::default();
        info.fill_pages(pages);

        let title = opf
            .and_then(|opf| opf.metadata.title())
            .or_else(|| navigation.doc_title().map(str::to_string));
        info.set_title(title);

        let Some(opf) = opf else {
            return info;
        };
        let metadata = &opf.metadata;

        if let Some(series) = metadata.named("calibre:series").map(str::trim).filter(|s| !s.is_empty()) {
            info.series = Some(series.to_string());
            info.number = metadata
                .named("calibre:series_index")
                .and_then(title::normalize_series_index)
                .or(info.number.take());
        }

        info.summary = metadata.description();
        if let Some(date) = metadata.date() {
            (info.year, info.month, info.day) = title::parse_date(&date);
        }

        let creators = metadata.creators();
        let names_with_role = |role: CreatorRole| {
            creators
                .iter()
                .filter(|creator| creator.role() == role)
                .map(|creator| creator.name.clone())
                .collect::<Vec<_>>()
        };
        info.writer = join_non_empty(names_with_role(CreatorRole::Writer));
        info.penciller = join_non_empty(names_with_role(CreatorRole::Artist));

        info.publisher = metadata.publisher();
        info.genre = join_non_empty(metadata.subjects());
        info.language_iso = metadata.language();
        info.manga = Manga::detect(opf, info.title.as_deref(), &config.manga_keywords);

        info
    }

    /// 没有任何标题来源时使用的标题（通常是输入文件名）
    pub fn with_fallback_title(mut self, title: &str) -> Self {
        if self.title.is_none() && !title.trim().is_empty() {
            self.set_title(Some(title.to_string()));
        }
        self
    }

    fn set_title(&mut self, title: Option<String>) {
        let Some(title) = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) else {
            return;
        };
        let SeriesInfo { series, number } = parse_series_number(&title);
        self.series = Some(series);
        self.number = Some(number);
        self.title = Some(title);
    }

    fn fill_pages(&mut self, pages: &OutputSet) {
        self.page_count = pages.len();
        self.pages.page = pages
            .iter()
            .enumerate()
            .map(|(index, image)| PageInfo {
                image: index,
                kind: image.is_cover().then_some("FrontCover"),
            })
            .collect();
    }

    /// 序列化为带XML声明的文本
    pub fn to_xml(&self) -> Result<String> {
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::with_root(&mut body, Some("ComicInfo"))
            .map_err(|e| ConvertError::ComicInfo(e.to_string()))?;
        serializer.indent(' ', 2);
        self.serialize(serializer)
            .map_err(|e| ConvertError::ComicInfo(e.to_string()))?;

        Ok(format!("{}\n{}\n", XML_DECLARATION, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const OPF: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Berserk Vol. 5</dc:title>
    <dc:creator opf:role="aut">Kentaro Miura</dc:creator>
    <dc:creator id="c2">Studio Gaga</dc:creator>
    <meta refines="#c2" property="role">art</meta>
    <dc:publisher>Dark Horse</dc:publisher>
    <dc:date>2003-11-25</dc:date>
    <dc:language>en</dc:language>
    <dc:subject>Dark Fantasy</dc:subject>
    <dc:subject>Seinen</dc:subject>
    <dc:description>Guts &amp; Casca.</dc:description>
  </metadata>
  <manifest/>
  <spine page-progression-direction="rtl"/>
</package>"##;

    fn output_with_cover() -> OutputSet {
        let mut output = OutputSet::new();
        output.stage_cover(PathBuf::from("/x/cover.jpg"));
        output.push_page(PathBuf::from("/x/a.jpg"), None);
        output.push_page(PathBuf::from("/x/b.jpg"), None);
        output
    }

    #[test]
    fn test_full_mapping() {
        let opf = Opf::parse_xml(OPF).unwrap();
        let info = ComicInfo::from_package(
            Some(&opf),
            &NavigationMap::empty(),
            &output_with_cover(),
            &ConvertConfig::default(),
        );

        assert_eq!(info.title.as_deref(), Some("Berserk Vol. 5"));
        assert_eq!(info.series.as_deref(), Some("Berserk"));
        assert_eq!(info.number.as_deref(), Some("5"));
        assert_eq!(info.writer.as_deref(), Some("Kentaro Miura"));
        assert_eq!(info.penciller.as_deref(), Some("Studio Gaga"));
        assert_eq!(info.publisher.as_deref(), Some("Dark Horse"));
        assert_eq!((info.year, info.month, info.day), (Some(2003), Some(11), Some(25)));
        assert_eq!(info.genre.as_deref(), Some("Dark Fantasy, Seinen"));
        assert_eq!(info.language_iso.as_deref(), Some("en"));
        assert_eq!(info.summary.as_deref(), Some("Guts & Casca."));
        assert_eq!(info.manga, Manga::YesAndRightToLeft);
        assert_eq!(info.page_count, 3);
        assert_eq!(info.pages.page[0].kind, Some("FrontCover"));
        assert_eq!(info.pages.page[1].kind, None);
    }

    #[test]
    fn test_xml_output() {
        let opf = Opf::parse_xml(OPF).unwrap();
        let info = ComicInfo::from_package(
            Some(&opf),
            &NavigationMap::empty(),
            &output_with_cover(),
            &ConvertConfig::default(),
        );
        let xml = info.to_xml().unwrap();

        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains(r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#));
        assert!(xml.contains("<Series>Berserk</Series>"));
        assert!(xml.contains("<Number>5</Number>"));
        assert!(xml.contains("<Summary>Guts &amp; Casca.</Summary>"));
        assert!(xml.contains("<LanguageISO>en</LanguageISO>"));
        assert!(xml.contains("<Manga>YesAndRightToLeft</Manga>"));
        assert!(xml.contains("<PageCount>3</PageCount>"));
        assert!(xml.contains(r#"<Page Image="0" Type="FrontCover"/>"#));
        assert!(xml.contains(r#"<Page Image="2"/>"#));
        assert!(!xml.contains("<Month/>"));
    }

    #[test]
    fn test_serialization_is_stable() {
        let opf = Opf::parse_xml(OPF).unwrap();
        let build = || {
            ComicInfo::from_package(
                Some(&opf),
                &NavigationMap::empty(),
                &output_with_cover(),
                &ConvertConfig::default(),
            )
            .to_xml()
            .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_calibre_series_overrides_title() {
        let opf = Opf::parse_xml(
            r#"<package><metadata>
<dc:title>The Black Swordsman</dc:title>
<meta name="calibre:series" content="Berserk"/>
<meta name="calibre:series_index" content="1.0"/>
</metadata><manifest/><spine/></package>"#,
        )
        .unwrap();
        let info = ComicInfo::from_package(
            Some(&opf),
            &NavigationMap::empty(),
            &OutputSet::new(),
            &ConvertConfig::default(),
        );

        assert_eq!(info.series.as_deref(), Some("Berserk"));
        assert_eq!(info.number.as_deref(), Some("1"));
        assert_eq!(info.manga, Manga::Unknown);
    }

    #[test]
    fn test_manga_keyword_detection() {
        let opf = Opf::parse_xml(
            r#"<package><metadata><dc:title>Some Story</dc:title><dc:subject>Manhwa</dc:subject></metadata>
<manifest/><spine page-progression-direction="default"/></package>"#,
        )
        .unwrap();
        let info = ComicInfo::from_package(
            Some(&opf),
            &NavigationMap::empty(),
            &OutputSet::new(),
            &ConvertConfig::default(),
        );
        assert_eq!(info.manga, Manga::Yes);
    }

    #[test]
    fn test_without_package() {
        let info = ComicInfo::from_package(None, &NavigationMap::empty(), &output_with_cover(), &ConvertConfig::default())
            .with_fallback_title("Chainsaw Man #3");

        assert_eq!(info.series.as_deref(), Some("Chainsaw Man"));
        assert_eq!(info.number.as_deref(), Some("3"));
        assert_eq!(info.writer, None);
        assert_eq!(info.manga, Manga::Unknown);
    }
}
