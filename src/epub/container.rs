use crate::error::{ConvertError, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// OPF包文件的标准媒体类型
pub const OPF_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone, PartialEq)]
pub struct RootFile {
    pub full_path: String,
    /// 部分制作工具会省略media-type，此时为空字符串
    pub media_type: String,
}

/// Container.xml的解析结果
#[derive(Debug, Clone)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Container {
    /// 解析container.xml内容
    ///
    /// # 参数
    /// * `xml_content` - container.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<Container>` - 解析后的Container信息，一个rootfile都没有时返回错误
    pub fn parse_xml(xml_content: &str) -> Result<Container> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut rootfiles = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e)
                    if e.local_name().as_ref() == b"rootfile" =>
                {
                    let mut full_path = String::new();
                    let mut media_type = String::new();

                    for attr_result in e.attributes() {
                        let attr = attr_result
                            .map_err(|e| ConvertError::Xml(quick_xml::Error::InvalidAttr(e)))?;
                        match attr.key.local_name().as_ref() {
                            b"full-path" => {
                                full_path = attr.unescape_value()?.trim().to_string();
                            }
                            b"media-type" => {
                                media_type = attr.unescape_value()?.trim().to_string();
                            }
                            _ => {}
                        }
                    }

                    if !full_path.is_empty() {
                        rootfiles.push(RootFile {
                            full_path,
                            media_type,
                        });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if rootfiles.is_empty() {
            return Err(ConvertError::ManifestParse(
                "container.xml中没有找到任何rootfile条目".to_string(),
            ));
        }

        Ok(Container { rootfiles })
    }

    /// 按扩展名查找rootfile路径
    ///
    /// 对于`opf`扩展名，优先返回媒体类型为标准OPF类型的条目。
    pub fn find_rootfile(&self, extension: &str) -> Option<&str> {
        let matches_extension = |rootfile: &&RootFile| {
            rootfile
                .full_path
                .rsplit('.')
                .next()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        };

        if extension.eq_ignore_ascii_case("opf") {
            if let Some(rootfile) = self
                .rootfiles
                .iter()
                .filter(matches_extension)
                .find(|rootfile| rootfile.media_type == OPF_MEDIA_TYPE)
            {
                return Some(&rootfile.full_path);
            }
        }

        self.rootfiles
            .iter()
            .find(matches_extension)
            .map(|rootfile| rootfile.full_path.as_str())
    }
}
