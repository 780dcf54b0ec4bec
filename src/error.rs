use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// 转换过程中的错误类型
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML解析错误: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("目录遍历错误: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("未找到OPF包文件: {0}")]
    ManifestNotFound(PathBuf),

    #[error("OPF文件解析错误: {0}")]
    ManifestParse(String),

    #[error("NCX文件解析错误: {0}")]
    NavigationParse(String),

    #[error("无法定位图片 {reference} (引用自 {page})")]
    ImageNotFound { reference: String, page: PathBuf },

    #[error("结构化解析没有得到任何图片")]
    NoImagesResolved,

    #[error("无法创建压缩包: {0}")]
    ArchiveCreationFailed(String),

    #[error("配置文件错误: {0}")]
    Config(String),

    #[error("ComicInfo生成失败: {0}")]
    ComicInfo(String),
}

impl ConvertError {
    /// 将XML层面的错误归类为OPF解析错误
    pub(crate) fn into_manifest_error(self) -> Self {
        match self {
            ConvertError::Xml(e) => ConvertError::ManifestParse(format!("XML解析错误: {}", e)),
            other => other,
        }
    }

    /// 将XML层面的错误归类为NCX解析错误
    pub(crate) fn into_navigation_error(self) -> Self {
        match self {
            ConvertError::Xml(e) => ConvertError::NavigationParse(format!("XML解析错误: {}", e)),
            other => other,
        }
    }
}
