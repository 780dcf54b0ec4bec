pub mod archive;
pub mod comicinfo;
pub mod config;
pub mod convert;
pub mod epub;
pub mod error;
pub mod pages;
pub mod workspace;

// === 核心API重新导出 ===

/// 转换入口
pub use convert::{convert_batch, convert_file, output_path, ConvertReport, FileOutcome};

/// 错误处理
pub use error::{ConvertError, Result};

/// 配置
pub use config::ConvertConfig;

// === 流水线组件（高级用法） ===

/// 页面解析
pub use pages::{resolve_pages, OutputSet, PageSource, Resolution, ResolvedImage};

/// EPUB读取
pub use epub::{EpubTree, ImageExtractor, NavigationMap, Opf};

/// ComicInfo
pub use comicinfo::{ComicInfo, Manga};

// === 库信息 ===

/// comicforge库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// comicforge库的描述
pub const DESCRIPTION: &str = "将漫画EPUB转换为带ComicInfo元数据的CBZ";
