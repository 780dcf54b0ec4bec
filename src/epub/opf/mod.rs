//! OPF（Open Packaging Format）文件解析模块
//!
//! 此模块提供EPUB文件中OPF包文件的解析功能，包括元数据、清单、脊柱、guide等信息的提取。

mod guide;
mod manifest;
mod metadata;
mod parser;
mod spine;

pub use guide::GuideReference;
pub use manifest::{ManifestItem, NCX_MEDIA_TYPE};
pub use metadata::{Creator, CreatorRole, DublinCoreValue, Metadata};
pub use parser::Opf;
pub use spine::{PageProgression, SpineItem};
