pub mod container;
pub mod images;
pub mod locator;
pub mod ncx;
pub mod opf;
pub mod paths;
pub mod reader;

// 重新导出容器相关
pub use container::{Container, RootFile};

// 重新导出目录读取器
pub use reader::{EpubTree, PackageDocument};

// 重新导出图片引用提取
pub use images::{ImageExtractor, ImageReference, ImageReferences};

// 重新导出OPF相关
pub use opf::{Creator, CreatorRole, ManifestItem, Metadata, Opf, PageProgression, SpineItem};

// 重新导出NCX相关
pub use ncx::{NavigationMap, Ncx};
