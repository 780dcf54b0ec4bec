//! 转换配置模块
//!
//! 提供转换过程中各类启发式参数的配置管理功能，支持从YAML文件加载配置。

use crate::epub::paths;
use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 转换配置，所有字段都有默认值，配置文件中可以只写需要覆盖的部分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// 兜底扫描时图片文件的最小字节数，小于此值的视为装饰性素材
    pub min_image_bytes: u64,
    /// 查找OPF/NCX以及按文件名搜索图片时的最大递归深度
    pub search_depth: usize,
    /// 兜底扫描的最大递归深度
    pub fallback_depth: usize,
    /// 兜底扫描认可的图片扩展名（小写，不含点）
    pub image_extensions: Vec<String>,
    /// 封面页面的文件名后缀，脊柱中匹配的页面会被直接跳过
    pub cover_page_names: Vec<String>,
    /// 用于判断漫画阅读方向的关键词
    pub manga_keywords: Vec<String>,
    /// 并行处理的文件数
    pub jobs: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            min_image_bytes: 10 * 1024,
            search_depth: 5,
            fallback_depth: 16,
            image_extensions: ["jpg", "jpeg", "png", "gif", "webp", "bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cover_page_names: ["cover.xhtml", "cover.html", "cover.htm"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            manga_keywords: ["manga", "manhua", "manhwa"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            jobs: 1,
        }
    }
}

impl ConvertConfig {
    /// 从YAML配置文件加载
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConvertError::Config(format!("无法读取配置文件: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// 从YAML文本解析配置
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yml::from_str(content)
            .map_err(|e| ConvertError::Config(format!("配置文件格式错误: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 将默认配置写入指定路径
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = serde_yml::to_string(&Self::default())
            .map_err(|e| ConvertError::Config(format!("序列化配置失败: {}", e)))?;

        let content_with_header = format!(
            "# comicforge 转换配置文件\n# 未列出的字段使用内置默认值\n\n{}",
            yaml_content
        );

        fs::write(path.as_ref(), content_with_header)
            .map_err(|e| ConvertError::Config(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(ConvertError::Config("jobs 必须大于0".to_string()));
        }
        if self.search_depth == 0 || self.fallback_depth == 0 {
            return Err(ConvertError::Config("递归深度必须大于0".to_string()));
        }
        Ok(())
    }

    /// 判断扩展名是否为可识别的图片类型
    pub fn is_image_extension(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.image_extensions.iter().any(|ext| *ext == extension)
    }

    /// 判断脊柱中的href是否指向专门的封面页面
    ///
    /// 只比较文件名（不区分大小写）：与配置的名字相同，或以`-`、`_`连接在其他前缀之后，
    /// 如`p-cover.xhtml`；`backcover.xhtml`、`discover.xhtml`不算。
    pub fn is_cover_page(&self, href: &str) -> bool {
        let Some(file_name) = paths::basename(href) else {
            return false;
        };
        let file_name = file_name.to_lowercase();

        self.cover_page_names.iter().any(|name| {
            let name = name.to_lowercase();
            match file_name.strip_suffix(name.as_str()) {
                Some("") => true,
                Some(prefix) => prefix.ends_with(['-', '_']),
                None => false,
            }
        })
    }
}
