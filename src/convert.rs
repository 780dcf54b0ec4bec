//! 转换驱动
//!
//! 单个文件的完整流程：解压 → 解析页面 → 暂存图片和ComicInfo.xml → 打包CBZ。
//! 批量转换时每个文件相互独立，一个文件失败不影响其它文件。

use crate::archive;
use crate::comicinfo::{ComicInfo, COMIC_INFO_FILE};
use crate::config::ConvertConfig;
use crate::error::{ConvertError, Result};
use crate::pages::{self, PageSource, Resolution};
use crate::workspace::Workspace;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn};

/// 输出文件的扩展名
pub const OUTPUT_EXTENSION: &str = "cbz";

/// 单个文件的转换结果
#[derive(Debug, Clone)]
pub struct ConvertReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// 不含封面的页面数
    pub pages: usize,
    pub has_cover: bool,
    pub source: PageSource,
}

/// 批量转换中一个文件的结果
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<ConvertReport>,
}

/// 计算输出路径：`<输出目录>/<输入文件名>.cbz`，未指定输出目录时放在输入文件旁边
pub fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let mut name = stem.to_os_string();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    dir.join(name)
}

/// 转换单个EPUB文件
///
/// # 参数
/// * `input` - EPUB文件路径
/// * `output_dir` - 输出目录，None表示输入文件所在目录
/// * `config` - 转换配置
///
/// # 返回值
/// * `Result<ConvertReport>` - 成功时返回输出路径和页面统计
pub fn convert_file(input: &Path, output_dir: Option<&Path>, config: &ConvertConfig) -> Result<ConvertReport> {
    let _span = info_span!("convert", file = %input.display()).entered();

    let workspace = Workspace::new()?;
    archive::extract_to(input, workspace.extract_dir())?;

    let resolution = pages::resolve_pages(workspace.extract_dir(), config)?;
    if resolution.pages.is_empty() {
        return Err(ConvertError::ArchiveCreationFailed(
            "没有可以写入的页面".to_string(),
        ));
    }

    stage_pages(&resolution, workspace.staging_dir())?;
    stage_comic_info(&resolution, input, workspace.staging_dir(), config);

    let output = output_path(input, output_dir);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    archive::compress_dir(workspace.staging_dir(), &output)?;

    let report = ConvertReport {
        input: input.to_path_buf(),
        output,
        pages: resolution.pages.page_count(),
        has_cover: resolution.pages.cover().is_some(),
        source: resolution.source,
    };
    info!(
        output = %report.output.display(),
        pages = report.pages,
        cover = report.has_cover,
        source = ?report.source,
        "转换完成"
    );
    Ok(report)
}

fn stage_pages(resolution: &Resolution, staging_dir: &Path) -> Result<()> {
    for image in &resolution.pages {
        fs::copy(&image.path, staging_dir.join(image.destination_name()))?;
    }
    Ok(())
}

/// 生成ComicInfo.xml，失败只记录警告
fn stage_comic_info(resolution: &Resolution, input: &Path, staging_dir: &Path, config: &ConvertConfig) {
    let fallback_title = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();

    let info = ComicInfo::from_package(
        resolution.package.as_ref().map(|package| &package.opf),
        &resolution.navigation,
        &resolution.pages,
        config,
    )
    .with_fallback_title(&fallback_title);

    let written = info
        .to_xml()
        .and_then(|xml| archive::write_file(&staging_dir.join(COMIC_INFO_FILE), xml.as_bytes()));
    if let Err(e) = written {
        warn!("{}，输出中不包含{}", e, COMIC_INFO_FILE);
    }
}

/// 批量转换，按`config.jobs`并行处理；结果顺序与输入一致
pub fn convert_batch(inputs: &[PathBuf], output_dir: Option<&Path>, config: &ConvertConfig) -> Vec<FileOutcome> {
    let convert_one = |input: &PathBuf| {
        let result = convert_file(input, output_dir, config);
        if let Err(e) = &result {
            error!(file = %input.display(), "转换失败: {}", e);
        }
        FileOutcome {
            input: input.clone(),
            result,
        }
    };

    if config.jobs <= 1 {
        return inputs.iter().map(convert_one).collect();
    }

    match rayon::ThreadPoolBuilder::new().num_threads(config.jobs).build() {
        Ok(pool) => pool.install(|| inputs.par_iter().map(convert_one).collect()),
        Err(e) => {
            warn!("无法创建线程池，改为顺序处理: {}", e);
            inputs.iter().map(convert_one).collect()
        }
    }
}
