//! 压缩包读写
//!
//! 只提供转换流程需要的三个操作：解压到目录、写入单个文件、把目录打包为CBZ。

use crate::error::{ConvertError, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// 把压缩包解压到`dir`，条目路径中的`..`和绝对路径由zip库拒绝
pub fn extract_to(input: &Path, dir: &Path) -> Result<()> {
    let file = File::open(input)?;
    let mut archive = ZipArchive::new(file)?;
    debug!(input = %input.display(), entries = archive.len(), "开始解压");
    archive.extract(dir)?;
    Ok(())
}

/// 写入文件，必要时创建父目录
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// 把`dir`下的全部文件按路径字典序打包到`output`
///
/// 图片原样存储，XML使用deflate压缩。先写入临时文件，成功后再改名，
/// 失败时不会留下不完整的输出。
pub fn compress_dir(dir: &Path, output: &Path) -> Result<()> {
    let partial = partial_path(output);
    let result = write_archive(dir, &partial).and_then(|()| {
        fs::rename(&partial, output)?;
        Ok(())
    });

    if let Err(e) = result {
        let _ = fs::remove_file(&partial);
        return Err(ConvertError::ArchiveCreationFailed(format!(
            "{}: {}",
            output.display(),
            e
        )));
    }
    Ok(())
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    output.with_file_name(name)
}

fn write_archive(dir: &Path, output: &Path) -> Result<()> {
    let stored = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(File::create(output)?);

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let options = if is_xml(entry.path()) { deflated } else { stored };

        zip.start_file(name.as_str(), options)?;
        let mut source = File::open(entry.path())?;
        io::copy(&mut source, &mut zip)?;
    }

    zip.finish()?.flush()?;
    Ok(())
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}
