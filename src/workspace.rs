//! 临时工作目录
//!
//! 每个输入文件使用独立的临时目录，其中`extracted/`存放解压内容，`staging/`存放待打包的文件。
//! 目录在值被drop时删除。

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};

const PREFIX: &str = "comicforge-";

/// 单个文件转换的临时工作目录
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    extract_dir: PathBuf,
    staging_dir: PathBuf,
}

impl Workspace {
    /// 在系统临时目录下创建工作目录
    pub fn new() -> Result<Self> {
        Self::from_dir(Builder::new().prefix(PREFIX).tempdir()?)
    }

    fn from_dir(dir: TempDir) -> Result<Self> {
        let extract_dir = dir.path().join("extracted");
        let staging_dir = dir.path().join("staging");
        fs::create_dir_all(&extract_dir)?;
        fs::create_dir_all(&staging_dir)?;

        Ok(Self {
            dir,
            extract_dir,
            staging_dir,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }
}
