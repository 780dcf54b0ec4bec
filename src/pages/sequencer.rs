//! 页面排序模块
//!
//! 按脊柱顺序遍历内容页面，提取并解析其中的图片，为每张图片分配序号和标签。
//!
//! 每个脊柱项依次经过：跳过判断 → 读取页面 → 提取引用 → 解析路径 → 封面去重检查 → 输出。
//! 任何一步失败都只影响当前页面或当前引用。

use crate::config::ConvertConfig;
use crate::epub::images::ImageExtractor;
use crate::epub::ncx::NavigationMap;
use crate::epub::reader::{EpubTree, PackageDocument};
use crate::pages::output::{file_sha256, OutputSet};
use crate::pages::resolver::PathResolver;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 与封面比较所需的状态，只在第一张成功解析的正文图片上使用一次
#[derive(Debug, Clone, PartialEq, Eq)]
struct DuplicateCheck {
    cover_hash: String,
}

/// 页面排序器
pub struct PageSequencer<'a> {
    tree: &'a EpubTree,
    package: &'a PackageDocument,
    navigation: &'a NavigationMap,
    resolver: &'a PathResolver,
    config: &'a ConvertConfig,
    duplicate_check: Option<DuplicateCheck>,
}

impl<'a> PageSequencer<'a> {
    pub fn new(
        tree: &'a EpubTree,
        package: &'a PackageDocument,
        navigation: &'a NavigationMap,
        resolver: &'a PathResolver,
        config: &'a ConvertConfig,
    ) -> Self {
        Self {
            tree,
            package,
            navigation,
            resolver,
            config,
            duplicate_check: None,
        }
    }

    /// 按脊柱顺序把图片追加到`output`
    ///
    /// `output`中已经放入封面时，第一张解析成功的正文图片会与封面比较内容哈希，
    /// 相同则丢弃且不占用序号。
    ///
    /// # 返回值
    /// * 追加的正文图片数量
    pub fn sequence(mut self, output: &mut OutputSet) -> usize {
        self.duplicate_check = output.cover().and_then(|cover| match cover.content_hash() {
            Ok(hash) => Some(DuplicateCheck {
                cover_hash: hash.to_string(),
            }),
            Err(e) => {
                warn!(path = %cover.path.display(), "无法计算封面哈希，跳过去重: {}", e);
                None
            }
        });

        let package = self.package;
        let before = output.page_count();
        for (spine_item, manifest_item) in package.opf.spine_items() {
            let Some(manifest_item) = manifest_item else {
                warn!(idref = %spine_item.idref, "脊柱项在清单中不存在，已跳过");
                continue;
            };

            if self.config.is_cover_page(&manifest_item.href) {
                debug!(href = %manifest_item.href, "跳过封面页面");
                continue;
            }

            let Some(page_path) = package.resolve_href(self.tree.root(), &manifest_item.href) else {
                warn!(href = %manifest_item.href, "内容页面路径越出解压目录，已跳过");
                continue;
            };
            self.sequence_page(&page_path, output);
        }
        output.page_count() - before
    }

    fn sequence_page(&mut self, page_path: &Path, output: &mut OutputSet) {
        let (tree, navigation) = (self.tree, self.navigation);
        if !page_path.is_file() {
            warn!(page = %page_path.display(), "内容页面不存在，已跳过");
            return;
        }

        let markup = match tree.read_text(page_path) {
            Ok(markup) => markup,
            Err(e) => {
                warn!(page = %page_path.display(), "无法读取内容页面: {}", e);
                return;
            }
        };

        let page_dir = page_path.parent().unwrap_or(tree.root());
        let label = navigation.label_for(page_path);
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for reference in ImageExtractor::new(&markup).iter() {
            let image_path = match self.resolver.resolve(page_dir, &reference) {
                Ok(path) => path,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            // 同一页面中重复引用的图片只计一次
            if !seen.insert(image_path.clone()) {
                continue;
            }

            if self.is_cover_duplicate(&image_path) {
                debug!(path = %image_path.display(), "第一张正文图片与封面相同，已丢弃");
                continue;
            }

            let image = output.push_page(image_path, label);
            debug!(sequence = image.sequence, path = %image.path.display(), "输出页面");
        }
    }

    /// 消耗去重检查：只有第一次调用可能返回true
    fn is_cover_duplicate(&mut self, image_path: &Path) -> bool {
        let Some(check) = self.duplicate_check.take() else {
            return false;
        };

        match file_sha256(image_path) {
            Ok(hash) => hash == check.cover_hash,
            Err(e) => {
                warn!(path = %image_path.display(), "无法计算图片哈希: {}", e);
                false
            }
        }
    }
}
