//! 元数据处理模块
//!
//! 保存OPF中的Dublin Core元素、name形式的meta标签以及EPUB3的refines关联信息，
//! 并提供按字段读取的访问方法。所有字段都是可选的。

use std::collections::HashMap;

/// 一个Dublin Core元素的值
#[derive(Debug, Clone, PartialEq)]
pub struct DublinCoreValue {
    /// 元素文本
    pub value: String,
    /// 元素属性（本地名，如 role、file-as、id）
    pub attributes: HashMap<String, String>,
}

/// 创建者在漫画元数据中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorRole {
    /// 原作/编剧
    Writer,
    /// 作画
    Artist,
}

/// 创建者信息
#[derive(Debug, Clone, PartialEq)]
pub struct Creator {
    /// 创建者姓名
    pub name: String,
    /// MARC角色代码(如aut、art)
    pub role_code: Option<String>,
    /// 元素ID（用于关联refines元数据）
    pub id: Option<String>,
}

impl Creator {
    /// 将角色代码映射为漫画角色，没有角色代码的一律视为作者
    pub fn role(&self) -> CreatorRole {
        match self.role_code.as_deref().map(str::trim) {
            Some(code)
                if ["art", "ill", "pen"]
                    .iter()
                    .any(|c| code.eq_ignore_ascii_case(c)) =>
            {
                CreatorRole::Artist
            }
            _ => CreatorRole::Writer,
        }
    }
}

/// OPF文件中的元数据信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Dublin Core元素：key为去掉命名空间前缀的标签名，value按文档顺序排列
    dublin_core: HashMap<String, Vec<DublinCoreValue>>,
    /// name形式的meta标签，如 <meta name="cover" content="cover-image"/>
    named_meta: HashMap<String, String>,
    /// refines形式的meta标签：key为被精化的元素ID（不含#），value为(property, 内容)
    refines: HashMap<String, Vec<(String, String)>>,
}

impl Metadata {
    /// 创建新的元数据实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加Dublin Core元数据
    pub fn add_dublin_core(&mut self, tag: String, value: String, attributes: HashMap<String, String>) {
        self.dublin_core
            .entry(tag)
            .or_default()
            .push(DublinCoreValue { value, attributes });
    }

    /// 添加基于name的meta元数据，同名标签以第一个为准
    pub fn add_named_meta(&mut self, name: String, content: String) {
        self.named_meta.entry(name).or_insert(content);
    }

    /// 添加基于refines的meta元数据
    pub fn add_refines(&mut self, refines_id: String, property: String, content: String) {
        self.refines
            .entry(refines_id)
            .or_default()
            .push((property, content));
    }

    fn first(&self, tag: &str) -> Option<String> {
        self.dublin_core
            .get(tag)
            .and_then(|values| values.first())
            .map(|v| v.value.clone())
    }

    fn all(&self, tag: &str) -> Vec<String> {
        self.dublin_core
            .get(tag)
            .map(|values| values.iter().map(|v| v.value.clone()).collect())
            .unwrap_or_default()
    }

    /// 获取标题
    pub fn title(&self) -> Option<String> {
        self.first("title")
    }

    /// 获取出版社
    pub fn publisher(&self) -> Option<String> {
        self.first("publisher")
    }

    /// 获取出版日期
    pub fn date(&self) -> Option<String> {
        self.first("date")
    }

    /// 获取语言
    pub fn language(&self) -> Option<String> {
        self.first("language")
    }

    /// 获取描述
    pub fn description(&self) -> Option<String> {
        self.first("description")
    }

    /// 获取第一个标识符
    pub fn identifier(&self) -> Option<String> {
        self.first("identifier")
    }

    /// 获取所有主题
    pub fn subjects(&self) -> Vec<String> {
        self.all("subject")
    }

    /// 获取所有创建者，角色优先取元素属性，其次取refines关联的role
    pub fn creators(&self) -> Vec<Creator> {
        let Some(values) = self.dublin_core.get("creator") else {
            return Vec::new();
        };

        values
            .iter()
            .map(|dc| {
                let id = dc.attributes.get("id").cloned();
                let role_code = dc.attributes.get("role").cloned().or_else(|| {
                    id.as_ref()
                        .and_then(|id| self.refines.get(id))
                        .and_then(|list| {
                            list.iter()
                                .find(|(property, _)| property == "role")
                                .map(|(_, content)| content.clone())
                        })
                });

                Creator {
                    name: dc.value.clone(),
                    role_code,
                    id,
                }
            })
            .collect()
    }

    /// 获取<meta name="cover">指向的清单ID
    pub fn cover_id(&self) -> Option<&str> {
        self.named("cover")
    }

    /// 获取name形式的meta标签内容
    pub fn named(&self, name: &str) -> Option<&str> {
        self.named_meta.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_creator_roles_from_attributes() {
        let mut metadata = Metadata::new();
        metadata.add_dublin_core("creator".into(), "Kentaro Miura".into(), attrs(&[("role", "aut")]));
        metadata.add_dublin_core("creator".into(), "Studio Gaga".into(), attrs(&[("role", "art")]));
        metadata.add_dublin_core("creator".into(), "Nobody".into(), HashMap::new());

        let creators = metadata.creators();
        assert_eq!(creators.len(), 3);
        assert_eq!(creators[0].role(), CreatorRole::Writer);
        assert_eq!(creators[1].role(), CreatorRole::Artist);
        assert_eq!(creators[2].role(), CreatorRole::Writer);
    }

    #[test]
    fn test_creator_role_from_refines() {
        let mut metadata = Metadata::new();
        metadata.add_dublin_core("creator".into(), "Artist Name".into(), attrs(&[("id", "c1")]));
        metadata.add_refines("c1".into(), "role".into(), "art".into());

        let creators = metadata.creators();
        assert_eq!(creators[0].role_code.as_deref(), Some("art"));
        assert_eq!(creators[0].role(), CreatorRole::Artist);
    }

    #[test]
    fn test_missing_fields_are_none() {
        let metadata = Metadata::new();
        assert_eq!(metadata.title(), None);
        assert_eq!(metadata.publisher(), None);
        assert!(metadata.subjects().is_empty());
        assert!(metadata.creators().is_empty());
        assert_eq!(metadata.cover_id(), None);
    }

    #[test]
    fn test_named_meta_first_wins() {
        let mut metadata = Metadata::new();
        metadata.add_named_meta("cover".into(), "img1".into());
        metadata.add_named_meta("cover".into(), "img2".into());
        assert_eq!(metadata.cover_id(), Some("img1"));
    }
}
