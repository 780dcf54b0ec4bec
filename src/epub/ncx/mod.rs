//! NCX（Navigation Control file for XML）文件解析模块
//!
//! 此模块提供EPUB文件中NCX导航控制文件的解析功能。
//! 对漫画转换而言，NCX只用来给页面起一个可读的名字。

pub mod navigation;
pub mod parser;

pub use navigation::NavigationMap;
pub use parser::{NavEntry, Ncx};
