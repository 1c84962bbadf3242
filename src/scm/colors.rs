use std::collections::HashMap;

use super::models::{GraphColor, HistoryItem, HistoryItemGroup};

/// 通配键：显示全部分组时，未归属当前谱系的引用使用中性色
pub const WILDCARD: &str = "*";

/// 轮换泳道颜色的数量
pub const LANE_COLOR_COUNT: u8 = 5;

/// 引用名到颜色的映射
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorMap {
    entries: HashMap<String, GraphColor>,
}

impl ColorMap {
    /// 依次写入本地、远程、基准，同名时后写入者覆盖（基准覆盖远程）
    pub fn for_group(group: &HistoryItemGroup, include_wildcard: bool) -> Self {
        let mut entries = HashMap::new();
        entries.insert(group.name.clone(), GraphColor::Local);

        if let Some(remote) = &group.remote {
            entries.insert(remote.name.clone(), GraphColor::Remote);
        }
        if let Some(base) = &group.base {
            entries.insert(base.name.clone(), GraphColor::Base);
        }
        if include_wildcard {
            entries.insert(WILDCARD.to_string(), GraphColor::Neutral);
        }

        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<GraphColor> {
        self.entries.get(name).copied()
    }

    /// 按标签查找提交的颜色；有装饰但无匹配时回落到通配颜色
    pub fn label_color(&self, item: &HistoryItem) -> Option<GraphColor> {
        item.labels
            .iter()
            .find_map(|label| self.get(&label.title))
            .or_else(|| {
                if item.labels.is_empty() {
                    None
                } else {
                    self.get(WILDCARD)
                }
            })
    }
}

/// 下一种轮换颜色
pub(crate) fn next_lane_color(color_index: &mut Option<u8>) -> GraphColor {
    let next = match *color_index {
        Some(index) => (index + 1) % LANE_COLOR_COUNT,
        None => 0,
    };
    *color_index = Some(next);
    GraphColor::Lane(next)
}
