use std::collections::HashMap;

use super::colors::{next_lane_color, ColorMap};
use super::models::{
    ColoredLabel, HistoryItem, HistoryItemKind, HistoryItemViewModel, Swimlane,
};

/// 逐页构建的提交图
///
/// 每个提交的输入泳道是上一个提交的输出泳道。追加的页面只读取已有的最后一行
/// 和本页内容，已经计算出的行不会因为后续页面而改变。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryGraph {
    view_models: Vec<HistoryItemViewModel>,
    color_index: Option<u8>,
}

impl HistoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view_models(&self) -> &[HistoryItemViewModel] {
        &self.view_models
    }

    pub fn len(&self) -> usize {
        self.view_models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view_models.is_empty()
    }

    /// 追加一页提交；合并提交其余父提交的标签颜色只在本页中查找
    pub fn extend(&mut self, items: &[HistoryItem], color_map: &ColorMap, head_revision: Option<&str>) {
        let page_by_id: HashMap<&str, &HistoryItem> =
            items.iter().map(|item| (item.id.as_str(), item)).collect();

        self.view_models.reserve(items.len());
        for item in items {
            let view_model = self.next_view_model(item, &page_by_id, color_map, head_revision);
            self.view_models.push(view_model);
        }
    }

    fn next_view_model(
        &mut self,
        item: &HistoryItem,
        page_by_id: &HashMap<&str, &HistoryItem>,
        color_map: &ColorMap,
        head_revision: Option<&str>,
    ) -> HistoryItemViewModel {
        let input_swimlanes = self
            .view_models
            .last()
            .map(|previous| previous.output_swimlanes.clone())
            .unwrap_or_default();

        let mut output_swimlanes = Vec::with_capacity(input_swimlanes.len() + 1);
        let mut first_parent_added = false;

        for lane in &input_swimlanes {
            if lane.id != item.id {
                output_swimlanes.push(lane.clone());
                continue;
            }

            // 第一条指向本提交的泳道延续到第一个父提交，其余泳道在此汇合
            if !first_parent_added {
                if let Some(first_parent) = item.parent_ids.first() {
                    output_swimlanes.push(Swimlane {
                        id: first_parent.clone(),
                        color: color_map.label_color(item).unwrap_or(lane.color),
                    });
                    first_parent_added = true;
                }
            }
        }

        let start = usize::from(first_parent_added);
        for (index, parent_id) in item.parent_ids.iter().enumerate().skip(start) {
            let label_color = if index == 0 {
                color_map.label_color(item)
            } else {
                page_by_id
                    .get(parent_id.as_str())
                    .and_then(|parent| color_map.label_color(parent))
            };

            output_swimlanes.push(Swimlane {
                id: parent_id.clone(),
                color: label_color.unwrap_or_else(|| next_lane_color(&mut self.color_index)),
            });
        }

        let labels = item
            .labels
            .iter()
            .map(|label| ColoredLabel {
                label: label.clone(),
                color: color_map.get(&label.title),
            })
            .collect();

        let kind = if head_revision == Some(item.id.as_str()) {
            HistoryItemKind::Head
        } else {
            HistoryItemKind::Node
        };

        HistoryItemViewModel {
            history_item: item.clone(),
            kind,
            input_swimlanes,
            output_swimlanes,
            labels,
        }
    }
}

/// 把一批提交当作单独一页计算泳道
pub fn to_history_item_view_models(
    items: &[HistoryItem],
    color_map: &ColorMap,
    head_revision: Option<&str>,
) -> Vec<HistoryItemViewModel> {
    let mut graph = HistoryGraph::new();
    graph.extend(items, color_map, head_revision);
    graph.view_models
}
