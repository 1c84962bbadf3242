use super::{utils, RowFormatter};
use crate::infrastructure::error::Result;
use crate::scm::models::{GraphColor, HistoryItemChange, HistoryItemKind, HistoryItemViewModel};
use crate::scm::tree::TreeElement;

const RESET: &str = "\x1b[0m";

/// 文本格式化器
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// 创建新的文本格式化器
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    /// 创建不使用颜色的文本格式化器
    pub fn new_no_color() -> Self {
        Self { use_colors: false }
    }

    fn paint(&self, text: &str, color: Option<GraphColor>) -> String {
        match color {
            Some(color) if self.use_colors => {
                format!("{}{}{}", utils::graph_color_to_ansi(color), text, RESET)
            }
            _ => text.to_string(),
        }
    }

    /// 提交图的列：节点所在泳道画 `*`（HEAD 画 `@`），其余输入泳道画 `|`
    fn format_graph(&self, view_model: &HistoryItemViewModel) -> String {
        let node_index = view_model.node_index();
        let columns = view_model.input_swimlanes.len().max(node_index + 1);
        let node_color = view_model
            .input_swimlanes
            .get(node_index)
            .or_else(|| view_model.output_swimlanes.get(node_index))
            .map(|lane| lane.color);

        (0..columns)
            .map(|index| {
                if index == node_index {
                    let symbol = match view_model.kind {
                        HistoryItemKind::Head => "@",
                        HistoryItemKind::Node => "*",
                    };
                    self.paint(symbol, node_color)
                } else {
                    let lane = view_model.input_swimlanes.get(index);
                    self.paint(
                        if lane.is_some() { "|" } else { " " },
                        lane.map(|lane| lane.color),
                    )
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn format_labels(&self, view_model: &HistoryItemViewModel) -> String {
        if view_model.labels.is_empty() {
            return String::new();
        }

        let labels = view_model
            .labels
            .iter()
            .map(|colored| self.paint(&colored.label.title, colored.color))
            .collect::<Vec<_>>()
            .join(", ");
        format!(" ({})", labels)
    }

    fn format_item(&self, view_model: &HistoryItemViewModel) -> String {
        let item = &view_model.history_item;
        let statistics = item
            .statistics
            .map(|stats| format!(" [+{} -{}]", stats.insertions, stats.deletions))
            .unwrap_or_default();

        format!(
            "{}  {}{} {} - {}, {}{}",
            self.format_graph(view_model),
            item.short_id(),
            self.format_labels(view_model),
            item.subject(),
            item.author,
            item.timestamp.format("%Y-%m-%d %H:%M"),
            statistics
        )
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl RowFormatter for TextFormatter {
    fn format_rows(&self, rows: &[TreeElement]) -> Result<String> {
        if rows.is_empty() {
            return Ok("No history items.\n".to_string());
        }

        let mut output = String::new();
        for row in rows {
            match row {
                TreeElement::HistoryItem { view_model, .. } => {
                    output.push_str(&self.format_item(view_model));
                }
                TreeElement::LoadMore { .. } => {
                    output.push_str("⋯  more history available (use --pages to load more)");
                }
            }
            output.push('\n');
        }
        Ok(output)
    }

    fn format_changes(&self, changes: &[HistoryItemChange]) -> Result<String> {
        let mut output = String::new();
        for change in changes {
            let letter = utils::change_type_to_letter(&change.status);
            match &change.original_path {
                Some(original) => output.push_str(&format!(
                    "{}  {} -> {}\n",
                    letter,
                    original.display(),
                    change.path.display()
                )),
                None => output.push_str(&format!("{}  {}\n", letter, change.path.display())),
            }
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        "text"
    }
}
