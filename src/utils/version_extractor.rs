//! 捕获文本提取工具
//! 根据匹配器的提取方式（分组序号 / 模板）从正则捕获中取出片段文本
//! 模板支持 \1 或 $1 两种分组引用格式，未产生有效替换时视为无文本

use regex::Captures;

use crate::compiler::CaptureRule;

/// 捕获文本提取工具类
pub struct VersionExtractor;

impl VersionExtractor {
    /// 按提取方式取出片段文本
    ///
    /// - `Group(n)`：分组未参与匹配时返回 None
    /// - `Template`：见 [`VersionExtractor::render_template`]
    /// - `Whole`：无文本
    pub fn capture_text(rule: &CaptureRule, captures: &Captures) -> Option<String> {
        match rule {
            CaptureRule::Group(index) => captures.get(*index).map(|m| m.as_str().to_string()),
            CaptureRule::Template(template) => Self::render_template(template, captures),
            CaptureRule::Whole => None,
        }
    }

    /// 渲染模板
    ///
    /// 单次扫描替换分组引用（支持多位序号，如 `\10`），引用不存在的分组替换为空。
    /// 未发生任何非空替换或结果为空时返回 None。
    pub fn render_template(template: &str, captures: &Captures) -> Option<String> {
        let mut rendered = String::with_capacity(template.len() + 8);
        let mut replaced = false;
        let mut chars = template.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            if c != '\\' && c != '$' {
                rendered.push(c);
                continue;
            }

            // 读取紧随其后的数字序号
            let start = pos + c.len_utf8();
            let mut end = start;
            while let Some(&(next_pos, next_c)) = chars.peek() {
                if next_c.is_ascii_digit() {
                    end = next_pos + 1;
                    chars.next();
                } else {
                    break;
                }
            }

            if end == start {
                rendered.push(c);
                continue;
            }

            let index: usize = template[start..end].parse().unwrap_or(usize::MAX);
            if let Some(matched) = captures.get(index) {
                let matched_str = matched.as_str().trim();
                if !matched_str.is_empty() {
                    replaced = true;
                }
                rendered.push_str(matched_str);
            }
        }

        let rendered = rendered.trim();
        if replaced && !rendered.is_empty() {
            Some(rendered.to_string())
        } else {
            None
        }
    }
}
