//! HTML内联脚本提取器
//! 负责从HTML中提取可执行的内联 `<script>` 内容

use std::cell::{Cell, RefCell};
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts
};
use html5ever::tokenizer::states::RawKind;
use markup5ever::interface::Attribute;
use tendril::StrTendril;

#[derive(Debug, Default, Clone)]
pub struct HtmlExtractor {
    // 当前是否位于需要收集的 script 块内
    collecting: Cell<bool>,
    current: RefCell<String>,
    inline_scripts: RefCell<Vec<String>>,
}

impl TokenSink for HtmlExtractor {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(Tag { kind: TagKind::StartTag, name, attrs, .. })
                if name.as_ref() == "script" =>
            {
                self.collecting.set(Self::is_inline_javascript(&attrs));
                self.current.borrow_mut().clear();
                // script 内容按原始文本处理，避免被当作标签解析
                return TokenSinkResult::RawData(RawKind::ScriptData);
            }
            Token::TagToken(Tag { kind: TagKind::EndTag, name, .. }) if name.as_ref() == "script" => {
                self.finish_script();
            }
            Token::CharacterTokens(text) if self.collecting.get() => {
                self.current.borrow_mut().push_str(&text);
            }
            Token::EOFToken => self.finish_script(),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl HtmlExtractor {
    /// 创建新的提取器
    pub fn new() -> Self {
        Self::default()
    }

    /// 从HTML字符串提取内联脚本
    pub fn extract(&self, html: &str) -> Self {
        let tokenizer = Tokenizer::new(self.clone(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink
    }

    /// 外链脚本、模块脚本与非JavaScript类型（如 JSON、模板）不收集
    fn is_inline_javascript(attrs: &[Attribute]) -> bool {
        for attr in attrs {
            match attr.name.local.as_ref() {
                "src" => return false,
                "type" => {
                    let script_type = attr.value.to_ascii_lowercase();
                    let script_type = script_type.trim();
                    if !(script_type.is_empty()
                        || script_type.contains("javascript")
                        || script_type.contains("ecmascript"))
                    {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }

    /// 结束当前 script 块
    fn finish_script(&self) {
        if !self.collecting.replace(false) {
            return;
        }
        let script = self.current.take();
        let script = script.trim();
        if !script.is_empty() {
            self.inline_scripts.borrow_mut().push(script.to_string());
        }
    }

    /// 获取提取到的内联脚本列表（文档顺序）
    pub fn get_inline_scripts(&self) -> Vec<String> {
        self.inline_scripts.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_extractor() {
        let html = r#"
            <script src="/jquery.min.js"></script>
            <script>window.a = "<b>not a tag</b>";</script>
            <script type="application/ld+json">{"@type": "Organization"}</script>
            <script type="module"> import x from "./x.js"; </script>
        "#;

        let extractor = HtmlExtractor::new();
        let result = extractor.extract(html);

        assert_eq!(
            result.get_inline_scripts(),
            vec![r#"window.a = "<b>not a tag</b>";"#.to_string()]
        );
    }

    #[test]
    fn test_unterminated_script_is_kept() {
        let result = HtmlExtractor::new().extract("<script>var a = 1;");
        assert_eq!(result.get_inline_scripts(), vec!["var a = 1;".to_string()]);
    }
}
