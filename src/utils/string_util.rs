/// Strip a surrounding markdown code fence, if present. Smaller models wrap
/// JSON answers in ```json fences even when asked not to.
pub trait StripCodeBlock {
    fn strip_code_block(&self) -> &str;
}

impl StripCodeBlock for str {
    fn strip_code_block(&self) -> &str {
        let trimmed = self.trim();
        if trimmed.starts_with("```")
            && let Some(pos) = trimmed.find('\n')
        {
            let inner = &trimmed[pos + 1..];
            if let Some(inner) = inner.strip_suffix("```") {
                return inner.trim();
            }
        }
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(fenced.strip_code_block(), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence() {
        let fenced = "```\n{}\n```";
        assert_eq!(fenced.strip_code_block(), "{}");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!("{\"a\": 1}".strip_code_block(), "{\"a\": 1}");
        assert_eq!("  hello  ".strip_code_block(), "hello");
    }

    #[test]
    fn unterminated_fence_is_only_trimmed() {
        let partial = "```json\n{\"a\": 1}";
        assert_eq!(partial.strip_code_block(), "```json\n{\"a\": 1}");
    }
}
