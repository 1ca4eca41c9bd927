/// A byte range into emitted kernel text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Span covering the last non-empty line of `text`.
    pub fn last_line(text: &str) -> Self {
        let trimmed = text.trim_end_matches('\n');
        let start = trimmed.rfind('\n').map(|i| i + 1).unwrap_or(0);
        Self {
            start: start as u32,
            end: trimmed.len() as u32,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_line() {
        let text = "u32 tmp_1 = u32(0);\nu32 tmp_2 = tmp_1;\n";
        let span = Span::last_line(text);
        assert_eq!(&text[span.start as usize..span.end as usize], "u32 tmp_2 = tmp_1;");
    }

    #[test]
    fn test_last_line_empty() {
        assert!(Span::last_line("").is_dummy());
    }
}
