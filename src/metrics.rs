#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetrics {
    pub page_number: usize,
    pub command_count: usize,
    pub text_count: usize,
    pub content_bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub total_bytes: usize,
    /// Characters the output encoding could not represent.
    pub replaced_chars: usize,
}
