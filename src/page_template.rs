use crate::Canvas;
use crate::doc_context::DocContext;
use crate::types::{Margins, Size};
use std::sync::Arc;

pub type OnPageCallback = Arc<dyn Fn(&mut Canvas, &DocContext) + Send + Sync>;

/// Page box plus the running header and footer drawn on every page.
#[derive(Clone)]
pub struct PageTemplate {
    pub name: String,
    pub page_size: Size,
    pub margins: Margins,
    on_page_header: Option<OnPageCallback>,
    on_page_footer: Option<OnPageCallback>,
}

impl PageTemplate {
    pub fn new(name: impl Into<String>, page_size: Size, margins: Margins) -> Self {
        Self {
            name: name.into(),
            page_size,
            margins,
            on_page_header: None,
            on_page_footer: None,
        }
    }

    /// Runs right after a page is opened, with the cursor at the top-left margin.
    /// Whatever the callback leaves in the cursor is where page content starts.
    pub fn set_on_page_header<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Canvas, &DocContext) + Send + Sync + 'static,
    {
        self.on_page_header = Some(Arc::new(callback));
        self
    }

    /// Runs right before a page is closed.
    pub fn set_on_page_footer<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Canvas, &DocContext) + Send + Sync + 'static,
    {
        self.on_page_footer = Some(Arc::new(callback));
        self
    }

    pub(crate) fn with_callbacks(
        mut self,
        header: Option<OnPageCallback>,
        footer: Option<OnPageCallback>,
    ) -> Self {
        self.on_page_header = header;
        self.on_page_footer = footer;
        self
    }

    pub fn on_page_header(&self) -> Option<&OnPageCallback> {
        self.on_page_header.as_ref()
    }

    pub fn on_page_footer(&self) -> Option<&OnPageCallback> {
        self.on_page_footer.as_ref()
    }
}

impl std::fmt::Debug for PageTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTemplate")
            .field("name", &self.name)
            .field("page_size", &self.page_size)
            .field("margins", &self.margins)
            .field("on_page_header", &self.on_page_header.is_some())
            .field("on_page_footer", &self.on_page_footer.is_some())
            .finish()
    }
}
