use crate::error::RowmapError;
use crate::types::RowValues;

use super::{Query, QueryKind};

/// SQL text plus the bindings for its `?` placeholders, in left-to-right order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    /// Statement the text was rendered as.
    pub kind: QueryKind,
    pub sql: String,
    pub bindings: Vec<RowValues>,
}

impl RenderedSql {
    /// Number of `?` placeholders in the SQL text.
    ///
    /// Identifiers are validated and values are never inlined, so every `?` is a placeholder.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.sql.bytes().filter(|b| *b == b'?').count()
    }
}

/// Render-then-read façade over a [`Query`].
///
/// Remembers the last render so [`SqlRenderer::bindings`] can return the matching bindings.
/// The query itself is never modified.
#[derive(Debug)]
pub struct SqlRenderer<'q> {
    query: &'q Query,
    last: Option<RenderedSql>,
}

impl<'q> SqlRenderer<'q> {
    #[must_use]
    pub fn new(query: &'q Query) -> Self {
        Self { query, last: None }
    }

    #[must_use]
    pub fn query(&self) -> &'q Query {
        self.query
    }

    fn remember(&mut self, rendered: RenderedSql) -> &str {
        &self.last.insert(rendered).sql
    }

    /// # Errors
    /// Propagates [`Query::render_select_sql`] failures; the previous render is kept.
    pub fn render_select_sql(&mut self) -> Result<&str, RowmapError> {
        let rendered = self.query.render_select_sql()?;
        Ok(self.remember(rendered))
    }

    /// # Errors
    /// Propagates [`Query::render_insert_sql`] failures; the previous render is kept.
    pub fn render_insert_sql(&mut self) -> Result<&str, RowmapError> {
        let rendered = self.query.render_insert_sql()?;
        Ok(self.remember(rendered))
    }

    /// # Errors
    /// Propagates [`Query::render_update_sql`] failures; the previous render is kept.
    pub fn render_update_sql(&mut self) -> Result<&str, RowmapError> {
        let rendered = self.query.render_update_sql()?;
        Ok(self.remember(rendered))
    }

    /// # Errors
    /// Propagates [`Query::render_delete_sql`] failures; the previous render is kept.
    pub fn render_delete_sql(&mut self) -> Result<&str, RowmapError> {
        let rendered = self.query.render_delete_sql()?;
        Ok(self.remember(rendered))
    }

    /// Bindings for the most recent render.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidState` if nothing has been rendered yet.
    pub fn bindings(&self) -> Result<&[RowValues], RowmapError> {
        self.last
            .as_ref()
            .map(|rendered| rendered.bindings.as_slice())
            .ok_or_else(|| RowmapError::invalid_state("bindings requested before any render"))
    }

    /// The most recent render, if any.
    #[must_use]
    pub fn last_rendered(&self) -> Option<&RenderedSql> {
        self.last.as_ref()
    }
}
