use crate::error::RowmapError;

use super::{Query, QueryKind, RenderedSql, push_identifier, push_identifier_list};

impl Query {
    /// Render `SELECT <columns-or-*> FROM <table> [WHERE ...]`.
    ///
    /// Works for any query kind that carries no value set; the projection and filter are
    /// used as-is.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the query has a value set.
    pub fn render_select_sql(&self) -> Result<RenderedSql, RowmapError> {
        self.check_parts(QueryKind::Select)?;

        let mut sql = String::with_capacity(32 + self.table.len());
        sql.push_str("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            push_identifier_list(&mut sql, self.columns.iter().map(String::as_str));
        }
        sql.push_str(" FROM ");
        push_identifier(&mut sql, &self.table);

        let mut bindings = Vec::with_capacity(self.filter.len());
        self.push_where(&mut sql, &mut bindings);

        Ok(RenderedSql {
            kind: QueryKind::Select,
            sql,
            bindings,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RowmapError;
    use crate::query_builder::{Filter, QueryBuilder};
    use crate::types::RowValues;

    #[test]
    fn select_without_filter_omits_where() {
        let rendered = QueryBuilder::select("t")
            .unwrap()
            .build()
            .render_select_sql()
            .unwrap();
        assert_eq!(rendered.sql, "SELECT * FROM t");
        assert!(rendered.bindings.is_empty());
    }

    #[test]
    fn select_with_projection_and_filters() {
        let query = QueryBuilder::select("t")
            .unwrap()
            .columns(["id", "name"])
            .unwrap()
            .filter("name", "alice")
            .unwrap()
            .filter("age", 30)
            .unwrap()
            .build();
        let rendered = query.render_select_sql().unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT id, name FROM t WHERE name = ? AND age = ?"
        );
        assert_eq!(
            rendered.bindings,
            vec![RowValues::Text("alice".into()), RowValues::Int(30)]
        );
    }

    #[test]
    fn in_filter_renders_one_placeholder_per_value() {
        let query = QueryBuilder::select("t")
            .unwrap()
            .filter_in("id", [3_i64, 1, 2])
            .unwrap()
            .filter("kind", "x")
            .unwrap()
            .build();
        let rendered = query.render_select_sql().unwrap();
        assert_eq!(rendered.sql, "SELECT * FROM t WHERE id IN (?, ?, ?) AND kind = ?");
        assert_eq!(
            rendered.bindings,
            vec![
                RowValues::Int(3),
                RowValues::Int(1),
                RowValues::Int(2),
                RowValues::Text("x".into()),
            ]
        );
        let expected: usize = query.filter().iter().map(|(_, f)| f.placeholder_count()).sum();
        assert_eq!(rendered.placeholder_count(), expected);
        assert!(matches!(query.filter()[0].1, Filter::In(_)));
    }

    #[test]
    fn values_never_reach_the_sql_text() {
        let hostile = "x'; DROP TABLE t; --";
        let rendered = QueryBuilder::select("t")
            .unwrap()
            .filter("name", hostile)
            .unwrap()
            .build()
            .render_select_sql()
            .unwrap();
        assert!(!rendered.sql.contains("DROP"));
        assert_eq!(rendered.bindings, vec![RowValues::Text(hostile.into())]);
    }

    #[test]
    fn keyword_identifiers_are_quoted() {
        let rendered = QueryBuilder::select("order")
            .unwrap()
            .columns(["id", "group"])
            .unwrap()
            .filter("select", 1)
            .unwrap()
            .build()
            .render_select_sql()
            .unwrap();
        assert_eq!(
            rendered.sql,
            r#"SELECT id, "group" FROM "order" WHERE "select" = ?"#
        );
    }

    #[test]
    fn update_description_with_values_is_not_rendered_as_select() {
        let query = QueryBuilder::update("t")
            .unwrap()
            .value("name", "x")
            .unwrap()
            .build();
        let err = query.render_select_sql().unwrap_err();
        assert!(matches!(err, RowmapError::InvalidArgument(_)), "{err:?}");
    }
}
