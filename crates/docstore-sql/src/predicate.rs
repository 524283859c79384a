use tracing::debug;

use crate::dialect::Dialect;
use crate::document::encode_value;
use crate::error::Result;
use crate::model::{Operator, Query};
use crate::statement::{qualified, sanitize, Fragment};

/// Translates `queries` into one AND-able fragment per query.
///
/// Values of one query are OR-ed inside parentheses. Comparison values are
/// bound as `:attribute_{query}_{value}_{attribute}`; `search` values are
/// escaped into the statement because full-text predicates take no
/// placeholders.
pub fn translate(dialect: &dyn Dialect, queries: &[Query]) -> Result<Vec<Fragment>> {
    let mut fragments = Vec::with_capacity(queries.len());

    for (i, query) in queries.iter().enumerate() {
        if query.values.is_empty() {
            debug!(attribute = %query.attribute, "query without values skipped");
            continue;
        }

        let attribute = sanitize(&query.attribute)?;
        let column = qualified(&attribute)?;
        let mut alternatives = Vec::with_capacity(query.values.len());

        for (k, value) in query.values.iter().enumerate() {
            let alternative = match query.operator.as_sql() {
                Some(op) => {
                    let placeholder = format!(":attribute_{i}_{k}_{attribute}");
                    Fragment::new(format!("{column} {op} {placeholder}"))
                        .with_param(placeholder, encode_value(value)?)
                }
                None => {
                    debug_assert_eq!(query.operator, Operator::Search);
                    let term = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    Fragment::new(dialect.search_condition(&column, &term)?)
                }
            };
            alternatives.push(alternative);
        }

        let mut joined = Fragment::join(alternatives, " OR ");
        joined.sql = format!("({})", joined.sql);
        fragments.push(joined);
    }

    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MariaDb, Sqlite};
    use crate::driver::SqlValue;
    use crate::error::AdapterError;
    use serde_json::json;

    #[test]
    fn values_or_queries_and() {
        let queries = vec![
            Query::new("status", Operator::Equal, ["open", "blocked"]),
            Query::new("priority", Operator::GreaterEqual, [3]),
        ];
        let fragments = translate(&MariaDb, &queries).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(
            fragments[0].sql,
            "(table_main.`status` = :attribute_0_0_status OR table_main.`status` = :attribute_0_1_status)"
        );
        assert_eq!(fragments[1].sql, "(table_main.`priority` >= :attribute_1_0_priority)");
        assert_eq!(fragments[1].params, vec![(":attribute_1_0_priority".to_string(), SqlValue::Integer(3))]);
    }

    #[test]
    fn same_attribute_in_two_queries_gets_distinct_placeholders() {
        let queries = vec![
            Query::new("n", Operator::Greater, [1]),
            Query::new("n", Operator::Lesser, [9]),
        ];
        let fragments = translate(&Sqlite, &queries).unwrap();
        assert_eq!(fragments[0].params[0].0, ":attribute_0_0_n");
        assert_eq!(fragments[1].params[0].0, ":attribute_1_0_n");
    }

    #[test]
    fn empty_query_contributes_nothing() {
        let queries = vec![Query::new("n", Operator::Equal, Vec::<i64>::new())];
        assert!(translate(&MariaDb, &queries).unwrap().is_empty());
    }

    #[test]
    fn booleans_bind_as_integers() {
        let fragments = translate(&Sqlite, &[Query::equal("done", json!(true))]).unwrap();
        assert_eq!(fragments[0].params[0].1, SqlValue::Integer(1));
    }

    #[test]
    fn search_is_inlined_on_mariadb_and_rejected_on_sqlite() {
        let queries = vec![Query::search("body", "it's")];
        let fragments = translate(&MariaDb, &queries).unwrap();
        assert_eq!(fragments[0].sql, "(MATCH(table_main.`body`) AGAINST('it''s'))");
        assert!(fragments[0].params.is_empty());

        assert!(matches!(translate(&Sqlite, &queries), Err(AdapterError::Validation(_))));
    }

    #[test]
    fn hostile_attribute_names_are_sanitized() {
        let queries = vec![Query::equal("title`) OR 1=1 --", "x")];
        let fragments = translate(&MariaDb, &queries).unwrap();
        assert_eq!(fragments[0].sql, "(table_main.`titleOR11` = :attribute_0_0_titleOR11)");
    }
}
