//! Short type labels shown next to catalog entries and result columns

/// Label for a column type
///
/// Accepts both the standard SQL names used by `INFORMATION_SCHEMA.COLUMNS`
/// (`INT64`, `STRUCT<a INT64>`, `NUMERIC(10, 2)`) and the legacy names used by
/// REST result schemas (`INTEGER`, `RECORD`, `BOOLEAN`).
#[must_use]
pub fn column_type_label(data_type: &str) -> &'static str {
    let base = data_type
        .split(['<', '('])
        .next()
        .unwrap_or(data_type)
        .trim()
        .to_ascii_uppercase();

    match base.as_str() {
        "INT64" | "INTEGER" | "INT" | "SMALLINT" | "BIGINT" | "TINYINT" | "BYTEINT" => "#",
        "FLOAT64" | "FLOAT" | "NUMERIC" | "DECIMAL" | "BIGNUMERIC" | "BIGDECIMAL" => "#.#",
        "BOOL" | "BOOLEAN" => "t/f",
        "STRING" => "s",
        "BYTES" => "0b",
        "TIMESTAMP" => "ts",
        "DATE" => "d",
        "TIME" => "t",
        "DATETIME" => "dt",
        "INTERVAL" => "|-|",
        "GEOGRAPHY" => "geo",
        "JSON" => "{j}",
        "ARRAY" => "[]",
        "STRUCT" | "RECORD" => "{}",
        _ => "?",
    }
}

/// Label for a result field, where a `REPEATED` field is an array
#[must_use]
pub fn field_type_label(data_type: &str, repeated: bool) -> &'static str {
    if repeated {
        "[]"
    } else {
        column_type_label(data_type)
    }
}

/// Label for a `table_type` value from `INFORMATION_SCHEMA.TABLES`
#[must_use]
pub fn table_type_label(table_type: &str) -> &'static str {
    match table_type.to_ascii_uppercase().as_str() {
        "BASE TABLE" | "TABLE" => "t",
        "VIEW" => "v",
        "EXTERNAL" => "ext",
        "MATERIALIZED VIEW" => "mv",
        "SNAPSHOT" => "snap",
        "CLONE" => "clone",
        _ => "?",
    }
}

/// Label for a `routine_type` value from `INFORMATION_SCHEMA.ROUTINES`
#[must_use]
pub fn routine_type_label(routine_type: &str) -> &'static str {
    match routine_type.to_ascii_uppercase().as_str() {
        "FUNCTION" | "SCALAR FUNCTION" => "fn",
        "PROCEDURE" => "proc",
        "TABLE FUNCTION" => "tvf",
        "AGGREGATE FUNCTION" => "agg",
        _ => "?",
    }
}
