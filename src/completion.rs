//! Static editor completions: type names, reserved keywords and built-in functions
//!
//! Dataset, table and column names come from the catalog, not from here.

use serde::{Deserialize, Serialize};

/// Standard SQL type names
pub const TYPE_NAMES: &[&str] = &[
    "ARRAY", "BIGNUMERIC", "BOOL", "BYTES", "DATE", "DATETIME", "FLOAT64", "GEOGRAPHY",
    "INT64", "INTERVAL", "JSON", "NUMERIC", "RANGE", "STRING", "STRUCT", "TIME", "TIMESTAMP",
];

/// GoogleSQL reserved keywords
pub const RESERVED_KEYWORDS: &[&str] = &[
    "ALL", "AND", "ANY", "ARRAY", "AS", "ASC", "ASSERT_ROWS_MODIFIED", "AT", "BETWEEN", "BY",
    "CASE", "CAST", "COLLATE", "CONTAINS", "CREATE", "CROSS", "CUBE", "CURRENT", "DEFAULT",
    "DEFINE", "DESC", "DISTINCT", "ELSE", "END", "ENUM", "ESCAPE", "EXCEPT", "EXCLUDE",
    "EXISTS", "EXTRACT", "FALSE", "FETCH", "FOLLOWING", "FOR", "FROM", "FULL", "GROUP",
    "GROUPING", "GROUPS", "HASH", "HAVING", "IF", "IGNORE", "IN", "INNER", "INTERSECT",
    "INTERVAL", "INTO", "IS", "JOIN", "LATERAL", "LEFT", "LIKE", "LIMIT", "LOOKUP", "MERGE",
    "NATURAL", "NEW", "NO", "NOT", "NULL", "NULLS", "OF", "ON", "OR", "ORDER", "OUTER", "OVER",
    "PARTITION", "PRECEDING", "PROTO", "QUALIFY", "RANGE", "RECURSIVE", "RESPECT", "RIGHT",
    "ROLLUP", "ROWS", "SELECT", "SET", "SOME", "STRUCT", "TABLESAMPLE", "THEN", "TO", "TREAT",
    "TRUE", "UNBOUNDED", "UNION", "UNNEST", "USING", "WHEN", "WHERE", "WINDOW", "WITH",
    "WITHIN",
];

/// Commonly used built-in functions
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    // aggregate
    "ANY_VALUE", "APPROX_COUNT_DISTINCT", "APPROX_QUANTILES", "APPROX_TOP_COUNT", "ARRAY_AGG",
    "ARRAY_CONCAT_AGG", "AVG", "BIT_AND", "BIT_OR", "BIT_XOR", "COUNT", "COUNTIF", "LOGICAL_AND",
    "LOGICAL_OR", "MAX", "MAX_BY", "MIN", "MIN_BY", "STRING_AGG", "SUM",
    // statistical
    "CORR", "COVAR_POP", "COVAR_SAMP", "STDDEV", "STDDEV_POP", "STDDEV_SAMP", "VARIANCE",
    "VAR_POP", "VAR_SAMP",
    // navigation and numbering
    "CUME_DIST", "DENSE_RANK", "FIRST_VALUE", "LAG", "LAST_VALUE", "LEAD", "NTH_VALUE", "NTILE",
    "PERCENT_RANK", "PERCENTILE_CONT", "PERCENTILE_DISC", "RANK", "ROW_NUMBER",
    // conditional
    "COALESCE", "IF", "IFNULL", "NULLIF",
    // conversion
    "CAST", "SAFE_CAST", "PARSE_BIGNUMERIC", "PARSE_NUMERIC",
    // math
    "ABS", "CEIL", "CEILING", "DIV", "EXP", "FLOOR", "GREATEST", "IEEE_DIVIDE", "LEAST", "LN",
    "LOG", "LOG10", "MOD", "POW", "POWER", "RAND", "ROUND", "SAFE_ADD", "SAFE_DIVIDE",
    "SAFE_MULTIPLY", "SAFE_NEGATE", "SAFE_SUBTRACT", "SIGN", "SQRT", "TRUNC",
    // string
    "ASCII", "BYTE_LENGTH", "CHAR_LENGTH", "CONCAT", "ENDS_WITH", "FORMAT", "FROM_BASE64",
    "FROM_HEX", "INITCAP", "INSTR", "LEFT", "LENGTH", "LOWER", "LPAD", "LTRIM", "NORMALIZE",
    "REGEXP_CONTAINS", "REGEXP_EXTRACT", "REGEXP_EXTRACT_ALL", "REGEXP_REPLACE", "REPEAT",
    "REPLACE", "REVERSE", "RIGHT", "RPAD", "RTRIM", "SPLIT", "STARTS_WITH", "STRPOS",
    "SUBSTR", "SUBSTRING", "TO_BASE64", "TO_HEX", "TRIM", "UPPER",
    // json
    "JSON_EXTRACT", "JSON_EXTRACT_ARRAY", "JSON_EXTRACT_SCALAR", "JSON_QUERY",
    "JSON_QUERY_ARRAY", "JSON_VALUE", "JSON_VALUE_ARRAY", "PARSE_JSON", "TO_JSON",
    "TO_JSON_STRING",
    // array
    "ARRAY_CONCAT", "ARRAY_LENGTH", "ARRAY_REVERSE", "ARRAY_TO_STRING", "GENERATE_ARRAY",
    "GENERATE_DATE_ARRAY", "GENERATE_TIMESTAMP_ARRAY",
    // date and time
    "CURRENT_DATE", "CURRENT_DATETIME", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATE",
    "DATE_ADD", "DATE_DIFF", "DATE_SUB", "DATE_TRUNC", "DATETIME", "DATETIME_ADD",
    "DATETIME_DIFF", "DATETIME_SUB", "DATETIME_TRUNC", "EXTRACT", "FORMAT_DATE",
    "FORMAT_DATETIME", "FORMAT_TIMESTAMP", "LAST_DAY", "PARSE_DATE", "PARSE_DATETIME",
    "PARSE_TIMESTAMP", "TIME", "TIMESTAMP", "TIMESTAMP_ADD", "TIMESTAMP_DIFF",
    "TIMESTAMP_MICROS", "TIMESTAMP_MILLIS", "TIMESTAMP_SECONDS", "TIMESTAMP_SUB",
    "TIMESTAMP_TRUNC", "UNIX_DATE", "UNIX_MICROS", "UNIX_MILLIS", "UNIX_SECONDS",
    // hashing and misc
    "FARM_FINGERPRINT", "GENERATE_UUID", "MD5", "SESSION_USER", "SHA1", "SHA256", "SHA512",
    // geography
    "ST_AREA", "ST_ASTEXT", "ST_CONTAINS", "ST_DISTANCE", "ST_GEOGFROMTEXT", "ST_GEOGPOINT",
    "ST_INTERSECTS", "ST_X", "ST_Y",
];

/// Editor completion offered to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub label: String,
    pub type_label: String,
    pub value: String,
    pub priority: u32,
}

impl Completion {
    fn new(word: &str, type_label: &str, priority: u32) -> Self {
        Self {
            label: word.to_string(),
            type_label: type_label.to_string(),
            value: word.to_string(),
            priority,
        }
    }
}

/// All static completions: types, then keywords, then functions
#[must_use]
pub fn completions() -> Vec<Completion> {
    let types = TYPE_NAMES.iter().map(|t| Completion::new(t, "type", 1000));
    let keywords = RESERVED_KEYWORDS.iter().map(|k| Completion::new(k, "kw", 100));
    let functions = BUILTIN_FUNCTIONS.iter().map(|f| Completion::new(f, "fn", 1000));

    types.chain(keywords).chain(functions).collect()
}
