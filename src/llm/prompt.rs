//! Prompt templates and response helpers
//!
//! Three prompts drive the application: the database architect (schema plan from
//! column names), the BI analyst (report suggestions from a schema plan) and the
//! summarizer (narrative for a generated report).

use crate::models::Row;

/// Prompt template for schema inference
pub const ARCHITECT_PROMPT_TEMPLATE: &str = r#"You are a database architect. Normalize the columns of a flat CSV file into related tables.

## Rules
1. Use the column names EXACTLY as given (case-sensitive). Never rename or invent source columns.
2. Every table needs a generated primary key column (for example "customer_id") listed in its "columns".
3. "natural_key_for_uniqueness" lists the source columns whose combined values identify one row of the table. It must never be empty.
4. "foreign_keys" maps a column of the table to "<parent_table>.<parent_primary_key>". Tables without foreign keys are parent tables.
5. A foreign key column must also appear in the table's "columns".
6. Prefer a small number of tables; keep repeated descriptive attributes with the entity they describe.

## Columns
{columns}

{samples_section}
## Output
Return ONLY a JSON object of this shape, with no explanation or markdown:
{"schema": {"<table_name>": {"columns": ["..."], "primary_key": "...", "natural_key_for_uniqueness": ["..."], "foreign_keys": {"<column>": "<parent_table>.<parent_column>"}}}}"#;

/// Prompt template for report suggestions
pub const ANALYST_PROMPT_TEMPLATE: &str = r#"You are a business intelligence analyst. Suggest 3 to 5 useful reports over the database described below.

## Schema
```json
{schema}
```

## Rules
1. Only use table and column names that appear in the schema.
2. A report over two tables must include a "join" between a parent table and a child table that references it.
3. "aggregation" is optional; "method" is one of SUM, COUNT or AVG.
4. "chart_config.type" is one of bar, line, pie or doughnut.

## Output
Return ONLY a JSON array of reports, with no explanation or markdown. Each report has this shape:
{"title": "...", "description": "...", "query": {"tables": ["..."], "columns": {"<table>": ["..."]}, "join": {"parent_table": "...", "parent_key": "...", "child_table": "...", "child_key": "..."}, "aggregation": {"groupBy": "...", "column": "...", "method": "SUM", "newColumnName": "..."}}, "chart_config": {"type": "bar"}}"#;

/// Prompt template for report summaries
pub const SUMMARIZER_PROMPT_TEMPLATE: &str = r#"The user generated a report titled "{title}". Based on this title, the report's description ("{description}") and the data below, write a brief, one-paragraph summary of the key insight.

## Data
```json
{data}
```"#;

/// Maximum tokens spent on sample data inside a prompt
pub const SAMPLE_TOKEN_BUDGET: usize = 1500;

/// Build the schema inference prompt
pub fn architect_prompt(columns: &[String], sample: &[Row]) -> String {
    let column_list = columns
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n");

    let samples_section = if sample.is_empty() {
        String::new()
    } else {
        let rows = sample
            .iter()
            .enumerate()
            .map(|(i, row)| {
                format!(
                    "Row {}: {}",
                    i + 1,
                    serde_json::to_string(row).unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "## Sample Rows\n```json\n{}\n```\n",
            truncate_to_tokens(&rows, SAMPLE_TOKEN_BUDGET)
        )
    };

    ARCHITECT_PROMPT_TEMPLATE
        .replace("{columns}", &column_list)
        .replace("{samples_section}", &samples_section)
}

/// Build the report suggestion prompt from a pretty-printed schema plan
pub fn analyst_prompt(schema_json: &str) -> String {
    ANALYST_PROMPT_TEMPLATE.replace("{schema}", schema_json)
}

/// Build the summary prompt
pub fn summarizer_prompt(title: &str, description: &str, data: &[Row]) -> String {
    let data_json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string());
    SUMMARIZER_PROMPT_TEMPLATE
        .replace("{title}", title)
        .replace("{description}", description)
        .replace("{data}", &truncate_to_tokens(&data_json, SAMPLE_TOKEN_BUDGET))
}

/// Extract JSON from a response that may contain markdown or other text
///
/// Handles fenced ```json blocks, generic fences, and JSON surrounded by prose
/// (the outermost object or array).
pub fn extract_json(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let content_start = start + 7;
        if let Some(end) = trimmed[content_start..].find("```") {
            return trimmed[content_start..content_start + end]
                .trim()
                .to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let content_start = start + 3;
        // Skip language identifier if present
        let content_start = trimmed[content_start..]
            .find('\n')
            .map(|n| content_start + n + 1)
            .unwrap_or(content_start);
        if let Some(end) = trimmed[content_start..].find("```") {
            return trimmed[content_start..content_start + end]
                .trim()
                .to_string();
        }
    }

    // Whichever bracket opens first decides between object and array
    let object = trimmed.find('{');
    let array = trimmed.find('[');
    let (open, close) = match (object, array) {
        (Some(o), Some(a)) if a < o => ('[', ']'),
        (None, Some(_)) => ('[', ']'),
        _ => ('{', '}'),
    };
    if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

/// Truncate text to approximately the given number of tokens
///
/// Uses a rough estimate of 4 characters per token
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens * 4;
    if text.len() <= max_chars {
        return text.to_string();
    }

    let mut cut = max_chars;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let truncated = &text[..cut];
    match truncated.rfind(' ') {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}

/// Estimate the token count for a piece of text
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_architect_prompt_lists_columns_verbatim() {
        let columns = vec!["Customer Name".to_string(), "order_total".to_string()];
        let prompt = architect_prompt(&columns, &[]);
        assert!(prompt.contains("- Customer Name"));
        assert!(prompt.contains("- order_total"));
        assert!(!prompt.contains("Sample Rows"));
        assert!(!prompt.contains("{columns}"));
    }

    #[test]
    fn test_architect_prompt_with_samples() {
        let sample = vec![json!({"a": 1}).as_object().cloned().unwrap()];
        let prompt = architect_prompt(&["a".to_string()], &sample);
        assert!(prompt.contains("Sample Rows"));
        assert!(prompt.contains("Row 1: {\"a\":1}"));
    }

    #[test]
    fn test_summarizer_prompt() {
        let prompt = summarizer_prompt("Sales", "Totals by region", &[]);
        assert!(prompt.contains("titled \"Sales\""));
        assert!(prompt.contains("(\"Totals by region\")"));
    }

    #[test]
    fn test_extract_json_code_block() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_json_generic_block() {
        let input = "```\n[1, 2]\n```";
        assert_eq!(extract_json(input), "[1, 2]");
    }

    #[test]
    fn test_extract_json_direct() {
        let input = "Some text {\"key\": \"value\"} more text";
        assert_eq!(extract_json(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_json_array_with_prose() {
        let input = "Here you go: [{\"title\": \"a\"}] enjoy";
        assert_eq!(extract_json(input), "[{\"title\": \"a\"}]");
    }

    #[test]
    fn test_truncate_to_tokens() {
        let short = "Hello world";
        assert_eq!(truncate_to_tokens(short, 100), short);

        let long = "a ".repeat(100);
        let truncated = truncate_to_tokens(&long, 10);
        assert!(truncated.len() < long.len());
        assert!(truncated.ends_with("..."));

        let multibyte = "é".repeat(50);
        assert!(truncate_to_tokens(&multibyte, 3).ends_with("..."));
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("test"), 1);
        assert_eq!(estimate_tokens("hello world"), 3);
    }
}
