//! Prompt construction for NL-to-SQL generation.
//!
//! The schema descriptor is a static string: the bot knows exactly one table
//! and the prompt never takes schema text from the user.

/// Description of the one queryable table, fed verbatim into the system prompt.
pub const SCHEMA_DESCRIPTOR: &str = "\
Table: public.sales_daily
Columns:
  - date         DATE        (format: YYYY-MM-DD)
  - region       TEXT        (e.g. 'North', 'South', 'East', 'West')
  - category     TEXT        (e.g. 'Electronics', 'Grocery', 'Fashion')
  - revenue      NUMERIC     (sales revenue, decimal)
  - orders       INTEGER     (number of orders)
  - created_at   TIMESTAMPTZ (row creation timestamp, usually not needed)";

const SYSTEM_TEMPLATE: &str = "\
You are a SQL expert. Your only job is to convert a natural language question \
into a single valid PostgreSQL SELECT statement.

You have access to ONE table only:

{schema}

Rules you MUST follow:
1. Output ONLY the SQL query - no explanation, no markdown, no code fences.
2. Always write a SELECT statement. Never write INSERT, UPDATE, DELETE, DROP, or any DDL.
3. Reference only the table and columns listed above.
4. If the question is ambiguous, make a reasonable assumption.
5. End the query with a semicolon.

Examples:
Question: show revenue by region for 2025-09-01
SQL: SELECT region, SUM(revenue) AS total_revenue FROM public.sales_daily WHERE date = '2025-09-01' GROUP BY region ORDER BY total_revenue DESC;

Question: which category had the most orders?
SQL: SELECT category, SUM(orders) AS total_orders FROM public.sales_daily GROUP BY category ORDER BY total_orders DESC LIMIT 1;

Question: total revenue per day
SQL: SELECT date, SUM(revenue) AS total_revenue FROM public.sales_daily GROUP BY date ORDER BY date;";

/// Builds the (system, human) prompt pair for a question.
///
/// Pure string composition: the system prompt is constant apart from the
/// schema text, the human prompt interpolates the question opaquely.
pub fn build_prompt(question: &str) -> (String, String) {
    let system = SYSTEM_TEMPLATE.replace("{schema}", SCHEMA_DESCRIPTOR);
    let human = format!("Question: {}\nSQL:", question);
    (system, human)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_carries_schema_and_rules() {
        let (system, _) = build_prompt("anything");
        assert!(system.contains("public.sales_daily"));
        assert!(system.contains("SELECT statement"));
        assert!(system.contains("no code fences"));
        assert!(!system.contains("{schema}"));
    }

    #[test]
    fn human_prompt_interpolates_question() {
        let (_, human) = build_prompt("show revenue by region for 2025-09-01");
        assert_eq!(
            human,
            "Question: show revenue by region for 2025-09-01\nSQL:"
        );
    }

    #[test]
    fn system_prompt_is_constant_across_questions() {
        let (a, _) = build_prompt("question one");
        let (b, _) = build_prompt("question two");
        assert_eq!(a, b);
    }
}
