//! The per-request pipeline: prompt, model, sanitize, execute, format,
//! chart decision. Every failure short-circuits into one `PipelineError`
//! and is reported once; nothing here retries.

use crate::chart;
use crate::db::executor::QueryRunner;
use crate::error::PipelineError;
use crate::format;
use crate::llm::{prompts, SqlGenerator};
use crate::sql;
use tracing::info;

/// Everything the chat layer needs to deliver one answer.
#[derive(Debug)]
pub struct Answer {
    pub sql: String,
    pub table: String,
    pub total_rows: usize,
    pub chart_triggered: bool,
    pub chart_png: Option<Vec<u8>>,
}

pub async fn run(
    generator: &dyn SqlGenerator,
    runner: &dyn QueryRunner,
    question: &str,
) -> Result<Answer, PipelineError> {
    let (system_prompt, human_prompt) = prompts::build_prompt(question);

    let raw_output = generator.generate_sql(&system_prompt, &human_prompt).await?;

    // A rejection here is reported to the user with the raw model text; the
    // output never reaches the database.
    let sanitized = sql::sanitize(&raw_output)?;
    info!("Generated SQL: {}", sanitized);

    let result = runner.run(&sanitized).await?;
    info!(
        "Query returned {} rows ({} shown)",
        result.total_rows,
        result.rows.len()
    );

    let table = format::render_table(&result);
    let chart_triggered = chart::is_date_range_query(sanitized.as_str());
    let chart_png = if chart_triggered {
        chart::render_bar_chart(&result, question)
    } else {
        None
    };

    Ok(Answer {
        sql: sanitized.into_string(),
        table,
        total_rows: result.total_rows,
        chart_triggered,
        chart_png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::executor::QueryResult;
    use crate::sql::SanitizedSql;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeGenerator {
        output: String,
    }

    #[async_trait]
    impl SqlGenerator for FakeGenerator {
        async fn generate_sql(&self, _: &str, _: &str) -> Result<String, PipelineError> {
            Ok(self.output.clone())
        }
    }

    struct FakeRunner {
        result: QueryResult,
        called: AtomicBool,
    }

    impl FakeRunner {
        fn returning(columns: &[&str], rows: Vec<Vec<&str>>) -> Self {
            Self {
                result: QueryResult {
                    columns: columns.iter().map(|s| s.to_string()).collect(),
                    total_rows: rows.len(),
                    rows: rows
                        .into_iter()
                        .map(|r| r.into_iter().map(|s| s.to_string()).collect())
                        .collect(),
                },
                called: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl QueryRunner for FakeRunner {
        async fn run(&self, _: &SanitizedSql) -> Result<QueryResult, PipelineError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    #[tokio::test]
    async fn single_date_question_yields_table_only() {
        let generator = FakeGenerator {
            output: "SELECT region, SUM(revenue) AS total_revenue FROM public.sales_daily \
                     WHERE date = '2025-09-01' GROUP BY region ORDER BY total_revenue DESC;"
                .to_string(),
        };
        let runner = FakeRunner::returning(
            &["region", "total_revenue"],
            vec![
                vec!["North", "1200.00"],
                vec!["South", "800.00"],
                vec!["East", "430.00"],
            ],
        );

        let answer = run(&generator, &runner, "show revenue by region for 2025-09-01")
            .await
            .unwrap();

        assert_eq!(answer.total_rows, 3);
        assert!(answer.table.contains("North"));
        assert!(!answer.chart_triggered);
        assert!(answer.chart_png.is_none());
    }

    #[tokio::test]
    async fn date_range_question_triggers_chart() {
        let generator = FakeGenerator {
            output: "```sql\nSELECT date, SUM(orders) AS total_orders FROM public.sales_daily \
                     WHERE date BETWEEN '2025-09-01' AND '2025-09-02' GROUP BY date ORDER BY date;\n```"
                .to_string(),
        };
        let runner = FakeRunner::returning(
            &["date", "total_orders"],
            vec![vec!["2025-09-01", "42"], vec!["2025-09-02", "57"]],
        );

        let answer = run(&generator, &runner, "orders between 2025-09-01 and 2025-09-02")
            .await
            .unwrap();

        assert!(answer.chart_triggered);
        assert!(answer.sql.starts_with("SELECT date"));
        assert!(answer.table.contains("2025-09-02"));
    }

    #[tokio::test]
    async fn prose_output_never_reaches_the_database() {
        let generator = FakeGenerator {
            output: "I cannot answer that".to_string(),
        };
        let runner = FakeRunner::returning(&["n"], vec![vec!["1"]]);

        let err = run(&generator, &runner, "what is the meaning of life")
            .await
            .unwrap_err();

        match err {
            PipelineError::UnsafeOrInvalidSql { raw } => {
                assert_eq!(raw, "I cannot answer that");
            }
            other => panic!("expected UnsafeOrInvalidSql, got {:?}", other),
        }
        assert!(!runner.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn model_failure_short_circuits() {
        struct FailingGenerator;

        #[async_trait]
        impl SqlGenerator for FailingGenerator {
            async fn generate_sql(&self, _: &str, _: &str) -> Result<String, PipelineError> {
                Err(PipelineError::ModelTimeout)
            }
        }

        let runner = FakeRunner::returning(&["n"], vec![vec!["1"]]);
        let err = run(&FailingGenerator, &runner, "anything").await.unwrap_err();
        assert!(matches!(err, PipelineError::ModelTimeout));
        assert!(!runner.called.load(Ordering::SeqCst));
    }
}
