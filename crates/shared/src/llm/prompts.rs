use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub system_prompt: &'static str,
    pub context_prompt: &'static str,
    pub output_schema: Value,
}

/// Template for classifying a natural-language question about a table into
/// a structured intent the executor can run.
pub fn intent_analysis_template() -> PromptTemplate {
    PromptTemplate {
        system_prompt: "You are a data analysis assistant. Analyze the user's query \
             against the described table and determine what they want.",
        context_prompt: "Use only the supplied table context. Respond with JSON matching \
             the output schema and nothing else.",
        output_schema: json!({
            "intent": "one of: summarize, filter, aggregate, visualize, compare, correlation",
            "columns": ["list of relevant columns"],
            "operation": "specific operation like sum, mean, count, max, min, describe",
            "filters": {"column": "value"},
            "chart_type": "if visualization: bar, line, pie, scatter",
            "explanation": "brief explanation of what you understood"
        }),
    }
}
