//! The `calcular` tool: evaluates an arithmetic expression for the model.

use async_trait::async_trait;
use serde_json::json;

use crate::eval::evaluate;
use crate::{Tool, ToolError};

pub struct CalcTool;

impl CalcTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalcTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalcTool {
    fn name(&self) -> &str {
        "calcular"
    }

    fn description(&self) -> &str {
        "Avalia uma expressão matemática simples e retorna o resultado. \
         Exemplo: \"1234 * 5678\" ou \"math.sqrt(144)\""
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "expressao": {
                    "type": "string",
                    "description": "A expressão matemática a ser avaliada"
                }
            },
            "required": ["expressao"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        // Some models call with the anglicized key; accept both.
        let expr = args
            .get("expressao")
            .or_else(|| args.get("expression"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ToolError::InvalidArguments("missing 'expressao' parameter".to_string())
            })?;

        // Evaluation itself never fails: errors come back as a string
        // the model can relay to the user.
        Ok(evaluate(expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn evaluates_an_expression() {
        let tool = CalcTool::new();
        let out = tool.execute(json!({"expressao": "12 * 7"})).await.unwrap();
        assert_eq!(out, "84");
    }

    #[tokio::test]
    async fn bad_expressions_come_back_as_strings() {
        let tool = CalcTool::new();
        let out = tool.execute(json!({"expressao": "import os"})).await.unwrap();
        assert!(out.starts_with("Erro ao calcular:"));
    }

    #[tokio::test]
    async fn missing_argument_is_rejected() {
        let tool = CalcTool::new();
        assert!(tool.execute(json!({})).await.is_err());
    }

    #[test]
    fn schema_names_the_expression_parameter() {
        let schema = CalcTool::new().schema();
        assert_eq!(schema.name, "calcular");
        assert!(schema.parameters["properties"]["expressao"].is_object());
    }
}
