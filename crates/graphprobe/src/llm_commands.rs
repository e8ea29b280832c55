use anyhow::{Context, Result};
use graphprobe_cli::LlmCommand;

use crate::report_output::emit;
use crate::stack_runtime::StackRuntime;

const EMBEDDING_PREVIEW_VALUES: usize = 5;

pub(crate) fn execute(runtime: &StackRuntime, command: LlmCommand) -> Result<i32> {
    let ollama = &runtime.ollama;
    match command {
        LlmCommand::Models => {
            let models = ollama.list_models().context("failed to list ollama models")?;
            let mut lines = vec![format!(
                "llm models: url={} count={}",
                ollama.base_url(),
                models.len()
            )];
            lines.extend(models.iter().map(|model| {
                let marker = if model.name == runtime.config.llm_model {
                    " role=llm"
                } else if model.name == runtime.config.embedder_model {
                    " role=embedder"
                } else {
                    ""
                };
                format!("llm model: name={} size={}{marker}", model.name, model.size)
            }));
            emit(&lines.join("\n"), None)?;
        }
        LlmCommand::Generate { prompt, model } => {
            let model = model.unwrap_or_else(|| runtime.config.llm_model.clone());
            let response = ollama
                .generate(&model, &prompt)
                .with_context(|| format!("generation with '{model}' failed"))?;
            emit(response.trim(), None)?;
        }
        LlmCommand::Embed { text, model } => {
            let model = model.unwrap_or_else(|| runtime.config.embedder_model.clone());
            let embedding = ollama
                .embed(&model, &text)
                .with_context(|| format!("embedding with '{model}' failed"))?;
            let head = embedding
                .iter()
                .take(EMBEDDING_PREVIEW_VALUES)
                .map(|value| format!("{value:.4}"))
                .collect::<Vec<_>>()
                .join(",");
            emit(
                &format!(
                    "llm embedding: model={model} dimensions={} expected={} head=[{head}]",
                    embedding.len(),
                    runtime.config.embedding_dim
                ),
                None,
            )?;
            if embedding.len() != runtime.config.embedding_dim {
                tracing::warn!(
                    actual = embedding.len(),
                    expected = runtime.config.embedding_dim,
                    "embedding dimension mismatch"
                );
                return Ok(1);
            }
        }
    }
    Ok(0)
}
