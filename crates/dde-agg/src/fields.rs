//! Decoders for list-valued log fields.

use std::collections::BTreeMap;

use dde_core::errors::{DdeError, ErrorInfo};
use serde::de::DeserializeOwned;

fn field_error(code: &str, field: &str, raw: &str, message: impl Into<String>) -> DdeError {
    DdeError::Field(
        ErrorInfo::new(code, message)
            .with_context("field", field)
            .with_context("value", raw),
    )
}

fn decode_json<T: DeserializeOwned>(field: &str, raw: &str) -> Result<T, DdeError> {
    serde_json::from_str(raw.trim())
        .map_err(|err| field_error("field_json", field, raw, err.to_string()))
}

/// Decodes a JSON list of numbers such as `[1, 0.5, 3]`.
pub fn decode_f64_list(field: &str, raw: &str) -> Result<Vec<f64>, DdeError> {
    decode_json(field, raw)
}

/// Decodes a JSON list of number lists such as `[[1,0],[0,2]]`.
///
/// Every inner list must have the same length.
pub fn decode_f64_matrix(field: &str, raw: &str) -> Result<Vec<Vec<f64>>, DdeError> {
    let matrix: Vec<Vec<f64>> = decode_json(field, raw)?;
    if let Some(first) = matrix.first() {
        if matrix.iter().any(|row| row.len() != first.len()) {
            return Err(field_error(
                "field_ragged",
                field,
                raw,
                "score lists differ in length",
            ));
        }
    }
    Ok(matrix)
}

/// Decodes a JSON list of non-negative integers such as `[0, 3, 3, 1]`.
pub fn decode_u64_list(field: &str, raw: &str) -> Result<Vec<u64>, DdeError> {
    decode_json(field, raw)
}

/// Task scores of one population keyed by `<task>_<pathway>`.
pub type TaskScores = BTreeMap<String, f64>;

/// Parses a task-performance field of the form `[{NOT:1,NAND:0},{AND:3}]`.
///
/// Each brace group is one pathway; a task is named `<task>_<pathway index>`.
pub fn decode_task_performance(field: &str, raw: &str) -> Result<TaskScores, DdeError> {
    let trimmed = raw.trim().trim_matches(|c| matches!(c, '[' | ']' | '{' | '}'));
    let mut scores = TaskScores::new();
    if trimmed.trim().is_empty() {
        return Ok(scores);
    }
    for (pathway, group) in trimmed.split("},{").enumerate() {
        for entry in group.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (task, value) = entry.split_once(':').ok_or_else(|| {
                field_error(
                    "field_task_entry",
                    field,
                    raw,
                    format!("entry '{entry}' lacks a ':' separator"),
                )
            })?;
            let value = value.trim().parse::<f64>().map_err(|err| {
                field_error(
                    "field_task_score",
                    field,
                    raw,
                    format!("score for '{}' is not numeric: {err}", task.trim()),
                )
            })?;
            scores.insert(format!("{}_{pathway}", task.trim()), value);
        }
    }
    Ok(scores)
}

/// Parses a task-list configuration value of the form `[(NOT,0),(AND,1)]`.
///
/// Returns `<task>_<pathway>` names in declaration order; `[]` yields none.
pub fn decode_task_list(field: &str, raw: &str) -> Result<Vec<String>, DdeError> {
    let trimmed = raw
        .trim()
        .trim_matches(|c| matches!(c, '[' | ']' | '(' | ')'));
    if trimmed.trim().is_empty() {
        return Ok(Vec::new());
    }
    trimmed
        .split("),(")
        .map(|item| {
            let mut parts = item.split(',').map(str::trim);
            match (parts.next(), parts.next()) {
                (Some(task), Some(pathway)) if !task.is_empty() && !pathway.is_empty() => {
                    Ok(format!("{task}_{pathway}"))
                }
                _ => Err(field_error(
                    "field_task_list",
                    field,
                    raw,
                    format!("item '{item}' is not a (task,pathway) pair"),
                )),
            }
        })
        .collect()
}

/// Returns the pathway suffix of a task name (text after the last `_`).
pub fn pathway_of(task_name: &str) -> &str {
    task_name
        .rsplit_once('_')
        .map(|(_, pathway)| pathway)
        .unwrap_or(task_name)
}
