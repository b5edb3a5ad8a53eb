use std::fs;
use std::path::Path;
use std::time::Instant;
use tradegym_domain::services::policies::LinearQModel;

fn record_read_metrics<T>(kind: &'static str, start: Instant, result: &Result<T, String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "tradegym.infra.artifacts.read.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!("tradegym.infra.artifacts.read_ms", "kind" => kind, "result" => result_label)
        .record(start.elapsed().as_millis() as f64);
}

/// Reads and validates a linear policy model stored as JSON.
pub fn load_linear_model(path: &Path) -> Result<LinearQModel, String> {
    let start = Instant::now();
    let result = read_linear_model(path);
    record_read_metrics("linear_model", start, &result);
    if let Ok(model) = &result {
        tracing::info!(
            path = %path.display(),
            version = model.version.as_deref().unwrap_or("unversioned"),
            "loaded policy model"
        );
    }
    result
}

fn read_linear_model(path: &Path) -> Result<LinearQModel, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read model {}: {}", path.display(), err))?;
    let model: LinearQModel = serde_json::from_str(&contents)
        .map_err(|err| format!("failed to parse model {}: {}", path.display(), err))?;
    model
        .validate()
        .map_err(|err| format!("invalid model {}: {}", path.display(), err))?;
    Ok(model)
}
