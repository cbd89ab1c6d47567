//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::Settings;
use crate::api::{self, HookRequest};
use crate::dispatch::HookDispatcher;
use crate::present;
use recorder_core::{
    Blueprint, Decision, Recorder, RecorderError, StorageBackend, primitives::NETWORKING_FEATURE,
    try_load_seed,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a hook replay file (100 MB).
const MAX_APPLY_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), RecorderError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| RecorderError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(RecorderError::DeserializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, RecorderError> {
    let canonical = path.canonicalize().map_err(|e| {
        RecorderError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(RecorderError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path against an existing parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, RecorderError> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        RecorderError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(RecorderError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| RecorderError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(settings: &Settings) -> Result<(), RecorderError> {
    let recorder = open_recorder(settings)?;

    println!("Blueprint Recorder Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", settings.host);
    println!("  Port:     {}", settings.port);
    println!("  Backend:  {}", settings.backend);
    println!("  Database: {:?}", settings.database);
    println!("  Seed:     {:?}", settings.seed);
    println!();
    println!("Endpoints:");
    println!("  POST /hooks/{{hook}}   - Deliver a hook invocation");
    println!("  GET  /admin            - Review page");
    println!("  GET  /admin/blueprint  - Query interface");
    println!("  GET  /admin/messages   - Query answers (SSE)");
    println!("  GET  /blueprint        - Cleaned blueprint");
    println!("  GET  /status           - Blueprint status");
    println!("  GET  /health           - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", settings.host, settings.port);
    api::run_server(&addr, recorder).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show blueprint status.
pub fn cmd_status(settings: &Settings, json_mode: bool) -> Result<(), RecorderError> {
    let recorder = open_recorder(settings)?;
    let blueprint = recorder.blueprint()?;
    let recorded = present::recorded_step_count(&blueprint);
    let networking = blueprint.feature(NETWORKING_FEATURE);

    if json_mode {
        let output = serde_json::json!({
            "database": settings.database.to_string_lossy(),
            "backend": settings.backend,
            "step_count": blueprint.steps.len(),
            "recorded_steps": recorded,
            "revision": blueprint.revision(),
            "networking": networking,
            "has_seed": recorder.seed().is_some(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Blueprint Status");
    println!("================");
    println!("Database: {:?}", settings.database);
    println!("Backend:  {}", settings.backend);
    println!();
    println!("Steps:          {}", blueprint.steps.len());
    println!("Recorded Steps: {}", recorded);
    println!("Revision:       {}", blueprint.revision());
    println!("Networking:     {}", networking);
    println!(
        "Seed:           {}",
        if recorder.seed().is_some() { "loaded" } else { "none" }
    );

    Ok(())
}

// =============================================================================
// SHOW / URL COMMANDS
// =============================================================================

/// Print the cleaned blueprint, followed by the seed when it differs.
pub fn cmd_show(settings: &Settings) -> Result<(), RecorderError> {
    let recorder = open_recorder(settings)?;
    let rendered = present::render(&recorder.blueprint()?, recorder.seed());

    println!("{}", rendered.blueprint);
    if let Some(seed) = rendered.seed {
        println!();
        println!("Seed blueprint:");
        println!("{}", seed);
    }
    Ok(())
}

/// Print the playground handoff URL.
pub fn cmd_url(settings: &Settings, builder: bool) -> Result<(), RecorderError> {
    let recorder = open_recorder(settings)?;
    println!("{}", present::handoff_url(&recorder.blueprint()?, builder));
    Ok(())
}

// =============================================================================
// APPLY COMMAND
// =============================================================================

/// One entry of a hook replay file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookCall {
    pub hook: String,
    #[serde(flatten)]
    pub request: HookRequest,
}

/// Tally of a replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub changed: usize,
    pub unchanged: usize,
    pub snapshots: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// Feed `calls` through the dispatcher and recorder in order.
///
/// Bad hook invocations and storage failures are logged and skipped.
pub fn apply_calls(
    recorder: &mut Recorder<StorageBackend>,
    dispatcher: &HookDispatcher,
    calls: Vec<HookCall>,
) -> ApplySummary {
    let mut summary = ApplySummary::default();

    for (i, call) in calls.into_iter().enumerate() {
        let event = match dispatcher.decode(&call.hook, call.request.args) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(index = i, error = %e, "Skipping hook invocation");
                summary.rejected += 1;
                continue;
            }
        };

        match recorder.handle(&event, &call.request.context) {
            Ok(None) => summary.snapshots += 1,
            Ok(Some(decision)) if decision.changed() => summary.changed += 1,
            Ok(Some(Decision::Suppressed(reason))) => {
                tracing::debug!(index = i, hook = %call.hook, reason = %reason, "Suppressed");
                summary.unchanged += 1;
            }
            Ok(Some(_)) => summary.unchanged += 1,
            Err(e) => {
                tracing::warn!(index = i, hook = %call.hook, error = %e, "Dropping event");
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Replay hook invocations from a file.
pub fn cmd_apply(settings: &Settings, json_mode: bool, file: &Path) -> Result<(), RecorderError> {
    let validated = validate_file_path(file)?;
    validate_file_size(&validated, MAX_APPLY_FILE_SIZE)?;

    let content = std::fs::read_to_string(&validated)
        .map_err(|e| RecorderError::IoError(format!("Read file: {}", e)))?;
    let calls: Vec<HookCall> = serde_json::from_str(&content)
        .map_err(|e| RecorderError::DeserializationError(format!("Parse JSON: {}", e)))?;

    let mut recorder = open_recorder(settings)?;
    let total = calls.len();
    let summary = apply_calls(&mut recorder, &HookDispatcher::default(), calls);

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).unwrap_or_default()
        );
    } else {
        println!("Applied {} hook invocations", total);
        println!("  Changed:   {}", summary.changed);
        println!("  Unchanged: {}", summary.unchanged);
        println!("  Snapshots: {}", summary.snapshots);
        println!("  Rejected:  {}", summary.rejected);
        println!("  Failed:    {}", summary.failed);
    }

    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write the cleaned blueprint to a file.
pub fn cmd_export(settings: &Settings, output: &Path) -> Result<(), RecorderError> {
    let validated_output = validate_output_path(output)?;
    let recorder = open_recorder(settings)?;

    let data = present::pretty(&recorder.blueprint()?);
    std::fs::write(&validated_output, data.as_bytes())
        .map_err(|e| RecorderError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize the settings database, or reset it with `force`.
pub fn cmd_init(settings: &Settings, force: bool) -> Result<(), RecorderError> {
    let exists = settings.backend == "redb" && settings.database.exists();
    if exists && !force {
        return Err(RecorderError::Storage(
            "Database already exists. Use --force to reset it.".to_string(),
        ));
    }

    let mut recorder = open_recorder(settings)?;
    if exists {
        let blueprint = recorder.reset()?;
        println!(
            "Reset blueprint at {:?} ({} steps)",
            settings.database,
            blueprint.steps.len()
        );
    } else {
        println!(
            "Initialized new {} database at {:?}",
            settings.backend, settings.database
        );
    }

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured backend.
pub fn open_backend(settings: &Settings) -> Result<StorageBackend, RecorderError> {
    match settings.backend.as_str() {
        "redb" => StorageBackend::redb(&settings.database),
        "memory" => Ok(StorageBackend::default()),
        other => Err(RecorderError::Storage(format!(
            "Unknown backend: {}. Use: redb, memory",
            other
        ))),
    }
}

/// Read the seed file. A malformed seed is reported and ignored.
pub fn read_seed(path: &Path) -> Option<Blueprint> {
    match try_load_seed(path) {
        Ok(Some(seed)) => {
            tracing::info!(path = %path.display(), steps = seed.steps.len(), "Loaded seed blueprint");
            Some(seed)
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable seed blueprint");
            None
        }
    }
}

/// Open the recorder over the configured backend and seed.
pub fn open_recorder(settings: &Settings) -> Result<Recorder<StorageBackend>, RecorderError> {
    let backend = open_backend(settings)?;
    Recorder::open(backend, read_seed(&settings.seed))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_settings(dir: &Path) -> Settings {
        Settings {
            database: dir.join("recorder.db"),
            backend: "memory".to_string(),
            seed: dir.join("blueprint.json"),
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }

    fn calls(value: serde_json::Value) -> Vec<HookCall> {
        serde_json::from_value(value).expect("calls")
    }

    #[test]
    fn apply_tallies_outcomes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut recorder = open_recorder(&memory_settings(dir.path())).expect("open");

        let summary = apply_calls(
            &mut recorder,
            &HookDispatcher::default(),
            calls(json!([
                {"hook": "activate_plugin", "args": {"plugin": "akismet/akismet.php"}},
                {"hook": "activate_plugin", "args": {"plugin": "akismet/akismet.php"}},
                {"hook": "updated_option", "args": {"option": "_transient_x", "old_value": 1, "value": 2}},
                {"hook": "pre_post_update", "args": {"post_id": 1, "post": {}}},
                {"hook": "not_a_hook", "args": {}},
            ])),
        );

        assert_eq!(
            summary,
            ApplySummary {
                changed: 1,
                unchanged: 2,
                snapshots: 1,
                rejected: 1,
                failed: 0,
            }
        );
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut settings = memory_settings(dir.path());
        settings.backend = "file".to_string();
        assert!(matches!(open_backend(&settings), Err(RecorderError::Storage(_))));
    }

    #[test]
    fn malformed_seed_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = memory_settings(dir.path());
        std::fs::write(&settings.seed, "{ not json").expect("write");
        assert!(read_seed(&settings.seed).is_none());

        let recorder = open_recorder(&settings).expect("open");
        assert_eq!(recorder.blueprint().expect("blueprint"), Blueprint::default());
    }

    #[test]
    fn init_refuses_existing_database_without_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut settings = memory_settings(dir.path());
        settings.backend = "redb".to_string();

        cmd_init(&settings, false).expect("first init");
        assert!(settings.database.exists());
        assert!(cmd_init(&settings, false).is_err());
        cmd_init(&settings, true).expect("forced init");
    }

    #[test]
    fn export_writes_clean_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = memory_settings(dir.path());
        let output = dir.path().join("out.json");

        cmd_export(&settings, &output).expect("export");
        let written = std::fs::read_to_string(&output).expect("read");
        let doc: Blueprint = serde_json::from_str(&written).expect("json");
        assert_eq!(doc.revision, None);
        assert_eq!(doc.steps, Blueprint::default().steps);
    }

    #[test]
    fn output_path_requires_existing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(validate_output_path(&dir.path().join("missing/out.json")).is_err());
        assert!(validate_output_path(&dir.path().join("out.json")).is_ok());
    }
}
