//! Post-build stamping of module manifests and the plugin descriptor.
//!
//! Both steps rewrite JSON files in place: the document is parsed, a field is
//! replaced, and the file is rewritten from the start and truncated to the new
//! length. Field order is preserved and output is indented with four spaces.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::PackConfig;
use crate::error::PackError;
use crate::git::{RevisionSource, short_revision};

/// Three-part engine version from `Build.version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EngineVersion {
    pub major_version: u32,
    pub minor_version: u32,
    pub patch_version: u32,
}

impl std::fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.major_version, self.minor_version, self.patch_version
        )
    }
}

impl EngineVersion {
    pub fn read(path: &Path) -> Result<Self, PackError> {
        let contents = read_existing(path)?;
        serde_json::from_str(&contents).map_err(|source| PackError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Version string `<major>.<minor>.<patch>-<rev7>`.
pub fn compose_version(engine: EngineVersion, revision: &str) -> Result<String, PackError> {
    Ok(format!("{engine}-{}", short_revision(revision)?))
}

/// Reads the engine version and the plugin revision and composes the version string.
pub fn resolve_version(
    config: &PackConfig,
    revisions: &impl RevisionSource,
) -> Result<String, PackError> {
    let engine = EngineVersion::read(&config.engine_version_file())?;
    let revision = revisions.latest_revision(config.revision_branch.as_deref())?;
    compose_version(engine, &revision)
}

fn read_existing(path: &Path) -> Result<String, PackError> {
    if !path.is_file() {
        return Err(PackError::MissingFile(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

fn parse_object(path: &Path, contents: &str) -> Result<Map<String, Value>, PackError> {
    let value: Value = serde_json::from_str(contents).map_err(|source| PackError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(PackError::InvalidField {
            path: path.to_path_buf(),
            field: "<root>".into(),
            expected: "an object",
        }),
    }
}

fn to_indented_json(path: &Path, value: &Map<String, Value>) -> Result<Vec<u8>, PackError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser).map_err(|source| PackError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(out)
}

/// A parsed JSON object waiting to be written back to the file it came from.
struct PendingJson {
    path: PathBuf,
    doc: Map<String, Value>,
}

impl PendingJson {
    fn load(path: &Path) -> Result<Self, PackError> {
        let contents = read_existing(path)?;
        let doc = parse_object(path, &contents)?;
        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    /// Rewrites the file in place, truncated to the new length.
    fn store(&self) -> Result<(), PackError> {
        let bytes = to_indented_json(&self.path, &self.doc)?;
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&bytes)?;
        file.set_len(bytes.len() as u64)?;
        Ok(())
    }
}

fn string_field(path: &Path, doc: &Map<String, Value>, field: &str) -> Result<String, PackError> {
    match doc.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(PackError::InvalidField {
            path: path.to_path_buf(),
            field: field.into(),
            expected: "a string",
        }),
        None => Err(PackError::MissingField {
            path: path.to_path_buf(),
            field: field.into(),
        }),
    }
}

/// Reads `BuildId` from a module manifest.
pub fn read_build_id(path: &Path) -> Result<String, PackError> {
    let contents = read_existing(path)?;
    let doc = parse_object(path, &contents)?;
    string_field(path, &doc, "BuildId")
}

// Loads every output manifest with its new BuildId applied, without writing anything.
fn stage_build_ids(config: &PackConfig) -> Result<Vec<PendingJson>, PackError> {
    let mut staged = Vec::with_capacity(config.module_manifests.len());
    for name in &config.module_manifests {
        let build_id = read_build_id(&config.binary_win64().join(name))?;
        let mut pending = PendingJson::load(&config.out_win64().join(name))?;
        let previous = pending
            .doc
            .insert("BuildId".into(), Value::String(build_id.clone()));
        debug!(manifest = %name, %build_id, ?previous, "staged BuildId");
        staged.push(pending);
    }
    Ok(staged)
}

// Sets `VersionName` and bumps `Version` in memory; returns the new `Version`.
fn stage_descriptor(path: &Path, version_name: &str) -> Result<(PendingJson, u64), PackError> {
    let mut pending = PendingJson::load(path)?;
    let current = match pending.doc.get("Version") {
        Some(value) => value.as_u64().ok_or_else(|| PackError::InvalidField {
            path: path.to_path_buf(),
            field: "Version".into(),
            expected: "a non-negative integer",
        })?,
        None => {
            return Err(PackError::MissingField {
                path: path.to_path_buf(),
                field: "Version".into(),
            });
        }
    };
    let next = current.checked_add(1).ok_or_else(|| PackError::InvalidField {
        path: path.to_path_buf(),
        field: "Version".into(),
        expected: "below the integer limit",
    })?;
    pending
        .doc
        .insert("VersionName".into(), Value::String(version_name.to_string()));
    pending.doc.insert("Version".into(), Value::from(next));
    Ok((pending, next))
}

/// Outcome of a full stamping pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampOutcome {
    pub version_name: String,
    pub version: u64,
    pub manifests: Vec<PathBuf>,
}

/// Runs both stamping steps against the build output.
///
/// All manifests and the descriptor are loaded and edited in memory first;
/// nothing on disk changes unless every input is present and well formed.
pub fn stamp_output(config: &PackConfig, version_name: &str) -> Result<StampOutcome, PackError> {
    info!("setting BuildId");
    let manifests = stage_build_ids(config)?;

    info!(%version_name, "setting VersionName");
    let (descriptor, version) = stage_descriptor(&config.out_descriptor(), version_name)?;

    for pending in &manifests {
        pending.store()?;
    }
    descriptor.store()?;

    Ok(StampOutcome {
        version_name: version_name.to_string(),
        version,
        manifests: manifests.into_iter().map(|p| p.path).collect(),
    })
}

#[cfg(test)]
pub mod testutil {
    use super::*;
    use std::fs;

    pub const BINARY_BUILD_ID: &str = "f9a7c1e2-binary";

    /// Writes the files the stamper reads from the binary engine and expects in the output.
    pub fn seed_build_tree(config: &PackConfig) {
        let version_file = config.engine_version_file();
        fs::create_dir_all(version_file.parent().unwrap()).unwrap();
        fs::write(
            &version_file,
            r#"{"MajorVersion": 4, "MinorVersion": 25, "PatchVersion": 1, "Changelist": 0, "BranchName": "++UE4+Release-4.25"}"#,
        )
        .unwrap();

        fs::create_dir_all(config.binary_win64()).unwrap();
        fs::create_dir_all(config.out_win64()).unwrap();
        for name in &config.module_manifests {
            fs::write(
                config.binary_win64().join(name),
                format!(r#"{{"BuildId": "{BINARY_BUILD_ID}", "Modules": {{}}}}"#),
            )
            .unwrap();
            fs::write(
                config.out_win64().join(name),
                r#"{"BuildId": "a-much-longer-locally-generated-build-identifier", "Modules": {"SkookumScript": "UE4Editor-SkookumScript.dll"}}"#,
            )
            .unwrap();
        }

        fs::write(
            config.out_descriptor(),
            r#"{"FileVersion": 3, "Version": 41, "VersionName": "old", "FriendlyName": "SkookumScript", "Modules": []}"#,
        )
        .unwrap();
    }

    pub fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use crate::git::fake::FixedRevision;
    use std::fs;
    use tempfile::TempDir;

    // Single-step helpers: load, edit in memory, write back.
    fn propagate_build_ids(config: &PackConfig) -> Result<Vec<PathBuf>, PackError> {
        let staged = stage_build_ids(config)?;
        for pending in &staged {
            pending.store()?;
        }
        Ok(staged.into_iter().map(|p| p.path).collect())
    }

    fn stamp_descriptor(path: &Path, version_name: &str) -> Result<u64, PackError> {
        let (pending, next) = stage_descriptor(path, version_name)?;
        pending.store()?;
        Ok(next)
    }

    fn layout() -> (TempDir, PackConfig) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let config = PackConfig::new(
            root.join("binary"),
            root.join("source"),
            root.join("plugin"),
            root.join("out"),
        );
        seed_build_tree(&config);
        (tmp, config)
    }

    #[test]
    fn compose_version_uses_engine_triple_and_short_revision() {
        let engine = EngineVersion {
            major_version: 4,
            minor_version: 25,
            patch_version: 1,
        };
        assert_eq!(
            compose_version(engine, "abcdef1234567").unwrap(),
            "4.25.1-abcdef1"
        );
    }

    #[test]
    fn engine_version_ignores_extra_fields() {
        let (_tmp, config) = layout();
        let engine = EngineVersion::read(&config.engine_version_file()).unwrap();
        assert_eq!(engine.to_string(), "4.25.1");
    }

    #[test]
    fn engine_version_missing_field_is_json_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Build.version");
        fs::write(&path, r#"{"MajorVersion": 4, "MinorVersion": 25}"#).unwrap();
        assert!(matches!(
            EngineVersion::read(&path),
            Err(PackError::Json { .. })
        ));
    }

    #[test]
    fn resolve_version_reads_engine_and_revision() {
        let (_tmp, mut config) = layout();
        config.revision_branch = Some("master".into());
        let revisions = FixedRevision::new("abcdef1234567");

        assert_eq!(resolve_version(&config, &revisions).unwrap(), "4.25.1-abcdef1");
        assert_eq!(
            revisions.requested.borrow().as_slice(),
            &[Some("master".to_string())]
        );
    }

    #[test]
    fn build_id_propagation_preserves_other_fields() {
        let (_tmp, config) = layout();
        let target = config.out_win64().join("UE4Editor.modules");
        let before = read_json(&target);

        let stamped = propagate_build_ids(&config).unwrap();
        assert_eq!(stamped.len(), 2);

        let after = read_json(&target);
        assert_eq!(after["BuildId"], BINARY_BUILD_ID);
        assert_eq!(after["Modules"], before["Modules"]);
        assert_eq!(after.as_object().unwrap().len(), 2);
    }

    #[test]
    fn rewrite_truncates_shorter_content() {
        let (_tmp, config) = layout();
        let target = config.out_win64().join("UnrealHeaderTool.modules");
        propagate_build_ids(&config).unwrap();

        // No leftover bytes from the longer original must survive the rewrite.
        let text = fs::read_to_string(&target).unwrap();
        assert!(text.trim_end().ends_with('}'));
        assert!(!text.contains("locally-generated"));
        assert!(text.contains("\n    \"BuildId\""));
    }

    #[test]
    fn rewrite_preserves_field_order() {
        let (_tmp, config) = layout();
        stamp_descriptor(&config.out_descriptor(), "4.25.1-abcdef1").unwrap();

        let text = fs::read_to_string(config.out_descriptor()).unwrap();
        let positions: Vec<usize> = ["FileVersion", "\"Version\"", "VersionName", "FriendlyName"]
            .iter()
            .map(|key| text.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn missing_binary_manifest_is_fatal() {
        let (_tmp, config) = layout();
        let missing = config.binary_win64().join("UE4Editor.modules");
        fs::remove_file(&missing).unwrap();

        let err = propagate_build_ids(&config).unwrap_err();
        assert!(matches!(err, PackError::MissingFile(ref p) if *p == missing));
        assert!(err.is_data_integrity());
    }

    #[test]
    fn missing_second_manifest_leaves_first_untouched() {
        let (_tmp, config) = layout();
        let first = config.out_win64().join("UE4Editor.modules");
        let before = fs::read_to_string(&first).unwrap();
        fs::remove_file(config.binary_win64().join("UnrealHeaderTool.modules")).unwrap();

        assert!(propagate_build_ids(&config).is_err());
        assert_eq!(fs::read_to_string(&first).unwrap(), before);
    }

    #[test]
    fn bad_descriptor_stops_stamping_before_any_write() {
        let (_tmp, config) = layout();
        fs::write(config.out_descriptor(), r#"{"VersionName": "old"}"#).unwrap();
        let manifest = config.out_win64().join("UE4Editor.modules");
        let before = fs::read_to_string(&manifest).unwrap();

        let err = stamp_output(&config, "4.25.1-abcdef1").unwrap_err();
        assert!(err.is_data_integrity());
        assert_eq!(fs::read_to_string(&manifest).unwrap(), before);
    }

    #[test]
    fn missing_build_id_field_is_fatal() {
        let (_tmp, config) = layout();
        fs::write(
            config.binary_win64().join("UE4Editor.modules"),
            r#"{"Modules": {}}"#,
        )
        .unwrap();

        assert!(matches!(
            propagate_build_ids(&config),
            Err(PackError::MissingField { ref field, .. }) if field == "BuildId"
        ));
    }

    #[test]
    fn malformed_output_manifest_is_fatal() {
        let (_tmp, config) = layout();
        fs::write(config.out_win64().join("UE4Editor.modules"), "{ not json").unwrap();

        assert!(matches!(
            propagate_build_ids(&config),
            Err(PackError::Json { .. })
        ));
    }

    #[test]
    fn descriptor_version_increments_by_one() {
        let (_tmp, config) = layout();
        let next = stamp_descriptor(&config.out_descriptor(), "4.25.1-abcdef1").unwrap();
        assert_eq!(next, 42);

        let doc = read_json(&config.out_descriptor());
        assert_eq!(doc["Version"], 42);
        assert_eq!(doc["VersionName"], "4.25.1-abcdef1");
        assert_eq!(doc["FriendlyName"], "SkookumScript");
    }

    #[test]
    fn descriptor_without_version_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("P.uplugin");
        fs::write(&path, r#"{"VersionName": "x"}"#).unwrap();

        assert!(matches!(
            stamp_descriptor(&path, "1.0.0-abcdef1"),
            Err(PackError::MissingField { ref field, .. }) if field == "Version"
        ));
        // Failed stamping leaves the file untouched.
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"VersionName": "x"}"#);
    }

    #[test]
    fn descriptor_with_text_version_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("P.uplugin");
        fs::write(&path, r#"{"Version": "3", "VersionName": "x"}"#).unwrap();

        assert!(matches!(
            stamp_descriptor(&path, "1.0.0-abcdef1"),
            Err(PackError::InvalidField { .. })
        ));
    }

    #[test]
    fn non_object_document_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("P.uplugin");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(stamp_descriptor(&path, "1.0.0-abcdef1").is_err());
    }

    #[test]
    fn stamp_output_runs_both_steps() {
        let (_tmp, config) = layout();
        let outcome = stamp_output(&config, "4.25.1-abcdef1").unwrap();

        assert_eq!(outcome.version_name, "4.25.1-abcdef1");
        assert_eq!(outcome.version, 42);
        assert_eq!(outcome.manifests.len(), 2);
        for path in &outcome.manifests {
            assert_eq!(read_json(path)["BuildId"], BINARY_BUILD_ID);
        }
    }
}
