//! Preset pack loading from ZIP files and directories.
//!
//! Pack layout:
//!
//! ```text
//! schema.json                  optional node-type declarations
//! presets/**/*.json            one preset or an array of presets per file
//! assets/meshes.json           arrays of object database records
//! assets/materials.json
//! assets/colors.json
//! assets/patterns.json
//! assets/profiles.json
//! ```

use super::{Preset, PresetPack, PresetSchema};
use crate::database::{Color, Material, Mesh, Pattern, Profile};
use crate::error::{BimError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum PresetFile {
    Many(Vec<Preset>),
    One(Box<Preset>),
}

/// Load a preset pack from a file path.
///
/// Supports both ZIP files and directories.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<PresetPack> {
    let path = path.as_ref();

    if path.is_dir() {
        load_from_directory(path)
    } else {
        let data = std::fs::read(path)?;
        load_from_bytes(&data)
    }
}

/// Load a preset pack from bytes (ZIP data).
pub fn load_from_bytes(data: &[u8]) -> Result<PresetPack> {
    let cursor = std::io::Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let mut pack = PresetPack::new();
    let mut found_presets = false;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let file_path = file.name().to_string();
        if !file_path.ends_with(".json") {
            continue;
        }

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        if file_path.starts_with("presets/") {
            found_presets = true;
        }
        handle_entry(&mut pack, &file_path, &contents);
    }

    if !found_presets {
        return Err(BimError::InvalidPack("No presets directory found".to_string()));
    }

    finish(pack)
}

/// Load a preset pack from a directory.
fn load_from_directory(path: &Path) -> Result<PresetPack> {
    let presets_path = path.join("presets");
    if !presets_path.is_dir() {
        return Err(BimError::InvalidPack(
            "No presets directory found".to_string(),
        ));
    }

    let mut pack = PresetPack::new();

    let schema_path = path.join("schema.json");
    if schema_path.exists() {
        let contents = std::fs::read_to_string(&schema_path)?;
        handle_entry(&mut pack, "schema.json", &contents);
    }

    let assets_path = path.join("assets");
    if assets_path.is_dir() {
        load_json_files_recursive(&assets_path, &assets_path, &mut |relative, contents| {
            handle_entry(&mut pack, &format!("assets/{}", relative), contents);
        })?;
    }

    load_json_files_recursive(&presets_path, &presets_path, &mut |relative, contents| {
        handle_entry(&mut pack, &format!("presets/{}", relative), contents);
    })?;

    finish(pack)
}

fn finish(mut pack: PresetPack) -> Result<PresetPack> {
    pack.presets.apply_schema(&pack.schema);
    tracing::debug!(
        presets = pack.presets.preset_count(),
        meshes = pack.database.mesh_count(),
        materials = pack.database.material_count(),
        "loaded preset pack"
    );
    Ok(pack)
}

/// Route one JSON file into the pack by its pack-relative path.
/// Unparseable files are logged and skipped.
fn handle_entry(pack: &mut PresetPack, file_path: &str, contents: &str) {
    if file_path == "schema.json" {
        if let Some(schema) = parse_or_warn::<PresetSchema>(file_path, contents) {
            pack.schema = schema;
        }
        return;
    }

    if file_path.starts_with("presets/") {
        match parse_or_warn::<PresetFile>(file_path, contents) {
            Some(PresetFile::One(preset)) => {
                pack.presets.add(*preset);
            }
            Some(PresetFile::Many(presets)) => {
                for preset in presets {
                    pack.presets.add(preset);
                }
            }
            None => {}
        }
        return;
    }

    let db = &mut pack.database;
    match file_path {
        "assets/meshes.json" => {
            for mesh in parse_or_warn::<Vec<Mesh>>(file_path, contents).unwrap_or_default() {
                db.add_mesh(mesh);
            }
        }
        "assets/materials.json" => {
            for material in parse_or_warn::<Vec<Material>>(file_path, contents).unwrap_or_default() {
                db.add_material(material);
            }
        }
        "assets/colors.json" => {
            for color in parse_or_warn::<Vec<Color>>(file_path, contents).unwrap_or_default() {
                db.add_color(color);
            }
        }
        "assets/patterns.json" => {
            for pattern in parse_or_warn::<Vec<Pattern>>(file_path, contents).unwrap_or_default() {
                db.add_pattern(pattern);
            }
        }
        "assets/profiles.json" => {
            for profile in parse_or_warn::<Vec<Profile>>(file_path, contents).unwrap_or_default() {
                db.add_profile(profile);
            }
        }
        _ => tracing::debug!(path = file_path, "ignoring pack file"),
    }
}

fn parse_or_warn<T: DeserializeOwned>(file_path: &str, contents: &str) -> Option<T> {
    match serde_json::from_str::<T>(contents) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to parse {}: {}", file_path, e);
            None
        }
    }
}

/// Load JSON files recursively from a directory, passing paths relative to `base`.
fn load_json_files_recursive<F>(base: &Path, dir: &Path, handler: &mut F) -> Result<()>
where
    F: FnMut(&str, &str),
{
    let mut entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            load_json_files_recursive(base, &path, handler)?;
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            let Ok(relative) = path.strip_prefix(base) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");

            let contents = std::fs::read_to_string(&path)?;
            handler(&relative, &contents);
        }
    }
    Ok(())
}
