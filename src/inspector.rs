use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use serde_json::Value;
use std::{fs, io::Read, path::Path};
use zip::{result::ZipError, ZipArchive};

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
pub const FABRIC_MOD_JSON: &str = "fabric.mod.json";
pub const MOD_EXTENSION: &str = "jar";

#[derive(Debug, Clone, Serialize)]
pub struct ModReport {
    pub file_name: String,
    pub path: String,
    pub manifest: Option<String>,
    pub fabric_json: Option<Value>,
    pub error: String,
    pub icon_data: Option<String>,
}

impl ModReport {
    fn new(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            file_name,
            path: path.display().to_string(),
            manifest: None,
            fabric_json: None,
            error: String::new(),
            icon_data: None,
        }
    }
}

// Never fails: every problem with the archive or its entries becomes a
// diagnostic in the report's error field, alongside whatever was recovered.
pub fn inspect_jar(path: &Path) -> ModReport {
    let mut report = ModReport::new(path);
    let mut log: Vec<String> = Vec::new();

    match open_archive(path) {
        Ok(mut archive) => inspect_entries(&mut archive, &mut report, &mut log),
        Err(err) => log.push(err),
    }

    report.error = log.join(" ").trim().to_string();
    report
}

fn open_archive(path: &Path) -> Result<ZipArchive<fs::File>, String> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) => return Err(format!("An unexpected error occurred: {err}.")),
    };
    match ZipArchive::new(file) {
        Ok(archive) => Ok(archive),
        Err(ZipError::Io(err)) => Err(format!("An unexpected error occurred: {err}.")),
        Err(_) => Err("File is not a valid archive.".to_string()),
    }
}

fn inspect_entries(
    archive: &mut ZipArchive<fs::File>,
    report: &mut ModReport,
    log: &mut Vec<String>,
) {
    match read_entry(archive, MANIFEST_PATH) {
        Ok(Some(bytes)) => match String::from_utf8(bytes) {
            Ok(text) => report.manifest = Some(text),
            Err(err) => log.push(format!("Failed to decode {MANIFEST_PATH}: {err}.")),
        },
        Ok(None) => log.push(format!("{MANIFEST_PATH} not found.")),
        Err(err) => log.push(format!("Error reading {MANIFEST_PATH}: {err}.")),
    }

    // First matching entry wins; nothing past it is considered even when
    // it fails to parse.
    let Some(entry_name) = archive
        .file_names()
        .find(|name| name.ends_with(FABRIC_MOD_JSON))
        .map(str::to_string)
    else {
        return;
    };

    let raw = match read_entry(archive, &entry_name) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return,
        Err(err) => {
            log.push(format!("Error reading {entry_name}: {err}."));
            return;
        }
    };

    let text = match std::str::from_utf8(&raw) {
        Ok(text) => text.trim_start_matches('\u{feff}'),
        Err(err) => {
            log.push(format!("Failed to decode {entry_name}: {err}."));
            return;
        }
    };

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            log.push(format!("Failed to parse {entry_name}: {err}."));
            return;
        }
    };

    if !value.is_object() {
        log.push(format!("{entry_name} was empty or invalid."));
        return;
    }

    let icon_path = value
        .get("icon")
        .and_then(Value::as_str)
        .map(str::to_string);
    report.fabric_json = Some(value);

    let Some(icon_path) = icon_path.filter(|path| !path.is_empty()) else {
        return;
    };

    match read_entry(archive, &icon_path) {
        Ok(Some(bytes)) => report.icon_data = Some(BASE64.encode(bytes)),
        Ok(None) => log.push(format!("Icon file '{icon_path}' not found.")),
        Err(err) => log.push(format!("Error reading icon: {err}.")),
    }
}

fn read_entry(archive: &mut ZipArchive<fs::File>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

// Per-file problems stay inside each report; only an unlistable directory
// is an error here. Reports come back in OS listing order, unsorted.
pub fn collect_mods(mods_dir: &Path) -> Result<Vec<ModReport>> {
    let entries = fs::read_dir(mods_dir)
        .with_context(|| format!("list mods dir {}", mods_dir.display()))?;

    let mut reports = Vec::new();
    for entry in entries {
        let entry = entry.context("read mods dir entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_mod = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(MOD_EXTENSION))
            .unwrap_or(false);
        if !is_mod {
            continue;
        }
        reports.push(inspect_jar(&path));
    }
    Ok(reports)
}
