use crate::inspector::MOD_EXTENSION;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::{
    collections::HashMap,
    fs::{self, File},
    io::Read,
    path::Path,
    time::Duration,
};

const MODRINTH_API_URL: &str = "https://api.modrinth.com/v2";
const USER_AGENT: &str = "moddy/0.1.0 (mod update check)";

#[derive(Debug, Clone, Serialize)]
pub struct ModUpdate {
    pub latest_version: String,
    pub project_slug: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ModHash {
    pub file_name: String,
    pub hash: String,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    hashes: &'a [String],
    algorithm: &'a str,
    loaders: Vec<String>,
    game_versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VersionFile {
    #[serde(default)]
    version_number: Option<String>,
    #[serde(default)]
    project_slug: Option<String>,
}

pub fn check_for_updates(
    hashes: &[String],
    loader: &str,
    game_version: &str,
) -> Result<HashMap<String, ModUpdate>> {
    if hashes.is_empty() {
        return Ok(HashMap::new());
    }

    let payload = UpdateRequest {
        hashes,
        algorithm: "sha512",
        loaders: vec![loader.to_lowercase()],
        game_versions: vec![game_version.to_string()],
    };

    let agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(5))
        .timeout_read(Duration::from_secs(15))
        .timeout_write(Duration::from_secs(15))
        .build();
    let url = format!("{MODRINTH_API_URL}/version_files/update");
    let response = match agent
        .post(&url)
        .set("User-Agent", USER_AGENT)
        .send_json(&payload)
    {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            bail!("Modrinth API error ({code}): {}", body.trim());
        }
        Err(err) => return Err(err).context("query Modrinth"),
    };

    let raw: HashMap<String, VersionFile> =
        response.into_json().context("decode Modrinth response")?;

    let mut updates = HashMap::new();
    for (local_hash, version) in raw {
        let project_slug = version.project_slug.unwrap_or_default();
        updates.insert(
            local_hash,
            ModUpdate {
                latest_version: version
                    .version_number
                    .unwrap_or_else(|| "Unknown".to_string()),
                url: format!("https://modrinth.com/project/{project_slug}"),
                project_slug,
            },
        );
    }
    Ok(updates)
}

pub fn collect_hashes(mods_dir: &Path) -> Result<Vec<ModHash>> {
    let entries = fs::read_dir(mods_dir)
        .with_context(|| format!("list mods dir {}", mods_dir.display()))?;

    let mut hashes = Vec::new();
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
        hashes.push(ModHash {
            file_name: entry.file_name().to_string_lossy().to_string(),
            hash: hash_mod_file(&path)?,
        });
    }
    Ok(hashes)
}

pub fn hash_mod_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("open {} for hashing", path.display()))?;
    let mut hasher = Sha512::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_set_short_circuits() {
        let updates = check_for_updates(&[], "fabric", "1.20.1").unwrap();
        assert!(updates.is_empty());
    }

    #[test]
    fn hashing_is_stable_and_sha512_shaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod.jar");
        fs::write(&path, b"mod bytes").unwrap();

        let first = hash_mod_file(&path).unwrap();
        let second = hash_mod_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 128);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn collect_hashes_skips_non_mods() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jar"), b"a").unwrap();
        fs::write(dir.path().join("b.JAR"), b"b").unwrap();
        fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let hashes = collect_hashes(dir.path()).unwrap();
        assert_eq!(hashes.len(), 2);
        assert!(collect_hashes(&dir.path().join("absent")).is_err());
    }
}
