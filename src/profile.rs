use crate::inspector::MOD_EXTENSION;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileMeta {
    pub name: String,
    #[serde(rename = "minecraftVersion")]
    pub minecraft_version: String,
    pub loader: String,
    #[serde(rename = "loaderVersion")]
    pub loader_version: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(default)]
    pub mods: Vec<ProfileModRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileModRef {
    pub file: String,
}

#[derive(Debug, Clone, Copy)]
pub struct SwitchReport {
    pub mod_count: usize,
    pub config_count: usize,
}

pub fn profiles_root(data_dir: &Path) -> PathBuf {
    data_dir.join("profiles")
}

pub fn sanitize_name(name: &str) -> String {
    name.trim().replace(' ', "_").to_lowercase()
}

pub fn create_profile(
    data_dir: &Path,
    name: &str,
    minecraft_version: &str,
    loader: &str,
    loader_version: &str,
) -> Result<PathBuf> {
    let root = profiles_root(data_dir);
    fs::create_dir_all(&root).context("create profiles dir")?;

    let profile_dir = root.join(sanitize_name(name));
    if profile_dir.exists() {
        bail!("profile '{name}' already exists");
    }

    fs::create_dir_all(profile_dir.join("mods")).context("create profile mods dir")?;
    fs::create_dir_all(profile_dir.join("config")).context("create profile config dir")?;

    let meta = ProfileMeta {
        name: name.to_string(),
        minecraft_version: minecraft_version.to_string(),
        loader: loader.to_string(),
        loader_version: loader_version.to_string(),
        created_at: now_rfc3339()?,
        mods: Vec::new(),
    };
    save_profile(&profile_dir, &meta)?;
    Ok(profile_dir)
}

pub fn find_profile(data_dir: &Path, name: &str) -> Result<PathBuf> {
    let profile_dir = profiles_root(data_dir).join(sanitize_name(name));
    if !profile_dir.join("profile.json").exists() {
        bail!("profile '{name}' not found");
    }
    Ok(profile_dir)
}

pub fn load_profile(profile_dir: &Path) -> Result<ProfileMeta> {
    let raw =
        fs::read_to_string(profile_dir.join("profile.json")).context("read profile.json")?;
    let meta = serde_json::from_str(&raw).context("parse profile.json")?;
    Ok(meta)
}

pub fn save_profile(profile_dir: &Path, meta: &ProfileMeta) -> Result<()> {
    let raw = serde_json::to_string_pretty(meta).context("serialize profile.json")?;
    fs::write(profile_dir.join("profile.json"), raw).context("write profile.json")?;
    Ok(())
}

pub fn list_profiles(data_dir: &Path) -> Result<Vec<ProfileMeta>> {
    let root = profiles_root(data_dir);
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut profiles = Vec::new();
    for entry in fs::read_dir(&root).context("list profiles dir")? {
        let entry = entry.context("read profiles dir entry")?;
        if !entry.path().is_dir() {
            continue;
        }
        // half-created or foreign directories are skipped, not fatal
        if let Ok(meta) = load_profile(&entry.path()) {
            profiles.push(meta);
        }
    }
    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(profiles)
}

pub fn add_mod(profile_dir: &Path, mod_file: &Path) -> Result<()> {
    if !mod_file.is_file() {
        bail!("mod file {} does not exist", mod_file.display());
    }
    let is_mod = mod_file
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(MOD_EXTENSION))
        .unwrap_or(false);
    if !is_mod {
        bail!("only .{MOD_EXTENSION} mod files are supported");
    }

    let file_name = mod_file
        .file_name()
        .context("resolve mod file name")?
        .to_string_lossy()
        .to_string();

    let mods_dir = profile_dir.join("mods");
    fs::create_dir_all(&mods_dir).context("create profile mods dir")?;
    let destination = mods_dir.join(&file_name);
    if destination.exists() {
        bail!("mod '{file_name}' already exists in profile");
    }
    fs::copy(mod_file, &destination).context("copy mod into profile")?;

    let mut meta = load_profile(profile_dir)?;
    meta.mods.push(ProfileModRef { file: file_name });
    save_profile(profile_dir, &meta)?;
    Ok(())
}

// Replaces the game's mods dir with the profile's and overlays the
// profile's config tree on top of the game's.
pub fn apply_profile(profile_dir: &Path, minecraft_dir: &Path) -> Result<SwitchReport> {
    let game_mods = minecraft_dir.join("mods");
    if game_mods.exists() {
        fs::remove_dir_all(&game_mods).context("clear game mods dir")?;
    }
    let mod_count = copy_dir(&profile_dir.join("mods"), &game_mods)?;
    let config_count = copy_dir(&profile_dir.join("config"), &minecraft_dir.join("config"))?;
    Ok(SwitchReport {
        mod_count,
        config_count,
    })
}

// The reverse copy: captures the game's current mods and config into the
// profile and refreshes the descriptor's mod list from what landed.
pub fn snapshot_profile(profile_dir: &Path, minecraft_dir: &Path) -> Result<SwitchReport> {
    let profile_mods = profile_dir.join("mods");
    if profile_mods.exists() {
        fs::remove_dir_all(&profile_mods).context("clear profile mods dir")?;
    }
    let mod_count = copy_dir(&minecraft_dir.join("mods"), &profile_mods)?;
    let config_count = copy_dir(&minecraft_dir.join("config"), &profile_dir.join("config"))?;

    let mut meta = load_profile(profile_dir)?;
    meta.mods = list_mod_files(&profile_mods)?;
    save_profile(profile_dir, &meta)?;

    Ok(SwitchReport {
        mod_count,
        config_count,
    })
}

fn list_mod_files(mods_dir: &Path) -> Result<Vec<ProfileModRef>> {
    let mut files: Vec<String> = Vec::new();
    if !mods_dir.exists() {
        return Ok(Vec::new());
    }
    for entry in fs::read_dir(mods_dir).context("list profile mods dir")? {
        let entry = entry.context("read profile mods dir entry")?;
        if entry.path().is_file() {
            files.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    files.sort_unstable();
    Ok(files.into_iter().map(|file| ProfileModRef { file }).collect())
}

fn copy_dir(source: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)
        .with_context(|| format!("create dir {}", dest.display()))?;
    if !source.exists() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.context("walk source dir")?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .context("strip source prefix")?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("create dir {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create dir {}", parent.display()))?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("copy {}", entry.path().display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format timestamp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_writes_descriptor_and_layout() {
        let dir = tempfile::tempdir().unwrap();
        let profile_dir =
            create_profile(dir.path(), "My Pack", "1.20.1", "Fabric", "0.15.0").unwrap();

        assert!(profile_dir.ends_with("my_pack"));
        assert!(profile_dir.join("mods").is_dir());
        assert!(profile_dir.join("config").is_dir());

        let meta = load_profile(&profile_dir).unwrap();
        assert_eq!(meta.name, "My Pack");
        assert_eq!(meta.minecraft_version, "1.20.1");
        assert_eq!(meta.loader, "Fabric");
        assert_eq!(meta.loader_version, "0.15.0");
        assert!(!meta.created_at.is_empty());
        assert!(meta.mods.is_empty());
    }

    #[test]
    fn create_rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        create_profile(dir.path(), "Pack", "1.20.1", "fabric", "0.15.0").unwrap();
        // same name after sanitizing
        assert!(create_profile(dir.path(), "pack", "1.20.1", "fabric", "0.15.0").is_err());
    }

    #[test]
    fn add_mod_copies_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let profile_dir =
            create_profile(dir.path(), "Pack", "1.20.1", "fabric", "0.15.0").unwrap();

        let mod_file = dir.path().join("somemod.jar");
        fs::write(&mod_file, b"jar bytes").unwrap();
        add_mod(&profile_dir, &mod_file).unwrap();

        assert!(profile_dir.join("mods").join("somemod.jar").is_file());
        let meta = load_profile(&profile_dir).unwrap();
        assert_eq!(meta.mods.len(), 1);
        assert_eq!(meta.mods[0].file, "somemod.jar");

        // second copy of the same file is refused
        assert!(add_mod(&profile_dir, &mod_file).is_err());
    }

    #[test]
    fn add_mod_rejects_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let profile_dir =
            create_profile(dir.path(), "Pack", "1.20.1", "fabric", "0.15.0").unwrap();

        let zip_file = dir.path().join("somemod.zip");
        fs::write(&zip_file, b"zip bytes").unwrap();
        assert!(add_mod(&profile_dir, &zip_file).is_err());
        assert!(add_mod(&profile_dir, &dir.path().join("absent.jar")).is_err());
    }

    #[test]
    fn apply_replaces_game_mods_and_overlays_config() {
        let dir = tempfile::tempdir().unwrap();
        let profile_dir =
            create_profile(dir.path(), "Pack", "1.20.1", "fabric", "0.15.0").unwrap();
        fs::write(profile_dir.join("mods").join("a.jar"), b"a").unwrap();
        fs::create_dir_all(profile_dir.join("config").join("nested")).unwrap();
        fs::write(
            profile_dir.join("config").join("nested").join("opts.toml"),
            b"x = 1",
        )
        .unwrap();

        let game_dir = dir.path().join("minecraft");
        fs::create_dir_all(game_dir.join("mods")).unwrap();
        fs::write(game_dir.join("mods").join("stale.jar"), b"old").unwrap();

        let report = apply_profile(&profile_dir, &game_dir).unwrap();
        assert_eq!(report.mod_count, 1);
        assert_eq!(report.config_count, 1);
        assert!(game_dir.join("mods").join("a.jar").is_file());
        assert!(!game_dir.join("mods").join("stale.jar").exists());
        assert!(game_dir
            .join("config")
            .join("nested")
            .join("opts.toml")
            .is_file());
    }

    #[test]
    fn snapshot_refreshes_the_mod_list() {
        let dir = tempfile::tempdir().unwrap();
        let profile_dir =
            create_profile(dir.path(), "Pack", "1.20.1", "fabric", "0.15.0").unwrap();

        let game_dir = dir.path().join("minecraft");
        fs::create_dir_all(game_dir.join("mods")).unwrap();
        fs::create_dir_all(game_dir.join("config")).unwrap();
        fs::write(game_dir.join("mods").join("b.jar"), b"b").unwrap();
        fs::write(game_dir.join("mods").join("a.jar"), b"a").unwrap();

        let report = snapshot_profile(&profile_dir, &game_dir).unwrap();
        assert_eq!(report.mod_count, 2);

        let meta = load_profile(&profile_dir).unwrap();
        let files: Vec<&str> = meta.mods.iter().map(|m| m.file.as_str()).collect();
        assert_eq!(files, vec!["a.jar", "b.jar"]);
    }

    #[test]
    fn snapshot_of_empty_game_dir_clears_the_mod_list() {
        let dir = tempfile::tempdir().unwrap();
        let profile_dir =
            create_profile(dir.path(), "Pack", "1.20.1", "fabric", "0.15.0").unwrap();
        let mod_file = dir.path().join("old.jar");
        fs::write(&mod_file, b"old").unwrap();
        add_mod(&profile_dir, &mod_file).unwrap();

        let game_dir = dir.path().join("minecraft");
        fs::create_dir_all(&game_dir).unwrap();

        let report = snapshot_profile(&profile_dir, &game_dir).unwrap();
        assert_eq!(report.mod_count, 0);
        let meta = load_profile(&profile_dir).unwrap();
        assert!(meta.mods.is_empty());
    }

    #[test]
    fn list_profiles_sorts_by_name() {
        let dir = tempfile::tempdir().unwrap();
        create_profile(dir.path(), "Zeta", "1.20.1", "fabric", "0.15.0").unwrap();
        create_profile(dir.path(), "Alpha", "1.20.1", "fabric", "0.15.0").unwrap();
        fs::create_dir_all(profiles_root(dir.path()).join("not_a_profile")).unwrap();

        let profiles = list_profiles(dir.path()).unwrap();
        let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn list_profiles_without_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_profiles(dir.path()).unwrap().is_empty());
    }
}
