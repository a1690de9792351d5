use crate::{
    config::{self, AppConfig},
    inspector, profile, update,
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    Mods {
        dir: Option<PathBuf>,
    },
    Inspect {
        path: PathBuf,
    },
    ProfilesList,
    ProfileCreate {
        name: String,
        game_version: Option<String>,
        loader: Option<String>,
        loader_version: Option<String>,
    },
    ProfileAdd {
        name: String,
        mod_file: PathBuf,
    },
    ProfileApply {
        name: String,
    },
    ProfileSnapshot {
        name: String,
    },
    Updates {
        dir: Option<PathBuf>,
    },
    Paths,
    Help,
    Version,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, format) = parse_args(&args)?;
    run_command(command, format)
}

fn parse_args(args: &[String]) -> Result<(CliCommand, OutputFormat)> {
    let mut format = OutputFormat::Text;
    let mut dir: Option<PathBuf> = None;
    let mut game_version: Option<String> = None;
    let mut loader: Option<String> = None;
    let mut loader_version: Option<String> = None;
    let mut positionals: Vec<String> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--format" | "-f" => {
                let value = iter.next().context("--format requires a value")?;
                format = OutputFormat::parse(value)
                    .with_context(|| format!("unknown format '{value}' (expected json or text)"))?;
            }
            "--dir" => {
                let value = iter.next().context("--dir requires a path")?;
                dir = Some(PathBuf::from(value));
            }
            "--mc" => {
                game_version = Some(iter.next().context("--mc requires a version")?.clone());
            }
            "--loader" => {
                loader = Some(iter.next().context("--loader requires a name")?.clone());
            }
            "--loader-version" => {
                loader_version = Some(
                    iter.next()
                        .context("--loader-version requires a version")?
                        .clone(),
                );
            }
            "--help" | "-h" => return Ok((CliCommand::Help, format)),
            "--version" | "-V" => return Ok((CliCommand::Version, format)),
            other if other.starts_with('-') => bail!("unknown option '{other}'"),
            other => positionals.push(other.to_string()),
        }
    }

    let mut pos = positionals.into_iter();
    let command = match pos.next().as_deref() {
        None | Some("help") => CliCommand::Help,
        Some("version") => CliCommand::Version,
        Some("paths") => CliCommand::Paths,
        Some("mods") => CliCommand::Mods { dir },
        Some("updates") => CliCommand::Updates { dir },
        Some("inspect") => {
            let path = pos.next().context("inspect requires a mod file path")?;
            CliCommand::Inspect {
                path: PathBuf::from(path),
            }
        }
        Some("profiles") => match pos.next().as_deref() {
            None | Some("list") => CliCommand::ProfilesList,
            Some("create") => CliCommand::ProfileCreate {
                name: pos.next().context("profiles create requires a name")?,
                game_version,
                loader,
                loader_version,
            },
            Some("add") => CliCommand::ProfileAdd {
                name: pos.next().context("profiles add requires a profile name")?,
                mod_file: PathBuf::from(
                    pos.next().context("profiles add requires a mod file path")?,
                ),
            },
            Some("apply") => CliCommand::ProfileApply {
                name: pos.next().context("profiles apply requires a name")?,
            },
            Some("snapshot") => CliCommand::ProfileSnapshot {
                name: pos.next().context("profiles snapshot requires a name")?,
            },
            Some(other) => bail!("unknown profiles subcommand '{other}'"),
        },
        Some(other) => bail!("unknown command '{other}'"),
    };

    Ok((command, format))
}

fn run_command(command: CliCommand, format: OutputFormat) -> Result<()> {
    match command {
        CliCommand::Help => {
            print_help();
            Ok(())
        }
        CliCommand::Version => {
            println!("moddy v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Paths => {
            let config = AppConfig::load_or_create()?;
            let data_dir = config::base_data_dir()?;
            println!("data dir:      {}", data_dir.display());
            println!("profiles dir:  {}", profile::profiles_root(&data_dir).display());
            println!("minecraft dir: {}", config.minecraft_dir.display());
            println!("mods dir:      {}", config.mods_dir().display());
            Ok(())
        }
        CliCommand::Mods { dir } => {
            let mods_dir = match dir {
                Some(dir) => dir,
                None => AppConfig::load_or_create()?.mods_dir(),
            };
            let reports = inspector::collect_mods(&mods_dir)?;
            match format {
                OutputFormat::Json => print_json(&reports),
                OutputFormat::Text => {
                    for report in &reports {
                        let name = report
                            .fabric_json
                            .as_ref()
                            .and_then(|json| json.get("name"))
                            .and_then(|value| value.as_str())
                            .unwrap_or("-");
                        println!("{}  {}", report.file_name, name);
                        if !report.error.is_empty() {
                            println!("  ! {}", report.error);
                        }
                    }
                    println!("{} mod(s) in {}", reports.len(), mods_dir.display());
                    Ok(())
                }
            }
        }
        CliCommand::Inspect { path } => {
            let report = inspector::inspect_jar(&path);
            match format {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Text => {
                    println!("file:     {}", report.file_name);
                    println!("manifest: {}", presence(report.manifest.is_some()));
                    println!("metadata: {}", presence(report.fabric_json.is_some()));
                    println!("icon:     {}", presence(report.icon_data.is_some()));
                    if !report.error.is_empty() {
                        println!("errors:   {}", report.error);
                    }
                    Ok(())
                }
            }
        }
        CliCommand::ProfilesList => {
            let data_dir = config::base_data_dir()?;
            let profiles = profile::list_profiles(&data_dir)?;
            match format {
                OutputFormat::Json => print_json(&profiles),
                OutputFormat::Text => {
                    for meta in &profiles {
                        println!(
                            "{}  {} {} {}  ({} mod(s))",
                            meta.name,
                            meta.minecraft_version,
                            meta.loader,
                            meta.loader_version,
                            meta.mods.len()
                        );
                    }
                    println!("{} profile(s)", profiles.len());
                    Ok(())
                }
            }
        }
        CliCommand::ProfileCreate {
            name,
            game_version,
            loader,
            loader_version,
        } => {
            let config = AppConfig::load_or_create()?;
            let data_dir = config::base_data_dir()?;
            let profile_dir = profile::create_profile(
                &data_dir,
                &name,
                game_version.as_deref().unwrap_or(&config.game_version),
                loader.as_deref().unwrap_or(&config.loader),
                loader_version.as_deref().unwrap_or(""),
            )?;
            println!("Created profile '{name}' at {}", profile_dir.display());
            Ok(())
        }
        CliCommand::ProfileAdd { name, mod_file } => {
            let data_dir = config::base_data_dir()?;
            let profile_dir = profile::find_profile(&data_dir, &name)?;
            profile::add_mod(&profile_dir, &mod_file)?;
            println!("Added {} to '{name}'", mod_file.display());
            Ok(())
        }
        CliCommand::ProfileApply { name } => {
            let config = AppConfig::load_or_create()?;
            let data_dir = config::base_data_dir()?;
            let profile_dir = profile::find_profile(&data_dir, &name)?;
            let report = profile::apply_profile(&profile_dir, &config.minecraft_dir)?;
            println!(
                "Applied '{name}': {} mod file(s), {} config file(s)",
                report.mod_count, report.config_count
            );
            Ok(())
        }
        CliCommand::ProfileSnapshot { name } => {
            let config = AppConfig::load_or_create()?;
            let data_dir = config::base_data_dir()?;
            let profile_dir = profile::find_profile(&data_dir, &name)?;
            let report = profile::snapshot_profile(&profile_dir, &config.minecraft_dir)?;
            println!(
                "Snapshotted into '{name}': {} mod file(s), {} config file(s)",
                report.mod_count, report.config_count
            );
            Ok(())
        }
        CliCommand::Updates { dir } => {
            let config = AppConfig::load_or_create()?;
            let mods_dir = dir.unwrap_or_else(|| config.mods_dir());
            let local = update::collect_hashes(&mods_dir)?;
            let hashes: Vec<String> = local.iter().map(|entry| entry.hash.clone()).collect();
            let updates =
                update::check_for_updates(&hashes, &config.loader, &config.game_version)?;

            match format {
                OutputFormat::Json => {
                    let rows: Vec<UpdateRow<'_>> = local
                        .iter()
                        .map(|entry| UpdateRow {
                            file_name: &entry.file_name,
                            hash: &entry.hash,
                            update: updates.get(&entry.hash),
                        })
                        .collect();
                    print_json(&rows)
                }
                OutputFormat::Text => {
                    for entry in &local {
                        match updates.get(&entry.hash) {
                            Some(found) => println!(
                                "{}: {} available ({})",
                                entry.file_name, found.latest_version, found.url
                            ),
                            None => println!("{}: no update found", entry.file_name),
                        }
                    }
                    println!("{} mod(s) checked", local.len());
                    Ok(())
                }
            }
        }
    }
}

#[derive(Serialize)]
struct UpdateRow<'a> {
    file_name: &'a str,
    hash: &'a str,
    update: Option<&'a update::ModUpdate>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).context("serialize output")?;
    println!("{raw}");
    Ok(())
}

fn presence(present: bool) -> &'static str {
    if present {
        "present"
    } else {
        "absent"
    }
}

fn print_help() {
    println!("moddy - Minecraft mod inspector and profile switcher");
    println!();
    println!("Usage: moddy <command> [options]");
    println!();
    println!("Commands:");
    println!("  mods                        Inspect every mod in the mods directory");
    println!("  inspect <file>              Inspect a single mod archive");
    println!("  updates                     Check Modrinth for mod updates");
    println!("  profiles [list]             List profiles");
    println!("  profiles create <name>      Create a profile");
    println!("  profiles add <name> <file>  Copy a mod into a profile");
    println!("  profiles apply <name>       Copy a profile into the game directory");
    println!("  profiles snapshot <name>    Capture the game directory into a profile");
    println!("  paths                       Show resolved directories");
    println!("  help, version");
    println!();
    println!("Options:");
    println!("  --format <json|text>        Output format (default text)");
    println!("  --dir <path>                Override the mods directory");
    println!("  --mc <version>              Minecraft version for new profiles");
    println!("  --loader <name>             Mod loader for new profiles");
    println!("  --loader-version <version>  Loader version for new profiles");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_args_means_help() {
        let (command, format) = parse_args(&[]).unwrap();
        assert_eq!(command, CliCommand::Help);
        assert_eq!(format, OutputFormat::Text);
    }

    #[test]
    fn mods_with_format_and_dir() {
        let (command, format) =
            parse_args(&args(&["mods", "--format", "json", "--dir", "/tmp/mods"])).unwrap();
        assert_eq!(
            command,
            CliCommand::Mods {
                dir: Some(PathBuf::from("/tmp/mods")),
            }
        );
        assert_eq!(format, OutputFormat::Json);
    }

    #[test]
    fn profile_create_collects_flags() {
        let (command, _) = parse_args(&args(&[
            "profiles",
            "create",
            "My Pack",
            "--mc",
            "1.20.1",
            "--loader",
            "fabric",
            "--loader-version",
            "0.15.0",
        ]))
        .unwrap();
        assert_eq!(
            command,
            CliCommand::ProfileCreate {
                name: "My Pack".to_string(),
                game_version: Some("1.20.1".to_string()),
                loader: Some("fabric".to_string()),
                loader_version: Some("0.15.0".to_string()),
            }
        );
    }

    #[test]
    fn unknown_command_and_option_fail() {
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(parse_args(&args(&["mods", "--frobnicate"])).is_err());
        assert!(parse_args(&args(&["--format", "yaml", "mods"])).is_err());
    }

    #[test]
    fn inspect_requires_a_path() {
        assert!(parse_args(&args(&["inspect"])).is_err());
        let (command, _) = parse_args(&args(&["inspect", "a.jar"])).unwrap();
        assert_eq!(
            command,
            CliCommand::Inspect {
                path: PathBuf::from("a.jar"),
            }
        );
    }
}
