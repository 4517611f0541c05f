use crate::{
    catalog::{self, ModEntry, ModState},
    config::{self, ManagerConfig},
    preset::PresetStore,
    reconcile,
};
use anyhow::{bail, Result};
use std::fs;

#[derive(Clone, Copy, PartialEq, Eq)]
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

#[derive(Clone, Copy, PartialEq, Eq)]
enum StateSelect {
    All,
    Installed,
    Broken,
}

enum CliCommand {
    ModsList(StateSelect),
    Apply(Vec<String>),
    Revert(Vec<String>),
    Toggle(Vec<String>),
    FixBroken,
    PresetsList,
    PresetSave(String),
    PresetToggle(String),
    PresetDelete(Vec<String>),
    SetSource(String),
    SetDest(String),
    SetExtensions(String),
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
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--format" | "-f" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--format requires a value"))?;
                format = OutputFormat::parse(value)
                    .ok_or_else(|| anyhow::anyhow!("unknown format: {value}"))?;
            }
            "--help" | "-h" => return Ok((CliCommand::Help, format)),
            "--version" | "-V" => return Ok((CliCommand::Version, format)),
            other => positional.push(other.to_string()),
        }
    }

    let Some((head, rest)) = positional.split_first() else {
        return Ok((CliCommand::Help, format));
    };

    let command = match head.as_str() {
        "mods" => match rest.first().map(String::as_str) {
            Some("list") | None => {
                let select = match rest.get(1).map(String::as_str) {
                    Some("--installed") => StateSelect::Installed,
                    Some("--broken") => StateSelect::Broken,
                    Some(flag) => bail!("unknown mods flag: {flag}"),
                    None => StateSelect::All,
                };
                CliCommand::ModsList(select)
            }
            Some(other) => bail!("unknown mods subcommand: {other}"),
        },
        "apply" => CliCommand::Apply(require_names(rest, "apply")?),
        "revert" => CliCommand::Revert(require_names(rest, "revert")?),
        "toggle" => CliCommand::Toggle(require_names(rest, "toggle")?),
        "fix-broken" => CliCommand::FixBroken,
        "presets" => match rest.first().map(String::as_str) {
            Some("list") | None => CliCommand::PresetsList,
            Some(other) => bail!("unknown presets subcommand: {other}"),
        },
        "preset" => match rest.split_first() {
            Some((sub, names)) => match sub.as_str() {
                "save" => CliCommand::PresetSave(require_one(names, "preset save")?),
                "toggle" => CliCommand::PresetToggle(require_one(names, "preset toggle")?),
                "delete" => CliCommand::PresetDelete(require_names(names, "preset delete")?),
                other => bail!("unknown preset subcommand: {other}"),
            },
            None => bail!("preset requires a subcommand: save, toggle, delete"),
        },
        "config" => match rest.split_first() {
            Some((sub, values)) => match sub.as_str() {
                "set-source" => CliCommand::SetSource(require_one(values, "config set-source")?),
                "set-dest" => CliCommand::SetDest(require_one(values, "config set-dest")?),
                "set-extensions" => {
                    CliCommand::SetExtensions(values.first().cloned().unwrap_or_default())
                }
                other => bail!("unknown config subcommand: {other}"),
            },
            None => bail!("config requires a subcommand: set-source, set-dest, set-extensions"),
        },
        "paths" => CliCommand::Paths,
        "help" => CliCommand::Help,
        "version" => CliCommand::Version,
        other => bail!("unknown command: {other} (see 'linksmith help')"),
    };

    Ok((command, format))
}

fn require_names(values: &[String], what: &str) -> Result<Vec<String>> {
    if values.is_empty() {
        bail!("{what} requires at least one mod name");
    }
    Ok(values.to_vec())
}

fn require_one(values: &[String], what: &str) -> Result<String> {
    match values.first() {
        Some(value) => Ok(value.clone()),
        None => bail!("{what} requires a name"),
    }
}

fn run_command(command: CliCommand, format: OutputFormat) -> Result<()> {
    match command {
        CliCommand::Help => {
            print_help();
            Ok(())
        }
        CliCommand::Version => {
            println!("linksmith v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::SetSource(path) => {
            let mut config = ManagerConfig::load_or_create()?;
            config.mods_source_dir = path;
            config.save()
        }
        CliCommand::SetDest(path) => {
            let mut config = ManagerConfig::load_or_create()?;
            config.game_mods_dir = path;
            config.save()
        }
        CliCommand::SetExtensions(extensions) => {
            let mut config = ManagerConfig::load_or_create()?;
            config.mod_extensions = extensions;
            config.save()
        }
        CliCommand::Paths => {
            let config = ManagerConfig::load_or_create()?;
            println!("data dir:    {}", config::data_dir()?.display());
            println!("mods source: {}", or_not_set(&config.mods_source_dir));
            println!("game mods:   {}", or_not_set(&config.game_mods_dir));
            let extensions = if config.extension_filter().is_unfiltered() {
                "(all)".to_string()
            } else {
                config.mod_extensions.clone()
            };
            println!("extensions:  {extensions}");
            Ok(())
        }
        CliCommand::ModsList(select) => {
            let config = configured()?;
            let mods: Vec<ModEntry> = match select {
                StateSelect::All => catalog::discover(&config),
                StateSelect::Installed => catalog::list_installed(&config),
                StateSelect::Broken => catalog::list_broken(&config),
            };
            print_mods(&mods, format)
        }
        CliCommand::Apply(names) => {
            let config = configured()?;
            let report = reconcile::apply_selection(&catalog::discover(&config), &names);
            print_report(&report, format)
        }
        CliCommand::Revert(names) => {
            let config = configured()?;
            let report = reconcile::revert_selection(&catalog::discover(&config), &names);
            print_report(&report, format)
        }
        CliCommand::Toggle(names) => {
            let config = configured()?;
            run_toggle(&config, &names, format)
        }
        CliCommand::FixBroken => {
            let config = configured()?;
            let report = reconcile::remove_broken(&config);
            print_report(&report, format)
        }
        CliCommand::PresetsList => {
            let config = configured()?;
            let store = PresetStore::load_or_create()?;
            print_presets(&config, &store, format)
        }
        CliCommand::PresetSave(name) => {
            let config = configured()?;
            let installed = catalog::list_installed(&config);
            if installed.is_empty() {
                bail!("no installed mods to save");
            }
            let members: Vec<String> = installed.into_iter().map(|entry| entry.name).collect();
            let count = members.len();
            let mut store = PresetStore::load_or_create()?;
            store.save(&name, members)?;
            println!("Preset '{name}' saved ({count} mods)");
            Ok(())
        }
        CliCommand::PresetToggle(name) => {
            let config = configured()?;
            let store = PresetStore::load_or_create()?;
            let members = store.get(&name);
            let snapshot = catalog::discover(&config);
            let report = if reconcile::should_revert(&snapshot, &members) {
                println!("Preset '{name}': reverting");
                reconcile::revert_selection(&snapshot, &members)
            } else {
                println!("Preset '{name}': applying");
                reconcile::apply_selection(&snapshot, &members)
            };
            print_report(&report, format)
        }
        CliCommand::PresetDelete(names) => {
            let mut store = PresetStore::load_or_create()?;
            let (removed, missing) = store.delete(&names)?;
            let missing = if missing.is_empty() {
                "none".to_string()
            } else {
                missing.join(", ")
            };
            println!("Deleted: {removed}. Missing: {missing}");
            Ok(())
        }
    }
}

/// Per-mod toggle: flips each requested name against one snapshot and prints
/// every outcome, installed or not. Unlike preset apply, nothing is silent
/// here.
fn run_toggle(config: &ManagerConfig, names: &[String], format: OutputFormat) -> Result<()> {
    let snapshot = catalog::discover(config);
    let mut combined = reconcile::BatchReport::default();

    for name in names {
        let selection = std::slice::from_ref(name);
        let present = snapshot
            .iter()
            .find(|entry| &entry.name == name)
            .map(ModEntry::is_present);
        let report = match present {
            Some(true) => reconcile::revert_selection(&snapshot, selection),
            Some(false) => reconcile::apply_selection(&snapshot, selection),
            None => {
                println!("Skip {name}: not in source");
                continue;
            }
        };
        combined.succeeded += report.succeeded;
        combined.failed += report.failed;
        combined.log.extend(report.log);
    }

    print_report(&combined, format)
}

/// Refuses to run mod operations until both directories are configured, then
/// makes sure they exist.
fn configured() -> Result<ManagerConfig> {
    let config = ManagerConfig::load_or_create()?;
    if config.mods_source_dir.trim().is_empty() || config.game_mods_dir.trim().is_empty() {
        bail!("configure paths first: linksmith config set-source <dir> / set-dest <dir>");
    }
    fs::create_dir_all(config.source_dir())?;
    fs::create_dir_all(config.dest_dir())?;
    Ok(config)
}

fn print_mods(mods: &[ModEntry], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(mods)?);
        return Ok(());
    }
    if mods.is_empty() {
        println!("No mods found.");
        return Ok(());
    }
    for entry in mods {
        let mark = match entry.state {
            ModState::NotInstalled => "[ ]",
            ModState::Installed => "[X]",
            ModState::Broken => "[!]",
        };
        println!("{mark} {} ({})", entry.name, entry.kind.label());
    }
    Ok(())
}

fn print_report(report: &reconcile::BatchReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for item in &report.log {
        let tag = match item.outcome {
            reconcile::ItemOutcome::Applied => "install",
            reconcile::ItemOutcome::Reverted => "remove",
            reconcile::ItemOutcome::Failed => "ERR",
            reconcile::ItemOutcome::Skipped => "skip",
        };
        println!("{tag} {}: {}", item.name, item.message);
    }
    println!("OK: {}, Errors: {}", report.succeeded, report.failed);
    Ok(())
}

fn print_presets(config: &ManagerConfig, store: &PresetStore, format: OutputFormat) -> Result<()> {
    let snapshot = catalog::discover(config);

    if format == OutputFormat::Json {
        #[derive(serde::Serialize)]
        struct PresetRow<'a> {
            name: &'a str,
            members: &'a [String],
            all_installed: bool,
        }
        let rows: Vec<PresetRow> = store
            .iter()
            .map(|(name, members)| PresetRow {
                name,
                members,
                all_installed: reconcile::should_revert(&snapshot, members),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if store.is_empty() {
        println!("No presets saved.");
        return Ok(());
    }
    for (name, members) in store.iter() {
        let mark = if reconcile::should_revert(&snapshot, members) {
            "[X]"
        } else {
            "[ ]"
        };
        println!("{mark} {name} ({} mods)", members.len());
    }
    Ok(())
}

fn or_not_set(value: &str) -> &str {
    if value.trim().is_empty() {
        "-not set-"
    } else {
        value
    }
}

fn print_help() {
    println!("linksmith - link-based game mod activator");
    println!();
    println!("Usage: linksmith <command> [options]");
    println!();
    println!("Commands:");
    println!("  mods list [--installed|--broken]   show discovered mods and their state");
    println!("  apply <name>...                    link mods into the game folder");
    println!("  revert <name>...                   remove mod links");
    println!("  toggle <name>...                   flip each mod's installed state");
    println!("  fix-broken                         remove links whose source is gone");
    println!("  presets list                       show saved presets");
    println!("  preset save <name>                 snapshot installed mods as a preset");
    println!("  preset toggle <name>               apply or revert a whole preset");
    println!("  preset delete <name>...            delete presets");
    println!("  config set-source <dir>            set the mods source folder");
    println!("  config set-dest <dir>              set the game mods folder");
    println!("  config set-extensions <list>       comma-separated mod extensions, empty for all");
    println!("  paths                              show configured locations");
    println!();
    println!("Options:");
    println!("  -f, --format <text|json>           output format for list/report commands");
    println!("  -h, --help                         show this help");
    println!("  -V, --version                      show version");
}
