//! Loads extensions, independently loadable bundles of commands.
//!
//! Every `*.toml` file in the extensions directory enables the built-in module named by
//! its file stem, so `extensions/general.toml` loads the `general` module as
//! `extensions.general`. Files starting with `_` are ignored. Files are loaded in
//! lexicographic order and a failure in one never affects another.

mod manifest;
mod record;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use itertools::Itertools;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

pub use manifest::Manifest;
pub use record::ExtensionRecord;

use crate::commands::Command;
use crate::error::ExtensionError;

/// Suffix of extension files.
const EXTENSION_SUFFIX: &str = ".toml";

/// Files starting with this are skipped.
const EXCLUDE_MARKER: char = '_';

/// Builds the commands of one module.
pub type ModuleFn = fn() -> Vec<Command>;

/// The modules an extension file can refer to.
#[derive(Default)]
pub struct Catalog {
    #[allow(clippy::missing_docs_in_private_items)]
    modules: BTreeMap<&'static str, ModuleFn>,
}

impl Catalog {
    /// Add a module under `name`.
    pub fn with(mut self, name: &'static str, module: ModuleFn) -> Self {
        self.modules.insert(name, module);
        self
    }

    pub fn get(&self, name: &str) -> Option<ModuleFn> {
        self.modules.get(name).copied()
    }

    #[cfg(test)]
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modules.keys().copied()
    }
}

/// Everything produced by [load_extensions].
#[derive(Default)]
pub struct LoadReport {
    /// Outcome per extension.
    pub record: ExtensionRecord,
    /// Commands of the extensions that loaded.
    pub commands: Vec<Command>,
}

/// Load every extension found in `dir`.
/// A missing directory is created and treated as having no extensions.
#[instrument(level = "debug", skip(catalog))]
pub fn load_extensions(dir: &Path, catalog: &Catalog) -> LoadReport {
    let mut report = LoadReport::default();
    let shown = dir.display();

    if !dir.exists() {
        warn!("Extensions directory '{shown}' not found. Creating it...");
        if let Err(e) = fs::create_dir_all(dir) {
            error!("Could not create extensions directory '{shown}': {e}");
        }
        return report;
    }

    let candidates = match discover(dir) {
        Ok(candidates) => candidates,
        Err(e) => {
            error!("Could not read extensions directory '{shown}': {e}");
            return report;
        }
    };

    for path in candidates {
        let Some(name) = module_name(&path) else {
            continue;
        };
        let id = format!("extensions.{name}");

        match load_one(&path, name, catalog) {
            Ok(commands) => {
                let names = commands.iter().map(|c| c.name.as_str()).join(", ");
                info!("✓ Loaded: {id} [{names}]");
                report.record.record(id, true);
                report.commands.extend(commands);
            }
            Err(e) => {
                error!("✗ Failed to load {id}: {e}");
                report.record.record(id, false);
            }
        }
    }

    info!(
        "Extension loading complete: {} succeeded, {} failed",
        report.record.succeeded(),
        report.record.failed()
    );
    report
}

/// Candidate extension files of `dir`, sorted by file name.
fn discover(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if file_name.ends_with(EXTENSION_SUFFIX) && !file_name.starts_with(EXCLUDE_MARKER) {
            candidates.push(entry.path());
        }
    }

    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(candidates)
}

/// The file stem, which names the module.
fn module_name(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|stem| stem.to_str())
}

/// Load a single extension file.
fn load_one(path: &Path, name: &str, catalog: &Catalog) -> Result<Vec<Command>, ExtensionError> {
    let content = fs::read_to_string(path)?;
    let manifest = Manifest::parse(&content)?;

    let module = catalog.get(name).ok_or_else(|| ExtensionError::UnknownModule {
        name: name.to_string(),
    })?;
    let mut commands = module();

    if let Some(unknown) = manifest
        .disabled
        .iter()
        .find(|disabled| !commands.iter().any(|c| &c.name == *disabled))
    {
        return Err(ExtensionError::UnknownCommand {
            module: name.to_string(),
            command: unknown.clone(),
        });
    }

    commands.retain(|c| !manifest.disabled.contains(&c.name));

    if let Some(category) = manifest.category {
        for command in &mut commands {
            command.category = Some(category.clone());
        }
    }

    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::general;

    fn two_commands() -> Vec<Command> {
        vec![general::ping(), general::uptime()]
    }

    fn catalog() -> Catalog {
        Catalog::default()
            .with("alpha", two_commands)
            .with("beta", two_commands)
            .with("gamma", two_commands)
    }

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn missing_directory_is_created() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("extensions");

        let report = load_extensions(&dir, &catalog());

        assert!(dir.is_dir());
        assert!(report.record.is_empty());
        assert!(report.commands.is_empty());
    }

    #[test]
    fn skips_excluded_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "alpha.toml", "");
        write(dir.path(), "_beta.toml", "");
        write(dir.path(), "gamma.txt", "");
        fs::create_dir(dir.path().join("beta.toml")).unwrap();

        let report = load_extensions(dir.path(), &catalog());

        let ids: Vec<_> = report.record.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["extensions.alpha"]);
        assert_eq!(report.commands.len(), 2);
    }

    #[test]
    fn discovery_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["gamma.toml", "alpha.toml", "beta.toml"] {
            write(dir.path(), name, "");
        }

        let found: Vec<_> = discover(dir.path())
            .unwrap()
            .iter()
            .map(|p| module_name(p).unwrap().to_string())
            .collect();
        assert_eq!(found, ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn failures_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "alpha.toml", "");
        write(dir.path(), "beta.toml", "not = [valid");
        write(dir.path(), "delta.toml", "");
        write(dir.path(), "gamma.toml", "");

        let report = load_extensions(dir.path(), &catalog());

        assert_eq!(report.record.get("extensions.alpha"), Some(&true));
        assert_eq!(report.record.get("extensions.beta"), Some(&false));
        assert_eq!(report.record.get("extensions.delta"), Some(&false));
        assert_eq!(report.record.get("extensions.gamma"), Some(&true));
        assert_eq!(report.record.succeeded(), 2);
        assert_eq!(report.commands.len(), 4);
    }

    #[test]
    fn outcome_does_not_depend_on_neighbours() {
        let alone = tempfile::tempdir().unwrap();
        write(alone.path(), "beta.toml", "");
        let alone = load_extensions(alone.path(), &catalog());

        for neighbour in ["", "broken = ["] {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "alpha.toml", neighbour);
            write(dir.path(), "beta.toml", "");
            write(dir.path(), "gamma.toml", neighbour);
            let report = load_extensions(dir.path(), &catalog());

            assert_eq!(
                report.record.get("extensions.beta"),
                alone.record.get("extensions.beta")
            );
        }
    }

    #[test]
    fn disabled_commands_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "alpha.toml", "disabled = [\"ping\"]\ncategory = \"Misc\"");

        let report = load_extensions(dir.path(), &catalog());

        assert_eq!(report.commands.len(), 1);
        assert_eq!(report.commands[0].name, "uptime");
        assert_eq!(report.commands[0].category.as_deref(), Some("Misc"));
    }

    #[test]
    fn disabling_unknown_command_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "alpha.toml", "disabled = [\"nope\"]");

        let report = load_extensions(dir.path(), &catalog());

        assert_eq!(report.record.get("extensions.alpha"), Some(&false));
        assert!(report.commands.is_empty());
    }
}
