//! Command-line interface for Placekeeper
//!
//! The daemon itself starts through `run`; the remaining commands are small
//! inspection/maintenance surfaces over the two persisted documents.

use crate::config::{ConfigStore, StateStore};
use crate::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Placekeeper command-line interface
#[derive(Parser)]
#[command(name = "placekeeper")]
#[command(about = "Per-application window position and state restorer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct PlacekeeperCli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration directory (defaults to ~/.config/placekeeper)
    #[arg(short, long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Emit machine-readable JSON instead of plain text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the reconciliation daemon
    Run,

    /// Print the configured rule list
    Rules,

    /// Inspect or clear saved window states
    State(StateCommands),
}

#[derive(Args)]
pub struct StateCommands {
    #[command(subcommand)]
    pub action: StateActions,
}

#[derive(Subcommand)]
pub enum StateActions {
    /// Show saved state, optionally for a single class
    Show {
        /// Class identifier to show
        class: Option<String>,
    },

    /// Drop the saved state for a class
    Clear {
        /// Class identifier to clear
        class: String,
    },
}

/// Render the rule list for the `rules` command
pub fn render_rules(config: &ConfigStore, json: bool) -> Result<String> {
    let rules = config.rules();
    if json {
        return Ok(serde_json::to_string_pretty(&rules)?);
    }

    if rules.is_empty() {
        return Ok("No rules configured".to_string());
    }

    let lines: Vec<String> = rules
        .iter()
        .map(|rule| {
            let mut axes = Vec::new();
            if rule.restore_size {
                axes.push("size");
            }
            if rule.restore_position {
                axes.push("position");
            }
            if rule.restore_maximized {
                axes.push("maximized");
            }
            if rule.restore_workspace {
                axes.push("workspace");
            }
            if rule.restore_minimized {
                axes.push("minimized");
            }
            if rule.restore_above {
                axes.push("above");
            }
            if rule.restore_sticky {
                axes.push("sticky");
            }
            format!(
                "{}{}: {}",
                rule.class_pattern,
                if rule.is_regex { " (regex)" } else { "" },
                if axes.is_empty() {
                    "center only".to_string()
                } else {
                    axes.join(", ")
                }
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Render saved state for the `state show` command
pub fn render_state(states: &StateStore, class: Option<&str>, json: bool) -> Result<String> {
    let map = states.states();

    if let Some(class) = class {
        return match map.get(class) {
            Some(entry) if json => Ok(serde_json::to_string_pretty(entry)?),
            Some(entry) => Ok(format!("{}: {:?}", class, entry)),
            None => Ok(format!("No saved state for {}", class)),
        };
    }

    if json {
        return Ok(serde_json::to_string_pretty(&map)?);
    }
    if map.is_empty() {
        return Ok("No saved states".to_string());
    }

    let mut classes: Vec<&String> = map.keys().collect();
    classes.sort();
    let lines: Vec<String> = classes
        .into_iter()
        .map(|class| format!("{}: {:?}", class, map[class]))
        .collect();
    Ok(lines.join("\n"))
}

/// Execute the `state clear` command
pub fn clear_state(states: &StateStore, class: &str) -> Result<String> {
    if states.clear(class)? {
        Ok(format!("Cleared saved state for {}", class))
    } else {
        Ok(format!("No saved state for {}", class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings_store::{
        InMemorySettingsStore, SettingsStore, KEY_APP_CONFIGS,
    };
    use clap::CommandFactory;
    use std::sync::Arc;

    fn stores_with_rules(raw: &str) -> (ConfigStore, StateStore) {
        let store = Arc::new(InMemorySettingsStore::new());
        store.set_string(KEY_APP_CONFIGS, raw).unwrap();
        (
            ConfigStore::new(store.clone() as Arc<dyn SettingsStore>),
            StateStore::new(store as Arc<dyn SettingsStore>),
        )
    }

    #[test]
    fn cli_definition_is_consistent() {
        PlacekeeperCli::command().debug_assert();
    }

    #[test]
    fn run_command_parses() {
        let cli = PlacekeeperCli::try_parse_from(["placekeeper", "run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run));
        assert!(!cli.json);
    }

    #[test]
    fn state_clear_requires_a_class() {
        assert!(PlacekeeperCli::try_parse_from(["placekeeper", "state", "clear"]).is_err());

        let cli =
            PlacekeeperCli::try_parse_from(["placekeeper", "state", "clear", "editor"]).unwrap();
        match cli.command {
            Commands::State(StateCommands {
                action: StateActions::Clear { class },
            }) => assert_eq!(class, "editor"),
            _ => panic!("expected state clear"),
        }
    }

    #[test]
    fn rules_render_plain_and_json() {
        let (config, _) = stores_with_rules(
            r#"[{"classPattern": "editor", "restoreSize": true, "restorePosition": true}]"#,
        );

        let plain = render_rules(&config, false).unwrap();
        assert!(plain.contains("editor"));
        assert!(plain.contains("size, position"));

        let json = render_rules(&config, true).unwrap();
        assert!(json.contains("\"classPattern\": \"editor\""));
    }

    #[test]
    fn empty_rules_render_placeholder() {
        let (config, _) = stores_with_rules("[]");
        assert_eq!(render_rules(&config, false).unwrap(), "No rules configured");
    }

    #[test]
    fn state_show_and_clear_round_trip() {
        let (_, states) = stores_with_rules("[]");
        states
            .merge("editor", |entry| entry.x = Some(100))
            .unwrap();

        let shown = render_state(&states, Some("editor"), false).unwrap();
        assert!(shown.contains("editor"));

        let cleared = clear_state(&states, "editor").unwrap();
        assert!(cleared.contains("Cleared"));
        assert!(render_state(&states, Some("editor"), false)
            .unwrap()
            .contains("No saved state"));
    }
}
