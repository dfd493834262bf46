//! YAML scenario scripts
//!
//! A scenario registers panel kinds, then runs a list of steps against a manager backed by the
//! headless collaborators. Failing steps do not abort the run; their errors are recorded as
//! events next to dialog results, in the order they happened.
//!
//! ```yaml
//! config:
//!   cache_capacity: 2
//! panels:
//!   - key: home
//!   - key: settings
//!     level: 1
//!     load_mode: async
//! steps:
//!   - op: open
//!     panel: home
//!     stack: main
//!   - op: open
//!     panel: settings
//!   - op: complete_loads
//!   - op: pump
//!   - op: push
//!     panel: settings
//!   - op: pop
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PanelConfig;
use crate::dialog::DialogResult;
use crate::focus::InputMode;
use crate::headless::{HeadlessHost, Journal, MemoryLoader, RecordingPanel};
use crate::host::{RenderHost, TemplateId};
use crate::manager::{LoadStatus, OpenRequest, PanelManager};
use crate::panel::{CacheMode, HandlerId, LoadMode, PanelData, PanelKey, PanelRegistry};
use crate::snapshot::ManagerSnapshot;

/// One registered panel kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSpec {
    pub key: PanelKey,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub sub_level: i32,
    #[serde(default)]
    pub cache_mode: CacheMode,
    #[serde(default)]
    pub modal: bool,
    #[serde(default)]
    pub load_mode: LoadMode,
    #[serde(default = "default_true")]
    pub auto_focus: bool,
    #[serde(default)]
    pub pinned_level: Option<i32>,
    /// Selectable children spawned with every instance
    #[serde(default)]
    pub selectables: usize,
    /// Make every load of this kind fail
    #[serde(default)]
    pub fail: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Open {
        panel: PanelKey,
        #[serde(default)]
        level: Option<i32>,
        #[serde(default)]
        sub_level: Option<i32>,
        #[serde(default)]
        data: PanelData,
        #[serde(default)]
        stack: Option<String>,
    },
    Close {
        panel: PanelKey,
    },
    Show {
        panel: PanelKey,
    },
    Hide {
        panel: PanelKey,
    },
    Preload {
        panel: PanelKey,
        #[serde(default)]
        level: Option<i32>,
    },
    Push {
        panel: PanelKey,
        #[serde(default)]
        stack: Option<String>,
        #[serde(default = "default_true")]
        hide_previous: bool,
    },
    Pop {
        #[serde(default)]
        stack: Option<String>,
        #[serde(default = "default_true")]
        show_previous: bool,
        #[serde(default = "default_true")]
        auto_close: bool,
    },
    SetLevel {
        panel: PanelKey,
        level: i32,
        #[serde(default)]
        sub_level: Option<i32>,
    },
    SetModal {
        panel: PanelKey,
        modal: bool,
    },
    Tick {
        secs: f64,
    },
    Pump,
    Alert {
        title: String,
        message: String,
    },
    Confirm {
        title: String,
        message: String,
    },
    Prompt {
        title: String,
        #[serde(default)]
        placeholder: String,
    },
    /// Resolve the showing dialog: cancel, a value, or confirm when neither is given
    Resolve {
        #[serde(default)]
        cancel: bool,
        #[serde(default)]
        value: Option<PanelData>,
    },
    ClearDialogs,
    Mode {
        mode: InputMode,
    },
    /// Focus the `child`-th selectable of a panel, or clear focus without a panel
    Focus {
        #[serde(default)]
        panel: Option<PanelKey>,
        #[serde(default)]
        child: usize,
    },
    /// Let the loader finish deferred async loads (all, or one kind)
    CompleteLoads {
        #[serde(default)]
        panel: Option<PanelKey>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Overrides the config passed to `run`
    #[serde(default)]
    pub config: Option<PanelConfig>,
    #[serde(default)]
    pub panels: Vec<PanelSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Everything observable after a run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Panel hook calls, `"<panel>:<hook>"`
    pub journal: Vec<String>,
    /// Step errors and dialog results
    pub events: Vec<String>,
    pub snapshot: ManagerSnapshot,
}

type ScriptManager = PanelManager<HeadlessHost, MemoryLoader>;

impl Scenario {
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    /// Run every step, then shut the manager down
    pub fn run(&self, base: &PanelConfig) -> ScenarioReport {
        let config = self.config.clone().unwrap_or_else(|| base.clone());
        let journal = Journal::new();
        let events = Journal::new();

        let mut registry = PanelRegistry::new();
        let mut host = HeadlessHost::new();
        let mut loader = MemoryLoader::new();
        for (index, spec) in self.panels.iter().enumerate() {
            let template = TemplateId(index as u64 + 1);
            host.define_template(template, spec.selectables);
            loader = loader.with_template(spec.key.clone(), template);
            if spec.fail {
                loader.fail(spec.key.clone());
            }

            let mut descriptor = RecordingPanel::descriptor(spec.key.as_str(), &journal)
                .level(spec.level)
                .sub_level(spec.sub_level)
                .cache_mode(spec.cache_mode)
                .modal(spec.modal)
                .load_mode(spec.load_mode)
                .auto_focus(spec.auto_focus);
            if let Some(level) = spec.pinned_level {
                descriptor = descriptor.pinned_level(level);
            }
            registry.register(descriptor);
        }

        let mut manager = PanelManager::create(config, registry, host, loader);
        for (index, step) in self.steps.iter().enumerate() {
            tracing::debug!("Step {}: {:?}", index, step);
            if let Err(message) = apply(&mut manager, step, &events) {
                events.record(format!("step {}: {}", index, message));
            }
        }

        let snapshot = manager.snapshot();
        manager.shutdown();
        ScenarioReport {
            journal: journal.take(),
            events: events.take(),
            snapshot,
        }
    }
}

fn handler_of(manager: &ScriptManager, key: &PanelKey) -> Result<HandlerId, String> {
    manager
        .handler_for(key)
        .map(|handler| handler.id())
        .ok_or_else(|| format!("panel {} is not cached", key))
}

fn dialog_recorder(events: &Journal, title: &str) -> impl FnOnce(DialogResult) + 'static {
    let events = events.clone();
    let title = title.to_string();
    move |result| events.record(format!("dialog {}: {:?}", title, result))
}

fn apply(manager: &mut ScriptManager, step: &Step, events: &Journal) -> Result<(), String> {
    let default_stack = manager.config().default_stack.clone();
    match step {
        Step::Open {
            panel,
            level,
            sub_level,
            data,
            stack,
        } => {
            let mut request = OpenRequest::new().data(data.clone());
            if let Some(level) = level {
                request = request.level(*level);
            }
            if let Some(sub_level) = sub_level {
                request = request.sub_level(*sub_level);
            }
            if let Some(stack) = stack {
                request = request.stack(stack.clone());
            }
            let status = manager.open(panel.clone(), request).map_err(|e| e.to_string())?;
            if status == LoadStatus::Pending {
                tracing::debug!("Open of {} pending", panel);
            }
        }
        Step::Close { panel } => {
            let id = handler_of(manager, panel)?;
            manager.close(id).map_err(|e| e.to_string())?;
        }
        Step::Show { panel } => {
            let id = handler_of(manager, panel)?;
            manager.show(id).map_err(|e| e.to_string())?;
        }
        Step::Hide { panel } => {
            let id = handler_of(manager, panel)?;
            manager.hide(id).map_err(|e| e.to_string())?;
        }
        Step::Preload { panel, level } => {
            manager
                .preload(panel.clone(), *level)
                .map_err(|e| e.to_string())?;
        }
        Step::Push {
            panel,
            stack,
            hide_previous,
        } => {
            let id = handler_of(manager, panel)?;
            let stack = stack.as_deref().unwrap_or(&default_stack);
            manager
                .push(id, stack, *hide_previous)
                .map_err(|e| e.to_string())?;
        }
        Step::Pop {
            stack,
            show_previous,
            auto_close,
        } => {
            let stack = stack.as_deref().unwrap_or(&default_stack);
            manager
                .pop(stack, *show_previous, *auto_close)
                .map_err(|e| e.to_string())?;
        }
        Step::SetLevel {
            panel,
            level,
            sub_level,
        } => {
            let id = handler_of(manager, panel)?;
            manager
                .set_level(id, *level, *sub_level)
                .map_err(|e| e.to_string())?;
        }
        Step::SetModal { panel, modal } => {
            let id = handler_of(manager, panel)?;
            manager.set_modal(id, *modal).map_err(|e| e.to_string())?;
        }
        Step::Tick { secs } => {
            let delta = Duration::try_from_secs_f64(*secs)
                .map_err(|e| format!("invalid tick {}: {}", secs, e))?;
            manager.tick(delta);
        }
        Step::Pump => {
            manager.pump();
        }
        Step::Alert { title, message } => {
            manager.alert(title, message, dialog_recorder(events, title));
        }
        Step::Confirm { title, message } => {
            manager.confirm(title, message, dialog_recorder(events, title));
        }
        Step::Prompt { title, placeholder } => {
            manager.prompt(title, placeholder, dialog_recorder(events, title));
        }
        Step::Resolve { cancel, value } => {
            let result = match (cancel, value) {
                (true, _) => DialogResult::Cancel,
                (false, Some(value)) => DialogResult::Value(value.clone()),
                (false, None) => DialogResult::Confirm,
            };
            if !manager.resolve_dialog(result) {
                return Err("no dialog is showing".to_string());
            }
        }
        Step::ClearDialogs => {
            manager.clear_dialog_queue();
        }
        Step::Mode { mode } => manager.set_input_mode(*mode),
        Step::Focus { panel, child } => {
            let Some(panel) = panel else {
                manager.set_focus(None);
                return Ok(());
            };
            let id = handler_of(manager, panel)?;
            let root = manager
                .handler(id)
                .and_then(|handler| handler.node())
                .ok_or_else(|| format!("panel {} has no instance", panel))?;
            let target = manager
                .host()
                .selectables(root)
                .get(*child)
                .copied()
                .ok_or_else(|| format!("panel {} has no selectable {}", panel, child))?;
            manager.set_focus(Some(target));
        }
        Step::CompleteLoads { panel } => match panel {
            Some(panel) => {
                if !manager.loader_mut().complete(panel) {
                    return Err(format!("no pending load for {}", panel));
                }
            }
            None => {
                manager.loader_mut().complete_all();
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_and_struct_steps_parse() {
        let scenario = Scenario::from_yaml(
            "steps:\n  - op: pump\n  - op: tick\n    secs: 1.5\n  - op: mode\n    mode: navigation\n",
        )
        .unwrap();

        assert!(matches!(scenario.steps[0], Step::Pump));
        assert!(matches!(scenario.steps[1], Step::Tick { secs } if secs == 1.5));
        assert!(matches!(
            scenario.steps[2],
            Step::Mode {
                mode: InputMode::Navigation
            }
        ));
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        assert!(Scenario::from_yaml("steps:\n  - op: explode\n").is_err());
    }
}
