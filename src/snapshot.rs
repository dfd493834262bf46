//! Serializable view of the manager state for debugging dumps
//!
//! The scenario runner prints this as YAML or JSON after a script finishes.

use serde::Serialize;

use crate::dialog::DialogSlot;
use crate::focus::InputMode;
use crate::host::{NodeId, PanelLoader, RenderHost};
use crate::manager::PanelManager;
use crate::panel::{CacheMode, HandlerId, PanelHandler, PanelKey, PanelState};

#[derive(Debug, Clone, Serialize)]
pub struct ManagerSnapshot {
    pub opened: Vec<PanelSnapshot>,
    /// Preloaded kinds, least recently accessed first
    pub preloaded: Vec<PanelKey>,
    pub levels: Vec<LevelSnapshot>,
    pub stacks: Vec<StackSnapshot>,
    pub dialog: DialogSnapshot,
    pub loading: Vec<PanelKey>,
    pub focus: Option<NodeId>,
    pub input_mode: InputMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelSnapshot {
    pub key: PanelKey,
    pub handler: HandlerId,
    pub level: i32,
    pub sub_level: i32,
    pub hot: i32,
    pub state: PanelState,
    pub cache_mode: CacheMode,
    pub modal: bool,
    pub interactive: bool,
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelSnapshot {
    pub level: i32,
    /// Bottom first
    pub panels: Vec<PanelKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StackSnapshot {
    pub name: String,
    /// Bottom first
    pub panels: Vec<PanelKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DialogSnapshot {
    pub slot: DialogSlot,
    pub active: Option<PanelKey>,
    pub queued: usize,
}

impl PanelSnapshot {
    fn from_handler(handler: &PanelHandler) -> Self {
        Self {
            key: handler.key().clone(),
            handler: handler.id(),
            level: handler.level(),
            sub_level: handler.sub_level(),
            hot: handler.hot(),
            state: handler.state(),
            cache_mode: handler.cache_mode(),
            modal: handler.is_modal(),
            interactive: handler.is_interactive(),
            stack: handler.stack_name().map(str::to_string),
        }
    }
}

impl<H: RenderHost, L: PanelLoader> PanelManager<H, L> {
    pub fn snapshot(&self) -> ManagerSnapshot {
        let keys_of = |ids: &[HandlerId]| -> Vec<PanelKey> {
            ids.iter()
                .filter_map(|id| self.handler(*id))
                .map(|handler| handler.key().clone())
                .collect()
        };

        let opened = self
            .cached_panels()
            .into_iter()
            .filter_map(|(_, id)| self.handler(id))
            .map(PanelSnapshot::from_handler)
            .collect();

        let levels = self
            .levels()
            .levels()
            .into_iter()
            .map(|level| LevelSnapshot {
                level,
                panels: keys_of(self.levels().panels(level)),
            })
            .collect();

        let stacks = self
            .stacks()
            .names()
            .into_iter()
            .map(|name| StackSnapshot {
                panels: keys_of(self.stacks().members(&name).as_slice()),
                name,
            })
            .collect();

        ManagerSnapshot {
            opened,
            preloaded: self.cache().preloaded_keys(),
            levels,
            stacks,
            dialog: DialogSnapshot {
                slot: self.dialogs().slot(),
                active: self.dialogs().active_panel().cloned(),
                queued: self.dialogs().len(),
            },
            loading: self.loading_keys(),
            focus: self.current_focus(),
            input_mode: self.input_mode(),
        }
    }
}
