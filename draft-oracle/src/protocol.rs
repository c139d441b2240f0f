// Messages exchanged between the app orchestrator and the TUI.

use crate::draft::model::{Draft, DraftSummary};
use crate::draft::run::PickProgress;

/// Actions requested from the keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    NewDraft,
    ResumeSelected,
    StopDraft,
    LoadPlayerPool,
    RefreshDrafts,
    SelectNext,
    SelectPrev,
    Quit,
}

/// State pushed from the app orchestrator to the TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// A status line, shown verbatim.
    Status(String),
    /// The pick on the clock, or `None` once no run is advancing.
    Progress(Option<PickProgress>),
    /// The id of the draft with an active run.
    RunningDraft(Option<String>),
    DraftList {
        drafts: Vec<DraftSummary>,
        selected: Option<usize>,
    },
    /// Detail of the selected draft.
    DraftDetail(Box<Draft>),
}
