use ct_core::ArticleSummary;

/// One of the two comparison positions an article can occupy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Slot {
    #[default]
    Left,
    Right,
}

impl Slot {
    pub fn index(self) -> usize {
        match self {
            Slot::Left => 0,
            Slot::Right => 1,
        }
    }

    pub fn other(self) -> Slot {
        match self {
            Slot::Left => Slot::Right,
            Slot::Right => Slot::Left,
        }
    }
}

/// View mode of the comparison screen: one article in detail, or two
/// side by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    Detail,
    #[default]
    SideBySide,
}

impl Layout {
    pub fn columns(self) -> usize {
        match self {
            Layout::Detail => 1,
            Layout::SideBySide => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareSelection {
    pub summary: ArticleSummary,
    pub slot: Slot,
}

/// Selection state of the comparison workflow. At most one entry per slot;
/// `current` is the last-written selection and is the sole trigger the
/// fetch orchestrator watches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompareState {
    pub selections: Vec<CompareSelection>,
    pub current: Option<CompareSelection>,
    pub active_slot: Slot,
    pub layout: Layout,
}

impl CompareState {
    pub fn selection_for(&self, slot: Slot) -> Option<&CompareSelection> {
        self.selections.iter().find(|sel| sel.slot == slot)
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum CompareAction {
    /// Marks which slot the next selection targets.
    SetActiveSlot(Slot),
    /// Fills the active slot, replacing whatever was there.
    SelectForSlot(ArticleSummary),
    RemoveFromSlot(Slot),
    Clear,
    SetLayout(Layout),
}

pub(crate) fn reduce(state: &mut CompareState, action: &CompareAction) {
    match action {
        CompareAction::SetActiveSlot(slot) => {
            state.active_slot = *slot;
        }
        CompareAction::SelectForSlot(summary) => {
            let slot = state.active_slot;
            state.selections.retain(|sel| sel.slot != slot);
            let selection = CompareSelection {
                summary: summary.clone(),
                slot,
            };
            state.selections.push(selection.clone());
            state.current = Some(selection);
        }
        CompareAction::RemoveFromSlot(slot) => {
            state.selections.retain(|sel| sel.slot != *slot);
            if state
                .current
                .as_ref()
                .is_some_and(|current| current.slot == *slot)
            {
                state.current = None;
            }
            if state.selections.is_empty() {
                state.active_slot = Slot::Left;
            }
        }
        CompareAction::Clear => {
            state.selections.clear();
            state.current = None;
            state.active_slot = Slot::Left;
        }
        CompareAction::SetLayout(layout) => {
            state.layout = *layout;
        }
    }
}
