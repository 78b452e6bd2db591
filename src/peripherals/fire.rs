use super::Peripheral;

/// Set by instructions that should never be executed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fire;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FireState {
    pub on_fire: bool,
}

impl Peripheral for Fire {
    type State = FireState;

    fn name(&self) -> &'static str {
        "fire"
    }
}

impl Fire {
    pub fn catch_fire(&self, state: &mut FireState) {
        state.on_fire = true;
    }
}
