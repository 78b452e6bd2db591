use super::Peripheral;
use crate::constrain::Word;

#[derive(Debug, Clone, Copy, Default)]
pub struct Speaker;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakerState {
    pub beeps: u64,
    pub last_sound: Option<Word>,
}

impl Peripheral for Speaker {
    type State = SpeakerState;

    fn name(&self) -> &'static str {
        "speaker"
    }
}

impl Speaker {
    pub fn beep(&self, state: &mut SpeakerState) {
        state.beeps += 1;
    }

    pub fn sound(&self, state: &mut SpeakerState, sound: Word) {
        state.beeps += 1;
        state.last_sound = Some(sound);
    }
}
