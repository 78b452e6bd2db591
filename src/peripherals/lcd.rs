use super::Peripheral;
use crate::constrain::Word;

/// Character display that appends everything printed to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lcd;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LcdState {
    pub output: String,
}

impl Peripheral for Lcd {
    type State = LcdState;

    fn name(&self) -> &'static str {
        "lcd"
    }
}

impl Lcd {
    pub fn print_number(&self, state: &mut LcdState, value: Word) {
        state.output.push_str(&value.to_string());
    }

    /// Values that are not a Unicode scalar print as U+FFFD.
    pub fn print_ascii(&self, state: &mut LcdState, value: Word) {
        let ch = u32::try_from(value)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        state.output.push(ch);
    }

    pub fn print_str(&self, state: &mut LcdState, text: &str) {
        state.output.push_str(text);
    }
}
