//! Pluggable devices. The engine only ever resets them; instruction effects
//! call the device-specific operations directly on the device's state slot.

use std::any::{Any, TypeId};
use std::fmt;

pub mod fire;
pub mod lcd;
pub mod pixel;
pub mod robot;
pub mod speaker;

pub use fire::{Fire, FireState};
pub use lcd::{Lcd, LcdState};
pub use pixel::{PixelDisplay, PixelState};
pub use robot::{Heading, Robot, RobotState};
pub use speaker::{Speaker, SpeakerState};

/// A device attached to a processor. Each device owns one state slot in
/// [`PeripheralState`], keyed by its `State` type.
pub trait Peripheral: Send + Sync + 'static {
    type State: Any + Clone + fmt::Debug + Default + Send + Sync;

    fn name(&self) -> &'static str;

    fn reset(&self, state: &mut Self::State) {
        *state = Self::State::default();
    }
}

/// Object-safe view of a [`Peripheral`] so a processor can hold a mixed list.
pub trait Attached: Send + Sync {
    fn name(&self) -> &'static str;
    fn reset_slot(&self, slots: &mut PeripheralState);
}

impl<P: Peripheral> Attached for P {
    fn name(&self) -> &'static str {
        Peripheral::name(self)
    }

    fn reset_slot(&self, slots: &mut PeripheralState) {
        let mut state = P::State::default();
        self.reset(&mut state);
        slots.insert(state);
    }
}

trait Slot: Any + fmt::Debug + Send + Sync {
    fn clone_slot(&self) -> Box<dyn Slot>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + Clone + fmt::Debug + Send + Sync> Slot for T {
    fn clone_slot(&self) -> Box<dyn Slot> {
        Box::new(self.clone())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Composition of every attached device's state, one slot per state type,
/// kept in attach order.
#[derive(Debug, Default)]
pub struct PeripheralState {
    slots: Vec<(TypeId, Box<dyn Slot>)>,
}

impl Clone for PeripheralState {
    fn clone(&self) -> Self {
        Self {
            slots: self
                .slots
                .iter()
                .map(|(id, slot)| (*id, slot.as_ref().clone_slot()))
                .collect(),
        }
    }
}

impl PeripheralState {
    /// Store `value`, replacing any existing slot of the same type in place.
    pub fn insert<T: Any + Clone + fmt::Debug + Send + Sync>(&mut self, value: T) {
        let id = TypeId::of::<T>();
        match self.slots.iter_mut().find(|(slot_id, _)| *slot_id == id) {
            Some((_, slot)) => *slot = Box::new(value),
            None => self.slots.push((id, Box::new(value))),
        }
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        let id = TypeId::of::<T>();
        self.slots
            .iter()
            .find(|(slot_id, _)| *slot_id == id)
            .and_then(|(_, slot)| slot.as_ref().as_any().downcast_ref())
    }

    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        let id = TypeId::of::<T>();
        self.slots
            .iter_mut()
            .find(|(slot_id, _)| *slot_id == id)
            .and_then(|(_, slot)| slot.as_mut().as_any_mut().downcast_mut())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
