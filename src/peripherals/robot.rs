use serde::{Deserialize, Serialize};

use super::Peripheral;
use crate::constrain::Word;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Heading {
    #[default]
    North,
    East,
    South,
    West,
}

impl Heading {
    pub fn left(self) -> Self {
        match self {
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
            Heading::East => Heading::North,
        }
    }

    pub fn right(self) -> Self {
        match self {
            Heading::North => Heading::East,
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
        }
    }
}

/// Grid robot. Rows grow southwards, columns grow eastwards; the grid is unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Robot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotState {
    pub row: Word,
    pub column: Word,
    pub heading: Heading,
}

impl Peripheral for Robot {
    type State = RobotState;

    fn name(&self) -> &'static str {
        "robot"
    }
}

impl Robot {
    pub fn advance(&self, state: &mut RobotState, distance: Word) {
        match state.heading {
            Heading::North => state.row -= distance,
            Heading::South => state.row += distance,
            Heading::East => state.column += distance,
            Heading::West => state.column -= distance,
        }
    }

    pub fn turn_left(&self, state: &mut RobotState) {
        state.heading = state.heading.left();
    }

    pub fn turn_right(&self, state: &mut RobotState) {
        state.heading = state.heading.right();
    }
}
