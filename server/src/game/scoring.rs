//! Time-up verdict: compare the two King towers.

use crate::game::types::{Seat, Verdict};

/// Higher remaining King HP wins; equal HP (both destroyed included) is a draw.
pub fn decide_by_kings(king_p1: u32, king_p2: u32) -> Verdict {
    match king_p1.cmp(&king_p2) {
        std::cmp::Ordering::Greater => Verdict::Winner(Seat::P1),
        std::cmp::Ordering::Less => Verdict::Winner(Seat::P2),
        std::cmp::Ordering::Equal => Verdict::Draw,
    }
}
