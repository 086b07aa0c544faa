//! Role seating and round-to-round rotation.
//!
//! A group of `n` rotating participants has a *seat ladder*: the canonical role
//! table truncated to `n`, padded with observer seats past the fourth seat.
//!
//! ```text
//! n = 2   speaker → listener → (speaker)
//! n = 3   speaker → listener → scribe → (speaker)
//! n = 4   speaker → listener → scribe → observer → (speaker)
//! n = 5   speaker → listener → scribe → observer → observer → (speaker)
//! ```
//!
//! Rotation seats every rotating participant by its current role, then moves
//! each one seat down the ladder. For groups of up to four this is exactly one
//! step along the canonical cycle; for larger groups the extra observer seats
//! queue up before returning to speaker, so the role multiset never changes.
//! Permanent observers and unassigned participants are never seated.
//!
//! Seating also repairs a manually broken assignment (two speakers, say): the
//! ladder is rebuilt from the rotating head count, so the result is valid.

use super::entities::{Participant, Role};

/// Roles held by seat index in a group of `size` rotating participants.
pub fn seat_roles(size: usize) -> Vec<Role> {
    (0..size)
        .map(|seat| match seat {
            0 => Role::Speaker,
            1 => Role::Listener,
            2 => Role::Scribe,
            _ => Role::Observer,
        })
        .collect()
}

/// Rounds in one full cycle for a group with `rotating` role-bearing participants.
///
/// 2 for a pair, 3 for a trio, 4 for anything larger.
pub fn total_rounds(rotating: usize) -> u32 {
    match rotating {
        0 | 1 => 1,
        2 => 2,
        3 => 3,
        _ => 4,
    }
}

/// Number of participants that take part in rotation.
pub fn rotating_count(participants: &[Participant]) -> usize {
    participants.iter().filter(|p| p.role.rotates()).count()
}

/// Move every rotating participant one seat down the ladder.
///
/// Returns `false` when nobody rotates.
pub fn rotate_roles(participants: &mut [Participant]) -> bool {
    let mut seated: Vec<usize> = participants
        .iter()
        .enumerate()
        .filter(|(_, p)| p.role.rotates())
        .map(|(i, _)| i)
        .collect();

    if seated.is_empty() {
        return false;
    }

    // Observer seats are ordered by roster distance after the scribe: the
    // observer right behind the scribe arrived most recently.
    let len = participants.len();
    let anchor = participants
        .iter()
        .position(|p| p.role == Role::Scribe)
        .unwrap_or(len - 1);
    seated.sort_by_key(|&i| {
        let slot = participants[i].role.canonical_index().unwrap_or(usize::MAX);
        (slot, (i + len - anchor - 1) % len)
    });

    let observer_seat = if seated
        .iter()
        .any(|&i| participants[i].role == Role::ObserverTemporary)
    {
        Role::ObserverTemporary
    } else {
        Role::Observer
    };

    let ladder = seat_roles(seated.len());
    for (seat, &index) in seated.iter().enumerate() {
        let next = ladder[(seat + 1) % ladder.len()];
        participants[index].role = if next == Role::Observer {
            observer_seat
        } else {
            next
        };
    }
    true
}
