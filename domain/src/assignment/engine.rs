//! Group assignment engine.
//!
//! Partitions a roster into groups of two to four (five only for the
//! "together" choice), seats initial roles, reshuffles and rebalances.
//! Everything here is a pure function of its inputs plus the supplied RNG.

use super::config::{FivePersonChoice, GroupConfiguration, GroupSize, ObserverStrategy};
use crate::core::error::DomainError;
use crate::core::ids::{GroupId, ParticipantId};
use crate::group::Group;
use crate::participant::{Participant, Role, seat_roles};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of [`validate_configuration`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn into_result(self) -> Result<(), DomainError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(DomainError::InvalidConfiguration(self.errors))
        }
    }
}

/// Group sizes for a roster of `count`, largest-first in roster order.
///
/// Rosters of up to four form one group. Five splits into a pair and a trio
/// unless `together` is chosen. From six on, `Four` and `Mixed` prefer groups
/// of four and demote fours to threes to absorb the remainder; `Three` fills
/// threes and folds the remainder into a pair or a single four.
pub fn group_sizes(
    count: usize,
    preference: GroupSize,
    five: FivePersonChoice,
) -> Result<Vec<usize>, DomainError> {
    match count {
        0 | 1 => Err(DomainError::invalid_configuration(format!(
            "at least 2 participants are required, got {}",
            count
        ))),
        2..=4 => Ok(vec![count]),
        5 => Ok(match five {
            FivePersonChoice::Split => vec![2, 3],
            FivePersonChoice::Together => vec![5],
        }),
        _ => Ok(match preference {
            GroupSize::Four | GroupSize::Mixed => prefer_fours(count),
            GroupSize::Three => prefer_threes(count),
        }),
    }
}

fn prefer_fours(count: usize) -> Vec<usize> {
    let mut sizes = vec![4; count / 4];
    match count % 4 {
        0 => {}
        // Two fours become three threes: 9 = 3+3+3, 13 = 4+3+3+3
        1 => {
            sizes.truncate(sizes.len() - 2);
            sizes.extend([3, 3, 3]);
        }
        // One four becomes two threes: 6 = 3+3, 10 = 4+3+3
        2 => {
            sizes.pop();
            sizes.extend([3, 3]);
        }
        _ => sizes.push(3),
    }
    sizes
}

fn prefer_threes(count: usize) -> Vec<usize> {
    let mut sizes = vec![3; count / 3];
    match count % 3 {
        0 => {}
        1 => {
            if let Some(last) = sizes.last_mut() {
                *last = 4;
            }
        }
        _ => sizes.push(2),
    }
    sizes
}

/// Partition `participants` into groups and seat their initial roles.
///
/// Participants are sliced in input order. With `auto_assign_roles` every
/// member gets the role of its seat (`speaker, listener, scribe, observer…`);
/// permanent observers keep their role and take no seat. Otherwise roles are
/// kept as given.
pub fn assign(
    participants: &[Participant],
    config: &GroupConfiguration,
    five: FivePersonChoice,
) -> Result<Vec<Group>, DomainError> {
    let sizes = group_sizes(participants.len(), config.group_size, five)?;

    if let Some(max) = config.max_groups
        && sizes.len() > max as usize
    {
        return Err(DomainError::invalid_configuration(format!(
            "{} participants need {} groups, more than the maximum of {}",
            participants.len(),
            sizes.len(),
            max
        )));
    }

    let mut groups = slice_into_groups(participants.to_vec(), &sizes);

    if config.auto_assign_roles {
        groups.iter_mut().for_each(seat_group);
    }
    if config.observer_strategy == ObserverStrategy::Central
        && groups.len() > 1
        && let Some(first) = groups.first_mut()
    {
        centralize_observers(first);
    }

    Ok(groups)
}

fn slice_into_groups(participants: Vec<Participant>, sizes: &[usize]) -> Vec<Group> {
    let mut remaining = participants.into_iter();
    sizes
        .iter()
        .enumerate()
        .map(|(index, &size)| {
            let members: Vec<Participant> = remaining.by_ref().take(size).collect();
            Group::new(GroupId::numbered(index + 1), members)
        })
        .collect()
}

/// Give every non-permanent member the role of its seat.
pub fn seat_group(group: &mut Group) {
    seat_participants(&mut group.participants);
}

fn seat_participants(participants: &mut [Participant]) {
    let seats = participants
        .iter()
        .filter(|p| p.role != Role::ObserverPermanent)
        .count();
    let ladder = seat_roles(seats);
    participants
        .iter_mut()
        .filter(|p| p.role != Role::ObserverPermanent)
        .zip(ladder)
        .for_each(|(participant, role)| participant.role = role);
}

/// Give unassigned members the ladder seats nobody holds yet.
///
/// Roles already chosen are kept. When chosen roles collide, members left
/// without an open seat become observers.
pub fn fill_open_seats(participants: &mut [Participant]) {
    let seats = participants
        .iter()
        .filter(|p| p.role != Role::ObserverPermanent)
        .count();
    let mut open = seat_roles(seats);
    for participant in participants.iter().filter(|p| p.role.rotates()) {
        if let Some(index) = open
            .iter()
            .position(|r| r.canonical_index() == participant.role.canonical_index())
        {
            open.remove(index);
        }
    }

    let mut open = open.into_iter();
    for participant in participants.iter_mut().filter(|p| !p.role.is_assigned()) {
        participant.role = open.next().unwrap_or(Role::Observer);
    }
}

fn centralize_observers(group: &mut Group) {
    const ACTIVE: [Role; 3] = [Role::Speaker, Role::Listener, Role::Scribe];
    for (index, participant) in group.participants.iter_mut().enumerate() {
        if !participant.role.is_observer() {
            participant.role = ACTIVE[index % ACTIVE.len()];
        }
    }
}

/// Randomly redistribute all members across the existing group sizes.
///
/// Group ids, sizes and per-group state stay where they are; only the
/// membership moves.
pub fn shuffle_groups<R: Rng + ?Sized>(groups: &mut [Group], rng: &mut R) {
    let sizes: Vec<usize> = groups.iter().map(Group::len).collect();
    let mut pool: Vec<Participant> = groups
        .iter_mut()
        .flat_map(|g| std::mem::take(&mut g.participants))
        .collect();
    pool.shuffle(rng);

    let mut remaining = pool.into_iter();
    for (group, size) in groups.iter_mut().zip(sizes) {
        group.participants = remaining.by_ref().take(size).collect();
    }
}

/// Fill in canonical roles missing from groups of four or more.
///
/// Missing roles go, in role-table order, to members whose role is a
/// duplicate or unassigned; groups that already hold every role are left
/// alone.
pub fn balance_roles(groups: &mut [Group]) {
    for group in groups.iter_mut().filter(|g| g.len() >= 4) {
        let mut missing: Vec<Role> = Role::CANONICAL
            .iter()
            .copied()
            .filter(|role| {
                !group
                    .participants
                    .iter()
                    .any(|p| p.role.canonical_index() == role.canonical_index())
            })
            .collect();
        if missing.is_empty() {
            continue;
        }
        missing.reverse();

        let mut seen = HashSet::new();
        for participant in group.participants.iter_mut() {
            if participant.role == Role::ObserverPermanent {
                continue;
            }
            let duplicate = !participant.role.is_assigned()
                || !seen.insert(participant.role.canonical_index());
            if duplicate && let Some(role) = missing.pop() {
                participant.role = role;
            }
        }
    }
}

/// Check a roster size against a configuration before running assignment.
pub fn validate_configuration(count: usize, config: &GroupConfiguration) -> ValidationReport {
    let mut errors = Vec::new();

    if count < 3 {
        errors.push("Minimum 3 participants required for group sessions".to_string());
    }
    if config.max_groups == Some(0) {
        errors.push("Maximum groups must be at least 1".to_string());
    }
    if config.group_size == GroupSize::Four && count < 4 {
        errors.push("At least 4 participants required for groups of 4".to_string());
    }
    if let Some(max) = config.max_groups
        && max > 0
        && let Ok(sizes) = group_sizes(count, config.group_size, FivePersonChoice::Split)
        && sizes.len() > max as usize
    {
        errors.push(format!(
            "{} participants need {} groups of {}, more than the maximum of {}",
            count,
            sizes.len(),
            config.group_size,
            max
        ));
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Whether `groups` hold every id in `roster` exactly once and nothing else.
pub fn is_partition(roster: &[ParticipantId], groups: &[Group]) -> bool {
    let mut seen = HashSet::new();
    for participant in groups.iter().flat_map(|g| g.participants.iter()) {
        if !seen.insert(&participant.id) {
            return false;
        }
    }
    seen.len() == roster.len() && roster.iter().all(|id| seen.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn roster(count: usize) -> Vec<Participant> {
        (0..count)
            .map(|i| Participant::new(format!("p{}", i), format!("P{}", i)))
            .collect()
    }

    fn ids(participants: &[Participant]) -> Vec<ParticipantId> {
        participants.iter().map(|p| p.id.clone()).collect()
    }

    fn sizes_of(groups: &[Group]) -> Vec<usize> {
        groups.iter().map(Group::len).collect()
    }

    fn roles_of(group: &Group) -> Vec<Role> {
        group.participants.iter().map(|p| p.role).collect()
    }

    // ==================== Group Sizes ====================

    #[test]
    fn test_eight_participants_by_preference() {
        let split = FivePersonChoice::Split;
        assert_eq!(group_sizes(8, GroupSize::Four, split).unwrap(), vec![4, 4]);
        assert_eq!(group_sizes(8, GroupSize::Three, split).unwrap(), vec![3, 3, 2]);
        assert_eq!(group_sizes(8, GroupSize::Mixed, split).unwrap(), vec![4, 4]);
    }

    #[test]
    fn test_four_preference_folds_remainders() {
        let split = FivePersonChoice::Split;
        assert_eq!(group_sizes(6, GroupSize::Four, split).unwrap(), vec![3, 3]);
        assert_eq!(group_sizes(7, GroupSize::Four, split).unwrap(), vec![4, 3]);
        assert_eq!(group_sizes(9, GroupSize::Four, split).unwrap(), vec![3, 3, 3]);
        assert_eq!(group_sizes(13, GroupSize::Four, split).unwrap(), vec![4, 3, 3, 3]);
    }

    #[test]
    fn test_three_preference_folds_remainders() {
        let split = FivePersonChoice::Split;
        assert_eq!(group_sizes(7, GroupSize::Three, split).unwrap(), vec![3, 4]);
        assert_eq!(group_sizes(10, GroupSize::Three, split).unwrap(), vec![3, 3, 4]);
        assert_eq!(group_sizes(12, GroupSize::Three, split).unwrap(), vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_every_roster_is_partitioned_within_bounds() {
        let config_for = |size| GroupConfiguration::default().with_group_size(size);
        for count in 2..=20 {
            for size in [GroupSize::Three, GroupSize::Four, GroupSize::Mixed] {
                let participants = roster(count);
                let groups =
                    assign(&participants, &config_for(size), FivePersonChoice::Split).unwrap();
                assert!(
                    is_partition(&ids(&participants), &groups),
                    "count {} size {}",
                    count,
                    size
                );
                for group in &groups {
                    assert!((2..=4).contains(&group.len()), "count {} size {}", count, size);
                }
            }
        }
    }

    #[test]
    fn test_single_participant_is_rejected() {
        let result = assign(&roster(1), &GroupConfiguration::default(), FivePersonChoice::Split);
        assert!(matches!(result, Err(DomainError::InvalidConfiguration(_))));
    }

    // ==================== Roles ====================

    #[test]
    fn test_small_rosters_get_one_group() {
        let config = GroupConfiguration::default();
        let groups = assign(&roster(2), &config, FivePersonChoice::Split).unwrap();
        assert_eq!(roles_of(&groups[0]), vec![Role::Speaker, Role::Listener]);

        let groups = assign(&roster(4), &config, FivePersonChoice::Split).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(roles_of(&groups[0]), Role::CANONICAL.to_vec());
    }

    #[test]
    fn test_pairs_only_hold_speaker_and_listener() {
        let config = GroupConfiguration::default().with_group_size(GroupSize::Three);
        for count in [5, 8, 11, 14] {
            let groups = assign(&roster(count), &config, FivePersonChoice::Split).unwrap();
            for group in groups.iter().filter(|g| g.len() == 2) {
                assert_eq!(roles_of(group), vec![Role::Speaker, Role::Listener]);
            }
        }
    }

    #[test]
    fn test_five_split_and_together() {
        let config = GroupConfiguration::default();
        let participants = roster(5);

        let split = assign(&participants, &config, FivePersonChoice::Split).unwrap();
        assert_eq!(sizes_of(&split), vec![2, 3]);
        assert_eq!(split[0].participants[0].id.as_str(), "p0");
        assert_eq!(split[0].participants[1].id.as_str(), "p1");

        let together = assign(&participants, &config, FivePersonChoice::Together).unwrap();
        assert_eq!(together.len(), 1);
        let observers = together[0]
            .participants
            .iter()
            .filter(|p| p.role == Role::Observer)
            .count();
        assert_eq!(observers, 2);
        assert_eq!(together[0].participants[0].role, Role::Speaker);
    }

    #[test]
    fn test_roles_kept_without_auto_assign() {
        let config = GroupConfiguration::default().with_auto_assign_roles(false);
        let mut participants = roster(3);
        participants[0].role = Role::Scribe;
        let groups = assign(&participants, &config, FivePersonChoice::Split).unwrap();
        assert_eq!(
            roles_of(&groups[0]),
            vec![Role::Scribe, Role::Unassigned, Role::Unassigned]
        );
    }

    #[test]
    fn test_permanent_observer_takes_no_seat() {
        let mut participants = roster(4);
        participants[0].role = Role::ObserverPermanent;
        let groups =
            assign(&participants, &GroupConfiguration::default(), FivePersonChoice::Split).unwrap();
        assert_eq!(
            roles_of(&groups[0]),
            vec![
                Role::ObserverPermanent,
                Role::Speaker,
                Role::Listener,
                Role::Scribe
            ]
        );
    }

    #[test]
    fn test_central_strategy_reseats_first_group() {
        let config = GroupConfiguration::default()
            .with_auto_assign_roles(false)
            .with_observer_strategy(ObserverStrategy::Central);
        let mut participants = roster(8);
        participants[3].role = Role::Observer;
        let groups = assign(&participants, &config, FivePersonChoice::Split).unwrap();
        assert_eq!(roles_of(&groups[0]), Role::CANONICAL.to_vec());
        assert!(groups[1].participants.iter().all(|p| p.role == Role::Unassigned));
    }

    #[test]
    fn test_max_groups_exceeded() {
        let config = GroupConfiguration::default().with_max_groups(2);
        let result = assign(&roster(12), &config, FivePersonChoice::Split);
        assert!(matches!(result, Err(DomainError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_fill_open_seats_keeps_choices() {
        let mut participants = roster(4);
        participants[1].role = Role::Speaker;
        participants[3].role = Role::Scribe;
        fill_open_seats(&mut participants);
        let roles: Vec<Role> = participants.iter().map(|p| p.role).collect();
        assert_eq!(
            roles,
            vec![Role::Listener, Role::Speaker, Role::Observer, Role::Scribe]
        );
    }

    // ==================== Shuffle / Balance ====================

    #[test]
    fn test_shuffle_preserves_sizes_and_ids() {
        let participants = roster(11);
        let mut groups =
            assign(&participants, &GroupConfiguration::default(), FivePersonChoice::Split).unwrap();
        let before = sizes_of(&groups);
        let mut rng = StdRng::seed_from_u64(7);

        shuffle_groups(&mut groups, &mut rng);

        assert_eq!(sizes_of(&groups), before);
        assert!(is_partition(&ids(&participants), &groups));
        assert_eq!(groups[0].group_id.as_str(), "group-1");
    }

    #[test]
    fn test_balance_fills_missing_roles() {
        let mut group = Group::new(
            GroupId::numbered(1),
            roster(4)
                .into_iter()
                .map(|p| p.with_role(Role::Speaker))
                .collect(),
        );
        group.participants[1].role = Role::Listener;
        let mut groups = vec![group];

        balance_roles(&mut groups);

        assert_eq!(
            roles_of(&groups[0]),
            vec![Role::Speaker, Role::Listener, Role::Scribe, Role::Observer]
        );
    }

    #[test]
    fn test_balance_ignores_small_groups() {
        let mut groups = vec![Group::new(
            GroupId::numbered(1),
            roster(3)
                .into_iter()
                .map(|p| p.with_role(Role::Speaker))
                .collect(),
        )];
        balance_roles(&mut groups);
        assert!(groups[0].participants.iter().all(|p| p.role == Role::Speaker));
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_configuration_messages() {
        let report = validate_configuration(2, &GroupConfiguration::default().with_max_groups(0));
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![
                "Minimum 3 participants required for group sessions".to_string(),
                "Maximum groups must be at least 1".to_string(),
                "At least 4 participants required for groups of 4".to_string(),
            ]
        );

        let report = validate_configuration(9, &GroupConfiguration::default());
        assert!(report.is_valid);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_validate_rejects_too_many_groups() {
        let config = GroupConfiguration::default()
            .with_group_size(GroupSize::Three)
            .with_max_groups(2);
        let report = validate_configuration(9, &config);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("more than the maximum of 2"));
    }
}
