//! Console output formatter for sessions, plans and group dashboards

use colored::Colorize;
use dialogos_domain::{
    AggregateOutcome, Group, GroupConfiguration, GroupProgress, Participant, PhaseChange, Session,
    ValidationReport,
};

/// Formats dialogos results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    // ==================== Planning ====================

    /// Format a group plan with each member's seat
    pub fn format_plan(groups: &[Group], config: &GroupConfiguration) -> String {
        let mut output = String::new();
        let count: usize = groups.iter().map(Group::len).sum();

        output.push_str(&Self::header("Group Plan"));
        output.push('\n');
        output.push_str(&format!(
            "{} {} in {} group(s)\n",
            "Participants:".cyan().bold(),
            count,
            groups.len()
        ));
        output.push_str(&format!(
            "{} size {}, observers {:?}, rotation {:?}\n",
            "Configuration:".cyan().bold(),
            config.group_size,
            config.observer_strategy,
            config.group_rotation
        ));

        for group in groups {
            output.push_str(&Self::section_header(&format!(
                "{} ({} members)",
                group.group_id,
                group.len()
            )));
            for participant in &group.participants {
                output.push_str(&Self::participant_line(participant));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    pub fn format_plan_json(groups: &[Group]) -> String {
        serde_json::to_string_pretty(groups).unwrap_or_else(|_| "[]".to_string())
    }

    /// Format the result of validating a roster size
    pub fn format_validation(count: usize, report: &ValidationReport) -> String {
        if report.is_valid {
            return format!(
                "{} {} participants fit the configuration\n",
                "OK".green().bold(),
                count
            );
        }

        let mut output = format!(
            "{} {} participants do not fit the configuration\n",
            "INVALID".red().bold(),
            count
        );
        for error in &report.errors {
            output.push_str(&format!("  * {}\n", error));
        }
        output
    }

    pub fn format_validation_json(report: &ValidationReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    // ==================== Sessions ====================

    /// Format a session summary: status, roster, groups and notes
    pub fn format_session(session: &Session) -> String {
        let mut output = String::new();

        output.push_str(&Self::header(&session.name));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Session:".cyan().bold(), session.session_id));
        if let Some(topic) = &session.topic {
            output.push_str(&format!("{} {}\n", "Topic:".cyan().bold(), topic));
        }
        output.push_str(&format!(
            "{} {} ({}, {})\n",
            "Status:".cyan().bold(),
            session.status,
            session.variant,
            session.group_mode.as_str()
        ));
        output.push_str(&format!(
            "{} {} (round {})\n",
            "Phase:".cyan().bold(),
            session.current_phase.display_name(),
            session.current_round
        ));

        if session.groups.is_empty() {
            output.push_str(&Self::section_header("Participants"));
            for participant in &session.participants {
                output.push_str(&Self::participant_line(participant));
            }
        } else {
            for group in &session.groups {
                output.push_str(&Self::section_header(&format!(
                    "{} [{}] {} (round {})",
                    group.group_id,
                    group.status,
                    group.current_phase.display_name(),
                    group.round_number
                )));
                for participant in &group.participants {
                    output.push_str(&Self::participant_line(participant));
                }
                let notes = group.scribe_notes.accumulated.trim();
                if !notes.is_empty() {
                    output.push_str(&format!(
                        "\n{}\n{}\n",
                        "Notes:".yellow().bold(),
                        Self::indent(notes, "  ")
                    ));
                }
            }
        }

        let notes = session.accumulated_scribe_notes().trim();
        if session.groups.is_empty() && !notes.is_empty() {
            output.push_str(&Self::section_header("Scribe Notes"));
            output.push_str(&Self::indent(notes, "  "));
            output.push('\n');
        }

        output.push_str(&Self::footer());
        output
    }

    pub fn format_session_json(session: &Session) -> String {
        serde_json::to_string_pretty(session).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line per stored session
    pub fn format_session_list(sessions: &[Session]) -> String {
        if sessions.is_empty() {
            return format!("{}\n", "No sessions stored.".dimmed());
        }

        let mut output = String::new();
        for session in sessions {
            output.push_str(&format!(
                "{}  {:<10} {:<24} v{}  {}\n",
                session.session_id.as_str().yellow(),
                session.status.as_str(),
                session.name,
                session.version,
                session.created_at.format("%Y-%m-%d %H:%M")
            ));
        }
        output
    }

    pub fn format_session_list_json(sessions: &[Session]) -> String {
        serde_json::to_string_pretty(sessions).unwrap_or_else(|_| "[]".to_string())
    }

    // ==================== Progress ====================

    /// Format a phase transition as a single step line
    pub fn format_step(scope: &str, change: &PhaseChange) -> String {
        if !change.applied {
            return format!("{} {}\n", format!("[{}]", scope).dimmed(), "no change".dimmed());
        }

        let mut line = format!(
            "{} {} {} {} (round {})",
            format!("[{}]", scope).yellow().bold(),
            change.from.display_name(),
            "->".dimmed(),
            change.to.display_name().bold(),
            change.round
        );
        if change.notes_flushed {
            line.push_str(&format!(" {}", "notes saved".green()));
        }
        if change.rotated {
            line.push_str(&format!(" {}", "roles rotated".cyan()));
        }
        line.push('\n');
        line
    }

    /// Format the per-group dashboard
    pub fn format_progress(progress: &[GroupProgress]) -> String {
        let mut output = Self::section_header("Group Progress");
        for group in progress {
            output.push_str(&format!(
                "  {:<10} {:<9} {:<22} {}/{} rounds  {} members\n",
                group.group_id.as_str().bold(),
                group.status.as_str(),
                group.phase.display_name(),
                group.completed_rounds,
                group.total_rounds,
                group.participant_count
            ));
        }
        output
    }

    pub fn format_progress_json(progress: &[GroupProgress]) -> String {
        serde_json::to_string_pretty(progress).unwrap_or_else(|_| "[]".to_string())
    }

    /// Format the result of an all-groups operation
    pub fn format_aggregate(verb: &str, outcome: &AggregateOutcome) -> String {
        let status = if outcome.is_complete_success() {
            "OK".green().bold()
        } else {
            "PARTIAL".yellow().bold()
        };
        let mut output = format!(
            "{} {} all groups: {} changed, {} failed\n",
            status,
            verb,
            outcome.changed(),
            outcome.failed.len()
        );
        for (group_id, error) in &outcome.failed {
            output.push_str(&format!("  {} {}: {}\n", "x".red(), group_id, error));
        }
        output
    }

    // ==================== Helpers ====================

    fn participant_line(participant: &Participant) -> String {
        let hand = if participant.hand_raised { " (hand raised)" } else { "" };
        format!(
            "  {:<20} {:<10} {}{}\n",
            participant.name,
            participant.role.display_name(),
            participant.status.as_str().dimmed(),
            hand
        )
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogos_domain::{
        ActorContext, DomainError, FivePersonChoice, GroupId, GroupStatus, GroupStatusChange, Phase,
        SessionConfig, SessionId, assign, validate_configuration,
    };

    fn roster(count: usize) -> Vec<Participant> {
        (1..=count)
            .map(|i| Participant::new(format!("p{}", i), format!("Participant {}", i)))
            .collect()
    }

    #[test]
    fn test_format_plan_lists_every_member() {
        colored::control::set_override(false);
        let config = GroupConfiguration::default();
        let groups = assign(&roster(7), &config, FivePersonChoice::Split).unwrap();

        let output = ConsoleFormatter::format_plan(&groups, &config);
        assert!(output.contains("7 in 2 group(s)"));
        assert!(output.contains("group-1 (4 members)"));
        assert!(output.contains("group-2 (3 members)"));
        assert!(output.contains("Participant 7"));
        assert!(output.contains("Speaker"));
    }

    #[test]
    fn test_format_plan_json_is_camel_case() {
        let groups = assign(&roster(3), &GroupConfiguration::default(), FivePersonChoice::Split).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&ConsoleFormatter::format_plan_json(&groups)).unwrap();
        assert_eq!(json[0]["groupId"], "group-1");
        assert_eq!(json[0]["participants"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_format_validation() {
        colored::control::set_override(false);
        let ok = validate_configuration(6, &GroupConfiguration::default());
        assert!(ConsoleFormatter::format_validation(6, &ok).starts_with("OK"));

        let bad = validate_configuration(1, &GroupConfiguration::default());
        let output = ConsoleFormatter::format_validation(1, &bad);
        assert!(output.starts_with("INVALID"));
        assert!(output.contains("  * "));
    }

    #[test]
    fn test_format_session_shows_roster_and_phase() {
        colored::control::set_override(false);
        let ctx = ActorContext::now("host");
        let mut session = Session::create(
            SessionId::new("s1"),
            "Hana",
            SessionConfig::new("Practice").with_topic("Listening"),
            &ctx,
        )
        .unwrap();
        session
            .join(&ActorContext::now("guest"), "Gil", dialogos_domain::Role::Unassigned)
            .unwrap();

        let output = ConsoleFormatter::format_session(&session);
        assert!(output.contains("Practice"));
        assert!(output.contains("Topic: Listening"));
        assert!(output.contains("Hana"));
        assert!(output.contains("Gil"));
        assert!(output.contains(Phase::TopicSelection.display_name()));
    }

    #[test]
    fn test_format_step_marks_rotation() {
        colored::control::set_override(false);
        let change = PhaseChange {
            from: Phase::Listening,
            to: Phase::Transition,
            round: 2,
            rotated: true,
            notes_flushed: true,
            flushed_round: Some(1),
            applied: true,
        };
        let line = ConsoleFormatter::format_step("session", &change);
        assert!(line.contains("round 2"));
        assert!(line.contains("notes saved"));
        assert!(line.contains("roles rotated"));
    }

    #[test]
    fn test_format_aggregate_lists_failures() {
        colored::control::set_override(false);
        let outcome = AggregateOutcome {
            succeeded: vec![GroupStatusChange {
                group_id: GroupId::numbered(1),
                from: GroupStatus::Active,
                to: GroupStatus::Paused,
                applied: true,
            }],
            failed: vec![(
                GroupId::numbered(2),
                DomainError::InvalidTransition {
                    action: "pause the group",
                    phase: Phase::HelloCheckin,
                },
            )],
        };
        let output = ConsoleFormatter::format_aggregate("pause", &outcome);
        assert!(output.starts_with("PARTIAL"));
        assert!(output.contains("1 changed, 1 failed"));
        assert!(output.contains("group-2"));
    }

    #[test]
    fn test_empty_session_list() {
        colored::control::set_override(false);
        assert!(ConsoleFormatter::format_session_list(&[]).contains("No sessions"));
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "> "), "> a\n> b");
    }
}
