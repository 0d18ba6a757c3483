//! Prompt classification: an ordered, first-match-wins rule list mapping
//! prompt text to a task type, plus the derived complexity and archival
//! heuristics. Everything here is pure so it can be tested in isolation.

use crate::core::status::types::{ArchivePriority, TaskType};

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub task_type: TaskType,
    pub complexity_score: u8,
    pub should_archive: bool,
    pub archive_priority: ArchivePriority,
    pub archive_tags: Vec<String>,
}

struct Rule {
    tag: &'static str,
    keywords: &'static [&'static str],
    task_type: TaskType,
}

/// Order matters: the first rule with a keyword hit wins. Git before file
/// ops so "commit the file changes" lands on git_operation; codegen last
/// among the specific rules because its keywords are the most generic.
const RULES: &[Rule] = &[
    Rule {
        tag: "git",
        keywords: &[
            "git ", "commit", "branch", "merge", "rebase", "pull request", "push ",
        ],
        task_type: TaskType::GitOperation,
    },
    Rule {
        tag: "terminal",
        keywords: &["run command", "shell", "terminal", "execute "],
        task_type: TaskType::TerminalCommand,
    },
    Rule {
        tag: "search",
        keywords: &["search", "find ", "grep", "locate", "look for"],
        task_type: TaskType::Search,
    },
    Rule {
        tag: "analysis",
        keywords: &[
            "analyze", "analyse", "review", "explain", "audit", "investigate", "summarize",
        ],
        task_type: TaskType::Analysis,
    },
    Rule {
        tag: "file",
        keywords: &[
            "create file", "create a file", "edit file", "write file", "delete file", "rename",
            "file", "folder", "directory",
        ],
        task_type: TaskType::FileOperation,
    },
    Rule {
        tag: "codegen",
        keywords: &[
            "implement", "generate", "refactor", "fix ", "build", "code", "function", "class ",
            "test", "bug",
        ],
        task_type: TaskType::CodeGeneration,
    },
];

const MULTI_STEP_CONNECTIVES: &[&str] = &[" then ", " after ", " finally ", " afterwards "];

const MAX_COMPLEXITY: u8 = 10;
const MULTI_STEP_BUMP: u8 = 2;

fn detect_multi_step(lower: &str) -> bool {
    MULTI_STEP_CONNECTIVES.iter().any(|c| lower.contains(c))
}

fn base_complexity(prompt: &str) -> u8 {
    ((prompt.len() / 100) + 1).min(MAX_COMPLEXITY as usize) as u8
}

/// Deterministic keyword classification of a prompt.
pub fn classify(prompt: &str) -> Classification {
    let lower = prompt.to_lowercase();

    let matched = RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lower.contains(k)));

    let multi_step = detect_multi_step(&lower);
    let task_type = if multi_step {
        TaskType::MultiStep
    } else {
        matched.map(|r| r.task_type).unwrap_or(TaskType::Other)
    };

    let mut complexity_score = base_complexity(prompt);
    if multi_step {
        complexity_score = complexity_score.saturating_add(MULTI_STEP_BUMP).min(MAX_COMPLEXITY);
    }

    let should_archive = complexity_score >= 5
        || matches!(task_type, TaskType::CodeGeneration | TaskType::MultiStep);
    let archive_priority = if complexity_score >= 8 {
        ArchivePriority::High
    } else if complexity_score >= 5 {
        ArchivePriority::Medium
    } else {
        ArchivePriority::Low
    };

    let mut archive_tags = vec![task_type.as_str().to_string()];
    if let Some(rule) = matched {
        if rule.task_type != task_type {
            // Multi-step override: keep the underlying rule tag too
            archive_tags.push(rule.tag.to_string());
        }
    }
    if multi_step {
        archive_tags.push("multi_step".to_string());
    }
    archive_tags.dedup();

    Classification {
        task_type,
        complexity_score,
        should_archive,
        archive_priority,
        archive_tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_deterministic() {
        let prompt = "Create file x.txt with a greeting";
        let a = classify(prompt);
        let b = classify(prompt);
        assert_eq!(a, b);
        assert_eq!(a.task_type, TaskType::FileOperation);
    }

    #[test]
    fn first_matching_rule_wins() {
        // "commit" (git) and "file" (file ops) both hit; git is earlier.
        let c = classify("Commit the file changes to the repo");
        assert_eq!(c.task_type, TaskType::GitOperation);
    }

    #[test]
    fn connectives_force_multi_step_and_bump_complexity() {
        let plain = classify("Implement the parser");
        let chained = classify("Implement the parser then add tests");
        assert_eq!(plain.task_type, TaskType::CodeGeneration);
        assert_eq!(chained.task_type, TaskType::MultiStep);
        assert_eq!(
            chained.complexity_score,
            plain.complexity_score + MULTI_STEP_BUMP
        );
        assert!(chained.archive_tags.contains(&"multi_step".to_string()));
    }

    #[test]
    fn complexity_scales_with_length_and_clamps() {
        assert_eq!(classify("short").complexity_score, 1);
        let medium = "a".repeat(250);
        assert_eq!(classify(&medium).complexity_score, 3);
        let huge = "a".repeat(5000);
        assert_eq!(classify(&huge).complexity_score, 10);
        // Bump cannot push past the ceiling
        let huge_chained = format!("{} then more", "a".repeat(5000));
        assert_eq!(classify(&huge_chained).complexity_score, 10);
    }

    #[test]
    fn unmatched_prompt_is_other() {
        let c = classify("hello");
        assert_eq!(c.task_type, TaskType::Other);
        assert!(!c.should_archive);
        assert_eq!(c.archive_priority, ArchivePriority::Low);
    }

    #[test]
    fn archive_priority_tracks_complexity() {
        let high = classify(&"implement ".repeat(100));
        assert_eq!(high.archive_priority, ArchivePriority::High);
        assert!(high.should_archive);

        let medium = classify(&format!("analyze {}", "x".repeat(450)));
        assert_eq!(medium.archive_priority, ArchivePriority::Medium);
    }
}
