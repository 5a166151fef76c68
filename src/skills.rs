//! Workspace skill discovery.
//!
//! Skills live under `<workspace>/.claude/skills/`, one directory per skill
//! containing a `SKILL.md` whose `---`-fenced front matter names and
//! describes it. Discovered skills are advertised on the agent card; a
//! missing or empty skills directory is not an error.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One skill entry as embedded in the agent card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEntry {
    /// Stable identifier derived from the directory name.
    pub id: String,
    /// Display name from front matter, or the title-cased directory name.
    pub name: String,
    /// Description from front matter.
    pub description: String,
    /// Tags; currently just the directory name.
    pub tags: Vec<String>,
    /// Example invocations (unused by discovery, kept for card shape).
    pub examples: Vec<String>,
    /// Accepted media types.
    pub input_modes: Vec<String>,
    /// Produced media types.
    pub output_modes: Vec<String>,
}

/// Name and description extracted from `SKILL.md` front matter.
struct FrontMatter {
    name: String,
    description: String,
}

/// Parse `---`-fenced front matter from the start of a skill file.
///
/// Only `name:` and `description:` keys are consulted; a missing fence
/// yields `None`. An absent `name` is tolerated — the caller falls back to
/// the directory name.
fn parse_front_matter(content: &str) -> Option<FrontMatter> {
    let rest = content.strip_prefix("---")?;
    let end = rest.find("\n---")?;

    let mut name = String::new();
    let mut description = String::new();
    for line in rest[..end].lines() {
        if let Some((key, value)) = line.split_once(':') {
            match key.trim() {
                "name" => name = value.trim().to_owned(),
                "description" => description = value.trim().to_owned(),
                _ => {}
            }
        }
    }

    Some(FrontMatter { name, description })
}

fn to_snake_case(name: &str) -> String {
    name.to_lowercase().replace('-', "_")
}

fn to_title_case(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scan `skills_dir` for skill directories and load their front matter.
///
/// Directories without a parseable `SKILL.md` are skipped with a log line;
/// a missing `skills_dir` yields an empty list.
#[must_use]
pub fn load_skills(skills_dir: &Path) -> Vec<SkillEntry> {
    let Ok(entries) = fs::read_dir(skills_dir) else {
        debug!(dir = %skills_dir.display(), "no skills directory; skipping discovery");
        return Vec::new();
    };

    let mut skills = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let skill_file = path.join("SKILL.md");
        let Ok(content) = fs::read_to_string(&skill_file) else {
            continue;
        };
        let dir_name = entry.file_name().to_string_lossy().into_owned();

        match parse_front_matter(&content) {
            Some(front) => {
                let name = if front.name.is_empty() {
                    to_title_case(&dir_name)
                } else {
                    front.name
                };
                skills.push(SkillEntry {
                    id: to_snake_case(&dir_name),
                    name,
                    description: front.description,
                    tags: vec![dir_name],
                    examples: Vec::new(),
                    input_modes: vec!["text/plain".to_owned()],
                    output_modes: vec!["text/plain".to_owned()],
                });
            }
            None => {
                warn!(
                    file = %skill_file.display(),
                    "skill file has no usable front matter; skipping"
                );
            }
        }
    }

    skills.sort_by(|a, b| a.id.cmp(&b.id));
    skills
}
