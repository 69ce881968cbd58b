//! Best-effort extraction of display fields from the synthesis markdown.
//!
//! Nothing here fails: a header or marker the model left out simply leaves
//! the matching field empty.

use serde::Serialize;

const HOW_TO_MARKER: &str = "*How to deploy this:*";
const WHY_TOGETHER_MARKER: &str = "**Why these matter together:**";
const VALUE_PROP_MARKER: &str = "**Your unique value proposition:**";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Superpower {
    pub name: String,
    pub description: String,
    pub how_to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DealBreakers {
    pub work: Vec<String>,
    pub job: Vec<String>,
    pub leadership: Vec<String>,
    pub environment: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Territory {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NextStep {
    pub timeframe: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SynthesisReport {
    pub profile: String,
    pub superpowers: Vec<Superpower>,
    pub why_together: String,
    pub value_proposition: String,
    pub deal_breakers: DealBreakers,
    pub territories: Vec<Territory>,
    pub next_steps: Vec<NextStep>,
}

impl SynthesisReport {
    pub fn parse(content: &str) -> Self {
        let content = content.replace("\r\n", "\n");
        let mut report = SynthesisReport::default();

        if let Some(profile) = section(&content, "Your Profile") {
            report.profile = profile.trim().to_string();
        }

        if let Some(text) = section(&content, "Your Superpowers") {
            report.superpowers = superpowers(text);
            if let Some(why) = between(text, WHY_TOGETHER_MARKER, &[VALUE_PROP_MARKER]) {
                report.why_together = why.trim().to_string();
            }
            report.value_proposition = value_proposition(text).unwrap_or_default();
        }

        if let Some(text) = section(&content, "Your Deal-Breakers") {
            let list = |label: &str| bullets(between(text, label, &["\n**❌"]).unwrap_or(""));
            report.deal_breakers = DealBreakers {
                work: list("**❌ About the work:**"),
                job: list("**❌ What comes with the job:**"),
                leadership: list("**❌ About leadership:**"),
                environment: list("**❌ About the environment:**"),
            };
        }

        if let Some(text) = section(&content, "Role Territories to Explore") {
            report.territories = territories(text);
        }

        if let Some(text) = section(&content, "Next Three Steps") {
            report.next_steps = next_steps(text);
        }

        report
    }
}

/// Body of the `## header` section, up to the next `## ` header.
fn section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let marker = format!("## {}\n", header);
    let start = content.find(&marker)? + marker.len();
    let rest = &content[start..];
    let end = rest.find("\n## ").unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Text after `start`, cut at the earliest of `ends`.
fn between<'a>(text: &'a str, start: &str, ends: &[&str]) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let rest = &text[from..];
    let end = ends
        .iter()
        .filter_map(|e| rest.find(e))
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// First `**bold**` span in `text`, with the byte offset just past it.
fn bold(text: &str) -> Option<(&str, usize)> {
    let open = text.find("**")? + 2;
    let close = open + text[open..].find("**")?;
    let name = &text[open..close];
    if name.is_empty() {
        return None;
    }
    Some((name, close + 2))
}

fn bullets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| l.starts_with('-'))
        .map(str::to_string)
        .collect()
}

fn superpowers(text: &str) -> Vec<Superpower> {
    let mut found = Vec::new();
    let text = text.strip_prefix('\n').unwrap_or(text);

    for block in text.split("\n### ") {
        let block = block.strip_prefix("### ").unwrap_or(block);
        let mut lines = block.lines();
        let Some((name, _)) = lines.next().and_then(bold) else {
            continue;
        };
        if name.contains("Why these matter") || name.contains("Your unique value") {
            continue;
        }

        let description = lines
            .take_while(|l| !l.contains(HOW_TO_MARKER))
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let how_to = between(block, HOW_TO_MARKER, &["**Why these matter"])
            .map(str::trim)
            .unwrap_or("");

        if !description.is_empty() && !how_to.is_empty() {
            found.push(Superpower {
                name: name.to_string(),
                description,
                how_to: how_to.to_string(),
            });
        }
    }

    found
}

fn value_proposition(text: &str) -> Option<String> {
    let rest = between(text, VALUE_PROP_MARKER, &[])?;
    let open = rest.find('"')? + 1;
    let close = open + rest[open..].find('"')?;
    Some(rest[open..close].to_string())
}

fn territories(text: &str) -> Vec<Territory> {
    let mut blocks: Vec<String> = Vec::new();
    for line in text.lines() {
        let starts_block = line
            .strip_prefix("**")
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_uppercase());
        match blocks.last_mut() {
            Some(block) if !starts_block => {
                block.push('\n');
                block.push_str(line);
            }
            _ => blocks.push(line.to_string()),
        }
    }

    blocks
        .iter()
        .filter(|block| block.len() > 50)
        .filter_map(|block| {
            let (name, end) = bold(block)?;
            Some(Territory {
                name: name.to_string(),
                content: block[end..].trim().to_string(),
            })
        })
        .collect()
}

fn next_steps(text: &str) -> Vec<NextStep> {
    let mut steps: Vec<NextStep> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
        let numbered = digits > 0 && trimmed[digits..].starts_with('.');

        if numbered {
            let body = trimmed[digits + 1..].trim_start();
            if let Some(after_open) = body.strip_prefix("**") {
                if let Some(close) = after_open.find("**") {
                    let action = after_open[close + 2..]
                        .trim_start_matches(|c: char| c == ':' || c.is_whitespace());
                    steps.push(NextStep {
                        timeframe: after_open[..close].trim_end_matches(':').to_string(),
                        action: action.to_string(),
                    });
                    continue;
                }
            }
        }

        if let Some(step) = steps.last_mut() {
            step.action.push('\n');
            step.action.push_str(line);
        }
    }

    for step in &mut steps {
        step.action = step.action.trim().to_string();
    }
    steps
}
