//! Prompt assembly for section replies and the final synthesis.

use std::collections::BTreeMap;
use std::fmt::Write;

use super::sections::{Reflection, SCREENER_QUESTIONS, Section, reflection_sections};
use super::state::{JourneyState, Role};

pub const SYNTHESIS_REQUEST: &str = "Please create my Pathways Forward report.";

fn answer<'a>(answers: &'a BTreeMap<String, String>, id: &str) -> &'a str {
    answers.get(id).map(String::as_str).unwrap_or("unknown")
}

/// System instruction for automated reply number `reply_number` (1-based)
/// out of `max_replies` in a reflection section.
pub fn reply_system_prompt(
    section: &Section,
    reflection: &Reflection,
    answers: &BTreeMap<String, String>,
    reply_number: u32,
    max_replies: u32,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are a warm, direct career coach. Keep responses SHORT and conversational.\n"
    );
    let _ = writeln!(
        prompt,
        "Current section: \"{}\" - {}",
        section.title, reflection.focus
    );
    let _ = writeln!(prompt, "Section explainer: {}\n", reflection.explainer);
    let _ = writeln!(prompt, "Context about this person:");
    let _ = writeln!(prompt, "- Career stage: {}", answer(answers, "stage"));
    let _ = writeln!(prompt, "- What brought them here: {}", answer(answers, "trigger"));
    let _ = writeln!(prompt, "- Energy awareness: {}\n", answer(answers, "energy"));
    let _ = writeln!(
        prompt,
        "CRITICAL: This is response {} of {}.\n",
        reply_number, max_replies
    );

    if section.id == "energy" {
        prompt.push_str(
            "Ask about both work and life examples. Probe whether they enjoy the doing or the \
             result, and listen for commercial drive versus craft drive.\n\n",
        );
    }

    if reply_number >= max_replies {
        prompt.push_str(
            "This is your FINAL response. Use 2-3 sentences: name one pattern you noticed, \
             reference specific things they said, and end warmly by inviting them to add more \
             or continue. Do NOT ask more questions.",
        );
    } else {
        prompt.push_str(
            "Reply in 1-2 sentences plus ONE focused question asking for a concrete example of \
             what they were actually doing. End with: \"The more specific, the better.\"",
        );
    }

    prompt
}

/// Screener answers followed by every user message of every reflection
/// section, in catalog order. Assistant replies are left out.
pub fn synthesis_digest(state: &JourneyState) -> String {
    let mut digest = String::from("Screener Context:\n");
    for question in &SCREENER_QUESTIONS {
        let label = match question.id {
            "stage" => "Career stage",
            "trigger" => "What brought them",
            _ => "Energy awareness",
        };
        let _ = writeln!(
            digest,
            "- {}: {}",
            label,
            answer(&state.screener_answers, question.id)
        );
    }
    digest.push('\n');

    for section in reflection_sections() {
        let Some(messages) = state.conversations.get(section.id) else {
            continue;
        };
        let _ = writeln!(digest, "\n{}:", section.title);
        for message in messages.iter().filter(|m| m.role == Role::User) {
            let _ = writeln!(digest, "- {}", message.content);
        }
    }

    digest
}

pub fn synthesis_system_prompt(digest: &str) -> String {
    format!(
        "You are creating a personalized career clarity report called \"Your Pathways Forward.\"

Here's everything this person shared:
{digest}

Use warm, second-person language and reference specific things they said. Note whether they \
seem commercially driven, craft driven or in between, and let that guide the role territories.

FORMAT AS MARKDOWN with exactly these headers:

# Your Pathways Forward

## Your Profile

A narrative of about 250 words.

## Your Superpowers

3-4 superpowers, each as:
### **[Concrete Superpower Name]**

2-3 sentence description.

*How to deploy this:*
- **This week:** ...
- **In interviews:** ...
- **Roles that leverage this:** ...
- **Why it's valuable:** ...

**Why these matter together:**
2-3 sentences.

**Your unique value proposition:**
\"One sentence in quotes.\"

## Your Deal-Breakers

At most 3 short points per category:
**❌ About the work:**
- ...

**❌ What comes with the job:**
- ...

**❌ About leadership:**
- ...

**❌ About the environment:**
- ...

## Role Territories to Explore

5-7 territories, each starting with a bold **Territory Name** followed by why it fits, a \
realistic salary range, what transfers, search terms and which deal-breakers it respects.

## Next Three Steps

1. **This week:** ...
2. **This month:** ...
3. **Next 90 days:** ..."
    )
}
