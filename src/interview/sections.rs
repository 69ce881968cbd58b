/// A fixed-choice question asked on the screener page.
#[derive(Debug)]
pub struct ScreenerQuestion {
    pub id: &'static str,
    pub options: &'static [&'static str],
}

impl ScreenerQuestion {
    pub fn accepts(&self, answer: &str) -> bool {
        self.options.contains(&answer)
    }
}

/// Coaching context for an open-ended section.
#[derive(Debug)]
pub struct Reflection {
    pub explainer: &'static str,
    pub focus: &'static str,
}

#[derive(Debug)]
pub enum SectionKind {
    Consent,
    Intro,
    Screener,
    Reflection(Reflection),
    Synthesis,
}

#[derive(Debug)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: SectionKind,
}

impl Section {
    pub fn reflection(&self) -> Option<&Reflection> {
        match &self.kind {
            SectionKind::Reflection(r) => Some(r),
            _ => None,
        }
    }
}

pub static SCREENER_QUESTIONS: [ScreenerQuestion; 3] = [
    ScreenerQuestion {
        id: "stage",
        options: &[
            "Student or just starting out",
            "Early career (1-5 years)",
            "Mid-career feeling stuck",
            "Senior looking for a change",
            "Career break, returning to work",
            "Exploring something completely new",
        ],
    },
    ScreenerQuestion {
        id: "trigger",
        options: &[
            "I feel trapped in my current situation",
            "I lack direction and don't know what I want",
            "I have a big decision to make",
            "Just curious and exploring",
            "I know I need a change but don't know how",
            "I want to understand my strengths better",
        ],
    },
    ScreenerQuestion {
        id: "energy",
        options: &[
            "Yes, I know what energizes me",
            "Sometimes, but not consistently",
            "No, not really",
            "I'm not sure what that would feel like",
        ],
    },
];

pub static SECTIONS: [Section; 9] = [
    Section {
        id: "consent",
        title: "Privacy & Consent",
        kind: SectionKind::Consent,
    },
    Section {
        id: "welcome",
        title: "Welcome to Pathlight",
        kind: SectionKind::Intro,
    },
    Section {
        id: "screener",
        title: "Let's Start Here",
        kind: SectionKind::Screener,
    },
    Section {
        id: "energy",
        title: "What Energizes You",
        kind: SectionKind::Reflection(Reflection {
            explainer: "Think about the tasks, projects and situations that make you feel alive, \
                        at work and outside it. Notice whether the doing or the result is what \
                        energizes you.",
            focus: "exploring what energizes and drains them across work and life",
        }),
    },
    Section {
        id: "strengths",
        title: "What You're Naturally Good At",
        kind: SectionKind::Reflection(Reflection {
            explainer: "What do people ask you for help with? What comes easily to you that \
                        others find hard?",
            focus: "identifying hidden strengths they undervalue",
        }),
    },
    Section {
        id: "wins",
        title: "Your Wins",
        kind: SectionKind::Reflection(Reflection {
            explainer: "Moments you are proud of, inside or outside work: challenges overcome, \
                        skills learned, people helped.",
            focus: "building confidence through past accomplishments",
        }),
    },
    Section {
        id: "unlimited",
        title: "Dream Without Limits",
        kind: SectionKind::Reflection(Reflection {
            explainer: "If money, time and responsibilities were handled, what would your work \
                        and life look like?",
            focus: "encouraging them to think beyond current constraints",
        }),
    },
    Section {
        id: "dealbreakers",
        title: "Your Deal-Breakers",
        kind: SectionKind::Reflection(Reflection {
            explainer: "Jobs, bosses and environments that made you dread Monday mornings, and \
                        what specifically drained you.",
            focus: "identifying non-negotiables from past negative experiences",
        }),
    },
    Section {
        id: "synthesis",
        title: "Your Pathways Forward",
        kind: SectionKind::Synthesis,
    },
];

pub const SYNTHESIS_SECTION_ID: &str = "synthesis";

pub fn screener_question(id: &str) -> Option<&'static ScreenerQuestion> {
    SCREENER_QUESTIONS.iter().find(|q| q.id == id)
}

pub fn reflection_sections() -> impl Iterator<Item = &'static Section> {
    SECTIONS.iter().filter(|s| s.reflection().is_some())
}
