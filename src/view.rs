// src/view.rs
//! Render model for the ranked result list, plus a plain-text rendering

use std::fmt::Write as _;

use crate::types::MatchResult;

pub const EMPTY_RESULTS_MESSAGE: &str = "Start an analysis to browse top matches.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultCard {
    pub title: String,
    pub score: i64,
    pub score_label: String,
    pub badge: BadgeTone,
    pub badge_text: String,
    pub skills: Vec<String>,
    pub resume_url: Option<String>,
    pub details: Vec<(&'static str, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsBody {
    Placeholder(&'static str),
    Cards(Vec<ResultCard>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResults {
    pub analyzing: bool,
    pub body: ResultsBody,
}

impl RenderedResults {
    pub fn cards(&self) -> &[ResultCard] {
        match &self.body {
            ResultsBody::Cards(cards) => cards.as_slice(),
            ResultsBody::Placeholder(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cards().is_empty()
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if self.analyzing {
            out.push_str("Analyzing...\n");
        }

        let cards = match &self.body {
            ResultsBody::Placeholder(message) => {
                out.push_str(message);
                out.push('\n');
                return out;
            }
            ResultsBody::Cards(cards) => cards,
        };

        for (i, card) in cards.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let marker = match card.badge {
                BadgeTone::Positive => '+',
                BadgeTone::Negative => '-',
            };
            let _ = writeln!(
                out,
                "{:>4}  {}  [{} {}]",
                card.score_label, card.title, marker, card.badge_text
            );
            if !card.skills.is_empty() {
                let _ = writeln!(out, "      skills: {}", card.skills.join(", "));
            }
            if !card.details.is_empty() {
                let details: Vec<String> = card
                    .details
                    .iter()
                    .map(|(label, value)| format!("{} {}", label, value))
                    .collect();
                let _ = writeln!(out, "      {}", details.join(" | "));
            }
            if let Some(url) = &card.resume_url {
                let _ = writeln!(out, "      view résumé: {}", url);
            }
        }
        out
    }
}

/// Build the card list. Order is kept exactly as given.
pub fn render(results: &[MatchResult], analyzing: bool) -> RenderedResults {
    let body = if results.is_empty() {
        ResultsBody::Placeholder(EMPTY_RESULTS_MESSAGE)
    } else {
        ResultsBody::Cards(
            results
                .iter()
                .enumerate()
                .map(|(i, result)| card(i, result))
                .collect(),
        )
    };
    RenderedResults { analyzing, body }
}

fn card(index: usize, result: &MatchResult) -> ResultCard {
    let title = result
        .filename
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("Candidate #{}", index + 1));
    let score = result.display_score();

    ResultCard {
        title,
        score,
        score_label: format!("{}%", score),
        badge: if result.eligibility.is_eligible() {
            BadgeTone::Positive
        } else {
            BadgeTone::Negative
        },
        badge_text: result.eligibility.label().to_string(),
        skills: result.matched_skills().to_vec(),
        resume_url: result.resume_file_url.clone(),
        details: details(result),
    }
}

fn details(result: &MatchResult) -> Vec<(&'static str, String)> {
    let d = &result.details;
    let percentages = [
        ("skills", d.skill_match),
        ("experience", d.experience_match),
        ("role", d.role_similarity),
        ("semantic", d.semantic_score),
    ];

    let mut out: Vec<(&'static str, String)> = percentages
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .filter(|v| v.is_finite())
                .map(|v| (label, format!("{}%", v.round() as i64)))
        })
        .collect();

    if let Some(years) = d.years_of_experience.filter(|v| v.is_finite()) {
        out.push(("years", format!("{}", years)));
    }
    out
}
