use serde::{Deserialize, Serialize};

/// One league table row, as computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub rank: u32,
    pub team_id: u32,
    pub team_name: String,
    #[serde(default)]
    pub team_logo: Option<String>,
    #[serde(default)]
    pub points: i32,
    #[serde(default)]
    pub played: u32,
    #[serde(default)]
    pub won: u32,
    #[serde(default)]
    pub drawn: u32,
    #[serde(default)]
    pub lost: u32,
    #[serde(default)]
    pub goals_for: u32,
    #[serde(default)]
    pub goals_against: u32,
    #[serde(default)]
    pub goal_difference: i32,
    #[serde(default)]
    pub form: Option<String>,
}

impl StandingRow {
    pub fn form_results(&self) -> Vec<FormResult> {
        self.form.as_deref().map(parse_form).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Continental,
    Mid,
    Relegation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
}

/// Top four qualify; the bottom three go down. Top-four wins on tiny tables.
pub fn zone(rank: u32, table_len: usize) -> Zone {
    let len = table_len as u32;
    if rank <= 4 {
        Zone::Continental
    } else if len >= 2 && rank >= len - 2 {
        Zone::Relegation
    } else {
        Zone::Mid
    }
}

pub fn medal(rank: u32) -> Option<Medal> {
    match rank {
        1 => Some(Medal::Gold),
        2 => Some(Medal::Silver),
        3 => Some(Medal::Bronze),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormResult {
    Win,
    Draw,
    Loss,
}

impl FormResult {
    pub fn letter(self) -> char {
        match self {
            FormResult::Win => 'W',
            FormResult::Draw => 'D',
            FormResult::Loss => 'L',
        }
    }
}

const FORM_WINDOW: usize = 5;

/// Accepts `"W,D,L"` or `"WDL"`; unknown letters are skipped. Keeps the
/// last five results, oldest first.
pub fn parse_form(raw: &str) -> Vec<FormResult> {
    let results: Vec<FormResult> = raw
        .chars()
        .filter_map(|c| match c.to_ascii_uppercase() {
            'W' => Some(FormResult::Win),
            'D' => Some(FormResult::Draw),
            'L' => Some(FormResult::Loss),
            _ => None,
        })
        .collect();
    let skip = results.len().saturating_sub(FORM_WINDOW);
    results[skip..].to_vec()
}

pub fn form_string(results: &[FormResult]) -> String {
    results.iter().map(|r| r.letter()).collect()
}
