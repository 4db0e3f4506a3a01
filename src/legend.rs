//! Header and legend text printed alongside the traces.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Global measurements reported by the acquisition device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    pub rr_interval_ms: Option<u32>,
    pub pr_interval_ms: Option<u32>,
    pub qrs_duration_ms: Option<u32>,
    pub qt_interval_ms: Option<u32>,
    pub qtc_interval_ms: Option<u32>,
    pub p_axis: Option<i32>,
    pub qrs_axis: Option<i32>,
    pub t_axis: Option<i32>,
}

impl Measurements {
    /// Ventricular rate from the RR interval, in beats per minute.
    pub fn ventricular_rate_bpm(&self) -> Option<u32> {
        self.rr_interval_ms
            .filter(|&rr| rr > 0)
            .map(|rr| 60_000 / rr)
    }
}

/// Multi-line legend; lines whose inputs are missing are left out.
pub fn compose_legend(m: &Measurements) -> String {
    let mut lines = Vec::new();

    if let Some(bpm) = m.ventricular_rate_bpm() {
        lines.push(format!("Ventr. Freq.: {} BPM", bpm));
    }
    if let Some(pr) = m.pr_interval_ms {
        lines.push(format!("PR Interval: {} ms", pr));
    }
    if let Some(qrs) = m.qrs_duration_ms {
        lines.push(format!("QRS Duration: {} ms", qrs));
    }
    if let (Some(qt), Some(qtc)) = (m.qt_interval_ms, m.qtc_interval_ms) {
        lines.push(format!("QT/QTc: {}/{} ms", qt, qtc));
    }
    if let (Some(p), Some(qrs), Some(t)) = (m.p_axis, m.qrs_axis, m.t_axis) {
        lines.push(format!("P-R-T Axis: {} {} {}", p, qrs, t));
    }

    lines.join("\n")
}

/// Patient identification block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientHeader {
    /// Caret separated, e.g. "ROSSI^mario"
    pub name: String,
    pub id: String,
    pub sex: String,
    /// Acquisition timestamp as YYYYMMDDhhmmss
    pub acquired: Option<String>,
}

impl PatientHeader {
    /// "SURNAME First" from a caret-separated name.
    ///
    /// Anything other than exactly one caret is shown verbatim.
    pub fn display_name(&self) -> String {
        let mut parts = self.name.split('^');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(surname), Some(given), None) => format!("{} {}", surname, title_case(given))
                .trim()
                .to_string(),
            _ => self.name.clone(),
        }
    }

    pub fn identity_line(&self) -> String {
        format!("{} ({}) sex: {}", self.display_name(), self.id, self.sex)
    }

    /// "ECG date: 05 Mar 2014 09:41", or `None` unless the timestamp is a
    /// valid `YYYYMMDDhhmmss` calendar time.
    pub fn date_line(&self) -> Option<String> {
        let stamp = self.acquired.as_deref()?;
        let acquired = NaiveDateTime::parse_from_str(stamp.trim(), "%Y%m%d%H%M%S").ok()?;
        Some(format!("ECG date: {}", acquired.format("%d %b %Y %H:%M")))
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
