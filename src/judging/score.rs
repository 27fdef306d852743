//! Judge scorecards and match summaries.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    config::{CategorySpec, JudgingConfig},
    types::{JudgeId, Side, UnixSecs},
};

use super::model::{CategoryScore, Decision, JudgeRecord, MatchRecord, MatchSummary, Totals, WinnerCounts};

/// Slider values as submitted, before sanitizing.
pub type RawSliders = BTreeMap<String, Value>;

const WAITING: &str = "Waiting for judges scores...";

/// Clamps each configured category into `[0, max]`. Missing or non-numeric
/// values fall back to the category midpoint; unknown keys are dropped.
pub fn sanitize_sliders(config: &JudgingConfig, raw: &RawSliders) -> BTreeMap<String, u32> {
    config
        .categories
        .iter()
        .map(|spec| (spec.key.clone(), slider_value(raw.get(&spec.key), spec)))
        .collect()
}

fn slider_value(value: Option<&Value>, spec: &CategorySpec) -> u32 {
    match value.and_then(parse_slider) {
        Some(v) => v.clamp(0, i64::from(spec.max)) as u32,
        None => spec.midpoint(),
    }
}

fn parse_slider(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Builds a judge's scorecard: the slider is the red share of each category,
/// white gets the remainder.
pub fn score_judge(
    config: &JudgingConfig,
    judge_id: JudgeId,
    raw: &RawSliders,
    judge_name: &str,
    submitted_at: UnixSecs,
) -> JudgeRecord {
    let sliders = sanitize_sliders(config, raw);
    let mut scores = BTreeMap::new();
    let mut totals = Totals::default();
    let mut breakdown = Vec::with_capacity(config.categories.len());

    for spec in &config.categories {
        let red = sliders.get(&spec.key).copied().unwrap_or_else(|| spec.midpoint());
        let white = spec.max - red;
        totals.red += red;
        totals.white += white;
        breakdown.push(format!("{} {red}-{white}", spec.label));
        scores.insert(
            spec.key.clone(),
            CategoryScore {
                label: spec.label.clone(),
                max: spec.max,
                red,
                white,
            },
        );
    }

    JudgeRecord {
        judge_id,
        judge_name: judge_name.trim().to_string(),
        submitted_at,
        sliders,
        scores,
        totals,
        winner: Side::from_totals(totals.red, totals.white),
        scoreline: format!("{}-{}", totals.red, totals.white),
        breakdown: breakdown.join(" \u{b7} "),
    }
}

/// Re-derives a stored scorecard from its sliders under the current categories.
pub fn rescore(config: &JudgingConfig, record: &JudgeRecord, judge_id: JudgeId) -> JudgeRecord {
    let raw: RawSliders = record
        .sliders
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(*v)))
        .collect();
    let judge_id = if record.judge_id == 0 { judge_id } else { record.judge_id };
    score_judge(config, judge_id, &raw, &record.judge_name, record.submitted_at)
}

/// Tallies the judge panel of `record` into a summary.
pub fn summarize(config: &JudgingConfig, record: &MatchRecord) -> MatchSummary {
    let red_name = non_empty(&record.red, "Red");
    let white_name = non_empty(&record.white, "White");

    let mut counts = WinnerCounts::default();
    let mut pending = Vec::new();
    let mut scorecards = Vec::new();
    for judge_id in config.judge_ids() {
        match record.judges.get(&judge_id) {
            Some(card) => {
                counts.add(card.winner);
                scorecards.push(format!(
                    "Judge {judge_id}: {red_name} {}-{} {white_name}",
                    card.totals.red, card.totals.white
                ));
            }
            None => pending.push(judge_id),
        }
    }

    let panel = config.judge_count;
    let is_complete = pending.is_empty();
    let winner = Side::from_totals(counts.red, counts.white);
    let (winner_name, decision) = match winner {
        Side::Draw => (None, Decision::Draw),
        side => {
            let name = if side == Side::Red { red_name } else { white_name };
            let decision = if !is_complete {
                Decision::Pending
            } else if counts.of(side) == panel {
                Decision::Unanimous
            } else if counts.draw > 0 && counts.of(side) + counts.draw == panel {
                Decision::Majority
            } else {
                Decision::Split
            };
            (Some(name.to_string()), decision)
        }
    };

    let headline = headline(is_complete, winner_name.as_deref(), decision, &scorecards, &pending);
    MatchSummary {
        counts,
        winner,
        winner_name,
        decision,
        scorecard_strings: scorecards,
        pending_judges: pending,
        is_complete,
        headline,
    }
}

fn headline(
    is_complete: bool,
    winner_name: Option<&str>,
    decision: Decision,
    scorecards: &[String],
    pending: &[JudgeId],
) -> String {
    let cards = scorecards.join(" \u{b7} ");
    if is_complete {
        let base = match winner_name {
            Some(name) => format!("{name} wins via {}", decision.label()),
            None => "Draw".to_string(),
        };
        return if cards.is_empty() { base } else { format!("{base} \u{2014} {cards}") };
    }

    let mut line = WAITING.to_string();
    if !cards.is_empty() {
        line.push_str(&format!(" (have: {cards})"));
    }
    if !pending.is_empty() {
        let plural = if pending.len() > 1 { "s" } else { "" };
        let ids: Vec<String> = pending.iter().map(JudgeId::to_string).collect();
        line.push_str(&format!(" \u{2014} Pending Judge{plural} {}", ids.join(", ")));
    }
    line
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(pairs: &[(&str, Value)]) -> RawSliders {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn sanitize_clamps_and_defaults() {
        let config = JudgingConfig::default();
        let out = sanitize_sliders(
            &config,
            &raw(&[
                ("damage", json!(10)),
                ("aggression", json!("abc")),
                ("control", json!(-3)),
                ("style", json!(4)),
            ]),
        );
        assert_eq!(out.get("damage"), Some(&8));
        assert_eq!(out.get("aggression"), Some(&2));
        assert_eq!(out.get("control"), Some(&0));
        assert!(!out.contains_key("style"));
    }

    #[test]
    fn sanitize_accepts_numeric_strings_and_floats() {
        let config = JudgingConfig::default();
        let out = sanitize_sliders(
            &config,
            &raw(&[("damage", json!(" 6 ")), ("aggression", json!(4.9)), ("control", Value::Null)]),
        );
        assert_eq!(out.get("damage"), Some(&6));
        assert_eq!(out.get("aggression"), Some(&4));
        assert_eq!(out.get("control"), Some(&3));
    }

    #[test]
    fn out_of_range_damage_leaves_white_nothing() {
        let config = JudgingConfig::default();
        let card = score_judge(&config, 1, &raw(&[("damage", json!(10))]), " Ada ", 5);
        let damage = card.scores.get("damage").expect("damage");
        assert_eq!((damage.red, damage.white), (8, 0));
        assert_eq!(card.judge_name, "Ada");
        // 8 + 2 + 3 against 0 + 3 + 3
        assert_eq!(card.totals, Totals { red: 13, white: 6 });
        assert_eq!(card.winner, Side::Red);
        assert_eq!(card.scoreline, "13-6");
        assert_eq!(card.breakdown, "Damage 8-0 \u{b7} Aggression 2-3 \u{b7} Control 3-3");
    }

    #[test]
    fn even_card_is_a_draw() {
        let config = JudgingConfig {
            judge_count: 1,
            categories: vec![CategorySpec::new("damage", "Damage", 8)],
        };
        let card = score_judge(&config, 1, &RawSliders::new(), "", 0);
        assert_eq!(card.winner, Side::Draw);
    }

    #[test]
    fn incomplete_headline_lists_pending_judges() {
        let config = JudgingConfig::default();
        let mut record = MatchRecord::new("m".into(), "Antweights", "Razer", "Chaos 2", 0);
        record
            .judges
            .insert(2, score_judge(&config, 2, &raw(&[("damage", json!(8))]), "B", 0));
        let summary = summarize(&config, &record);
        assert!(!summary.is_complete);
        assert_eq!(summary.decision, Decision::Pending);
        assert_eq!(summary.pending_judges, vec![1, 3]);
        assert_eq!(
            summary.headline,
            "Waiting for judges scores... (have: Judge 2: Razer 13-6 Chaos 2) \u{2014} Pending Judges 1, 3"
        );
    }
}
