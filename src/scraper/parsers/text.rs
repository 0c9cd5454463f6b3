//! Field-level text extraction shared by the results and acceptances parsers.

use regex::Regex;
use scraper::ElementRef;
use std::sync::OnceLock;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex is valid"))
}

/// Element text with whitespace runs collapsed to single spaces
pub fn cell_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Straighten quotes, decode the entities the site leaks into titles,
/// collapse whitespace and drop a dangling trailing dash.
pub fn normalize_title(title: &str) -> String {
    let replaced = title
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace('\u{a0}', " ");

    let collapsed = collapse_whitespace(&replaced);
    collapsed
        .trim_end_matches(['-', '\u{2013}', '\u{2014}'])
        .trim_end()
        .to_string()
}

/// Race number from a "Race N - ..." heading
pub fn race_number_from_title(raw: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)^\s*Race\s+(\d+)")
        .captures(raw)
        .and_then(|caps| caps[1].parse().ok())
        .filter(|n| *n > 0)
}

/// Strip the "Race N - " prefix, start time and trailing parenthetical
/// from a race heading, e.g.
/// `Race 1 - 12:35PM KARRAKATTA PLATE (1200 METRES)` → `KARRAKATTA PLATE`.
pub fn clean_race_title(raw: &str) -> String {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    static START_TIME: OnceLock<Regex> = OnceLock::new();

    let text = collapse_whitespace(raw);
    let text = regex(&PREFIX, r"(?i)^Race\s+\d+\s*[-\u{2013}]\s*").replace(&text, "");
    let text = regex(&START_TIME, r"(?i)^\d{1,2}[:.]\d{2}\s*[AP]M\s*").replace(&text, "");
    let text = text.split('(').next().unwrap_or("").trim();

    if text.is_empty() {
        normalize_title(raw)
    } else {
        normalize_title(text)
    }
}

/// Grade or class line from a race summary's HTML, e.g. `BenchMark 68, Handicap`
pub fn extract_grade(summary_html: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"(?i)<br\s*/?>\s*((?:BenchMark|Class|Group|Listed|Maiden|Handicap|Restricted|Set Weights|Quality)[^<]*)<br",
    )
    .captures(summary_html)
    .map(|caps| normalize_title(&caps[1]))
    .filter(|grade| !grade.is_empty())
}

/// Track type and condition from the labelled summary, `"Unknown"` when absent
pub fn extract_track(summary_html: &str) -> (String, String) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = regex(
        &RE,
        r"(?i)<b>\s*Track Type:\s*</b>\s*([^<]*?)\s*<b>\s*Track Condition:\s*</b>\s*([^<]*)",
    );

    match re.captures(summary_html) {
        Some(caps) => {
            let or_unknown = |s: &str| {
                let s = normalize_title(s);
                if s.is_empty() {
                    "Unknown".to_string()
                } else {
                    s
                }
            };
            (or_unknown(&caps[1]), or_unknown(&caps[2]))
        }
        None => ("Unknown".to_string(), "Unknown".to_string()),
    }
}

/// Distance from a "(NNN METRES)" suffix
pub fn extract_distance(raw_title: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)\(\s*(\d+)\s*METRES?\s*\)")
        .captures(raw_title)
        .and_then(|caps| caps[1].parse().ok())
        .filter(|d| *d > 0)
}

/// A jockey cell split into the rider's name and apprentice claim
#[derive(Debug, Clone, PartialEq)]
pub struct JockeyCell {
    pub name: String,
    /// Allowance in kg, e.g. 2 for "(a2/54kg)"
    pub claim: Option<f64>,
}

pub fn split_jockey_cell(text: &str) -> JockeyCell {
    let text = collapse_whitespace(text);
    let (name, annotation) = match text.split_once('(') {
        Some((name, rest)) => (name, Some(rest)),
        None => (text.as_str(), None),
    };

    let claim = annotation
        .and_then(|rest| rest.split(['/', ')']).next())
        .map(|c| c.trim().trim_start_matches(['a', 'A']).trim())
        .and_then(|c| c.parse::<f64>().ok())
        .filter(|c| c.is_finite() && *c > 0.0);

    JockeyCell {
        name: name.trim().to_string(),
        claim,
    }
}

/// Female riders are listed with an honorific
pub fn infer_female(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?i)\b(?:ms|miss|mrs)\b").is_match(name)
}

/// Starting price as (numeric value, display string), e.g. "$4.60F" → (4.6, "$4.60F")
pub fn parse_starting_price(text: &str) -> (Option<f64>, Option<String>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let display = collapse_whitespace(text);
    if display.is_empty() {
        return (None, None);
    }

    // Thousands separators are grouped strictly so "$1,000.00" reads as 1000
    let value = regex(&RE, r"\$?\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)")
        .captures(&display)
        .and_then(|caps| caps[1].replace(',', "").parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0);

    (value, Some(display))
}

/// Weight in kg from "57kg" or "57.5"
pub fn parse_weight(text: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(\d+(?:\.\d+)?)")
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|w| *w > 0.0)
}

pub fn parse_barrier(text: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\d+")
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .filter(|b| *b > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("  Tom\u{2019}s   &amp; Co  Plate - "),
            "Tom's & Co Plate"
        );
        assert_eq!(normalize_title("\u{201C}Big\u{201D}&nbsp;Cup"), "\"Big\" Cup");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn test_clean_race_title() {
        assert_eq!(
            clean_race_title("Race 1 - 12:35PM KARRAKATTA PLATE (1200 METRES)"),
            "KARRAKATTA PLATE"
        );
        assert_eq!(
            clean_race_title("Race 7 - 4:10PM  Tom\u{2019}s  Handicap (1600 METRES)"),
            "Tom's Handicap"
        );
        assert_eq!(clean_race_title("Odd Heading"), "Odd Heading");
        assert_eq!(clean_race_title("(1200 METRES)"), "(1200 METRES)");
    }

    #[test]
    fn test_race_number_and_distance() {
        assert_eq!(race_number_from_title("Race 12 - 5:00PM X (2400 METRES)"), Some(12));
        assert_eq!(race_number_from_title("KARRAKATTA PLATE"), None);
        assert_eq!(extract_distance("Race 1 - X (1200 METRES)"), Some(1200));
        assert_eq!(extract_distance("Race 1 - X"), None);
    }

    #[test]
    fn test_extract_grade_and_track() {
        let html = "Of $50,000. <br>BenchMark 68, Handicap<br><b>Track Type:</b> Turf <b>Track Condition:</b> Good 4 <br>";
        assert_eq!(extract_grade(html).as_deref(), Some("BenchMark 68, Handicap"));
        assert_eq!(
            extract_track(html),
            ("Turf".to_string(), "Good 4".to_string())
        );

        let listed = "<br>Listed, Set Weights<br>";
        assert_eq!(extract_grade(listed).as_deref(), Some("Listed, Set Weights"));

        assert_eq!(extract_grade("<br>Prizemoney only<br>"), None);
        assert_eq!(
            extract_track("nothing here"),
            ("Unknown".to_string(), "Unknown".to_string())
        );
    }

    #[test]
    fn test_split_jockey_cell() {
        assert_eq!(
            split_jockey_cell("Craig  Williams (a2/54kg)"),
            JockeyCell {
                name: "Craig Williams".to_string(),
                claim: Some(2.0)
            }
        );
        assert_eq!(split_jockey_cell("Ms Jane Doe (a1.5/54.5kg)").claim, Some(1.5));
        assert_eq!(
            split_jockey_cell("Jane Doe"),
            JockeyCell {
                name: "Jane Doe".to_string(),
                claim: None
            }
        );
        assert_eq!(split_jockey_cell("Jane Doe (late alt)").claim, None);
        assert_eq!(split_jockey_cell("").name, "");
    }

    #[test]
    fn test_infer_female() {
        assert!(infer_female("Ms Jane Doe"));
        assert!(infer_female("Miss Jane Doe"));
        assert!(infer_female("Mrs. Jane Doe"));
        assert!(!infer_female("Thomas Missen"));
        assert!(!infer_female("Craig Williams"));
    }

    #[test]
    fn test_parse_starting_price() {
        assert_eq!(
            parse_starting_price(" $4.60F "),
            (Some(4.6), Some("$4.60F".to_string()))
        );
        assert_eq!(parse_starting_price("$10"), (Some(10.0), Some("$10".to_string())));
        assert_eq!(
            parse_starting_price("$1,000.00"),
            (Some(1000.0), Some("$1,000.00".to_string()))
        );
        assert_eq!(parse_starting_price("$1,000"), (Some(1000.0), Some("$1,000".to_string())));
        assert_eq!(parse_starting_price("$12,500.50F").0, Some(12500.5));
        assert_eq!(parse_starting_price("SCR"), (None, Some("SCR".to_string())));
        assert_eq!(parse_starting_price(""), (None, None));
    }

    #[test]
    fn test_weight_and_barrier() {
        assert_eq!(parse_weight("57kg"), Some(57.0));
        assert_eq!(parse_weight("54.5 kg"), Some(54.5));
        assert_eq!(parse_weight(""), None);
        assert_eq!(parse_barrier(" 3 "), Some(3));
        assert_eq!(parse_barrier("(11)"), Some(11));
        assert_eq!(parse_barrier("0"), None);
        assert_eq!(parse_barrier(""), None);
    }
}
