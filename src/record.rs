use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2,4}-\d{4}(?:-[A-Z0-9]+)?\b").unwrap());

/// Interest assigned to every scraped course. Edit the output file (or pass
/// `--interest` to `plan`) to express preferences.
pub const DEFAULT_INTEREST: u8 = 5;

/// One row of the ratings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    pub course_name: String,
    pub codes: String,
    #[serde(deserialize_with = "nan_if_null")]
    pub rating: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub difficulty: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub workload: f64,
    #[serde(serialize_with = "whole_as_integer", deserialize_with = "nan_if_null")]
    pub num_reviews: f64,
    pub interest: u8,
}

impl CourseRecord {
    /// Build a record from the raw cell texts of a table row.
    /// `numbers` holds rating, difficulty, workload and review count in
    /// column order.
    pub fn from_cells(course_name: &str, codes: &str, numbers: [&str; 4]) -> Self {
        let [rating, difficulty, workload, num_reviews] = numbers.map(coerce_number);
        Self {
            course_name: course_name.trim().to_string(),
            codes: codes.trim().to_string(),
            rating,
            difficulty,
            workload,
            num_reviews,
            interest: DEFAULT_INTEREST,
        }
    }

    /// Course codes found in the `codes` cell, e.g. `["CS-6515"]`.
    /// Falls back to the whole trimmed text when nothing code-shaped is found.
    pub fn code_list(&self) -> Vec<String> {
        let codes: Vec<String> = CODE_RE
            .find_iter(&self.codes)
            .map(|m| m.as_str().to_string())
            .collect();
        if codes.is_empty() && !self.codes.trim().is_empty() {
            vec![self.codes.trim().to_string()]
        } else {
            codes
        }
    }
}

/// Numeric coercion with JavaScript `Number(text)` semantics: blank text is
/// zero, anything unparseable is NaN.
pub fn coerce_number(text: &str) -> f64 {
    let t = text.trim();
    if t.is_empty() {
        return 0.0;
    }

    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    if let Some(value) = radix_literal(t) {
        return value;
    }

    // Rust accepts "inf", "nan" and friends; JS does not.
    if t
        .bytes()
        .any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E'))
    {
        return f64::NAN;
    }

    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// `0x1F`, `0o17`, `0b101` (unsigned, as JS allows). `None` if `t` has no
/// radix prefix; NaN if it has one but bad digits.
fn radix_literal(t: &str) -> Option<f64> {
    let (digits, radix) = match t.get(..2)? {
        "0x" | "0X" => (&t[2..], 16),
        "0o" | "0O" => (&t[2..], 8),
        "0b" | "0B" => (&t[2..], 2),
        _ => return None,
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Some(f64::NAN);
    }
    Some(
        u128::from_str_radix(digits, radix)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN),
    )
}

/// Review counts are whole numbers; keep them integral in the JSON. NaN
/// still goes out as `null`.
fn whole_as_integer<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_numbers() {
        assert_eq!(coerce_number("4.25"), 4.25);
        assert_eq!(coerce_number(" 17 "), 17.0);
        assert_eq!(coerce_number("-3"), -3.0);
        assert_eq!(coerce_number(".5"), 0.5);
        assert_eq!(coerce_number("1e3"), 1000.0);
    }

    #[test]
    fn blank_is_zero() {
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("   \n"), 0.0);
    }

    #[test]
    fn garbage_is_nan() {
        for text in ["N/A", "1,234", "4.2 stars", "inf", "NaN", "--", "e"] {
            assert!(coerce_number(text).is_nan(), "{text:?} should be NaN");
        }
    }

    #[test]
    fn js_literals() {
        assert_eq!(coerce_number("0x1A"), 26.0);
        assert_eq!(coerce_number("0b101"), 5.0);
        assert_eq!(coerce_number("0o17"), 15.0);
        assert!(coerce_number("0xZZ").is_nan());
        assert!(coerce_number("0x").is_nan());
        assert_eq!(coerce_number("Infinity"), f64::INFINITY);
        assert_eq!(coerce_number("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn from_cells_sets_interest() {
        let r = CourseRecord::from_cells(
            "  Graduate Algorithms ",
            "CS-6515",
            ["4.1", "4.3", "21", "980"],
        );
        assert_eq!(r.course_name, "Graduate Algorithms");
        assert_eq!(r.rating, 4.1);
        assert_eq!(r.num_reviews, 980.0);
        assert_eq!(r.interest, DEFAULT_INTEREST);
    }

    #[test]
    fn nan_survives_json() {
        let r = CourseRecord::from_cells("X", "CS-1000", ["n/a", "3", "10", "5"]);
        let json = serde_json::to_value(&r).unwrap();
        assert!(json["rating"].is_null());
        assert!(json["numReviews"].is_i64());
        assert_eq!(json["numReviews"], 5);
        assert_eq!(json["courseName"], "X");

        let back: CourseRecord = serde_json::from_value(json).unwrap();
        assert!(back.rating.is_nan());
        assert_eq!(back.difficulty, 3.0);
    }

    #[test]
    fn code_list_cross_listed() {
        let r = CourseRecord::from_cells("ML", "CS-7641 / CSE-7641", ["4", "3", "20", "10"]);
        assert_eq!(r.code_list(), vec!["CS-7641", "CSE-7641"]);

        let r = CourseRecord::from_cells("Special", "CS-8803-O08", ["4", "3", "20", "10"]);
        assert_eq!(r.code_list(), vec!["CS-8803-O08"]);

        let r = CourseRecord::from_cells("Odd", "misc", ["4", "3", "20", "10"]);
        assert_eq!(r.code_list(), vec!["misc"]);
    }

    #[test]
    fn review_count_written_as_integer() {
        let r = CourseRecord::from_cells("G", "CS-6515", ["3.4", "4.2", "21", "1288"]);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains(r#""numReviews":1288,"#), "{json}");

        let mut odd = r.clone();
        odd.num_reviews = 12.5;
        assert!(serde_json::to_string(&odd).unwrap().contains(r#""numReviews":12.5,"#));

        odd.num_reviews = f64::NAN;
        assert!(serde_json::to_string(&odd).unwrap().contains(r#""numReviews":null,"#));
    }
}
