use std::collections::HashSet;

use anyhow::{bail, Result};

/// At least `min` courses from `codes`.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub label: &'static str,
    pub codes: &'static [&'static str],
    pub min: usize,
}

#[derive(Debug, Clone)]
pub struct Specialization {
    pub name: &'static str,
    pub requirements: Vec<Requirement>,
}

impl Specialization {
    /// A code listed in two groups is almost certainly a catalog typo.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for req in &self.requirements {
            for code in req.codes {
                if !seen.insert(*code) {
                    bail!(
                        "{}: {} appears in more than one requirement group",
                        self.name,
                        code
                    );
                }
            }
        }
        Ok(())
    }
}

pub fn interactive_intelligence() -> Specialization {
    Specialization {
        name: "Interactive Intelligence",
        requirements: vec![
            Requirement {
                label: "algorithms",
                codes: &["CS-6300", "CS-6515"],
                min: 1,
            },
            Requirement {
                label: "core AI",
                codes: &["CS-6601", "CS-7637", "CS-7641"],
                min: 2,
            },
            Requirement {
                // interaction, AI methods and cognition electives pooled
                label: "electives",
                codes: &[
                    "CS-6440", "CS-6460", "CS-6603", "CS-6750", "CS-6476", "CS-7632", "CS-7643",
                    "CS-7650", "CS-6795",
                ],
                min: 2,
            },
        ],
    }
}

pub fn computing_systems() -> Specialization {
    Specialization {
        name: "Computing Systems",
        requirements: vec![
            Requirement {
                label: "algorithms",
                codes: &["CS-6515"],
                min: 1,
            },
            Requirement {
                label: "core systems",
                codes: &["CS-6210", "CS-6250", "CS-6290", "CS-6300", "CS-6301", "CS-6400"],
                min: 2,
            },
            Requirement {
                label: "electives",
                codes: &[
                    "CS-6035", "CS-6200", "CS-6238", "CS-6260", "CS-6262", "CS-6263", "CS-6291",
                    "CS-6310", "CS-6340", "CS-6422", "CS-6675", "CS-7210", "CS-7280", "CSE-6220",
                    "CS-6211", "CS-6264", "CS-7400", "CS-8803-O08",
                ],
                min: 3,
            },
        ],
    }
}

pub fn builtin() -> Vec<Specialization> {
    vec![interactive_intelligence(), computing_systems()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_groups_are_disjoint() {
        for spec in builtin() {
            spec.validate().unwrap();
        }
    }

    #[test]
    fn overlap_rejected() {
        let spec = Specialization {
            name: "Broken",
            requirements: vec![
                Requirement { label: "a", codes: &["CS-1", "CS-2"], min: 1 },
                Requirement { label: "b", codes: &["CS-2"], min: 1 },
            ],
        };
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("CS-2"));
    }
}
