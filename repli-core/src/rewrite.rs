use crate::error::RulesError;
use chrono::{Datelike, Month, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RewriteRule {
    pub find: String,
    pub replace: String,
}

impl RewriteRule {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self { find: find.into(), replace: replace.into() }
    }
}

/// Ordered literal substitutions. Each rule replaces every occurrence and
/// sees the output of the rules before it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RewriteTable {
    pub rules: Vec<RewriteRule>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RulesFile {
    List(Vec<RewriteRule>),
    Table(RewriteTable),
}

/// Rule `rule`'s replacement reintroduces the find pattern of rule `earlier`
/// (`earlier <= rule`), so a second pass would rewrite it again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub rule: usize,
    pub earlier: usize,
}

impl RewriteTable {
    pub fn new(rules: Vec<RewriteRule>) -> Result<Self, RulesError> {
        if let Some(i) = rules.iter().position(|r| r.find.is_empty()) {
            return Err(RulesError::EmptyFind(i));
        }
        Ok(Self { rules })
    }

    /// Load a JSON table: either `[{find, replace}, ...]` or `{"rules": [...]}`.
    pub fn from_json(src: &str) -> Result<Self, RulesError> {
        let rules = match serde_json::from_str::<RulesFile>(src)? {
            RulesFile::List(v) => v,
            RulesFile::Table(t) => t.rules,
        };
        Self::new(rules)
    }

    pub fn load(path: &Path) -> Result<Self, RulesError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Table advancing the month/year naming conventions by one month,
    /// starting from `period` (`YYYY-MM`).
    pub fn month_advance(period: &str) -> Result<Self, RulesError> {
        let bad = || RulesError::BadPeriod(period.to_string());
        let date = NaiveDate::parse_from_str(&format!("{}-01", period.trim()), "%Y-%m-%d")
            .map_err(|_| bad())?;
        let next = date.checked_add_months(chrono::Months::new(1)).ok_or_else(bad)?;
        let from = Period::of(date).ok_or_else(bad)?;
        let to = Period::of(next).ok_or_else(bad)?;

        let pairs = [
            (format!("Nav_{}_{}", from.abbr, from.year), format!("Nav_{}_{}", to.abbr, to.year)),
            (format!("{}_{}", from.name, from.year), format!("{}_{}", to.name, to.year)),
            (from.name.clone(), to.name.clone()),
            (from.name.to_lowercase(), to.name.to_lowercase()),
            (from.abbr.clone(), to.abbr.clone()),
            (from.abbr.to_lowercase(), to.abbr.to_lowercase()),
            (format!("{}-{:02}", from.year, from.month), format!("{}-{:02}", to.year, to.month)),
            (format!("{:02}/{}", from.month, from.year), format!("{:02}/{}", to.month, to.year)),
        ];
        let mut rules: Vec<RewriteRule> = Vec::with_capacity(pairs.len());
        for (find, replace) in pairs {
            // "May" is both the name and the abbreviation
            if rules.iter().any(|r| r.find == find) {
                continue;
            }
            rules.push(RewriteRule::new(find, replace));
        }
        Self::new(rules)
    }

    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for r in &self.rules {
            if out.contains(&r.find) {
                out = out.replace(&r.find, &r.replace);
            }
        }
        out
    }

    /// Rules whose replacement contains the find pattern of itself or an
    /// earlier rule, so a second run over already rewritten text would
    /// rewrite it again.
    ///
    /// Only matches lying wholly inside a replacement are found. A match
    /// straddling a replacement and the text around it is not: `("ba", "a")`
    /// turns `"bba"` into `"ba"` and is still reported clean.
    pub fn idempotence_conflicts(&self) -> Vec<Conflict> {
        let mut out = Vec::new();
        for (i, r) in self.rules.iter().enumerate() {
            for (j, earlier) in self.rules[..=i].iter().enumerate() {
                if r.replace.contains(&earlier.find) {
                    out.push(Conflict { rule: i, earlier: j });
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

struct Period {
    year: i32,
    month: u32,
    name: String,
    abbr: String,
}

impl Period {
    fn of(d: NaiveDate) -> Option<Self> {
        let m = Month::try_from(d.month() as u8).ok()?;
        let name = m.name().to_string();
        let abbr = name[..3].to_string();
        Some(Self { year: d.year(), month: d.month(), name, abbr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_apply_in_order() {
        let t = RewriteTable::new(vec![
            RewriteRule::new("ab", "x"),
            RewriteRule::new("x", "y"),
        ])
        .unwrap();
        assert_eq!(t.apply("ab ab x"), "y y y");

        let reversed = RewriteTable::new(vec![
            RewriteRule::new("x", "y"),
            RewriteRule::new("ab", "x"),
        ])
        .unwrap();
        assert_eq!(reversed.apply("ab ab x"), "x x y");
    }

    #[test]
    fn month_table_september_to_october() {
        let t = RewriteTable::month_advance("2025-09").unwrap();
        let finds: Vec<&str> = t.rules.iter().map(|r| r.find.as_str()).collect();
        assert_eq!(
            finds,
            ["Nav_Sep_2025", "September_2025", "September", "september", "Sep", "sep", "2025-09", "09/2025"]
        );
        assert_eq!(
            t.apply("# September_2025 report (Sep, 2025-09, 09/2025) see Nav_Sep_2025/september.md"),
            "# October_2025 report (Oct, 2025-10, 10/2025) see Nav_Oct_2025/october.md"
        );
    }

    #[test]
    fn month_table_rolls_over_the_year() {
        let t = RewriteTable::month_advance("2025-12").unwrap();
        assert_eq!(t.apply("December_2025 12/2025 2025-12"), "January_2026 01/2026 2026-01");
    }

    #[test]
    fn may_name_and_abbreviation_collapse_to_one_rule() {
        let t = RewriteTable::month_advance("2024-05").unwrap();
        assert_eq!(t.rules.iter().filter(|r| r.find == "May").count(), 1);
        assert_eq!(t.apply("May"), "June");
    }

    #[test]
    fn month_tables_have_no_idempotence_conflicts() {
        for m in 1..=12 {
            let t = RewriteTable::month_advance(&format!("2025-{m:02}")).unwrap();
            assert!(t.idempotence_conflicts().is_empty(), "month {m}");
        }
    }

    #[test]
    fn bad_periods_rejected() {
        for p in ["2025-13", "2025", "sept", ""] {
            assert!(matches!(RewriteTable::month_advance(p), Err(RulesError::BadPeriod(_))), "{p}");
        }
    }

    #[test]
    fn json_accepts_list_and_table_forms() {
        let a = RewriteTable::from_json(r#"[{"find":"a","replace":"b"}]"#).unwrap();
        let b = RewriteTable::from_json(r#"{"rules":[{"find":"a","replace":"b"}]}"#).unwrap();
        assert_eq!(a, b);
        assert!(matches!(
            RewriteTable::from_json(r#"[{"find":"","replace":"b"}]"#),
            Err(RulesError::EmptyFind(0))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"find":"Q3","replace":"Q4"},{"find":"draft","replace":"final"}]"#).unwrap();
        let t = RewriteTable::load(&path).unwrap();
        assert_eq!(t.rules.len(), 2);
        assert_eq!(t.apply("Q3 draft"), "Q4 final");
        assert!(matches!(RewriteTable::load(&dir.path().join("missing.json")), Err(RulesError::Io(_))));
    }

    #[test]
    fn self_feeding_rule_is_flagged_and_not_idempotent() {
        let t = RewriteTable::new(vec![RewriteRule::new("x", "xx")]).unwrap();
        assert_eq!(t.idempotence_conflicts(), vec![Conflict { rule: 0, earlier: 0 }]);
        let once = t.apply("x");
        assert_ne!(t.apply(&once), once);
    }
}
