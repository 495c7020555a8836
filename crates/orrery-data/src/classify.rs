//! Small-body classification as an ordered rule chain
//!
//! Rules are evaluated top to bottom; the first predicate that matches
//! decides the kind. The final rule always matches.

use crate::catalog::BodyKind;

/// The three database signals that drive classification
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmallBodySignals {
    /// Source kind code (`an`, `au`, `cn`, `cu`); lowercased
    pub kind_code: String,
    /// Orbit class code (`MBA`, `TNO`, `CEN`, ...); uppercased
    pub orbit_class: String,
    /// NEO flag; missing counts as not set
    pub neo: bool,
}

impl SmallBodySignals {
    pub fn new(kind_code: Option<&str>, orbit_class: Option<&str>, neo_flag: Option<&str>) -> Self {
        Self {
            kind_code: kind_code.unwrap_or_default().trim().to_ascii_lowercase(),
            orbit_class: orbit_class.unwrap_or_default().trim().to_ascii_uppercase(),
            neo: neo_flag.map(|f| f.trim().eq_ignore_ascii_case("Y")).unwrap_or(false),
        }
    }

    /// Everything whose kind code does not start with `a` is comet-like,
    /// including an empty code
    pub fn is_comet_like(&self) -> bool {
        !self.kind_code.starts_with('a')
    }
}

/// One named step of the chain
pub struct ClassificationRule {
    pub name: &'static str,
    pub matches: fn(&SmallBodySignals) -> bool,
    pub kind: BodyKind,
}

fn comet_like(s: &SmallBodySignals) -> bool {
    s.is_comet_like()
}

fn neo_flagged(s: &SmallBodySignals) -> bool {
    s.neo
}

fn trans_neptunian(s: &SmallBodySignals) -> bool {
    s.orbit_class == "TNO"
}

fn centaur_class(s: &SmallBodySignals) -> bool {
    s.orbit_class == "CEN"
}

fn always(_: &SmallBodySignals) -> bool {
    true
}

pub static CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule { name: "comet-like kind", matches: comet_like, kind: BodyKind::Comet },
    ClassificationRule { name: "neo flag", matches: neo_flagged, kind: BodyKind::Neo },
    ClassificationRule { name: "tno class", matches: trans_neptunian, kind: BodyKind::Tno },
    ClassificationRule { name: "centaur class", matches: centaur_class, kind: BodyKind::Centaur },
    ClassificationRule { name: "fallback", matches: always, kind: BodyKind::Asteroid },
];

/// First rule that accepts these signals
pub fn matching_rule(signals: &SmallBodySignals) -> &'static ClassificationRule {
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| (rule.matches)(signals))
        .unwrap_or(&CLASSIFICATION_RULES[CLASSIFICATION_RULES.len() - 1])
}

pub fn classify(signals: &SmallBodySignals) -> BodyKind {
    matching_rule(signals).kind
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(kind: &str, class: &str, neo: &str) -> SmallBodySignals {
        SmallBodySignals::new(Some(kind), Some(class), Some(neo))
    }

    #[test]
    fn test_neo_beats_orbit_class() {
        assert_eq!(classify(&signals("a", "TNO", "Y")), BodyKind::Neo);
    }

    #[test]
    fn test_comet_kind() {
        assert_eq!(classify(&signals("c", "", "N")), BodyKind::Comet);
        assert_eq!(classify(&signals("cn", "JFc", "Y")), BodyKind::Comet);
    }

    #[test]
    fn test_orbit_classes() {
        assert_eq!(classify(&signals("an", "TNO", "N")), BodyKind::Tno);
        assert_eq!(classify(&signals("au", "cen", "N")), BodyKind::Centaur);
        assert_eq!(classify(&signals("an", "MBA", "N")), BodyKind::Asteroid);
        assert_eq!(classify(&signals("AN", "TJN", "n")), BodyKind::Asteroid);
    }

    #[test]
    fn test_missing_signals() {
        let none = SmallBodySignals::new(None, None, None);
        assert!(!none.neo);
        assert_eq!(classify(&none), BodyKind::Comet);

        let asteroid = SmallBodySignals::new(Some("an"), None, None);
        assert_eq!(classify(&asteroid), BodyKind::Asteroid);
        assert_eq!(matching_rule(&asteroid).name, "fallback");
    }

    #[test]
    fn test_rule_order_is_stable() {
        let names: Vec<_> = CLASSIFICATION_RULES.iter().map(|r| r.name).collect();
        assert_eq!(names, ["comet-like kind", "neo flag", "tno class", "centaur class", "fallback"]);
    }
}
