//! Inclusion policy and tier partitioning for the save generator

use indexmap::IndexMap;

use crate::catalog::{BodyKind, CatalogBody, Tier};
use crate::config::SelectionConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Include,
    Exclude,
}

/// One named step of the inclusion chain
pub struct InclusionRule {
    pub name: &'static str,
    pub matches: fn(&CatalogBody, &SelectionConfig) -> bool,
    pub verdict: Verdict,
}

fn overridden(b: &CatalogBody, _: &SelectionConfig) -> bool {
    b.always_include
}

fn big_object(b: &CatalogBody, c: &SelectionConfig) -> bool {
    matches!(
        b.kind,
        BodyKind::Planet | BodyKind::Dwarf | BodyKind::Tno | BodyKind::Centaur | BodyKind::Asteroid
    ) && b.diameter_km() >= c.big_object_min_diam_km
}

fn large_moon(b: &CatalogBody, c: &SelectionConfig) -> bool {
    b.kind.is_moon() && b.diameter_km() >= c.moon_min_diam_km
}

fn small_moon(b: &CatalogBody, _: &SelectionConfig) -> bool {
    b.kind.is_moon()
}

fn large_asteroid(b: &CatalogBody, c: &SelectionConfig) -> bool {
    b.kind == BodyKind::Asteroid && b.diameter_km() >= c.asteroid_min_diam_km
}

fn bright_trans_neptunian(b: &CatalogBody, c: &SelectionConfig) -> bool {
    matches!(b.kind, BodyKind::Tno | BodyKind::Dwarf) && b.h.is_some_and(|h| h <= c.max_tno_abs_mag)
}

fn comet(b: &CatalogBody, _: &SelectionConfig) -> bool {
    b.kind == BodyKind::Comet
}

fn neo(b: &CatalogBody, _: &SelectionConfig) -> bool {
    b.kind == BodyKind::Neo
}

fn always(_: &CatalogBody, _: &SelectionConfig) -> bool {
    true
}

pub static INCLUSION_RULES: &[InclusionRule] = &[
    InclusionRule { name: "always_include", matches: overridden, verdict: Verdict::Include },
    InclusionRule { name: "big object", matches: big_object, verdict: Verdict::Include },
    InclusionRule { name: "large moon", matches: large_moon, verdict: Verdict::Include },
    InclusionRule { name: "small moon", matches: small_moon, verdict: Verdict::Exclude },
    InclusionRule { name: "large asteroid", matches: large_asteroid, verdict: Verdict::Include },
    InclusionRule { name: "bright tno/dwarf", matches: bright_trans_neptunian, verdict: Verdict::Include },
    InclusionRule { name: "comet (curated only)", matches: comet, verdict: Verdict::Exclude },
    InclusionRule { name: "neo (curated only)", matches: neo, verdict: Verdict::Exclude },
    InclusionRule { name: "fallback", matches: always, verdict: Verdict::Exclude },
];

/// First rule that matches the body
pub fn evaluate(body: &CatalogBody, config: &SelectionConfig) -> &'static InclusionRule {
    INCLUSION_RULES
        .iter()
        .find(|rule| (rule.matches)(body, config))
        .unwrap_or(&INCLUSION_RULES[INCLUSION_RULES.len() - 1])
}

pub fn should_include(body: &CatalogBody, config: &SelectionConfig) -> bool {
    evaluate(body, config).verdict == Verdict::Include
}

/// Included bodies split by save file section, catalog order kept
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    pub sun_orbiting: Vec<CatalogBody>,
    pub satellites: Vec<CatalogBody>,
    pub small_bodies: Vec<CatalogBody>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.sun_orbiting.len() + self.satellites.len() + self.small_bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tier(&self, tier: Tier) -> &[CatalogBody] {
        match tier {
            Tier::SunOrbiting => &self.sun_orbiting,
            Tier::Satellite => &self.satellites,
            Tier::SmallBody => &self.small_bodies,
        }
    }
}

/// Apply the policy and partition the survivors into tiers
pub fn select(catalog: impl IntoIterator<Item = CatalogBody>, config: &SelectionConfig) -> Selection {
    let mut selection = Selection::default();
    for body in catalog {
        let rule = evaluate(&body, config);
        if rule.verdict == Verdict::Exclude {
            tracing::debug!("Excluding {} ({})", body.name, rule.name);
            continue;
        }
        match body.kind.tier() {
            Tier::SunOrbiting => selection.sun_orbiting.push(body),
            Tier::Satellite => selection.satellites.push(body),
            Tier::SmallBody => selection.small_bodies.push(body),
        }
    }
    tracing::info!(
        "Selected {} planets/dwarfs, {} moons, {} small bodies",
        selection.sun_orbiting.len(),
        selection.satellites.len(),
        selection.small_bodies.len()
    );
    selection
}

/// How many bodies each rule decided, in rule order
pub fn rule_tally<'a>(
    catalog: impl IntoIterator<Item = &'a CatalogBody>,
    config: &SelectionConfig,
) -> IndexMap<&'static str, usize> {
    let mut tally: IndexMap<&'static str, usize> = INCLUSION_RULES.iter().map(|r| (r.name, 0)).collect();
    for body in catalog {
        *tally.entry(evaluate(body, config).name).or_insert(0) += 1;
    }
    tally
}
