//! Owner-mention extraction from prose and wiki markup
//!
//! Low-precision pattern rules shared by the flat providers. Nothing here
//! knows about the graph walk or scoring; callers turn an `OwnerMention`
//! into a single-hop candidate at low or medium confidence.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Confidence, RelationKind};

// =============================================================================
// PATTERNS
// =============================================================================

/// Owner capture shared by every rule: stops at sentence punctuation
const OWNER: &str = r"(?P<owner>[^.;,()\n]+)";

struct Rule {
    pattern: Regex,
    relation: RelationKind,
    confidence: Confidence,
}

fn rule(pattern: &str, relation: RelationKind, confidence: Confidence) -> Rule {
    Rule {
        pattern: Regex::new(&format!("(?i){}{}", pattern, OWNER)).unwrap(),
        relation,
        confidence,
    }
}

/// Rules in priority order; the first one producing a usable owner wins
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use Confidence::{Low, Medium};
    use RelationKind::*;
    vec![
        rule(r"\bowned\s+by\s+(?:the\s+)?", OwnedBy, Medium),
        rule(
            r"\b(?:appartient|appartenant)\s+(?:à|au|aux)\s+(?:(?:groupe|la\s+société|la\s+famille)\s+)?",
            OwnedBy,
            Medium,
        ),
        rule(r"\bpropriété\s+(?:de|du|des)\s+(?:(?:groupe)\s+)?", OwnedBy, Medium),
        rule(r"\bdétenue?\s+par\s+(?:le\s+groupe\s+)?", OwnedBy, Medium),
        rule(
            r"\b(?:subsidiary|division)\s+of\s+(?:the\s+)?",
            Subsidiary,
            Medium,
        ),
        rule(r"\bfiliale\s+(?:de|du|des)\s+(?:(?:groupe)\s+)?", Subsidiary, Medium),
        rule(r"\bparent\s+company\s+(?:is\s+)?(?:the\s+)?", ParentOrg, Medium),
        rule(r"\b(?:maison|société)[- ]mère\s+(?:est\s+)?", ParentOrg, Medium),
        rule(r"\bbrand\s+of\s+(?:the\s+)?", BrandOf, Medium),
        rule(
            r"\bmarque\s+(?:du\s+groupe|de\s+la\s+société|du|de|des)\s+",
            BrandOf,
            Medium,
        ),
        rule(r"\bfounded\s+(?:in\s+\d{4}\s+)?by\s+", Founder, Low),
        rule(r"\bfondée?\s+(?:en\s+\d{4}\s+)?par\s+", Founder, Low),
    ]
});

/// Words that end an owner mention
static OWNER_STOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(?:since|until|which|who|from|in|after|for|as|and|with|depuis|qui|en|et|jusqu|avec)\b",
    )
    .unwrap()
});

/// Leading descriptors that mark the owner as a person
static PERSON_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:billionaire|businessman|businesswoman|entrepreneur|investor|milliardaire|homme\s+d'affaires|femme\s+d'affaires|l'homme\s+d'affaires)\s+",
    )
    .unwrap()
});

static LISTING_VENUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?P<venue>NYSE|NASDAQ|Nasdaq|LSE|TSX|SIX|FWB|Euronext(?:\s+(?:Paris|Amsterdam|Brussels|Lisbon|Milan))?)\s*:\s*(?P<ticker>[A-Z0-9.]{1,8})\b").unwrap()
});

static LISTING_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:traded\s+as|publicly\s+traded|listed\s+on\s+the|cot[ée]e?s?\s+(?:en\s+bourse|à\s+la\s+bourse|sur\s+euronext))\b").unwrap()
});

static DELISTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:delisted|taken\s+private|went\s+private|formerly\s+(?:publicly\s+)?traded|retirée?\s+de\s+la\s+cote)\b").unwrap()
});

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(?:[^\]|]*\|)?(?P<text>[^\]|]*)\]\]").unwrap());

static WIKI_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<ref[^>/]*/>|<ref[^>]*>.*?</ref>").unwrap());

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// List-style templates whose first item is kept
static LIST_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\{\s*(?:ubl|unbulleted\s+list|plainlist|flatlist|hlist)\s*\|\s*(?P<first>[^|}]*)[^}]*\}\}").unwrap()
});

static TEMPLATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{[^{}]*\}\}").unwrap());

static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());

const MAX_OWNER_WORDS: usize = 8;

// =============================================================================
// OWNER MENTIONS
// =============================================================================

/// An owner named in free text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerMention {
    pub owner: String,
    pub relation: RelationKind,
    pub confidence: Confidence,
    /// Text carries a signal that the owner is a person
    pub person: bool,
}

/// First owner mention found by the pattern rules
pub fn find_owner_mention(text: &str) -> Option<OwnerMention> {
    RULES.iter().find_map(|rule| {
        rule.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.name("owner"))
            .find_map(|m| {
                let (owner, person) = clean_owner(m.as_str())?;
                Some(OwnerMention {
                    owner,
                    relation: rule.relation,
                    confidence: rule.confidence,
                    person: person || rule.relation == RelationKind::Founder,
                })
            })
    })
}

/// Trim a raw capture to a plausible entity name
///
/// Returns the name and whether a person descriptor preceded it. Captures
/// that do not start with an uppercase letter or digit are rejected.
pub fn clean_owner(raw: &str) -> Option<(String, bool)> {
    let mut owner = raw.trim().to_string();

    let person = PERSON_PREFIX.is_match(&owner);
    if person {
        owner = PERSON_PREFIX.replace(&owner, "").into_owned();
    }

    if let Some(stop) = OWNER_STOP.find(&owner) {
        owner.truncate(stop.start());
    }

    let owner = owner
        .split_whitespace()
        .take(MAX_OWNER_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    let owner = owner.trim_matches(|c: char| c == '\'' || c == '"' || c.is_whitespace());

    let first = owner.chars().next()?;
    if !(first.is_uppercase() || first.is_ascii_digit()) {
        return None;
    }
    Some((owner.to_string(), person))
}

// =============================================================================
// LISTING SIGNALS
// =============================================================================

/// Evidence that an entity is publicly traded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSignal {
    /// Exchange and ticker when the text names them (e.g. "NYSE: KO")
    pub venue: Option<String>,
}

/// Detect an exchange listing; delisting language cancels the signal
pub fn listing_signal(text: &str) -> Option<ListingSignal> {
    if DELISTED.is_match(text) {
        return None;
    }
    if let Some(caps) = LISTING_VENUE.captures(text) {
        return Some(ListingSignal {
            venue: Some(format!("{}: {}", &caps["venue"], &caps["ticker"])),
        });
    }
    LISTING_PHRASE
        .is_match(text)
        .then_some(ListingSignal { venue: None })
}

// =============================================================================
// WIKI MARKUP
// =============================================================================

/// Reduce a wikitext fragment to plain text
///
/// Links keep their display text, references and tags are dropped, list
/// templates keep their first item and other templates are removed.
pub fn strip_wiki_markup(text: &str) -> String {
    let text = WIKI_REF.replace_all(text, "");
    let text = WIKI_LINK.replace_all(&text, "$text");
    let text = LIST_TEMPLATE.replace_all(&text, "$first");
    let mut text = text.into_owned();
    // nested templates collapse from the inside out
    loop {
        let next = TEMPLATE.replace_all(&text, "").into_owned();
        if next == text {
            break;
        }
        text = next;
    }
    let text = HTML_TAG.replace_all(&text, "\n");
    text.replace("'''", "").replace("''", "")
}

/// First plain-text item of an infobox value, without parentheticals
pub fn first_value_item(value: &str) -> Option<String> {
    let plain = strip_wiki_markup(value);
    plain
        .split(['\n', '*', ';', '•'])
        .map(|item| PARENTHETICAL.replace_all(item, ""))
        .map(|item| item.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|item| !item.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_by() {
        let m = find_owner_mention("Instagram is a photo service owned by Meta Platforms since 2012.")
            .unwrap();
        assert_eq!(m.owner, "Meta Platforms");
        assert_eq!(m.relation, RelationKind::OwnedBy);
        assert_eq!(m.confidence, Confidence::Medium);
        assert!(!m.person);
    }

    #[test]
    fn test_person_descriptor() {
        let m = find_owner_mention("The newspaper is owned by billionaire Jane Doe.").unwrap();
        assert_eq!(m.owner, "Jane Doe");
        assert!(m.person);
    }

    #[test]
    fn test_lowercase_capture_rejected() {
        assert!(find_owner_mention("The club is owned by a consortium of investors.").is_none());
    }

    #[test]
    fn test_rule_priority() {
        let text = "Founded by John Smith, the label is a subsidiary of Universal Music Group.";
        let m = find_owner_mention(text).unwrap();
        assert_eq!(m.owner, "Universal Music Group");
        assert_eq!(m.relation, RelationKind::Subsidiary);
    }

    #[test]
    fn test_founder_is_low_and_person() {
        let m = find_owner_mention("The shop was founded in 1998 by Marie Curie-Dupont.").unwrap();
        assert_eq!(m.owner, "Marie Curie-Dupont");
        assert_eq!(m.relation, RelationKind::Founder);
        assert_eq!(m.confidence, Confidence::Low);
        assert!(m.person);
    }

    #[test]
    fn test_french_rules() {
        let m = find_owner_mention("Kitupé est une filiale du groupe Danone depuis 2007.").unwrap();
        assert_eq!(m.owner, "Danone");
        assert_eq!(m.relation, RelationKind::Subsidiary);

        let m = find_owner_mention("La marque appartient au groupe LVMH.").unwrap();
        assert_eq!(m.owner, "LVMH");
        assert_eq!(m.relation, RelationKind::OwnedBy);

        let m = find_owner_mention("Evian est une marque du groupe Danone.").unwrap();
        assert_eq!(m.relation, RelationKind::BrandOf);
    }

    #[test]
    fn test_owner_word_limit() {
        let text = "It is owned by Alpha Beta Gamma Delta Epsilon Zeta Eta Theta Iota Kappa.";
        let m = find_owner_mention(text).unwrap();
        assert_eq!(m.owner.split_whitespace().count(), MAX_OWNER_WORDS);
    }

    #[test]
    fn test_listing_signal() {
        let s = listing_signal("The Coca-Cola Company (NYSE: KO) is a beverage firm.").unwrap();
        assert_eq!(s.venue.as_deref(), Some("NYSE: KO"));

        let s = listing_signal("It is a publicly traded company.").unwrap();
        assert_eq!(s.venue, None);

        assert!(listing_signal("Le groupe est coté en bourse à Paris.").is_some());
        assert!(listing_signal("La société est cotée en bourse.").is_some());
        assert!(listing_signal("It was delisted from NYSE: XYZ in 2010.").is_none());
        assert!(listing_signal("A family business.").is_none());
    }

    #[test]
    fn test_strip_wiki_markup() {
        let raw = "[[Berkshire Hathaway|Berkshire]] (100%)<ref name=\"a\">cite</ref>";
        assert_eq!(strip_wiki_markup(raw), "Berkshire (100%)");

        let nested = "{{ubl|[[Alpha Group]]|[[Beta]]}}";
        assert_eq!(strip_wiki_markup(nested), "Alpha Group");

        let template = "Foo {{efn|{{nowrap|note}}}} Bar";
        assert_eq!(strip_wiki_markup(template), "Foo  Bar");
    }

    #[test]
    fn test_first_value_item() {
        assert_eq!(
            first_value_item("[[Nestlé]] (100%)<br />Other"),
            Some("Nestlé".to_string())
        );
        assert_eq!(
            first_value_item("* [[Alpha]]\n* [[Beta]]"),
            Some("Alpha".to_string())
        );
        assert_eq!(first_value_item("{{efn|x}}"), None);
    }
}
