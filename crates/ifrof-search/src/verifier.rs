//! Deterministic factory scoring.
//!
//! Every candidate starts at `SCORE_BASE`. Manufacturing signals, a website,
//! a location, and multiple listings add points; trading signals subtract.
//! The score is clamped to 0..=100 before the acceptance rule is applied.

use ifrof_core::defaults::{
    ACCEPT_MAX_RED_FLAGS, ACCEPT_MIN_REASONS, ACCEPT_MIN_SCORE, MAX_LISTING_EVIDENCE,
    MAX_WHY_FACTORY, SCORE_BASE, SCORE_LOCATION, SCORE_MANUFACTURING_SIGNAL,
    SCORE_MULTIPLE_LINKS, SCORE_TRADING_SIGNAL, SCORE_WEBSITE,
};
use ifrof_core::{Evidence, FactoryCandidate, Verification};

pub const EVIDENCE_MANUFACTURING: &str = "Manufacturing Signal";
pub const EVIDENCE_WEBSITE: &str = "Website";
pub const EVIDENCE_LISTING: &str = "Listing";

/// Checklist attached to every verified factory.
pub const VERIFICATION_STEPS: [&str; 3] = [
    "Contact the factory directly and ask for a business license",
    "Request a live video tour of the production line",
    "Use a third-party inspection service before paying",
];

fn listing_label(link: &str) -> String {
    url::Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| link.to_string())
}

/// Whether a scored candidate passes the acceptance rule.
pub fn is_accepted(score: i32, why_factory: usize, red_flags: usize) -> bool {
    score >= ACCEPT_MIN_SCORE && why_factory >= ACCEPT_MIN_REASONS && red_flags < ACCEPT_MAX_RED_FLAGS
}

/// Score a candidate. Pure: the same candidate always yields the same result.
pub fn verify(candidate: &FactoryCandidate) -> Verification {
    let mut score = SCORE_BASE;
    let mut evidence = Vec::new();
    let mut red_flags = Vec::new();
    let mut why_factory = Vec::new();
    let website = candidate.website();

    for signal in &candidate.manufacturing_signals {
        score += SCORE_MANUFACTURING_SIGNAL;
        why_factory.push(signal.clone());
        evidence.push(Evidence {
            evidence_type: EVIDENCE_MANUFACTURING.to_string(),
            claim: signal.clone(),
            source_url: website.unwrap_or_default().to_string(),
        });
    }

    for signal in &candidate.trading_signals {
        score += SCORE_TRADING_SIGNAL;
        red_flags.push(signal.clone());
    }

    if let Some(site) = website {
        score += SCORE_WEBSITE;
        evidence.push(Evidence {
            evidence_type: EVIDENCE_WEBSITE.to_string(),
            claim: format!("Official website: {}", site),
            source_url: site.to_string(),
        });
    }

    if let Some(location) = candidate.location() {
        score += SCORE_LOCATION;
        why_factory.push(format!("located in {}", location));
    }

    if candidate.links.len() > 1 {
        score += SCORE_MULTIPLE_LINKS;
        for link in candidate.links.iter().take(MAX_LISTING_EVIDENCE) {
            evidence.push(Evidence {
                evidence_type: EVIDENCE_LISTING.to_string(),
                claim: format!("Listed on {}", listing_label(link)),
                source_url: link.clone(),
            });
        }
    }

    let score = score.clamp(0, 100);
    why_factory.truncate(MAX_WHY_FACTORY);

    Verification {
        score,
        is_accepted: is_accepted(score, why_factory.len(), red_flags.len()),
        evidence,
        red_flags,
        why_factory,
        verification_steps: VERIFICATION_STEPS.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn strong_factory() -> FactoryCandidate {
        FactoryCandidate {
            name: "Yongkang Steelware Co.".into(),
            name_zh: Some("永康钢制品有限公司".into()),
            location: Some("Yongkang, Zhejiang".into()),
            website: Some("https://steelware.example".into()),
            links: strings(&["https://steelware.example/about", "https://b2b.example/steelware"]),
            manufacturing_signals: strings(&[
                "Own production lines",
                "15,000 m2 factory",
                "ISO 9001 certified plant",
            ]),
            trading_signals: vec![],
        }
    }

    #[test]
    fn test_strong_factory_scores_80_and_is_accepted() {
        let v = verify(&strong_factory());
        assert_eq!(v.score, 80);
        assert!(v.is_accepted);
        assert_eq!(v.why_factory.len(), 4);
        assert_eq!(v.why_factory[3], "located in Yongkang, Zhejiang");
        assert!(v.red_flags.is_empty());
        assert_eq!(v.verification_steps, VERIFICATION_STEPS.to_vec());

        let kinds: Vec<&str> = v.evidence.iter().map(|e| e.evidence_type.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                EVIDENCE_MANUFACTURING,
                EVIDENCE_MANUFACTURING,
                EVIDENCE_MANUFACTURING,
                EVIDENCE_WEBSITE,
                EVIDENCE_LISTING,
                EVIDENCE_LISTING,
            ]
        );
        assert_eq!(v.evidence[0].source_url, "https://steelware.example");
        assert_eq!(v.evidence[3].claim, "Official website: https://steelware.example");
        assert_eq!(v.evidence[5].claim, "Listed on b2b.example");
    }

    #[test]
    fn test_trader_scores_5_and_is_rejected() {
        let trader = FactoryCandidate {
            name: "Global Trade Ltd".into(),
            trading_signals: strings(&["trading company", "sells many unrelated products", "Hong Kong office only"]),
            ..Default::default()
        };
        let v = verify(&trader);
        assert_eq!(v.score, 5);
        assert!(!v.is_accepted);
        assert_eq!(v.red_flags.len(), 3);
        assert!(v.evidence.is_empty());
    }

    #[test]
    fn test_score_clamped_both_ways() {
        let high = FactoryCandidate {
            name: "Huge".into(),
            manufacturing_signals: (0..20).map(|i| format!("signal {}", i)).collect(),
            ..Default::default()
        };
        let v = verify(&high);
        assert_eq!(v.score, 100);
        assert_eq!(v.why_factory.len(), MAX_WHY_FACTORY);

        let low = FactoryCandidate {
            name: "Trader".into(),
            trading_signals: (0..10).map(|i| format!("flag {}", i)).collect(),
            ..Default::default()
        };
        assert_eq!(verify(&low).score, 0);
    }

    #[test]
    fn test_acceptance_boundaries() {
        assert!(is_accepted(40, 2, 2));
        assert!(!is_accepted(39, 2, 2));
        assert!(!is_accepted(40, 1, 2));
        assert!(!is_accepted(40, 2, 3));
    }

    #[test]
    fn test_boundary_candidate_at_exactly_forty() {
        // 50 + 2*5 (signals) - 2*15 (flags) + 5 (location) + 5 (website) = 40
        let candidate = FactoryCandidate {
            name: "Edge Co".into(),
            location: Some("Dongguan".into()),
            website: Some("https://edge.example".into()),
            manufacturing_signals: strings(&["injection molding machines"]),
            trading_signals: strings(&["also resells", "no factory photos"]),
            ..Default::default()
        };
        let mut candidate_plus = candidate.clone();
        candidate_plus
            .manufacturing_signals
            .push("own mold workshop".into());

        let v = verify(&candidate_plus);
        assert_eq!(v.score, 40);
        assert_eq!(v.why_factory.len(), 3);
        assert_eq!(v.red_flags.len(), 2);
        assert!(v.is_accepted);

        // One signal fewer: 35, rejected.
        let v = verify(&candidate);
        assert_eq!(v.score, 35);
        assert!(!v.is_accepted);
    }

    #[test]
    fn test_blank_website_and_location_ignored() {
        let candidate = FactoryCandidate {
            name: "Blank".into(),
            website: Some("   ".into()),
            location: Some("".into()),
            links: strings(&["https://only-one.example"]),
            ..Default::default()
        };
        let v = verify(&candidate);
        assert_eq!(v.score, 50);
        assert!(v.evidence.is_empty());
        assert!(v.why_factory.is_empty());
        assert!(!v.is_accepted);
    }

    #[test]
    fn test_every_signal_string_counts_as_given() {
        let candidate = FactoryCandidate {
            name: "Raw".into(),
            manufacturing_signals: strings(&["", "own plant"]),
            trading_signals: strings(&[""]),
            ..Default::default()
        };
        let v = verify(&candidate);
        // 50 + 2*5 - 15
        assert_eq!(v.score, 45);
        assert_eq!(v.why_factory, strings(&["", "own plant"]));
        assert_eq!(v.red_flags, strings(&[""]));
        assert_eq!(v.evidence.len(), 2);
    }

    #[test]
    fn test_listing_evidence_capped_and_unparsable_link_kept() {
        let candidate = FactoryCandidate {
            name: "Listed".into(),
            links: strings(&["not a url", "https://a.example/x", "https://b.example", "https://c.example"]),
            ..Default::default()
        };
        let v = verify(&candidate);
        let listings: Vec<&Evidence> = v
            .evidence
            .iter()
            .filter(|e| e.evidence_type == EVIDENCE_LISTING)
            .collect();
        assert_eq!(listings.len(), MAX_LISTING_EVIDENCE);
        assert_eq!(listings[0].claim, "Listed on not a url");
        assert_eq!(listings[1].claim, "Listed on a.example");
    }

    #[test]
    fn test_verify_is_idempotent() {
        let candidate = strong_factory();
        assert_eq!(verify(&candidate), verify(&candidate));
    }
}
