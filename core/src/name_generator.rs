//! Deterministic lender name generation using curated word lists.
//!
//! All generation is deterministic (same RNG seed = same names).
//! Names are upper case, the way the source snapshots report them.

use crate::rng::StreamRng;

pub struct LenderNameGenerator;

impl LenderNameGenerator {
    /// "PREFIX CORE SUFFIX", e.g. "SUMMIT HOME LOANS LLC".
    pub fn generate(rng: &mut StreamRng) -> String {
        let prefix = rng.pick(Self::prefixes());
        let core = rng.pick(Self::cores());
        let suffix = rng.pick(Self::suffixes());
        format!("{prefix} {core} {suffix}")
    }

    /// A genuinely different name for the same institution, as after a
    /// merger or rebrand. Never equal to `current`.
    pub fn rebrand(rng: &mut StreamRng, current: &str) -> String {
        loop {
            let candidate = Self::generate(rng);
            if candidate != current {
                return candidate;
            }
        }
    }

    /// A spelling variant of the same name, the kind a reporting
    /// system produces when two files disagree on abbreviations.
    pub fn spelling_variant(name: &str) -> String {
        let expansions = [
            (" CORP", " CORPORATION"),
            (" LLC", " L.L.C."),
            (" INC", " INCORPORATED"),
            (" CO", " COMPANY"),
            (" NA", " N.A."),
        ];
        for (short, long) in expansions {
            if let Some(stem) = name.strip_suffix(short) {
                return format!("{stem}{long}");
            }
        }
        format!("{name}, THE")
    }

    fn prefixes() -> &'static [&'static str] {
        &[
            "AMERICAN", "FIRST", "SUMMIT", "GUARANTEED", "PRIMARY", "FAIRWAY", "CROSSCOUNTRY",
            "GUILD", "CARDINAL", "HOMEBRIDGE", "PLAZA", "ACADEMY", "MOVEMENT", "NATIONS",
            "PARAMOUNT", "PRIMELENDING", "STEARNS", "UNION", "LIBERTY", "PACIFIC",
        ]
    }

    fn cores() -> &'static [&'static str] {
        &[
            "MORTGAGE", "HOME LOANS", "FINANCIAL", "LENDING", "RESIDENTIAL MORTGAGE",
            "FUNDING", "HOME MORTGAGE", "BANK",
        ]
    }

    fn suffixes() -> &'static [&'static str] {
        &["LLC", "CORP", "INC", "CO", "NA"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spelling_variant_differs_from_original() {
        assert_eq!(LenderNameGenerator::spelling_variant("FOO CORP"), "FOO CORPORATION");
        assert_eq!(LenderNameGenerator::spelling_variant("BAR"), "BAR, THE");
    }

    #[test]
    fn rebrand_never_returns_current_name() {
        let mut rng = StreamRng::new(3, 0);
        let current = LenderNameGenerator::generate(&mut rng);
        for _ in 0..20 {
            assert_ne!(LenderNameGenerator::rebrand(&mut rng, &current), current);
        }
    }
}
