//! Provider region tables
//!
//! Keys are provider region names with separators stripped and lowercased,
//! values are canonical provider-agnostic regions.

use crate::models::Provider;

/// Canonical regions recognised by the optimizer
pub const CANONICAL_REGIONS: &[&str] = &[
    "us-east",
    "us-central",
    "us-west",
    "ca-central",
    "sa-east",
    "eu-west",
    "eu-central",
    "eu-north",
    "uk-south",
    "ap-south",
    "ap-southeast",
    "ap-northeast",
    "au-east",
];

const AWS_REGIONS: &[(&str, &str)] = &[
    ("useast1", "us-east"),
    ("useast2", "us-central"),
    ("uswest1", "us-west"),
    ("uswest2", "us-west"),
    ("cacentral1", "ca-central"),
    ("saeast1", "sa-east"),
    ("euwest1", "eu-west"),
    ("euwest2", "uk-south"),
    ("euwest3", "eu-west"),
    ("eucentral1", "eu-central"),
    ("eunorth1", "eu-north"),
    ("apsouth1", "ap-south"),
    ("apsoutheast1", "ap-southeast"),
    ("apsoutheast2", "au-east"),
    ("apnortheast1", "ap-northeast"),
    ("apnortheast2", "ap-northeast"),
];

const AZURE_REGIONS: &[(&str, &str)] = &[
    ("eastus", "us-east"),
    ("eastus2", "us-east"),
    ("centralus", "us-central"),
    ("northcentralus", "us-central"),
    ("southcentralus", "us-central"),
    ("westus", "us-west"),
    ("westus2", "us-west"),
    ("westus3", "us-west"),
    ("canadacentral", "ca-central"),
    ("brazilsouth", "sa-east"),
    ("westeurope", "eu-west"),
    ("northeurope", "eu-west"),
    ("germanywestcentral", "eu-central"),
    ("swedencentral", "eu-north"),
    ("uksouth", "uk-south"),
    ("centralindia", "ap-south"),
    ("southeastasia", "ap-southeast"),
    ("japaneast", "ap-northeast"),
    ("koreacentral", "ap-northeast"),
    ("australiaeast", "au-east"),
];

const GCP_REGIONS: &[(&str, &str)] = &[
    ("useast1", "us-east"),
    ("useast4", "us-east"),
    ("uscentral1", "us-central"),
    ("uswest1", "us-west"),
    ("uswest2", "us-west"),
    ("northamericanortheast1", "ca-central"),
    ("southamericaeast1", "sa-east"),
    ("europewest1", "eu-west"),
    ("europewest2", "uk-south"),
    ("europewest3", "eu-central"),
    ("europewest4", "eu-west"),
    ("europenorth1", "eu-north"),
    ("asiasouth1", "ap-south"),
    ("asiasoutheast1", "ap-southeast"),
    ("asianortheast1", "ap-northeast"),
    ("australiasoutheast1", "au-east"),
];

/// Relative grid carbon intensity per canonical region (0 = cleanest, 1 = dirtiest)
const CARBON_INTENSITY: &[(&str, f64)] = &[
    ("us-east", 0.45),
    ("us-central", 0.55),
    ("us-west", 0.30),
    ("ca-central", 0.05),
    ("sa-east", 0.15),
    ("eu-west", 0.35),
    ("eu-central", 0.40),
    ("eu-north", 0.05),
    ("uk-south", 0.25),
    ("ap-south", 0.80),
    ("ap-southeast", 0.55),
    ("ap-northeast", 0.50),
    ("au-east", 0.75),
];

fn table(provider: Provider) -> &'static [(&'static str, &'static str)] {
    match provider {
        Provider::Aws => AWS_REGIONS,
        Provider::Azure => AZURE_REGIONS,
        Provider::Gcp => GCP_REGIONS,
    }
}

/// Lowercase and strip `-`, `_`, `.` and whitespace
pub fn strip_separators(region: &str) -> String {
    region
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | '.') && !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Look up the canonical region for a provider-native region name
pub fn lookup(provider: Provider, region: &str) -> Option<&'static str> {
    let key = strip_separators(region);
    table(provider)
        .iter()
        .find(|(native, _)| *native == key)
        .map(|(_, canonical)| *canonical)
}

pub fn is_canonical(region: &str) -> bool {
    CANONICAL_REGIONS.contains(&region)
}

/// Carbon intensity for a canonical region, if known
pub fn carbon_intensity(canonical_region: &str) -> Option<f64> {
    CARBON_INTENSITY
        .iter()
        .find(|(region, _)| *region == canonical_region)
        .map(|(_, intensity)| *intensity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mapping_targets_a_canonical_region() {
        for provider in [Provider::Aws, Provider::Azure, Provider::Gcp] {
            for (native, canonical) in table(provider) {
                assert!(is_canonical(canonical), "{} -> {}", native, canonical);
                assert_eq!(strip_separators(native), *native);
            }
        }
    }

    #[test]
    fn test_every_canonical_region_has_intensity() {
        for region in CANONICAL_REGIONS {
            assert!(carbon_intensity(region).is_some(), "{}", region);
        }
    }

    #[test]
    fn test_lookup_ignores_case_and_separators() {
        assert_eq!(lookup(Provider::Aws, "US-EAST-1"), Some("us-east"));
        assert_eq!(lookup(Provider::Azure, "West Europe"), Some("eu-west"));
        assert_eq!(lookup(Provider::Gcp, "europe-west3"), Some("eu-central"));
        assert_eq!(lookup(Provider::Aws, "mars-north-1"), None);
    }
}
