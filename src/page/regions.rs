//! Built-in deployment locations the probe knows how to highlight.

use serde::Serialize;

/// Cloud provider hosting a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
}

/// One deployment location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub name: &'static str,
    pub description: &'static str,
    pub provider: Provider,
    pub region: &'static str,
    pub city: Option<&'static str>,
    pub continent: &'static str,
    pub country: &'static str,
    pub state: Option<&'static str>,
}

pub const REGIONS: &[Region] = &[
    Region {
        name: "aws-eu-central-1",
        description: "AWS, Europe (Frankfurt)",
        provider: Provider::Aws,
        region: "eu-central-1",
        city: Some("Frankfurt"),
        continent: "Europe",
        country: "Germany",
        state: None,
    },
    Region {
        name: "aws-sa-east-1",
        description: "AWS, South America (São Paulo)",
        provider: Provider::Aws,
        region: "sa-east-1",
        city: Some("São Paulo"),
        continent: "South America",
        country: "Brazil",
        state: None,
    },
    Region {
        name: "aws-us-east-2",
        description: "AWS, US East (Ohio)",
        provider: Provider::Aws,
        region: "us-east-2",
        city: None,
        continent: "North America",
        country: "USA",
        state: Some("OH"),
    },
    Region {
        name: "aws-us-west-2",
        description: "AWS, US West (Oregon)",
        provider: Provider::Aws,
        region: "us-west-2",
        city: None,
        continent: "North America",
        country: "USA",
        state: Some("OR"),
    },
    Region {
        name: "azure-centralus",
        description: "Azure, Central US",
        provider: Provider::Azure,
        region: "centralus",
        city: None,
        continent: "North America",
        country: "USA",
        state: Some("IA"),
    },
    Region {
        name: "azure-eastus2",
        description: "Azure, East US 2",
        provider: Provider::Azure,
        region: "eastus2",
        city: None,
        continent: "North America",
        country: "USA",
        state: Some("VA"),
    },
    Region {
        name: "gcp-me-west1",
        description: "GCP, Tel Aviv, Israel, Middle East",
        provider: Provider::Gcp,
        region: "me-west1",
        city: Some("Tel Aviv"),
        continent: "Middle East",
        country: "Israel",
        state: None,
    },
    Region {
        name: "gcp-us-central1",
        description: "GCP, Council Bluffs, Iowa, USA",
        provider: Provider::Gcp,
        region: "us-central1",
        city: Some("Council Bluffs"),
        continent: "North America",
        country: "USA",
        state: Some("IA"),
    },
    Region {
        name: "gcp-us-east1",
        description: "GCP, Moncks Corner, South Carolina, USA",
        provider: Provider::Gcp,
        region: "us-east1",
        city: Some("Moncks Corner"),
        continent: "North America",
        country: "USA",
        state: Some("SC"),
    },
];

pub fn find(name: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|region| region.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_prefixed_by_provider() {
        for (i, region) in REGIONS.iter().enumerate() {
            assert!(REGIONS[i + 1..].iter().all(|other| other.name != region.name));
            let prefix = serde_json::to_value(region.provider).unwrap();
            assert!(region.name.starts_with(prefix.as_str().unwrap()));
            assert!(region.name.ends_with(region.region));
        }
    }

    #[test]
    fn find_by_name() {
        assert_eq!(find("gcp-me-west1").map(|r| r.country), Some("Israel"));
        assert!(find("mars-north-1").is_none());
    }
}
