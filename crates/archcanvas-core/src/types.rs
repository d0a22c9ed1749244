use crate::error::CanvasError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a closed vocabulary whose wire form is its human label.
///
/// Parsing is case-insensitive and tolerates the `<<label>>` stereotype
/// form used for interaction types. Deserialization goes through the same
/// parser, so JSON bodies, query strings and path segments agree.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CanvasError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s
                    .trim()
                    .trim_start_matches("<<")
                    .trim_end_matches(">>")
                    .trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        CanvasError::Validation(format!(
                            "unknown {} '{}', expected one of: {}",
                            stringify!($name),
                            s,
                            Self::ALL
                                .iter()
                                .map(|v| v.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ))
                    })
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

labelled_enum! {
    /// Architecture domains. `Enterprise` only exists on the canvas; the
    /// other ten each own a bucket in every project.
    Domain {
        People => "People",
        Services => "Services",
        Applications => "Applications",
        Network => "Network",
        Data => "Data",
        Information => "Information",
        Products => "Products",
        Process => "Process",
        Facilities => "Facilities",
        Platforms => "Platforms",
        Enterprise => "Enterprise",
    }
}

impl Domain {
    pub const BUCKETS: [Domain; 10] = [
        Domain::People,
        Domain::Services,
        Domain::Applications,
        Domain::Network,
        Domain::Data,
        Domain::Information,
        Domain::Products,
        Domain::Process,
        Domain::Facilities,
        Domain::Platforms,
    ];

    pub fn is_bucket(&self) -> bool {
        !matches!(self, Domain::Enterprise)
    }

    pub fn layer(&self) -> DomainLayer {
        match self {
            Domain::Enterprise => DomainLayer::Enterprise,
            Domain::Products | Domain::Services | Domain::Information => DomainLayer::Business,
            Domain::People | Domain::Process | Domain::Facilities => DomainLayer::Operational,
            Domain::Applications | Domain::Platforms | Domain::Network | Domain::Data => {
                DomainLayer::Technology
            }
        }
    }
}

labelled_enum! {
    DomainLayer {
        Enterprise => "Enterprise",
        Business => "Business",
        Operational => "Operational",
        Technology => "Technology",
    }
}

impl DomainLayer {
    pub fn color(&self) -> &'static str {
        match self {
            DomainLayer::Enterprise => "#1976D2",
            DomainLayer::Business => "#F57C00",
            DomainLayer::Operational => "#7B1FA2",
            DomainLayer::Technology => "#388E3C",
        }
    }
}

labelled_enum! {
    Impact {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Critical => "Critical",
    }
}

labelled_enum! {
    Likelihood {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        VeryHigh => "Very High",
    }
}

labelled_enum! {
    Effectiveness {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
}

labelled_enum! {
    Cost {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
}

labelled_enum! {
    RiskCategory {
        Operational => "Operational",
        Technical => "Technical",
        Strategic => "Strategic",
        Compliance => "Compliance",
        Financial => "Financial",
    }
}

labelled_enum! {
    MitigationType {
        Preventive => "Preventive",
        Detective => "Detective",
        Corrective => "Corrective",
        Compensating => "Compensating",
    }
}

labelled_enum! {
    ProjectStatus {
        Open => "Open",
        InProgress => "In Progress",
        Closed => "Closed",
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Open
    }
}

labelled_enum! {
    /// Relationship drawn between two domains on the canvas.
    InteractionType {
        Creates => "creates",
        Manages => "manages",
        Uses => "uses",
        Serves => "serves",
        Connects => "connects",
        Secures => "secures",
        Monitors => "monitors",
        Controls => "controls",
    }
}

impl InteractionType {
    /// `<<uses>>` form shown in connection listings.
    pub fn stereotype(&self) -> String {
        format!("<<{}>>", self.as_str())
    }
}

/// Cuts `text` to at most `max` characters and appends `...`, the way the
/// library tables abbreviate long descriptions.
pub fn truncate_description(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("people".parse::<Domain>().unwrap(), Domain::People);
        assert_eq!("Very High".parse::<Likelihood>().unwrap(), Likelihood::VeryHigh);
        assert_eq!("in progress".parse::<ProjectStatus>().unwrap(), ProjectStatus::InProgress);
        assert!("Galactic".parse::<Impact>().is_err());
    }

    #[test]
    fn interaction_accepts_stereotype_form() {
        assert_eq!("<<secures>>".parse::<InteractionType>().unwrap(), InteractionType::Secures);
        assert_eq!(InteractionType::Uses.stereotype(), "<<uses>>");
    }

    #[test]
    fn serializes_as_labels() {
        let json = serde_json::to_string(&ProjectStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let back: Likelihood = serde_json::from_str("\"Very High\"").unwrap();
        assert_eq!(back, Likelihood::VeryHigh);
    }

    #[test]
    fn deserializes_labels_case_insensitively() {
        let domain: Domain = serde_json::from_str("\"people\"").unwrap();
        assert_eq!(domain, Domain::People);
        let kind: InteractionType = serde_json::from_str("\"<<USES>>\"").unwrap();
        assert_eq!(kind, InteractionType::Uses);
        let err = serde_json::from_str::<Impact>("\"Galactic\"").unwrap_err();
        assert!(err.to_string().contains("Galactic"));
    }

    #[test]
    fn buckets_exclude_enterprise() {
        assert_eq!(Domain::BUCKETS.len(), 10);
        assert!(!Domain::BUCKETS.contains(&Domain::Enterprise));
        assert!(!Domain::Enterprise.is_bucket());
        assert_eq!(Domain::Network.layer(), DomainLayer::Technology);
        assert_eq!(Domain::Information.layer().color(), "#F57C00");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_description("abcdef", 3), "abc...");
        assert_eq!(truncate_description("ab", 50), "ab...");
    }
}
