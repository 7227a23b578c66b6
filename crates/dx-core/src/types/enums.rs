//! Enumerations for upstream sources and caller source preferences.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Upstream sources
// ---------------------------------------------------------------------------

/// Upstream that produced a [`Spot`](crate::Spot).
///
/// Serialized with the display names the dashboard binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpotSource {
    /// HamQTH bulk CSV feed over HTTP.
    #[serde(rename = "HamQTH")]
    HamQth,
    /// DXSpider cluster node over a telnet-style session.
    #[serde(rename = "DXSpider")]
    DxSpider,
}

impl SpotSource {
    /// Short lowercase identifier used in query strings and log tags.
    pub fn id(self) -> &'static str {
        match self {
            Self::HamQth => "hamqth",
            Self::DxSpider => "dxspider",
        }
    }
}

impl std::fmt::Display for SpotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HamQth => write!(f, "HamQTH"),
            Self::DxSpider => write!(f, "DXSpider"),
        }
    }
}

// ---------------------------------------------------------------------------
// Caller preference
// ---------------------------------------------------------------------------

/// Which upstream(s) a caller wants spots from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePreference {
    /// HamQTH first, DXSpider only if HamQTH yields nothing.
    #[default]
    Auto,
    /// HamQTH only.
    HamQth,
    /// DXSpider first, HamQTH as the single fallback.
    DxSpider,
}

impl SourcePreference {
    /// All preferences, in the order they are presented to the UI.
    pub const ALL: [SourcePreference; 3] = [Self::Auto, Self::HamQth, Self::DxSpider];

    /// Ordered list of sources to try until one yields a non-empty result.
    ///
    /// HamQTH is always ahead of DXSpider when both are tried, except when the
    /// caller explicitly asked for DXSpider. No source appears twice.
    pub fn strategy_order(self) -> &'static [SpotSource] {
        match self {
            Self::Auto => &[SpotSource::HamQth, SpotSource::DxSpider],
            Self::HamQth => &[SpotSource::HamQth],
            Self::DxSpider => &[SpotSource::DxSpider, SpotSource::HamQth],
        }
    }

    /// Query-string identifier.
    pub fn id(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::HamQth => "hamqth",
            Self::DxSpider => "dxspider",
        }
    }

    /// Human-readable label for UI population.
    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::HamQth => "HamQTH",
            Self::DxSpider => "DX Spider",
        }
    }

    /// One-line behavior description for UI population.
    pub fn description(self) -> &'static str {
        match self {
            Self::Auto => "HamQTH CSV feed, falling back to a DX Spider cluster node when it is empty",
            Self::HamQth => "HamQTH CSV feed over HTTP only",
            Self::DxSpider => "DX Spider cluster node over telnet, falling back to HamQTH when it is empty",
        }
    }
}

impl FromStr for SourcePreference {
    type Err = crate::error::DxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "hamqth" => Ok(Self::HamQth),
            "dxspider" | "telnet" => Ok(Self::DxSpider),
            other => Err(crate::error::DxError::Config(format!("unknown spot source: {other}"))),
        }
    }
}

impl std::fmt::Display for SourcePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_serializes_display_name() {
        assert_eq!(serde_json::to_string(&SpotSource::HamQth).unwrap(), "\"HamQTH\"");
        assert_eq!(serde_json::to_string(&SpotSource::DxSpider).unwrap(), "\"DXSpider\"");
    }

    #[test]
    fn preference_parse() {
        assert_eq!("AUTO".parse::<SourcePreference>().unwrap(), SourcePreference::Auto);
        assert_eq!("hamqth".parse::<SourcePreference>().unwrap(), SourcePreference::HamQth);
        assert_eq!(" DXSpider ".parse::<SourcePreference>().unwrap(), SourcePreference::DxSpider);
        assert_eq!("".parse::<SourcePreference>().unwrap(), SourcePreference::Auto);
        assert!("proxy".parse::<SourcePreference>().is_err());
    }

    #[test]
    fn hamqth_preferred_when_both_tried() {
        assert_eq!(SourcePreference::Auto.strategy_order(), &[SpotSource::HamQth, SpotSource::DxSpider]);
        assert_eq!(SourcePreference::DxSpider.strategy_order(), &[SpotSource::DxSpider, SpotSource::HamQth]);
        assert_eq!(SourcePreference::HamQth.strategy_order(), &[SpotSource::HamQth]);
    }
}
