/// Identifies the vendor/model family behind the active driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialization", derive(serde::Deserialize, serde::Serialize))]
pub enum HeadsetType {
    Vive,
    Rift,
    WindowsMr,
    Gear,
    Go,
    Fake,
    Mock,
    Unknown,
}

impl HeadsetType {
    pub fn as_str(self) -> &'static str {
        match self {
            HeadsetType::Vive => "vive",
            HeadsetType::Rift => "rift",
            HeadsetType::WindowsMr => "windowsmr",
            HeadsetType::Gear => "gear",
            HeadsetType::Go => "go",
            HeadsetType::Fake => "fake",
            HeadsetType::Mock => "mock",
            HeadsetType::Unknown => "unknown",
        }
    }
}

impl Default for HeadsetType {
    fn default() -> HeadsetType {
        HeadsetType::Unknown
    }
}
