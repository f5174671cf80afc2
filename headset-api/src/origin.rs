/// The reference frame poses are reported relative to.
///
/// `Head` means a seated/head-locked origin at head height; drivers add the
/// configured vertical offset so applications can treat y = 0 as the floor.
/// `Floor` means the runtime already tracks a floor-locked standing origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialization", derive(serde::Deserialize, serde::Serialize))]
pub enum HeadsetOrigin {
    Head,
    Floor,
}

impl Default for HeadsetOrigin {
    fn default() -> HeadsetOrigin {
        HeadsetOrigin::Head
    }
}
