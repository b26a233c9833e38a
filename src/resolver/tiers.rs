use std::time::Duration;

use super::{DeviceClass, Quality};

/// Pixel box requested from the upstream thumbnailer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// One row of the quality table
#[derive(Debug, Clone, Copy)]
pub struct TierSpec {
    pub quality: Quality,
    pub desktop: Option<TargetSize>,
    pub mobile: Option<TargetSize>,
    pub cache_secs: u64,
}

const HOUR: u64 = 3_600;

/// Sizes and cache lifetimes per quality tier.
/// `Medium` carries no size and is fetched at full resolution.
pub static TIERS: [TierSpec; 4] = [
    TierSpec {
        quality: Quality::Thumbnail,
        desktop: Some(TargetSize::new(400, 400)),
        mobile: Some(TargetSize::new(300, 300)),
        cache_secs: 24 * HOUR,
    },
    TierSpec {
        quality: Quality::Preview,
        desktop: Some(TargetSize::new(800, 800)),
        mobile: Some(TargetSize::new(600, 600)),
        cache_secs: 24 * HOUR,
    },
    TierSpec {
        quality: Quality::Background,
        desktop: Some(TargetSize::new(1200, 900)),
        mobile: Some(TargetSize::new(800, 600)),
        cache_secs: 12 * HOUR,
    },
    TierSpec {
        quality: Quality::Medium,
        desktop: None,
        mobile: None,
        cache_secs: HOUR,
    },
];

impl TierSpec {
    pub fn lookup(quality: Quality) -> &'static TierSpec {
        // Every Quality variant has a row
        TIERS
            .iter()
            .find(|tier| tier.quality == quality)
            .unwrap_or(&TIERS[TIERS.len() - 1])
    }

    pub fn target_for(&self, device: DeviceClass) -> Option<TargetSize> {
        match device {
            DeviceClass::Mobile => self.mobile,
            DeviceClass::Desktop => self.desktop,
        }
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_secs)
    }
}
