//! Client-identity generation
//!
//! Produces plausible, varied browser/OS signature strings so that repeated
//! requests are harder to fingerprint. Signatures are assembled from weighted
//! profile tables of current browser and OS combinations with randomized
//! version numbers; nothing here touches the network.
//!
//! Generation is fail-open: any internal fault falls back to one static
//! default signature rather than surfacing an error to the caller.

use rand::distributions::WeightedIndex;
use rand::prelude::*;

/// Static fallback signature used when generation fails
pub const DEFAULT_IDENTITY: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/126.0 Safari/537.36";

/// Mobile share of generated identities without a mobile preference
const MOBILE_CHANCE_DEFAULT: f64 = 0.30;

/// Mobile share of generated identities with a mobile preference
const MOBILE_CHANCE_PREFERRED: f64 = 0.75;

const WINDOWS_VERSIONS: &[&str] = &["Windows NT 10.0; Win64; x64", "Windows NT 10.0; WOW64"];

const MACOS_VERSIONS: &[&str] = &[
    "Macintosh; Intel Mac OS X 10_15_7",
    "Macintosh; Intel Mac OS X 12_6_8",
    "Macintosh; Intel Mac OS X 13_5",
    "Macintosh; Intel Mac OS X 13_6",
    "Macintosh; Intel Mac OS X 14_0",
    "Macintosh; Intel Mac OS X 14_1",
];

const LINUX_PLATFORMS: &[&str] = &[
    "X11; Linux x86_64",
    "X11; Ubuntu; Linux x86_64",
    "X11; Fedora; Linux x86_64",
];

/// (Android version, device model) pairs for mobile Chrome signatures
const ANDROID_DEVICES: &[(&str, &str)] = &[
    ("13", "Pixel 7"),
    ("13", "Pixel 7 Pro"),
    ("14", "Pixel 8"),
    ("14", "Pixel 8 Pro"),
    ("13", "SM-S918B"),
    ("13", "SM-G991B"),
    ("13", "SM-A536B"),
    ("14", "SM-S928B"),
];

const IOS_VERSIONS: &[&str] = &["16_5", "16_6", "17_0", "17_1", "17_2"];

/// (Safari major, minor) version pairs
const SAFARI_VERSIONS: &[(u32, u32)] = &[(16, 5), (16, 6), (17, 0), (17, 1), (17, 2)];

const WEBKIT_VERSIONS: &[&str] = &["605.1.15", "606.1.36", "606.2.11"];

const CHROME_MAJORS: std::ops::RangeInclusive<u32> = 125..=130;
const FIREFOX_MAJORS: std::ops::RangeInclusive<u32> = 128..=132;
const EDGE_MAJORS: std::ops::RangeInclusive<u32> = 125..=130;

/// Resolves the identity for a request
///
/// An explicit, non-empty identity always wins. Otherwise a fresh signature
/// is generated with the given mobile preference, falling back to
/// [`DEFAULT_IDENTITY`] if generation fails. This function never errors.
pub fn resolve(explicit: Option<&str>, prefer_mobile: bool) -> String {
    if let Some(identity) = explicit {
        let trimmed = identity.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    generate(prefer_mobile).unwrap_or_else(|| DEFAULT_IDENTITY.to_string())
}

/// Returns true if an identity string carries a mobile marker
///
/// Downstream header building inspects the signature to decide whether to
/// attach mobile-specific hints.
pub fn is_mobile(identity: &str) -> bool {
    ["Mobile", "Android", "iPhone", "iPad"]
        .iter()
        .any(|marker| identity.contains(marker))
}

/// Generates a fresh identity string
///
/// `prefer_mobile` shifts the desktop/mobile split from roughly 30% mobile
/// to roughly 75% mobile. Returns `None` on any internal selection fault so
/// that [`resolve`] can apply the static fallback.
pub fn generate(prefer_mobile: bool) -> Option<String> {
    let mut rng = thread_rng();
    let mobile_chance = if prefer_mobile {
        MOBILE_CHANCE_PREFERRED
    } else {
        MOBILE_CHANCE_DEFAULT
    };

    if rng.gen::<f64>() < mobile_chance {
        generate_mobile(&mut rng)
    } else {
        generate_desktop(&mut rng)
    }
}

/// Generates a desktop signature from the weighted profile table
pub fn generate_desktop(rng: &mut ThreadRng) -> Option<String> {
    type Profile = fn(&mut ThreadRng) -> Option<String>;
    // Chrome and Firefox weigh heaviest, matching real-world share
    let profiles: [(Profile, u32); 8] = [
        (chrome_windows, 20),
        (chrome_macos, 15),
        (chrome_linux, 10),
        (firefox_windows, 15),
        (firefox_macos, 10),
        (firefox_linux, 8),
        (safari_macos, 12),
        (edge_windows, 10),
    ];
    let dist = WeightedIndex::new(profiles.iter().map(|(_, w)| *w)).ok()?;
    (profiles[dist.sample(rng)].0)(rng)
}

/// Generates a mobile signature from the weighted profile table
pub fn generate_mobile(rng: &mut ThreadRng) -> Option<String> {
    type Profile = fn(&mut ThreadRng) -> Option<String>;
    let profiles: [(Profile, u32); 4] = [
        (chrome_android, 40),
        (safari_iphone, 35),
        (safari_ipad, 15),
        (firefox_android, 10),
    ];
    let dist = WeightedIndex::new(profiles.iter().map(|(_, w)| *w)).ok()?;
    (profiles[dist.sample(rng)].0)(rng)
}

fn chrome_version(rng: &mut ThreadRng) -> String {
    format!(
        "{}.0.{}.{}",
        rng.gen_range(CHROME_MAJORS),
        rng.gen_range(0..5000),
        rng.gen_range(0..200)
    )
}

fn firefox_version(rng: &mut ThreadRng) -> String {
    format!("{}.0", rng.gen_range(FIREFOX_MAJORS))
}

fn safari_version(rng: &mut ThreadRng) -> Option<(String, &'static str)> {
    let (major, minor) = *SAFARI_VERSIONS.choose(rng)?;
    let webkit = *WEBKIT_VERSIONS.choose(rng)?;
    Some((format!("{}.{}", major, minor), webkit))
}

fn chrome_windows(rng: &mut ThreadRng) -> Option<String> {
    let os = *WINDOWS_VERSIONS.choose(rng)?;
    Some(format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
        os,
        chrome_version(rng)
    ))
}

fn chrome_macos(rng: &mut ThreadRng) -> Option<String> {
    let os = *MACOS_VERSIONS.choose(rng)?;
    Some(format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
        os,
        chrome_version(rng)
    ))
}

fn chrome_linux(rng: &mut ThreadRng) -> Option<String> {
    let os = *LINUX_PLATFORMS.choose(rng)?;
    Some(format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
        os,
        chrome_version(rng)
    ))
}

fn firefox_windows(rng: &mut ThreadRng) -> Option<String> {
    let os = *WINDOWS_VERSIONS.choose(rng)?;
    let version = firefox_version(rng);
    Some(format!(
        "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
        os, version, version
    ))
}

fn firefox_macos(rng: &mut ThreadRng) -> Option<String> {
    let os = *MACOS_VERSIONS.choose(rng)?;
    let version = firefox_version(rng);
    Some(format!(
        "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
        os, version, version
    ))
}

fn firefox_linux(rng: &mut ThreadRng) -> Option<String> {
    let os = *LINUX_PLATFORMS.choose(rng)?;
    let version = firefox_version(rng);
    Some(format!(
        "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
        os, version, version
    ))
}

fn safari_macos(rng: &mut ThreadRng) -> Option<String> {
    let os = *MACOS_VERSIONS.choose(rng)?;
    let (version, webkit) = safari_version(rng)?;
    Some(format!(
        "Mozilla/5.0 ({}) AppleWebKit/{} (KHTML, like Gecko) Version/{} Safari/{}",
        os, webkit, version, webkit
    ))
}

fn edge_windows(rng: &mut ThreadRng) -> Option<String> {
    let os = *WINDOWS_VERSIONS.choose(rng)?;
    let edge = format!(
        "{}.0.{}.{}",
        rng.gen_range(EDGE_MAJORS),
        rng.gen_range(2000..3000),
        rng.gen_range(0..100)
    );
    Some(format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36 Edg/{}",
        os,
        chrome_version(rng),
        edge
    ))
}

fn chrome_android(rng: &mut ThreadRng) -> Option<String> {
    let (android, device) = *ANDROID_DEVICES.choose(rng)?;
    Some(format!(
        "Mozilla/5.0 (Linux; Android {}; {}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Mobile Safari/537.36",
        android,
        device,
        chrome_version(rng)
    ))
}

fn safari_iphone(rng: &mut ThreadRng) -> Option<String> {
    let ios = *IOS_VERSIONS.choose(rng)?;
    let (version, webkit) = safari_version(rng)?;
    Some(format!(
        "Mozilla/5.0 (iPhone; CPU iPhone OS {} like Mac OS X) AppleWebKit/{} (KHTML, like Gecko) Version/{} Mobile/15E148 Safari/604.1",
        ios, webkit, version
    ))
}

fn safari_ipad(rng: &mut ThreadRng) -> Option<String> {
    let ios = *IOS_VERSIONS.choose(rng)?;
    let (version, webkit) = safari_version(rng)?;
    Some(format!(
        "Mozilla/5.0 (iPad; CPU OS {} like Mac OS X) AppleWebKit/{} (KHTML, like Gecko) Version/{} Mobile/15E148 Safari/604.1",
        ios, webkit, version
    ))
}

fn firefox_android(rng: &mut ThreadRng) -> Option<String> {
    let (android, _) = *ANDROID_DEVICES.choose(rng)?;
    let version = firefox_version(rng);
    Some(format!(
        "Mozilla/5.0 (Android {}; Mobile; rv:{}) Gecko/{} Firefox/{}",
        android, version, version, version
    ))
}
