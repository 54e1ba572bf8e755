use super::tables::{MLB_SUFFIX, SERIAL_PREFIXES};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Characters Apple uses in serial numbers (no `I` or `O`).
const SERIAL_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKLMNPQRSTUVWXYZ";
const SERIAL_LENGTH: usize = 12;

static UUID_V4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("Invalid UUID regex")
});

static ROM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-F]{2}(:[0-9A-F]{2}){5}$").expect("Invalid ROM regex")
});

static GENERIC_SERIAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-HJ-NP-Z]{12}$").expect("Invalid serial regex"));

/// Generated values that make the machine present as a specific Mac model.
///
/// All fields are produced in one call to [`PlatformIdentity::generate`];
/// the board serial is derived from the system serial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformIdentity {
    pub model: String,
    pub serial: String,
    pub mlb: String,
    pub uuid: String,
    pub rom: [u8; 6],
}

impl PlatformIdentity {
    pub fn generate<R: Rng + ?Sized>(model: &str, cpu_brand: &str, rng: &mut R) -> Self {
        let serial = generate_serial(cpu_brand, rng);
        let mlb = format!("{}{}", serial, MLB_SUFFIX);

        let mut uuid_bytes = [0u8; 16];
        rng.fill(&mut uuid_bytes);
        let uuid = uuid::Builder::from_random_bytes(uuid_bytes)
            .into_uuid()
            .hyphenated()
            .to_string()
            .to_uppercase();

        let mut rom = [0u8; 6];
        rng.fill(&mut rom);

        Self {
            model: model.to_string(),
            serial,
            mlb,
            uuid,
            rom,
        }
    }

    /// ROM as `AA:BB:CC:DD:EE:FF`.
    pub fn rom_text(&self) -> String {
        self.rom
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Check every field against its textual format.
    pub fn is_well_formed(&self, cpu_brand: &str) -> bool {
        UUID_V4_PATTERN.is_match(&self.uuid)
            && ROM_PATTERN.is_match(&self.rom_text())
            && serial_matches_brand(&self.serial, cpu_brand)
            && self.mlb == format!("{}{}", self.serial, MLB_SUFFIX)
    }
}

pub fn serial_prefix(cpu_brand: &str) -> Option<&'static str> {
    let brand = cpu_brand.trim().to_ascii_lowercase();
    SERIAL_PREFIXES
        .iter()
        .find(|(b, _)| *b == brand)
        .map(|(_, prefix)| *prefix)
}

pub fn serial_matches_brand(serial: &str, cpu_brand: &str) -> bool {
    if !GENERIC_SERIAL_PATTERN.is_match(serial) {
        return false;
    }
    serial_prefix(cpu_brand).is_none_or(|prefix| serial.starts_with(prefix))
}

fn generate_serial<R: Rng + ?Sized>(cpu_brand: &str, rng: &mut R) -> String {
    let prefix = serial_prefix(cpu_brand).unwrap_or("");
    let mut serial = String::with_capacity(SERIAL_LENGTH);
    serial.push_str(prefix);
    while serial.len() < SERIAL_LENGTH {
        let idx = rng.gen_range(0..SERIAL_ALPHABET.len());
        serial.push(SERIAL_ALPHABET[idx] as char);
    }
    serial
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_identity_formats() {
        let mut rng = StdRng::seed_from_u64(7);
        let identity = PlatformIdentity::generate("iMac19,1", "Intel", &mut rng);

        assert_eq!(identity.model, "iMac19,1");
        assert!(identity.serial.starts_with("C02"));
        assert_eq!(identity.serial.len(), 12);
        assert!(identity.mlb.starts_with(&identity.serial));
        assert!(identity.mlb.ends_with(MLB_SUFFIX));
        assert!(UUID_V4_PATTERN.is_match(&identity.uuid));
        assert!(ROM_PATTERN.is_match(&identity.rom_text()));
        assert!(identity.is_well_formed("Intel"));
    }

    #[test]
    fn test_unknown_brand_uses_generic_serial() {
        let mut rng = StdRng::seed_from_u64(11);
        let identity = PlatformIdentity::generate("iMac19,1", "VIA", &mut rng);

        assert_eq!(serial_prefix("VIA"), None);
        assert!(GENERIC_SERIAL_PATTERN.is_match(&identity.serial));
        assert!(!identity.serial.contains('I'));
        assert!(!identity.serial.contains('O'));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = PlatformIdentity::generate("MacPro7,1", "AMD", &mut StdRng::seed_from_u64(42));
        let b = PlatformIdentity::generate("MacPro7,1", "AMD", &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert!(a.serial.starts_with("F5K"));
    }

    #[test]
    fn test_rom_text() {
        let identity = PlatformIdentity {
            model: String::new(),
            serial: String::new(),
            mlb: String::new(),
            uuid: String::new(),
            rom: [0x0A, 0x1B, 0x2C, 0x3D, 0x4E, 0x5F],
        };
        assert_eq!(identity.rom_text(), "0A:1B:2C:3D:4E:5F");
    }
}
