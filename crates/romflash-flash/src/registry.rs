//! Platform registry and initialization
//!
//! Opens a platform by name and works out how the flash is reached on it.
//! The CLI only ever sees the resulting [`PlatformHandle`].

use crate::handle::PlatformHandle;
use romflash_core::chip::ChipCatalog;
use romflash_core::platform::AccessKind;
use std::collections::HashMap;

/// Parsed platform parameters
pub struct PlatformParams {
    /// Platform name
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl PlatformParams {
    /// Parse parameter `key` as a number, if present
    ///
    /// Accepts decimal, `0x` hex and a `K`/`M` suffix.
    pub fn number(&self, key: &str) -> Result<Option<u64>, Box<dyn std::error::Error>> {
        match self.params.get(key) {
            Some(value) => parse_number(value)
                .map(Some)
                .ok_or_else(|| format!("Invalid number for '{}': {}", key, value).into()),
            None => Ok(None),
        }
    }
}

/// Parse a number: decimal, `0x` hex, or with a `K`/`M` suffix
pub fn parse_number(s: &str) -> Option<u64> {
    let s = s.trim();
    let (digits, scale) = match s.chars().last()? {
        'k' | 'K' => (&s[..s.len() - 1], 1024),
        'm' | 'M' => (&s[..s.len() - 1], 1024 * 1024),
        _ => (s, 1),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    value.checked_mul(scale)
}

/// Parse a platform string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_platform_params("physmap:base=0xfff80000")?;
/// assert_eq!(params.name, "physmap");
/// assert_eq!(params.params.get("base"), Some(&"0xfff80000".to_string()));
/// ```
pub fn parse_platform_params(s: &str) -> Result<PlatformParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(PlatformParams {
        name: name.to_string(),
        params,
    })
}

/// Open a platform and select its access method
///
/// # Arguments
/// * `platform` - Platform specification (e.g. "physmap" or "dummy:board=z180")
/// * `forced` - Access method to use instead of detecting one
/// * `catalog` - Chip catalog, used to resolve chip names in parameters
#[allow(unused_variables)] // Used in feature-gated code
pub fn open_platform(
    platform: &str,
    forced: Option<AccessKind>,
    catalog: &ChipCatalog,
) -> Result<PlatformHandle, Box<dyn std::error::Error>> {
    let params = parse_platform_params(platform)?;

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params, forced, catalog),

        #[cfg(feature = "physmap")]
        "physmap" | "devmem" => open_physmap(&params, forced),

        _ => Err(format!("Unknown platform: {}", params.name).into()),
    }
}

/// Look a chip up by catalog name or by hex device ID
#[allow(dead_code)] // Used in feature-gated code
fn resolve_chip(
    catalog: &ChipCatalog,
    spec: &str,
) -> Result<romflash_core::chip::ChipDescriptor, Box<dyn std::error::Error>> {
    if let Some(chip) = catalog.iter().find(|c| c.name.eq_ignore_ascii_case(spec)) {
        return Ok(chip.clone());
    }
    parse_number(spec)
        .and_then(|id| u16::try_from(id).ok())
        .and_then(|id| catalog.lookup(id))
        .ok_or_else(|| format!("Unknown chip: {}", spec).into())
}

// Platform-specific open functions

#[cfg(feature = "dummy")]
fn open_dummy(
    params: &PlatformParams,
    forced: Option<AccessKind>,
    catalog: &ChipCatalog,
) -> Result<PlatformHandle, Box<dyn std::error::Error>> {
    use romflash_core::platform::select;
    use romflash_dummy::{BoardConfig, BoardKind, EmulatedBoard};

    let kind = match params.params.get("board") {
        Some(name) => BoardKind::from_name(name).ok_or_else(|| {
            let names: Vec<&str> = BoardKind::ALL.iter().map(|k| k.name()).collect();
            format!("Unknown board '{}' (expected one of: {})", name, names.join(", "))
        })?,
        None => BoardKind::RomWbw,
    };
    let chip = match params.params.get("chip") {
        Some(spec) => resolve_chip(catalog, spec)?,
        None => resolve_chip(catalog, "39F040")?,
    };
    let chips = match params.number("chips")? {
        Some(n) => u32::try_from(n).map_err(|_| format!("Chip count out of range: {}", n))?,
        None => 1,
    };

    log::info!(
        "Opening emulated {} board with {} x {}",
        kind.name(),
        chips,
        chip.name
    );
    let mut board = EmulatedBoard::new(&BoardConfig { kind, chip, chips })?;

    if let Some(path) = params.params.get("image") {
        let data = std::fs::read(path)
            .map_err(|e| format!("Failed to read initial flash image '{}': {}", path, e))?;
        board.load_flash(&data);
    }

    let forced = match (forced, kind) {
        (None, BoardKind::Mapped) => Some(AccessKind::MemoryMapped),
        (forced, _) => forced,
    };
    let access = select(&mut board, forced)?;
    let strategy = romflash_dummy::strategy_for(board, access)?;
    Ok(PlatformHandle::new(access, strategy))
}

#[cfg(feature = "physmap")]
fn open_physmap(
    params: &PlatformParams,
    forced: Option<AccessKind>,
) -> Result<PlatformHandle, Box<dyn std::error::Error>> {
    if let Some(kind) = forced.filter(|&k| k != AccessKind::MemoryMapped) {
        return Err(format!("Access method '{}' is not available through /dev/mem", kind.name()).into());
    }

    let base = params
        .number("base")?
        .unwrap_or(romflash_physmap::DEFAULT_BASE);
    let size = params
        .number("size")?
        .map(|s| s as usize)
        .unwrap_or(romflash_physmap::DEFAULT_SIZE);

    let strategy = romflash_physmap::open(base, size).map_err(|e| {
        format!(
            "Failed to map flash window: {}\nThe physmap platform needs root.",
            e
        )
    })?;
    Ok(PlatformHandle::new(
        AccessKind::MemoryMapped,
        Box::new(strategy),
    ))
}

// Platform information and listing
/// Information about a platform
pub struct PlatformInfo {
    /// Name used in platform strings
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available platforms (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_platforms() -> Vec<PlatformInfo> {
    let mut platforms = Vec::new();

    #[cfg(feature = "dummy")]
    platforms.push(PlatformInfo {
        name: "dummy",
        description: "Emulated Z80/Z180 board (board=<romwbw|romwbw-legacy|una|p112|z180|mapped>,chip=<name|id>,chips=<n>,image=<file>)",
    });

    #[cfg(feature = "physmap")]
    platforms.push(PlatformInfo {
        name: "physmap",
        description: "Flash window in physical memory via /dev/mem (base=<addr>,size=<bytes>)",
    });

    platforms
}

/// Generate a short list of platform names for CLI help
pub fn platform_names_short() -> String {
    let platforms = available_platforms();
    if platforms.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = platforms.iter().map(|p| p.name).collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platform_params() {
        let p = parse_platform_params("dummy:board=z180,chips=2").unwrap();
        assert_eq!(p.name, "dummy");
        assert_eq!(p.params.get("board").map(String::as_str), Some("z180"));
        assert_eq!(p.number("chips").unwrap(), Some(2));
        assert_eq!(p.number("size").unwrap(), None);

        assert!(parse_platform_params("dummy:board").is_err());
        assert!(parse_platform_params("physmap").unwrap().params.is_empty());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("512K"), Some(512 * 1024));
        assert_eq!(parse_number("0xFFF80000"), Some(0xFFF8_0000));
        assert_eq!(parse_number("1M"), Some(1024 * 1024));
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("0xZZ"), None);
    }

    #[test]
    fn test_resolve_chip() {
        let catalog = ChipCatalog::builtin();
        assert_eq!(resolve_chip(&catalog, "at29c010").unwrap().device_id, 0x1FD5);
        assert_eq!(resolve_chip(&catalog, "0xBFB6").unwrap().name, "39F020");
        assert!(resolve_chip(&catalog, "0x1234").is_err());
    }

    #[test]
    fn test_unknown_platform() {
        let catalog = ChipCatalog::builtin();
        assert!(open_platform("ch341a", None, &catalog).is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_detects_access() {
        let catalog = ChipCatalog::builtin();
        let cases = [
            ("dummy", AccessKind::RomwbwModern),
            ("dummy:board=una", AccessKind::UnaBios),
            ("dummy:board=z180,chip=0xBFB5", AccessKind::Z180Dma),
            ("dummy:board=mapped", AccessKind::MemoryMapped),
        ];
        for (spec, kind) in cases {
            let handle = open_platform(spec, None, &catalog).unwrap();
            assert_eq!(handle.kind(), kind, "{}", spec);
        }

        let handle = open_platform("dummy:board=romwbw", Some(AccessKind::RomwbwLegacy), &catalog)
            .unwrap();
        assert_eq!(handle.kind(), AccessKind::RomwbwLegacy);
        assert!(open_platform("dummy:board=bogus", None, &catalog).is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_probe_ganged_chips() {
        use romflash_core::flash::ProbeOptions;

        let catalog = ChipCatalog::builtin();
        let mut handle = open_platform("dummy:chip=29F010,chips=4", None, &catalog).unwrap();
        let session = handle.probe(&catalog, &ProbeOptions::default()).unwrap();
        assert_eq!(session.chip_count(), 4);
        assert_eq!(session.total_size(), 512 * 1024);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_chip_count_out_of_range() {
        let catalog = ChipCatalog::builtin();
        // 2^32 + 2 must not wrap around to a valid count
        assert!(open_platform("dummy:chip=29F010,chips=4294967298", None, &catalog).is_err());
        assert!(open_platform("dummy:chip=29F010,chips=10", None, &catalog).is_err());
    }
}
