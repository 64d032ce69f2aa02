//! VID:PID device filters
//!
//! Written as `0x04e8:0x6860`, with `*` for either half. An empty filter
//! list lets every device through.

use anyhow::{Result, anyhow, bail};
use std::fmt;
use std::str::FromStr;

/// One parsed `VID:PID` pattern; `None` is a wildcard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    vendor_id: Option<u16>,
    product_id: Option<u16>,
}

impl DeviceFilter {
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id.is_none_or(|v| v == vendor_id)
            && self.product_id.is_none_or(|p| p == product_id)
    }

    /// Whether any of `filters` admits the device
    pub fn admits(filters: &[DeviceFilter], vendor_id: u16, product_id: u16) -> bool {
        filters.is_empty() || filters.iter().any(|f| f.matches(vendor_id, product_id))
    }
}

impl FromStr for DeviceFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((vendor, product)) = s.split_once(':') else {
            bail!("Invalid filter '{}', expected VID:PID like '0x04e8:*'", s);
        };

        Ok(Self {
            vendor_id: parse_id(vendor, "VID")?,
            product_id: parse_id(product, "PID")?,
        })
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vendor_id {
            Some(v) => write!(f, "0x{:04x}:", v)?,
            None => write!(f, "*:")?,
        }
        match self.product_id {
            Some(p) => write!(f, "0x{:04x}", p),
            None => write!(f, "*"),
        }
    }
}

fn parse_id(part: &str, name: &str) -> Result<Option<u16>> {
    if part == "*" {
        return Ok(None);
    }

    let digits = part
        .strip_prefix("0x")
        .or_else(|| part.strip_prefix("0X"))
        .ok_or_else(|| anyhow!("{} '{}' must be hex with a 0x prefix", name, part))?;
    if digits.is_empty() || digits.len() > 4 {
        bail!("{} '{}' must have 1-4 hex digits", name, part);
    }

    u16::from_str_radix(digits, 16)
        .map(Some)
        .map_err(|_| anyhow!("{} '{}' is not a hex number", name, part))
}

/// Parse every pattern, failing on the first bad one
pub fn parse_filters(patterns: &[String]) -> Result<Vec<DeviceFilter>> {
    patterns.iter().map(|p| p.parse()).collect()
}
