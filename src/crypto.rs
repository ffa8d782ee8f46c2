//! UUID sources for `crypto.randomUUID` inside the sandbox.
//!
//! Two tiers: the strong tier draws from the OS generator through `uuid`; the
//! weak tier is a xorshift generator that only produces v4-shaped strings.
//! The weak tier is for cosmetic identifiers in rendered previews and must
//! never back anything security relevant.

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait UuidSource {
    fn random_uuid(&self) -> String;

    /// Whether ids come from a cryptographically strong generator.
    fn is_strong(&self) -> bool;
}

#[cfg(feature = "crypto")]
#[derive(Debug, Default, Clone, Copy)]
pub struct StrongUuid;

#[cfg(feature = "crypto")]
impl UuidSource for StrongUuid {
    fn random_uuid(&self) -> String {
        uuid::Uuid::new_v4().hyphenated().to_string()
    }

    fn is_strong(&self) -> bool {
        true
    }
}

/// Non-cryptographic fallback. Output matches the v4 layout
/// `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx` with `y` in `8..=b`.
#[derive(Debug)]
pub struct WeakUuid {
    state: Cell<u64>,
}

impl WeakUuid {
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9e37_79b9_7f4a_7c15);
        Self::with_seed(nanos ^ 0x2545_f491_4f6c_dd1d)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Cell::new(if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed }),
        }
    }

    fn next_nibble(&self) -> u8 {
        let mut x = self.state.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state.set(x);
        (x >> 32) as u8 & 0xf
    }
}

impl Default for WeakUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl UuidSource for WeakUuid {
    fn random_uuid(&self) -> String {
        const TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";
        TEMPLATE
            .chars()
            .map(|c| match c {
                'x' => hex_digit(self.next_nibble()),
                'y' => hex_digit((self.next_nibble() & 0x3) | 0x8),
                other => other,
            })
            .collect()
    }

    fn is_strong(&self) -> bool {
        false
    }
}

fn hex_digit(nibble: u8) -> char {
    char::from_digit(nibble as u32, 16).unwrap_or('0')
}

/// Picks the strong tier when it is compiled in, otherwise the weak tier.
pub fn select_uuid_source() -> Box<dyn UuidSource> {
    #[cfg(feature = "crypto")]
    {
        Box::new(StrongUuid)
    }
    #[cfg(not(feature = "crypto"))]
    {
        log::warn!("no strong UUID generator available; crypto.randomUUID falls back to a non-cryptographic source");
        Box::new(WeakUuid::new())
    }
}
