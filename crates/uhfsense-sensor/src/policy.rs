//! Mapping a detected tag and the current light level to an LED command.

use std::collections::HashMap;

use tracing::info;
use uhfsense_core::constants::DEFAULT_ILLUMINATION_THRESHOLD_LUX;
use uhfsense_core::{Epc, LedColor};

use crate::command::LedCommand;

/// Tag-to-color mapping.
///
/// Explicit entries win. Any other tag gets a color from the last hex digit
/// of its EPC: even is RED, odd is GREEN. An empty EPC is RED.
#[derive(Debug, Clone, Default)]
pub struct TagColorRule {
    overrides: HashMap<Epc, LedColor>,
}

impl TagColorRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `epc` to `color`.
    pub fn insert(&mut self, epc: Epc, color: LedColor) -> Option<LedColor> {
        self.overrides.insert(epc, color)
    }

    /// Pin a tag given as hex to a color given by name (`RED`/`GREEN`, any case).
    ///
    /// # Errors
    ///
    /// Returns `InvalidHex` for a bad EPC and `InvalidColor` for any other
    /// color name. Nothing is stored on error.
    pub fn add_tag_color(&mut self, epc_hex: &str, color: &str) -> uhfsense_core::Result<()> {
        let color: LedColor = color.parse()?;
        let epc = Epc::from_hex(epc_hex)?;
        info!(epc = %epc, color = %color, "Tag color mapping added");
        self.overrides.insert(epc, color);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    pub fn color_for(&self, epc: &Epc) -> LedColor {
        if let Some(color) = self.overrides.get(epc) {
            return *color;
        }
        match epc.last_nibble() {
            Some(nibble) if nibble % 2 == 1 => LedColor::Green,
            _ => LedColor::Red,
        }
    }
}

/// Decides what the LED should show for a detected tag.
#[derive(Debug, Clone)]
pub struct ActuationPolicy {
    /// Below this many lux the LED is lit.
    pub threshold: f64,
    pub rule: TagColorRule,
}

impl ActuationPolicy {
    pub fn new(threshold: f64, rule: TagColorRule) -> Self {
        Self { threshold, rule }
    }

    pub fn decide(&self, epc: &Epc, lux: f64) -> LedCommand {
        if lux < self.threshold {
            LedCommand::On(self.rule.color_for(epc))
        } else {
            LedCommand::Off
        }
    }
}

impl Default for ActuationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ILLUMINATION_THRESHOLD_LUX, TagColorRule::new())
    }
}
