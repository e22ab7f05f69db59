//! Descriptive metadata attached to aligned outputs.

use goes_common::{CityExportDescriptor, Coverage};

pub const INSTITUTION: &str = "University of Maryland, College Park";
pub const SOURCE: &str = "Satellite observation";
pub const MICROWAVE_VARIABLE: &str = "microwave_LST";
pub const GRID_MAPPING: &str = "spatial_ref";

/// Published properties of one ABI thermal channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelInfo {
    pub channel: &'static str,
    pub valid_min: f64,
    pub valid_max: f64,
    pub wavelength: &'static str,
}

pub const THERMAL_CHANNELS: [ChannelInfo; 4] = [
    ChannelInfo {
        channel: "C13",
        valid_min: 89.62,
        valid_max: 341.27,
        wavelength: "10.1-10.6 µm",
    },
    ChannelInfo {
        channel: "C14",
        valid_min: 96.19,
        valid_max: 341.28,
        wavelength: "10.8-11.6 µm",
    },
    ChannelInfo {
        channel: "C15",
        valid_min: 97.38,
        valid_max: 341.28,
        wavelength: "11.8-12.8 µm",
    },
    ChannelInfo {
        channel: "C16",
        valid_min: 92.7,
        valid_max: 318.26,
        wavelength: "13.0-13.6 µm",
    },
];

/// Channel of an export band name such as `CMI_C13`.
pub fn channel_of(band: &str) -> &str {
    band.strip_prefix("CMI_").unwrap_or(band)
}

pub fn channel_info(band: &str) -> Option<&'static ChannelInfo> {
    let channel = channel_of(band);
    THERMAL_CHANNELS.iter().find(|c| c.channel == channel)
}

/// Output variable name of an export band, e.g. `CMI_C13` -> `GOES_C13_LWIR`.
pub fn output_variable_name(band: &str) -> String {
    format!("GOES_{}_LWIR", channel_of(band))
}

pub fn title(city: &CityExportDescriptor) -> String {
    match city.coverage {
        Coverage::West => format!(
            "GOES-17/18 and microwave LST data for {}",
            city.display_name
        ),
        Coverage::East => format!("GOES-16 and microwave_LST data for {}", city.display_name),
    }
}
