// ── Capability tags ──
//
// The hub describes each device with capability names ("Switch",
// "Temperature Measurement", ...). Recognized names map to a closed set
// of variants; anything else lands in `Unknown` and is reported as a
// diagnostic instead of driving accessory construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// A device capability as reported by the hub.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Capability {
    #[strum(to_string = "Acceleration Sensor", serialize = "accelerationSensor")]
    AccelerationSensor,
    #[strum(to_string = "Actuator")]
    Actuator,
    #[strum(to_string = "Alarm")]
    Alarm,
    #[strum(to_string = "Audio Mute", serialize = "audioMute")]
    AudioMute,
    #[strum(to_string = "Audio Volume", serialize = "audioVolume")]
    AudioVolume,
    #[strum(to_string = "Battery")]
    Battery,
    #[strum(to_string = "Button")]
    Button,
    #[strum(to_string = "Carbon Dioxide Measurement", serialize = "carbonDioxideMeasurement")]
    CarbonDioxideMeasurement,
    #[strum(to_string = "Carbon Monoxide Detector", serialize = "carbonMonoxideDetector")]
    CarbonMonoxideDetector,
    #[strum(to_string = "Color Control", serialize = "colorControl")]
    ColorControl,
    #[strum(to_string = "Color Temperature", serialize = "colorTemperature")]
    ColorTemperature,
    #[strum(to_string = "Contact Sensor", serialize = "contactSensor")]
    ContactSensor,
    #[strum(to_string = "Door Control", serialize = "doorControl")]
    DoorControl,
    #[strum(to_string = "Energy Meter", serialize = "energyMeter")]
    EnergyMeter,
    #[strum(to_string = "Fan Speed", serialize = "fanSpeed")]
    FanSpeed,
    #[strum(to_string = "Garage Door Control", serialize = "garageDoorControl")]
    GarageDoorControl,
    #[strum(to_string = "Health Check", serialize = "healthCheck")]
    HealthCheck,
    #[strum(to_string = "Illuminance Measurement", serialize = "illuminanceMeasurement")]
    IlluminanceMeasurement,
    #[strum(to_string = "Lock")]
    Lock,
    #[strum(to_string = "Motion Sensor", serialize = "motionSensor")]
    MotionSensor,
    #[strum(to_string = "Polling")]
    Polling,
    #[strum(to_string = "Power Meter", serialize = "powerMeter")]
    PowerMeter,
    #[strum(to_string = "Power Source", serialize = "powerSource")]
    PowerSource,
    #[strum(to_string = "Presence Sensor", serialize = "presenceSensor")]
    PresenceSensor,
    #[strum(to_string = "Refresh")]
    Refresh,
    #[strum(
        to_string = "Relative Humidity Measurement",
        serialize = "relativeHumidityMeasurement"
    )]
    RelativeHumidityMeasurement,
    #[strum(to_string = "Sensor")]
    Sensor,
    #[strum(to_string = "Smoke Detector", serialize = "smokeDetector")]
    SmokeDetector,
    #[strum(to_string = "Switch")]
    Switch,
    #[strum(to_string = "Switch Level", serialize = "switchLevel")]
    SwitchLevel,
    #[strum(to_string = "Tamper Alert", serialize = "tamperAlert")]
    TamperAlert,
    #[strum(to_string = "Temperature Measurement", serialize = "temperatureMeasurement")]
    TemperatureMeasurement,
    #[strum(to_string = "Thermostat")]
    Thermostat,
    #[strum(to_string = "Thermostat Cooling Setpoint", serialize = "thermostatCoolingSetpoint")]
    ThermostatCoolingSetpoint,
    #[strum(to_string = "Thermostat Fan Mode", serialize = "thermostatFanMode")]
    ThermostatFanMode,
    #[strum(to_string = "Thermostat Heating Setpoint", serialize = "thermostatHeatingSetpoint")]
    ThermostatHeatingSetpoint,
    #[strum(to_string = "Thermostat Mode", serialize = "thermostatMode")]
    ThermostatMode,
    #[strum(to_string = "Thermostat Operating State", serialize = "thermostatOperatingState")]
    ThermostatOperatingState,
    #[strum(to_string = "Valve")]
    Valve,
    #[strum(to_string = "Water Sensor", serialize = "waterSensor")]
    WaterSensor,
    #[strum(to_string = "Window Shade", serialize = "windowShade")]
    WindowShade,
    /// A tag outside the recognized set, kept verbatim for diagnostics.
    #[strum(default)]
    Unknown(String),
}

impl Capability {
    /// Parse a hub capability name; never fails.
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        Self::from_str(tag).unwrap_or_else(|_| Self::Unknown(tag.to_owned()))
    }

    /// Every recognized capability.
    pub fn known() -> impl Iterator<Item = Capability> {
        Self::iter().filter(Self::is_known)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// The hub's display name for this capability.
    pub fn name(&self) -> &str {
        match self {
            Self::Unknown(tag) => tag,
            known => known.into(),
        }
    }

    /// Attributes an accessory exposing this capability reads.
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            Self::AccelerationSensor => &["acceleration"],
            Self::Alarm => &["alarm"],
            Self::AudioMute => &["mute"],
            Self::AudioVolume => &["volume"],
            Self::Battery => &["battery"],
            Self::Button => &["button"],
            Self::CarbonDioxideMeasurement => &["carbonDioxide"],
            Self::CarbonMonoxideDetector => &["carbonMonoxide"],
            Self::ColorControl => &["hue", "saturation", "color"],
            Self::ColorTemperature => &["colorTemperature"],
            Self::ContactSensor => &["contact"],
            Self::DoorControl | Self::GarageDoorControl => &["door"],
            Self::EnergyMeter => &["energy"],
            Self::FanSpeed => &["speed"],
            Self::IlluminanceMeasurement => &["illuminance"],
            Self::Lock => &["lock"],
            Self::MotionSensor => &["motion"],
            Self::PowerMeter => &["power"],
            Self::PowerSource => &["powerSource"],
            Self::PresenceSensor => &["presence"],
            Self::RelativeHumidityMeasurement => &["humidity"],
            Self::SmokeDetector => &["smoke"],
            Self::Switch => &["switch"],
            Self::SwitchLevel => &["level"],
            Self::TamperAlert => &["tamper"],
            Self::TemperatureMeasurement => &["temperature"],
            Self::Thermostat => &[
                "thermostatMode",
                "thermostatOperatingState",
                "heatingSetpoint",
                "coolingSetpoint",
                "temperature",
            ],
            Self::ThermostatCoolingSetpoint => &["coolingSetpoint"],
            Self::ThermostatFanMode => &["thermostatFanMode"],
            Self::ThermostatHeatingSetpoint => &["heatingSetpoint"],
            Self::ThermostatMode => &["thermostatMode"],
            Self::ThermostatOperatingState => &["thermostatOperatingState"],
            Self::Valve => &["valve"],
            Self::WaterSensor => &["water"],
            Self::WindowShade => &["windowShade", "position"],
            Self::Actuator
            | Self::HealthCheck
            | Self::Polling
            | Self::Refresh
            | Self::Sensor
            | Self::Unknown(_) => &[],
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Capability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Capability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::parse(&tag))
    }
}
