// src/io/serial/line_config.rs
//
// Line configuration and its translation to termios attribute bits.
// Translation is pure; the result is applied onto attributes read from the device.

use std::fmt;
use std::str::FromStr;

use rustix::termios::{ControlModes, InputModes, LocalModes, OutputModes, SpecialCodeIndex, Termios};
use serde::{Deserialize, Serialize};

/// VMIN: return as soon as anything (or nothing) is available
const READ_MIN_BYTES: u8 = 0;
/// VTIME in tenths of a second
const READ_TIMEOUT_DECISECONDS: u8 = 1;

// ============================================================================
// Types
// ============================================================================

/// Supported line rates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum BaudRate {
    #[default]
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
    B230400,
}

impl BaudRate {
    pub const ALL: [BaudRate; 6] = [
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
        BaudRate::B230400,
    ];

    /// Unknown rates fall back to 9600.
    pub fn from_rate(rate: u32) -> Self {
        match rate {
            19200 => BaudRate::B19200,
            38400 => BaudRate::B38400,
            57600 => BaudRate::B57600,
            115200 => BaudRate::B115200,
            230400 => BaudRate::B230400,
            _ => BaudRate::B9600,
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
            BaudRate::B230400 => 230400,
        }
    }
}

impl From<u32> for BaudRate {
    fn from(rate: u32) -> Self {
        BaudRate::from_rate(rate)
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.as_u32()
    }
}

/// Character size
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl DataBits {
    /// Unknown sizes fall back to 8.
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl From<u8> for DataBits {
    fn from(bits: u8) -> Self {
        DataBits::from_bits(bits)
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        bits.as_u8()
    }
}

/// Parity setting for serial port configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "n" => Ok(Parity::None),
            "odd" | "o" => Ok(Parity::Odd),
            "even" | "e" => Ok(Parity::Even),
            other => Err(format!("Unknown parity '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopBits {
    #[default]
    #[serde(rename = "1")]
    One,
    /// No termios primitive; sent as two stop bits.
    #[serde(rename = "1.5")]
    OneAndHalf,
    #[serde(rename = "2")]
    Two,
}

impl FromStr for StopBits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(StopBits::One),
            "1.5" => Ok(StopBits::OneAndHalf),
            "2" => Ok(StopBits::Two),
            other => Err(format!("Unknown stop bits '{}'", other)),
        }
    }
}

/// User-facing line parameters for one connect attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineConfig {
    #[serde(default)]
    pub baud_rate: BaudRate,
    #[serde(default)]
    pub data_bits: DataBits,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default)]
    pub stop_bits: StopBits,
}

impl fmt::Display for LineConfig {
    /// `115200 8N1` style summary
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        let stop = match self.stop_bits {
            StopBits::One => "1",
            StopBits::OneAndHalf => "1.5",
            StopBits::Two => "2",
        };
        write!(
            f,
            "{} {}{}{}",
            self.baud_rate.as_u32(),
            self.data_bits.as_u8(),
            parity,
            stop
        )
    }
}

// ============================================================================
// Attribute Translation
// ============================================================================

/// Termios changes derived from a [`LineConfig`].
///
/// Flags in a `*_clear` set are removed first, then `control_set` is added,
/// so the size mask can be cleared and a single CSx set in one pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineAttributes {
    pub speed: u32,
    pub control_set: ControlModes,
    pub control_clear: ControlModes,
    pub input_clear: InputModes,
    pub local_clear: LocalModes,
    pub output_clear: OutputModes,
    pub vmin: u8,
    pub vtime: u8,
}

/// Map a line configuration onto termios bits. No I/O.
pub fn translate(config: &LineConfig) -> LineAttributes {
    let mut control_set = ControlModes::CREAD | ControlModes::CLOCAL;
    let mut control_clear = ControlModes::CSIZE;

    control_set |= match config.data_bits {
        DataBits::Five => ControlModes::CS5,
        DataBits::Six => ControlModes::CS6,
        DataBits::Seven => ControlModes::CS7,
        DataBits::Eight => ControlModes::CS8,
    };

    match config.parity {
        Parity::None => control_clear |= ControlModes::PARENB,
        Parity::Odd => control_set |= ControlModes::PARENB | ControlModes::PARODD,
        Parity::Even => {
            control_set |= ControlModes::PARENB;
            control_clear |= ControlModes::PARODD;
        }
    }

    match config.stop_bits {
        StopBits::One => control_clear |= ControlModes::CSTOPB,
        StopBits::OneAndHalf | StopBits::Two => control_set |= ControlModes::CSTOPB,
    }

    // Hardware flow control stays off
    #[cfg(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "freebsd"))]
    {
        control_clear |= ControlModes::CRTSCTS;
    }

    LineAttributes {
        speed: config.baud_rate.as_u32(),
        control_set,
        control_clear,
        input_clear: InputModes::IXON
            | InputModes::IXOFF
            | InputModes::IXANY
            | InputModes::ICRNL
            | InputModes::INLCR
            | InputModes::IGNCR
            | InputModes::ISTRIP
            | InputModes::BRKINT,
        local_clear: LocalModes::ICANON
            | LocalModes::ECHO
            | LocalModes::ECHOE
            | LocalModes::ISIG
            | LocalModes::IEXTEN,
        output_clear: OutputModes::OPOST,
        vmin: READ_MIN_BYTES,
        vtime: READ_TIMEOUT_DECISECONDS,
    }
}

impl LineAttributes {
    /// Apply onto attributes read from the device. Fails only if the platform rejects the speed.
    pub fn apply_to(&self, termios: &mut Termios) -> rustix::io::Result<()> {
        termios.control_modes &= !self.control_clear;
        termios.control_modes |= self.control_set;
        termios.input_modes &= !self.input_clear;
        termios.local_modes &= !self.local_clear;
        termios.output_modes &= !self.output_clear;
        termios.special_codes[SpecialCodeIndex::VMIN] = self.vmin;
        termios.special_codes[SpecialCodeIndex::VTIME] = self.vtime;
        termios.set_speed(self.speed)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn all_configs() -> Vec<LineConfig> {
        let mut configs = Vec::new();
        for baud_rate in BaudRate::ALL {
            for data_bits in [DataBits::Five, DataBits::Six, DataBits::Seven, DataBits::Eight] {
                for parity in [Parity::None, Parity::Odd, Parity::Even] {
                    for stop_bits in [StopBits::One, StopBits::OneAndHalf, StopBits::Two] {
                        configs.push(LineConfig {
                            baud_rate,
                            data_bits,
                            parity,
                            stop_bits,
                        });
                    }
                }
            }
        }
        configs
    }

    #[test]
    fn test_translate_is_deterministic() {
        for config in all_configs() {
            assert_eq!(translate(&config), translate(&config), "{}", config);
        }
    }

    #[test]
    fn test_unknown_numeric_inputs_fall_back() {
        assert_eq!(BaudRate::from_rate(12345), BaudRate::B9600);
        assert_eq!(BaudRate::from_rate(0), BaudRate::B9600);
        assert_eq!(DataBits::from_bits(9), DataBits::Eight);
        assert_eq!(DataBits::from_bits(0), DataBits::Eight);

        let config = LineConfig {
            baud_rate: BaudRate::from_rate(1_000_000),
            data_bits: DataBits::from_bits(4),
            ..LineConfig::default()
        };
        let attrs = translate(&config);
        assert_eq!(attrs.speed, 9600);
        assert!(attrs.control_set.contains(ControlModes::CS8));
    }

    #[test]
    fn test_each_rate_has_its_own_speed() {
        let speeds: Vec<u32> = BaudRate::ALL
            .iter()
            .map(|&baud_rate| translate(&LineConfig { baud_rate, ..LineConfig::default() }).speed)
            .collect();
        assert_eq!(speeds, vec![9600, 19200, 38400, 57600, 115200, 230400]);
    }

    #[test]
    fn test_data_bits_clear_size_mask() {
        for (bits, flag) in [
            (DataBits::Five, ControlModes::CS5),
            (DataBits::Six, ControlModes::CS6),
            (DataBits::Seven, ControlModes::CS7),
            (DataBits::Eight, ControlModes::CS8),
        ] {
            let attrs = translate(&LineConfig { data_bits: bits, ..LineConfig::default() });
            assert!(attrs.control_clear.contains(ControlModes::CSIZE));
            assert_eq!(attrs.control_set & ControlModes::CSIZE, flag);
        }
    }

    #[test]
    fn test_parity_bits() {
        let none = translate(&LineConfig { parity: Parity::None, ..LineConfig::default() });
        assert!(none.control_clear.contains(ControlModes::PARENB));
        assert!(!none.control_set.contains(ControlModes::PARENB));

        let odd = translate(&LineConfig { parity: Parity::Odd, ..LineConfig::default() });
        assert!(odd.control_set.contains(ControlModes::PARENB | ControlModes::PARODD));

        let even = translate(&LineConfig { parity: Parity::Even, ..LineConfig::default() });
        assert!(even.control_set.contains(ControlModes::PARENB));
        assert!(even.control_clear.contains(ControlModes::PARODD));
        assert!(!even.control_set.contains(ControlModes::PARODD));
    }

    #[test]
    fn test_one_and_half_stop_bits_sent_as_two() {
        let two = translate(&LineConfig { stop_bits: StopBits::Two, ..LineConfig::default() });
        let one_half = translate(&LineConfig { stop_bits: StopBits::OneAndHalf, ..LineConfig::default() });
        let one = translate(&LineConfig { stop_bits: StopBits::One, ..LineConfig::default() });
        assert_eq!(two, one_half);
        assert!(two.control_set.contains(ControlModes::CSTOPB));
        assert!(one.control_clear.contains(ControlModes::CSTOPB));
    }

    #[test]
    fn test_raw_mode_flags_always_forced() {
        for config in all_configs() {
            let attrs = translate(&config);
            assert!(attrs.control_set.contains(ControlModes::CREAD | ControlModes::CLOCAL));
            assert!(attrs.input_clear.contains(InputModes::IXON | InputModes::IXOFF | InputModes::IXANY));
            assert!(attrs.local_clear.contains(
                LocalModes::ICANON | LocalModes::ECHO | LocalModes::ECHOE | LocalModes::ISIG
            ));
            assert!(attrs.output_clear.contains(OutputModes::OPOST));
            assert_eq!(attrs.vmin, 0);
            assert_eq!(attrs.vtime, 1);
            // set and clear never overlap
            assert!((attrs.control_set & attrs.control_clear & !ControlModes::CSIZE).is_empty());
        }
    }

    #[test]
    fn test_line_config_display() {
        let config = LineConfig {
            baud_rate: BaudRate::B115200,
            data_bits: DataBits::Seven,
            parity: Parity::Even,
            stop_bits: StopBits::OneAndHalf,
        };
        assert_eq!(config.to_string(), "115200 7E1.5");
        assert_eq!(LineConfig::default().to_string(), "9600 8N1");
    }

    #[test]
    fn test_parse_parity_and_stop_bits() {
        assert_eq!("ODD".parse::<Parity>(), Ok(Parity::Odd));
        assert_eq!("e".parse::<Parity>(), Ok(Parity::Even));
        assert!("mark".parse::<Parity>().is_err());
        assert_eq!("1.5".parse::<StopBits>(), Ok(StopBits::OneAndHalf));
        assert!("3".parse::<StopBits>().is_err());
    }

    #[test]
    fn test_line_config_from_toml() {
        let config: LineConfig =
            toml::from_str("baud_rate = 115200\ndata_bits = 7\nparity = \"odd\"\nstop_bits = \"2\"\n")
                .unwrap();
        assert_eq!(config.baud_rate, BaudRate::B115200);
        assert_eq!(config.data_bits, DataBits::Seven);
        assert_eq!(config.parity, Parity::Odd);
        assert_eq!(config.stop_bits, StopBits::Two);

        // Unsupported numbers degrade instead of failing
        let config: LineConfig = toml::from_str("baud_rate = 300\ndata_bits = 9\n").unwrap();
        assert_eq!(config.baud_rate, BaudRate::B9600);
        assert_eq!(config.data_bits, DataBits::Eight);
    }
}
