use crate::Error;

/// Identity of one physical pickup point: `<device_id>-<pair_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Serial {
    device: String,
    pair: u32,
}

impl Serial {
    pub fn new(device: &str, pair: i64) -> Result<Self, Error> {
        if device.is_empty() || device.contains('-') || device.chars().any(char::is_whitespace) {
            return Err(Error::InvalidFormat(format!("device id {:?}", device)));
        }
        let pair = u32::try_from(pair).map_err(|_| Error::InvalidFormat(format!("pair id {}", pair)))?;
        Ok(Self {
            device: device.to_string(),
            pair,
        })
    }
    pub fn device(&self) -> &str {
        &self.device
    }
    pub fn pair(&self) -> u32 {
        self.pair
    }
}

/// str isomorphism
/// exactly one separator and a non-negative decimal pair id
impl TryFrom<&str> for Serial {
    type Error = Error;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let invalid = || Error::InvalidFormat(format!("serial {:?}", s));
        let mut parts = s.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(device), Some(pair), None) if pair.bytes().all(|b| b.is_ascii_digit()) => {
                let pair = pair.parse::<i64>().map_err(|_| invalid())?;
                Self::new(device, pair).map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}-{}", self.device, self.pair)
    }
}
