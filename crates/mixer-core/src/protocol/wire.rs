//! Console wire messages.
//!
//! A [`WireMessage`] is the address/arguments pair carried by one OSC
//! message.  Packet framing is not handled here; the bridge's console
//! connection converts between these values and encoded OSC packets.
//!
//! # Read requests
//!
//! Consoles answer a read request sent to the parameter's address with
//! `/?` appended and no arguments:
//!
//! ```text
//! → /sd/Input_Channels/3/Aux_Send/1/send_level/?      []
//! ← /sd/Input_Channels/3/Aux_Send/1/send_level        [0.75]
//! ```

/// Suffix appended to a parameter address to ask the console for its value.
pub const QUERY_SUFFIX: &str = "/?";

/// One OSC argument value.
///
/// Only the argument types consoles actually send for mixer parameters are
/// represented; anything else is dropped by the codec layer.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Float(f32),
    Double(f64),
    Int(i32),
    Str(String),
}

impl WireValue {
    /// Returns the value as an `f32` if it is numeric.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            WireValue::Float(f) => Some(f),
            WireValue::Double(d) => Some(d as f32),
            WireValue::Int(i) => Some(i as f32),
            WireValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// An OSC message as exchanged with the console.
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub address: String,
    pub args: Vec<WireValue>,
}

impl WireMessage {
    pub fn new(address: impl Into<String>, args: Vec<WireValue>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// A message with no arguments, used for read requests.
    pub fn request(address: impl Into<String>) -> Self {
        Self::new(address, Vec::new())
    }

    /// First argument as a number.
    pub fn first_f32(&self) -> Option<f32> {
        self.args.first().and_then(WireValue::as_f32)
    }

    /// First argument as a string.
    pub fn first_str(&self) -> Option<&str> {
        self.args.first().and_then(WireValue::as_str)
    }

    /// Splits the address into its `/`-separated segments.
    ///
    /// Returns `None` for addresses that do not start with `/`.
    pub fn segments(&self) -> Option<Vec<&str>> {
        self.address
            .strip_prefix('/')
            .map(|rest| rest.split('/').collect())
    }
}

/// Appends [`QUERY_SUFFIX`] to a parameter address.
pub fn query_address(address: &str) -> String {
    format!("{address}{QUERY_SUFFIX}")
}
