/// Controls the decoding of transmitted and received data at the application,
/// frame, and physical layer
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeLevel {
    /// Controls decoding of the application layer (PDU)
    pub app: AppDecodeLevel,
    /// Controls decoding of the MBAP header
    pub frame: FrameDecodeLevel,
    /// Controls logging of the raw bytes read from and written to the socket
    pub physical: PhysDecodeLevel,
}

/// Controls how transmitted and received PDUs are decoded at the INFO log level
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AppDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the function code only
    FunctionCode,
    /// Decode the function code and the general description of the data
    DataHeaders,
    /// Decode the function code, the data description, and the actual data values
    DataValues,
}

/// Controls how the MBAP header is decoded at the INFO log level
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FrameDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the header fields
    Header,
    /// Decode the header fields and the raw payload as hexadecimal
    Payload,
}

/// Controls how physical layer reads and writes are logged at the INFO log level
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PhysDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log only the length of data that is sent and received
    Length,
    /// Log the length and the actual data that is sent and received
    Data,
}

impl DecodeLevel {
    /// construct a `DecodeLevel` with nothing enabled
    pub fn nothing() -> Self {
        Self::default()
    }

    /// construct a `DecodeLevel` from its fields
    pub fn new(app: AppDecodeLevel, frame: FrameDecodeLevel, physical: PhysDecodeLevel) -> Self {
        DecodeLevel {
            app,
            frame,
            physical,
        }
    }

    /// return a copy with a different application decode level
    pub fn application(self, app: AppDecodeLevel) -> Self {
        Self { app, ..self }
    }

    /// return a copy with a different frame decode level
    pub fn frame(self, frame: FrameDecodeLevel) -> Self {
        Self { frame, ..self }
    }

    /// return a copy with a different physical layer decode level
    pub fn physical(self, physical: PhysDecodeLevel) -> Self {
        Self { physical, ..self }
    }
}

impl From<AppDecodeLevel> for DecodeLevel {
    fn from(app: AppDecodeLevel) -> Self {
        Self {
            app,
            frame: FrameDecodeLevel::Nothing,
            physical: PhysDecodeLevel::Nothing,
        }
    }
}

impl AppDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, AppDecodeLevel::Nothing)
    }

    pub(crate) fn data_headers(&self) -> bool {
        matches!(self, AppDecodeLevel::DataHeaders | AppDecodeLevel::DataValues)
    }

    pub(crate) fn data_values(&self) -> bool {
        matches!(self, AppDecodeLevel::DataValues)
    }
}

impl FrameDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, FrameDecodeLevel::Nothing)
    }

    pub(crate) fn payload_enabled(&self) -> bool {
        matches!(self, FrameDecodeLevel::Payload)
    }
}

impl PhysDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, PhysDecodeLevel::Nothing)
    }

    pub(crate) fn data_enabled(&self) -> bool {
        matches!(self, PhysDecodeLevel::Data)
    }
}
