//! Enumerations carried inside messages.

/// Log severity, ordered from quietest to noisiest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum LogLevel {
    /// No logging.
    #[default]
    None = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Verbose = 5,
    VeryVerbose = 6,
}

impl LogLevel {
    /// Convert a wire value. Values past the noisiest level saturate to it.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => LogLevel::None,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Verbose,
            _ => LogLevel::VeryVerbose,
        }
    }

    /// Wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Cover position reported in state messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CoverState {
    #[default]
    Open = 0,
    Closed = 1,
}

impl CoverState {
    /// Wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Convert a wire value. Anything but 1 reads as open.
    pub fn from_u32(value: u32) -> Self {
        if value == 1 {
            CoverState::Closed
        } else {
            CoverState::Open
        }
    }
}

/// Cover action requested by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CoverCommand {
    Open = 0,
    Close = 1,
    Stop = 2,
}

impl CoverCommand {
    /// Convert a wire value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(CoverCommand::Open),
            1 => Some(CoverCommand::Close),
            2 => Some(CoverCommand::Stop),
            _ => None,
        }
    }

    /// Wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Discrete fan speed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FanSpeed {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
}

impl FanSpeed {
    /// Convert a wire value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(FanSpeed::Low),
            1 => Some(FanSpeed::Medium),
            2 => Some(FanSpeed::High),
            _ => None,
        }
    }

    /// Wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Argument type of a user-defined service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ServiceArgType {
    #[default]
    Bool = 0,
    Int = 1,
    Float = 2,
    String = 3,
}

impl ServiceArgType {
    /// Convert a wire value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(ServiceArgType::Bool),
            1 => Some(ServiceArgType::Int),
            2 => Some(ServiceArgType::Float),
            3 => Some(ServiceArgType::String),
            _ => None,
        }
    }

    /// Wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}
