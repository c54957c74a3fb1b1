use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::decode::AppDecodeLevel;
use crate::error::RequestError;

/// Types that can serialize themselves into a request PDU payload
pub(crate) trait Serialize {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError>;
}

/// Types that can parse themselves from a response PDU payload
pub(crate) trait Parse: Sized {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, RequestError>;
}

/// Types that can describe themselves for decode logging at a particular level
pub(crate) trait Loggable {
    fn log(&self, level: AppDecodeLevel, f: &mut std::fmt::Formatter) -> std::fmt::Result;
}

pub(crate) struct LoggableDisplay<'a, T: Loggable> {
    loggable: &'a T,
    level: AppDecodeLevel,
}

impl<'a, T: Loggable> LoggableDisplay<'a, T> {
    pub(crate) fn new(loggable: &'a T, level: AppDecodeLevel) -> Self {
        Self { loggable, level }
    }
}

impl<T: Loggable> std::fmt::Display for LoggableDisplay<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.loggable.log(self.level, f)
    }
}
