use crate::common::cursor::WriteCursor;
use crate::common::traits::{Loggable, Serialize};
use crate::decode::AppDecodeLevel;
use crate::error::RequestError;
use crate::types::{coil_to_u16, AddressRange, Indexed};

impl Serialize for AddressRange {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        cursor.write_u16_be(self.start)?;
        cursor.write_u16_be(self.count)?;
        Ok(())
    }
}

impl Serialize for Indexed<bool> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        cursor.write_u16_be(self.index)?;
        cursor.write_u16_be(coil_to_u16(self.value))?;
        Ok(())
    }
}

impl Serialize for Indexed<u16> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        cursor.write_u16_be(self.index)?;
        cursor.write_u16_be(self.value)?;
        Ok(())
    }
}

impl Loggable for AddressRange {
    fn log(&self, level: AppDecodeLevel, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if level.data_headers() {
            write!(f, "{self}")?;
        }
        Ok(())
    }
}

impl Loggable for Indexed<bool> {
    fn log(&self, level: AppDecodeLevel, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if level.data_headers() {
            write!(f, "{self}")?;
        }
        Ok(())
    }
}

impl Loggable for Indexed<u16> {
    fn log(&self, level: AppDecodeLevel, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if level.data_headers() {
            write!(f, "{self}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_address_range() {
        let range = AddressRange::try_from(3, 512).unwrap();
        let mut buffer = [0u8; 4];
        let mut cursor = WriteCursor::new(&mut buffer);
        range.serialize(&mut cursor).unwrap();
        assert_eq!(buffer, [0x00, 0x03, 0x02, 0x00]);
    }

    #[test]
    fn serializes_coil_write_with_wire_constants() {
        let mut buffer = [0u8; 4];
        let mut cursor = WriteCursor::new(&mut buffer);
        Indexed::new(0x0102, true).serialize(&mut cursor).unwrap();
        assert_eq!(buffer, [0x01, 0x02, 0xFF, 0x00]);

        let mut cursor = WriteCursor::new(&mut buffer);
        Indexed::new(0x0102, false).serialize(&mut cursor).unwrap();
        assert_eq!(buffer, [0x01, 0x02, 0x00, 0x00]);
    }
}
