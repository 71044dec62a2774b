//! Modbus-RTU framing for the humidity/temperature probes.
//!
//! Only function 0x04 (read input registers) with a single register is
//! needed.  The probes expose humidity at 0x0000 and temperature at
//! 0x0001, both as signed tenths.
//!
//! ```text
//! request:   addr | 0x04 | reg_hi reg_lo | 0x00 0x01 | crc_lo crc_hi
//! response:  addr | 0x04 | 0x02 | val_hi val_lo      | crc_lo crc_hi
//! exception: addr | 0x84 | code                      | crc_lo crc_hi
//! ```

use crate::error::BusError;

pub const FN_READ_INPUT_REGISTERS: u8 = 0x04;
pub const HUMIDITY_REGISTER: u16 = 0x0000;
pub const TEMPERATURE_REGISTER: u16 = 0x0001;

pub const REQUEST_LEN: usize = 8;
pub const RESPONSE_LEN: usize = 7;
const EXCEPTION_LEN: usize = 5;

/// Register values are tenths of a unit.
pub const SCALE: f32 = 10.0;

/// CRC-16/MODBUS (poly 0xA001 reflected, init 0xFFFF).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xA001 } else { crc >> 1 };
        }
    }
    crc
}

/// Build a single-register read request.
pub fn read_input_request(address: u8, register: u16) -> [u8; REQUEST_LEN] {
    let [reg_hi, reg_lo] = register.to_be_bytes();
    let mut frame = [address, FN_READ_INPUT_REGISTERS, reg_hi, reg_lo, 0x00, 0x01, 0, 0];
    let [crc_lo, crc_hi] = crc16(&frame[..6]).to_le_bytes();
    frame[6] = crc_lo;
    frame[7] = crc_hi;
    frame
}

/// Build the slave's reply carrying `value`.  Used by the host-side bus
/// simulation.
pub fn read_input_response(address: u8, value: i16) -> [u8; RESPONSE_LEN] {
    let [val_hi, val_lo] = value.to_be_bytes();
    let mut frame = [address, FN_READ_INPUT_REGISTERS, 0x02, val_hi, val_lo, 0, 0];
    let [crc_lo, crc_hi] = crc16(&frame[..5]).to_le_bytes();
    frame[5] = crc_lo;
    frame[6] = crc_hi;
    frame
}

/// Decode the reply to [`read_input_request`].
pub fn parse_read_input_response(address: u8, frame: &[u8]) -> Result<i16, BusError> {
    if frame.len() < EXCEPTION_LEN {
        return Err(BusError::Timeout);
    }

    let is_exception = frame[1] == (FN_READ_INPUT_REGISTERS | 0x80);
    let len = if is_exception { EXCEPTION_LEN } else { RESPONSE_LEN };
    if frame.len() < len {
        return Err(BusError::Timeout);
    }
    let frame = &frame[..len];

    let crc = u16::from_le_bytes([frame[len - 2], frame[len - 1]]);
    if crc16(&frame[..len - 2]) != crc {
        return Err(BusError::Crc);
    }
    if frame[0] != address {
        return Err(BusError::AddressMismatch);
    }
    if is_exception {
        return Err(BusError::Exception(frame[2]));
    }
    if frame[1] != FN_READ_INPUT_REGISTERS || frame[2] != 2 {
        return Err(BusError::Framing);
    }
    Ok(i16::from_be_bytes([frame[3], frame[4]]))
}
