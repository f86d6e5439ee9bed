//! Two-wire bus on the ATmega32U4 TWI peripheral (pins D0/D1).

use avr_device::atmega32u4::TWI;
use ergodox_matrix::{BusError, TwoWire};

/// TWI (I2C) clock prescaler and bit rate for ~100kHz at 16MHz CPU.
/// SCL freq = CPU_FREQ / (16 + 2 * TWBR * prescaler)
/// 100kHz = 16MHz / (16 + 2 * 72 * 1) => TWBR = 72
const TWBR_VALUE: u8 = 72;

/// TWI status codes (TWSR with prescaler bits masked).
const TW_START: u8 = 0x08;
const TW_REP_START: u8 = 0x10;
const TW_MT_SLA_ACK: u8 = 0x18;
const TW_MT_SLA_NACK: u8 = 0x20;
const TW_MT_DATA_ACK: u8 = 0x28;
const TW_MT_DATA_NACK: u8 = 0x30;
const TW_ARB_LOST: u8 = 0x38;
const TW_MR_SLA_ACK: u8 = 0x40;
const TW_MR_SLA_NACK: u8 = 0x48;
const TW_MR_DATA_ACK: u8 = 0x50;
const TW_MR_DATA_NACK: u8 = 0x58;

const TW_STATUS_MASK: u8 = 0xF8;

pub struct Twi<'a> {
    twi: &'a TWI,
}

impl<'a> Twi<'a> {
    /// Set the bit rate and enable the peripheral.
    pub fn new(twi: &'a TWI) -> Self {
        twi.twbr.write(|w| unsafe { w.bits(TWBR_VALUE) });
        // Prescaler = 1 (TWPS = 0)
        twi.twsr.write(|w| w.twps().prescaler_1());
        twi.twcr.write(|w| w.twen().set_bit());
        Self { twi }
    }

    fn status(&self) -> u8 {
        self.twi.twsr.read().bits() & TW_STATUS_MASK
    }

    /// Wait for the current bus operation to finish.
    fn wait(&self) -> Result<u8, BusError> {
        let mut timeout: u16 = 0xFFFF;
        while self.twi.twcr.read().twint().bit_is_clear() {
            timeout -= 1;
            if timeout == 0 {
                return Err(BusError::Busy);
            }
        }
        Ok(self.status())
    }

    fn expect(&self, accepted: &[u8]) -> Result<(), BusError> {
        let status = self.wait()?;
        if accepted.contains(&status) {
            Ok(())
        } else {
            Err(classify(status))
        }
    }
}

fn classify(status: u8) -> BusError {
    match status {
        TW_ARB_LOST => BusError::ArbitrationLost,
        TW_MT_SLA_NACK | TW_MR_SLA_NACK => BusError::AddressNack,
        TW_MT_DATA_NACK => BusError::DataNack,
        other => BusError::Unexpected(other),
    }
}

impl TwoWire for Twi<'_> {
    fn start(&mut self, address_byte: u8) -> Result<(), BusError> {
        self.twi
            .twcr
            .write(|w| w.twint().set_bit().twsta().set_bit().twen().set_bit());
        self.expect(&[TW_START, TW_REP_START])?;

        self.twi.twdr.write(|w| unsafe { w.bits(address_byte) });
        self.twi.twcr.write(|w| w.twint().set_bit().twen().set_bit());
        self.expect(&[TW_MT_SLA_ACK, TW_MR_SLA_ACK])
    }

    fn write(&mut self, byte: u8) -> Result<(), BusError> {
        self.twi.twdr.write(|w| unsafe { w.bits(byte) });
        self.twi.twcr.write(|w| w.twint().set_bit().twen().set_bit());
        self.expect(&[TW_MT_DATA_ACK])
    }

    fn read_ack(&mut self) -> Result<u8, BusError> {
        self.twi
            .twcr
            .write(|w| w.twint().set_bit().twen().set_bit().twea().set_bit());
        self.expect(&[TW_MR_DATA_ACK])?;
        Ok(self.twi.twdr.read().bits())
    }

    fn read_nak(&mut self) -> Result<u8, BusError> {
        self.twi.twcr.write(|w| w.twint().set_bit().twen().set_bit());
        self.expect(&[TW_MR_DATA_NACK])?;
        Ok(self.twi.twdr.read().bits())
    }

    fn stop(&mut self) {
        self.twi
            .twcr
            .write(|w| w.twint().set_bit().twsto().set_bit().twen().set_bit());
        // Bounded wait for the stop condition to go out.
        let mut timeout: u16 = 0xFFFF;
        while self.twi.twcr.read().twsto().bit_is_set() && timeout > 0 {
            timeout -= 1;
        }
    }
}
