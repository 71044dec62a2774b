//! Half-duplex RS-485 transport for the Modbus probes.
//!
//! Implements [`SensorBus`] on top of the UART installed by
//! [`hw_init`](super::hw_init).  The MAX485's tied DE and /RE pins are
//! driven from one GPIO: HIGH while a request is on the wire, LOW while
//! waiting for the reply.
//!
//! On host builds the UART is replaced by a register table, answered
//! through the same Modbus framing so the parser is exercised end to end.

use log::debug;

use crate::app::ports::SensorBus;
use crate::drivers::hw_init;
use crate::error::BusError;
use crate::pins;
use crate::sensors::modbus;

/// Upper bound on one request/response exchange.
pub const READ_WINDOW_MS: u32 = 100;

pub struct Rs485Bus {
    de_gpio: i32,
    transmitting: bool,
    known: heapless::Vec<u8, 8>,
    #[cfg(not(target_os = "espidf"))]
    sim_registers: std::collections::HashMap<(u8, u16), i16>,
}

impl Default for Rs485Bus {
    fn default() -> Self {
        Self::new(pins::RS485_DE_GPIO)
    }
}

impl Rs485Bus {
    pub fn new(de_gpio: i32) -> Self {
        Self {
            de_gpio,
            transmitting: false,
            known: heapless::Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_registers: std::collections::HashMap::new(),
        }
    }

    /// Addresses registered through [`SensorBus::begin`].
    pub fn addresses(&self) -> &[u8] {
        &self.known
    }

    pub fn is_transmitting(&self) -> bool {
        self.transmitting
    }

    /// Seed the simulated slave `address` with a raw register value.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_register(&mut self, address: u8, register: u16, raw: i16) {
        self.sim_registers.insert((address, register), raw);
    }

    /// Drop a simulated slave so its reads time out.
    #[cfg(not(target_os = "espidf"))]
    pub fn disconnect_sim(&mut self, address: u8) {
        self.sim_registers.retain(|&(addr, _), _| addr != address);
    }

    #[cfg(target_os = "espidf")]
    fn exchange(
        &mut self,
        request: &[u8; modbus::REQUEST_LEN],
        reply: &mut [u8; modbus::RESPONSE_LEN],
    ) -> usize {
        if !hw_init::uart_send(request, READ_WINDOW_MS) {
            return 0;
        }
        // Release the line before the slave starts answering.
        self.set_transmit(false);
        hw_init::uart_receive(reply, READ_WINDOW_MS)
    }

    #[cfg(not(target_os = "espidf"))]
    fn exchange(
        &mut self,
        request: &[u8; modbus::REQUEST_LEN],
        reply: &mut [u8; modbus::RESPONSE_LEN],
    ) -> usize {
        let address = request[0];
        let register = u16::from_be_bytes([request[2], request[3]]);
        self.set_transmit(false);
        match self.sim_registers.get(&(address, register)) {
            Some(&raw) => {
                *reply = modbus::read_input_response(address, raw);
                reply.len()
            }
            None => 0,
        }
    }
}

impl SensorBus for Rs485Bus {
    fn begin(&mut self, address: u8) {
        if !self.known.contains(&address) && self.known.push(address).is_err() {
            log::warn!("RS485: address table full, {} not tracked", address);
        }
    }

    fn set_transmit(&mut self, enabled: bool) {
        if self.transmitting != enabled {
            hw_init::gpio_write(self.de_gpio, enabled);
            self.transmitting = enabled;
        }
    }

    fn read_input_register(&mut self, address: u8, register: u16) -> Result<i16, BusError> {
        let request = modbus::read_input_request(address, register);
        let mut reply = [0u8; modbus::RESPONSE_LEN];
        let n = self.exchange(&request, &mut reply);
        let result = modbus::parse_read_input_response(address, &reply[..n]);
        if let Err(e) = result {
            debug!("RS485: addr {} reg {} -> {}", address, register, e);
        }
        result
    }
}
