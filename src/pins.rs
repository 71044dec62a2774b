//! GPIO / peripheral pin assignments for the enclosure controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Main fan bank (eight EC fans, one shared PWM signal)
// ---------------------------------------------------------------------------

pub const FAN_RIGHT_GPIOS: [i32; 4] = [21, 47, 45, 35];
pub const FAN_LEFT_GPIOS: [i32; 4] = [37, 38, 39, 40];

/// Inner circulation fan, own PWM channel.
pub const INNER_FAN_GPIO: i32 = 41;

// ---------------------------------------------------------------------------
// Water
// ---------------------------------------------------------------------------

/// Drip pump relay (active HIGH).
pub const PUMP_GPIO: i32 = 13;
/// Sprinkler solenoid relay (active HIGH).
pub const SPRINKLER_GPIO: i32 = 10;

// ---------------------------------------------------------------------------
// Damper motor
// ---------------------------------------------------------------------------

/// Direction relay: HIGH drives toward open.
pub const DAMPER_DRIVE_GPIO: i32 = 12;
/// Motor supply relay.
pub const DAMPER_POWER_GPIO: i32 = 11;

// ---------------------------------------------------------------------------
// RS-485 sensor bus (MAX485, half-duplex)
// ---------------------------------------------------------------------------

pub const RS485_UART_PORT: i32 = 1;
pub const RS485_RX_GPIO: i32 = 16;
pub const RS485_TX_GPIO: i32 = 17;
/// Tied DE + /RE: HIGH = transmit.
pub const RS485_DE_GPIO: i32 = 5;
pub const RS485_BAUD: u32 = 4800;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0-255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC frequency for the fans (20 kHz, above hearing).
pub const FAN_PWM_FREQ_HZ: u32 = 20_000;
