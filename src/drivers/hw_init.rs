//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions, LEDC timers/channels and the RS-485 UART
//! using raw ESP-IDF sys calls. Called once from `main()` before the
//! control loop starts.  Host builds get no-op stand-ins so drivers can
//! be exercised in tests.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    UartInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::UartInitFailed(rc) => write!(f, "RS-485 UART init failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::GpioConfigFailed(_) => Self::Init("gpio"),
            HwInitError::LedcInitFailed(_) => Self::Init("ledc"),
            HwInitError::UartInitFailed(_) => Self::Init("uart"),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the loop; single-threaded.
    unsafe {
        init_gpio_outputs()?;
        init_ledc()?;
        init_uart()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [
        pins::PUMP_GPIO,
        pins::SPRINKLER_GPIO,
        pins::DAMPER_DRIVE_GPIO,
        pins::DAMPER_POWER_GPIO,
        pins::RS485_DE_GPIO,
    ];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured (all LOW)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs(). Main-loop only.
    unsafe { gpio_set_level(pin, u32::from(high)); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── LEDC PWM ─────────────────────────────────────────────────

pub const LEDC_CH_FANS: u32 = 0;
pub const LEDC_CH_INNER_FAN: u32 = 1;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Timer 0: fans (20 kHz)
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: pins::PWM_RESOLUTION_BITS as ledc_timer_bit_t,
        freq_hz: pins::FAN_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer0) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

    // Channel 0 is bound to the first fan pin, the other seven mirror
    // its output through the GPIO matrix.
    let first = pins::FAN_RIGHT_GPIOS[0];
    let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: LEDC_CH_FANS,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        gpio_num: first,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    }) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

    let mirrors = pins::FAN_RIGHT_GPIOS.iter().chain(pins::FAN_LEFT_GPIOS.iter()).skip(1);
    for &gpio in mirrors {
        unsafe {
            gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_OUTPUT);
            esp_rom_gpio_connect_out_signal(
                gpio as u32,
                LEDC_LS_SIG_OUT0_IDX + LEDC_CH_FANS,
                false,
                false,
            );
        }
    }

    // Channel 1: inner fan
    let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: LEDC_CH_INNER_FAN,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        gpio_num: pins::INNER_FAN_GPIO,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    }) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

    info!("hw_init: LEDC configured (fans=CH0 x8, inner=CH1)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u32) {
    // SAFETY: LEDC channels were configured in init_ledc(); duty register
    // writes are race-free since only the main loop calls this function.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u32) {}

// ── RS-485 UART ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const UART_RX_BUF: i32 = 256;

#[cfg(target_os = "espidf")]
unsafe fn init_uart() -> Result<(), HwInitError> {
    let cfg = uart_config_t {
        baud_rate: pins::RS485_BAUD as i32,
        data_bits: uart_word_length_t_UART_DATA_8_BITS,
        parity: uart_parity_t_UART_PARITY_DISABLE,
        stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
        flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
        ..Default::default()
    };
    let port = pins::RS485_UART_PORT;

    let ret = unsafe { uart_driver_install(port, UART_RX_BUF, 0, 0, core::ptr::null_mut(), 0) };
    if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }

    let ret = unsafe { uart_param_config(port, &cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }

    let ret = unsafe {
        uart_set_pin(
            port,
            pins::RS485_TX_GPIO,
            pins::RS485_RX_GPIO,
            UART_PIN_NO_CHANGE,
            UART_PIN_NO_CHANGE,
        )
    };
    if ret != ESP_OK as i32 { return Err(HwInitError::UartInitFailed(ret)); }

    info!("hw_init: RS-485 UART{} at {} baud", port, pins::RS485_BAUD);
    Ok(())
}

#[cfg(target_os = "espidf")]
fn ms_to_ticks(ms: u32) -> u32 {
    (u64::from(ms) * u64::from(configTICK_RATE_HZ) / 1000) as u32
}

/// Write `frame` and block until it has left the shift register.
#[cfg(target_os = "espidf")]
pub fn uart_send(frame: &[u8], timeout_ms: u32) -> bool {
    let port = pins::RS485_UART_PORT;
    // SAFETY: driver installed in init_uart(); only the main loop uses the port.
    unsafe {
        uart_flush_input(port);
        let written = uart_write_bytes(port, frame.as_ptr().cast(), frame.len());
        if written < 0 || written as usize != frame.len() {
            return false;
        }
        uart_wait_tx_done(port, ms_to_ticks(timeout_ms)) == ESP_OK as i32
    }
}

/// Read up to `buf.len()` bytes, waiting at most `timeout_ms`.
#[cfg(target_os = "espidf")]
pub fn uart_receive(buf: &mut [u8], timeout_ms: u32) -> usize {
    // SAFETY: driver installed in init_uart(); only the main loop uses the port.
    let n = unsafe {
        uart_read_bytes(
            pins::RS485_UART_PORT,
            buf.as_mut_ptr().cast(),
            buf.len() as u32,
            ms_to_ticks(timeout_ms),
        )
    };
    n.max(0) as usize
}
