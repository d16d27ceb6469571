//! One-shot hardware peripheral initialization.
//!
//! Configures the vane ADC channel (with its calibration scheme) and the
//! anemometer input using raw ESP-IDF sys calls. Called once from `main()`
//! before the scheduler starts. The I2C buses are owned by `esp-idf-hal`
//! drivers and set up in `main()` directly.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::error::SensorError;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    TimerCreateFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc)     => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc)  => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc)  => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::TimerCreateFailed(rc) => write!(f, "esp_timer create failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::AdcInitFailed(_) => Self::Init("vane ADC"),
            HwInitError::GpioConfigFailed(_) => Self::Init("anemometer GPIO"),
            HwInitError::IsrInstallFailed(_) => Self::Init("GPIO ISR service"),
            HwInitError::TimerCreateFailed(_) => Self::Init("debounce timer"),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the scheduler; single-threaded.
    unsafe {
        init_adc()?;
        init_anemometer_input()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot + calibration) ───────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut ADC1_CALI: adc_cali_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only after `init_adc()` and only from the
/// scheduler task (the single ADC user).
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

/// SAFETY: Same invariants as `adc1_handle()`.
#[cfg(target_os = "espidf")]
unsafe fn adc1_cali() -> adc_cali_handle_t {
    unsafe { ADC1_CALI }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    // 12 dB attenuation: the divider swings almost rail to rail.
    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::VANE_ADC1_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    let cali_cfg = adc_cali_line_fitting_config_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        ..Default::default()
    };
    // SAFETY: ADC1_CALI is only written here, once at boot.
    let ret = unsafe { adc_cali_create_scheme_line_fitting(&cali_cfg, &raw mut ADC1_CALI) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    info!("hw_init: ADC1 CH{} configured for wind vane", pins::VANE_ADC1_CHANNEL);
    Ok(())
}

/// One calibrated vane sample in millivolts.
#[cfg(target_os = "espidf")]
pub fn vane_read_millivolts() -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract: scheduler task only, after init.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), pins::VANE_ADC1_CHANNEL, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed);
    }
    let mut mv: i32 = 0;
    // SAFETY: adc1_cali() contract.
    let ret = unsafe { adc_cali_raw_to_voltage(adc1_cali(), raw, &mut mv) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed);
    }
    u16::try_from(mv).map_err(|_| SensorError::AdcReadFailed)
}

// ── Anemometer input ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_anemometer_input() -> Result<(), HwInitError> {
    // GPIO34 has no internal pull resistors; the board provides one.
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::ANEMOMETER_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    info!("hw_init: anemometer input on GPIO{}", pins::ANEMOMETER_GPIO);
    Ok(())
}

/// Level of the anemometer pin. ISR-safe (single register read).
#[cfg(target_os = "espidf")]
pub fn anemometer_level() -> bool {
    (unsafe { gpio_get_level(pins::ANEMOMETER_GPIO) }) != 0
}

// ── GPIO ISR Service ──────────────────────────────────────────

/// Install the per-pin GPIO ISR service. Handlers are registered by
/// [`crate::drivers::hw_timer::install_wind_capture`].
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).
    let ret = unsafe { gpio_install_isr_service(0) };
    if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
        return Err(HwInitError::IsrInstallFailed(ret));
    }
    info!("hw_init: ISR service installed");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
