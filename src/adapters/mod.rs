//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements   | Connects to                     |
//! |-------------|--------------|---------------------------------|
//! | `hardware`  | SensorPort   | I2C sensors, vane ADC           |
//! | `log_sink`  | EventSink    | Serial log output               |
//! | `network`   | NetworkPort  | Link-up flag (Wi-Fi / Ethernet) |
//! | `nvs`       | ConfigPort   | NVS / in-memory store           |
//! | `time`      | TimePort     | ESP32 system timer, RTC         |
//! | `uplink`    | UploadPort   | Serial log (JSON body)          |

pub mod hardware;
pub mod log_sink;
pub mod network;
pub mod nvs;
pub mod time;
pub mod uplink;
