fn main() {
    // ESP-IDF environment only matters for the on-target build; host builds
    // (unit + integration tests) skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
