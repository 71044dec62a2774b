fn main() {
    // ESP-IDF link args and env only apply to firmware images; host builds
    // (tests, simulation) skip the sysenv export entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
