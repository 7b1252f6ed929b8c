fn main() {
    // Host builds (tests, fuzzing) never enable `espidf` and skip the
    // ESP-IDF environment export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
