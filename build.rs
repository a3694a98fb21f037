fn main() {
    // The library and its tests build without the Tauri toolchain.
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
