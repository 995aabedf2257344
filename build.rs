fn main() {
    // ── macOS: Bluetooth permission ──────────────────────────────────────────
    // CoreBluetooth keeps an unbundled binary "unauthorised" (no scan results,
    // no prompt) unless the executable carries an Info.plist with
    // NSBluetoothAlwaysUsageDescription.  The plist is linked into the
    // __TEXT,__info_plist section of each binary target, where macOS looks
    // for it when there is no app bundle.
    //
    // CARGO_CFG_TARGET_OS is the *target* OS, so cross builds work too.
    println!("cargo:rerun-if-changed=Info.plist");

    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("macos") {
        return;
    }
    let Ok(dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:warning=CARGO_MANIFEST_DIR unset; Info.plist not embedded");
        return;
    };

    // Together: ld … -sectcreate __TEXT __info_plist <dir>/Info.plist …
    for arg in [
        "-sectcreate".to_owned(),
        "__TEXT".to_owned(),
        "__info_plist".to_owned(),
        format!("{dir}/Info.plist"),
    ] {
        println!("cargo:rustc-link-arg-bins={arg}");
    }
}
