// A perfectly valid shared library that exports neither the plugin entry
// point nor the ABI marker. Discovery must skip it as "not a plugin".

#[no_mangle]
pub extern "C" fn _plexus_plugin_make() -> i32 {
    0
}

#[no_mangle]
pub static PLEXUS_ABI: u32 = 1;
