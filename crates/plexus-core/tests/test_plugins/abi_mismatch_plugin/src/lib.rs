// Exports both plugin symbols, but with an ABI version no host speaks.
// The entry point must never be called.

use std::os::raw::c_void;

#[no_mangle]
pub static _PLEXUS_PLUGIN_ABI: u32 = 999;

#[no_mangle]
pub extern "C-unwind" fn _plexus_plugin_create() -> *mut c_void {
    panic!("entry point of an ABI-mismatched archive was called");
}
