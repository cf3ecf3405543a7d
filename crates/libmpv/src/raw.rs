// C layout of the subset of the libmpv client API the engine uses

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_double, c_int, c_void};

pub const MPV_EVENT_NONE: c_int = 0;
pub const MPV_EVENT_GET_PROPERTY_REPLY: c_int = 3;
pub const MPV_EVENT_PROPERTY_CHANGE: c_int = 22;

pub const MPV_FORMAT_NONE: c_int = 0;
pub const MPV_FORMAT_STRING: c_int = 1;
pub const MPV_FORMAT_OSD_STRING: c_int = 2;
pub const MPV_FORMAT_FLAG: c_int = 3;
pub const MPV_FORMAT_INT64: c_int = 4;
pub const MPV_FORMAT_DOUBLE: c_int = 5;

#[repr(C)]
pub struct mpv_handle {
    _unused: [u8; 0],
}

#[repr(C)]
pub struct mpv_event {
    pub event_id: c_int,
    pub error: c_int,
    pub reply_userdata: u64,
    pub data: *mut c_void,
}

#[repr(C)]
pub struct mpv_event_property {
    pub name: *const c_char,
    pub format: c_int,
    pub data: *mut c_void,
}

pub type mpv_create_fn = unsafe extern "C" fn() -> *mut mpv_handle;
pub type mpv_initialize_fn = unsafe extern "C" fn(*mut mpv_handle) -> c_int;
pub type mpv_set_option_string_fn =
    unsafe extern "C" fn(*mut mpv_handle, *const c_char, *const c_char) -> c_int;
pub type mpv_command_string_fn = unsafe extern "C" fn(*mut mpv_handle, *const c_char) -> c_int;
pub type mpv_set_property_string_fn =
    unsafe extern "C" fn(*mut mpv_handle, *const c_char, *const c_char) -> c_int;
pub type mpv_set_property_fn =
    unsafe extern "C" fn(*mut mpv_handle, *const c_char, c_int, *mut c_void) -> c_int;
pub type mpv_get_property_string_fn =
    unsafe extern "C" fn(*mut mpv_handle, *const c_char) -> *mut c_char;
pub type mpv_observe_property_fn =
    unsafe extern "C" fn(*mut mpv_handle, u64, *const c_char, c_int) -> c_int;
pub type mpv_unobserve_property_fn = unsafe extern "C" fn(*mut mpv_handle, u64) -> c_int;
pub type mpv_wait_event_fn = unsafe extern "C" fn(*mut mpv_handle, c_double) -> *mut mpv_event;
pub type mpv_wakeup_fn = unsafe extern "C" fn(*mut mpv_handle);
pub type mpv_free_fn = unsafe extern "C" fn(*mut c_void);
pub type mpv_terminate_destroy_fn = unsafe extern "C" fn(*mut mpv_handle);

/// Entry points resolved from the loaded library
#[derive(Clone, Copy)]
pub struct MpvApi {
    pub create: mpv_create_fn,
    pub initialize: mpv_initialize_fn,
    pub set_option_string: mpv_set_option_string_fn,
    pub command_string: mpv_command_string_fn,
    pub set_property_string: mpv_set_property_string_fn,
    pub set_property: mpv_set_property_fn,
    pub get_property_string: mpv_get_property_string_fn,
    pub observe_property: mpv_observe_property_fn,
    pub unobserve_property: mpv_unobserve_property_fn,
    pub wait_event: mpv_wait_event_fn,
    pub wakeup: mpv_wakeup_fn,
    pub free: mpv_free_fn,
    pub terminate_destroy: mpv_terminate_destroy_fn,
}
